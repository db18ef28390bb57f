//! Display-ready views of climbing statistics.
//!
//! Converts summaries into bar-chart rows and one-line descriptions
//! suitable for the dashboard, the profile page and the terminal.

use std::cmp::Reverse;

use karst_features::round_to;
use karst_model::{GradeScale, ProblemStatistics, StatisticsSummary};
use serde::{Deserialize, Serialize};

/// One row of the grade pyramid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeBar {
    pub grade: String,

    pub count: usize,

    /// Share of all graded ascents, in percent (one decimal)
    pub percent: f64,

    /// Bar length relative to the largest bucket, in percent (one decimal)
    pub width: f64,
}

/// One row of the activity chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearBar {
    pub year: i32,
    pub count: usize,
    pub width: f64,
}

/// Grade pyramid, hardest grade on top, grades off the scale at the bottom.
pub fn grade_pyramid(summary: &StatisticsSummary) -> Vec<GradeBar> {
    let scale = GradeScale::standard();
    let total: usize = summary.grade_distribution.values().sum();
    let widest = summary.grade_distribution.values().copied().max().unwrap_or(0);

    let mut bars: Vec<GradeBar> = summary
        .grade_distribution
        .iter()
        .map(|(grade, count)| GradeBar {
            grade: grade.clone(),
            count: *count,
            percent: percent(*count, total),
            width: percent(*count, widest),
        })
        .collect();

    bars.sort_by_key(|bar| {
        let rank = scale.rank(&bar.grade);
        (rank == scale.unranked(), Reverse(rank))
    });
    bars
}

/// Ascents per year, oldest first.
pub fn activity_bars(summary: &StatisticsSummary) -> Vec<YearBar> {
    let widest = summary.activity_by_year.values().copied().max().unwrap_or(0);
    summary
        .activity_by_year
        .iter()
        .map(|(year, count)| YearBar {
            year: *year,
            count: *count,
            width: percent(*count, widest),
        })
        .collect()
}

/// `part / whole` in percent, one decimal; zero when `whole` is zero.
pub fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    round_to(part as f64 * 100.0 / whole as f64, 1)
}

/// Fixed-width text bar for terminal output.
pub fn text_bar(width: f64, columns: usize) -> String {
    let filled = ((width / 100.0) * columns as f64).round() as usize;
    let filled = if width > 0.0 { filled.max(1) } else { 0 };
    "#".repeat(filled.min(columns))
}

/// One-line description of an ascent summary.
pub fn summary_line(summary: &StatisticsSummary) -> String {
    if summary.total_count == 0 {
        return "No ascents logged yet.".to_string();
    }

    let mut parts = vec![plural(summary.total_count, "ascent")];

    if let Some(hardest) = &summary.hardest_grade {
        parts.push(format!("hardest {}", hardest));
    }

    if summary.unique_area_count > 0 {
        let mut places = plural(summary.unique_area_count, "area");
        if summary.unique_city_count > 0 {
            places.push_str(&format!(" in {}", plural(summary.unique_city_count, "city")));
        }
        parts.push(places);
    }

    if let (Some(first), Some(last), Some(span)) =
        (summary.first_date, summary.last_date, summary.span_in_years)
    {
        parts.push(format!("{} to {} ({:.1} years)", first, last, span));
    }

    if let Some(rating) = summary.average_rating {
        parts.push(format!("average rating {:.1}", rating));
    }

    parts.join(", ")
}

/// One-line description of a problem's tick statistics.
pub fn problem_line(stats: &ProblemStatistics) -> String {
    if stats.total_ticks == 0 {
        return "Not ticked yet.".to_string();
    }

    let mut parts = vec![plural(stats.total_ticks, "tick")];

    if let Some(grade) = &stats.suggested_grade {
        parts.push(format!(
            "suggested grade {} ({})",
            grade,
            plural(stats.suggested_grade_votes, "vote")
        ));
    }

    if let Some(rating) = stats.average_rating {
        parts.push(format!("average rating {:.1}", rating));
    }

    parts.join(", ")
}

fn plural(count: usize, noun: &str) -> String {
    match (count, noun) {
        (1, _) => format!("1 {}", noun),
        (_, "city") => format!("{} cities", count),
        _ => format!("{} {}s", count, noun),
    }
}
