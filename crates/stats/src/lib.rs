//! Aggregate statistics over ascent records.
//!
//! Takes an in-memory snapshot of ticks and reduces it to the numbers the
//! dashboard, profile and problem pages display. Malformed fields are
//! skipped per record; nothing here fails.

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use karst_features::{round_to, year_of, years_between};
use karst_model::{
    height_label, height_rank, AscentRecord, GradeCount, GradeScale, HeightCount,
    ProblemStatistics, Reference, StatisticsSummary,
};

/// Summarize a collection of ascents.
///
/// Ascents without an effective grade are left out of the grade
/// distribution, and undated ascents out of the yearly activity. An empty
/// collection yields zero counts and `None` everywhere else.
pub fn summarize(records: &[AscentRecord]) -> StatisticsSummary {
    let grade_distribution = grade_distribution(records);
    let hardest_grade = hardest_grade(grade_distribution.keys().map(String::as_str));

    let dates: Vec<NaiveDate> = records.iter().filter_map(|r| r.date).collect();
    let mut activity_by_year = BTreeMap::new();
    for date in &dates {
        *activity_by_year.entry(year_of(*date)).or_insert(0) += 1;
    }

    let first_date = dates.iter().min().copied();
    let last_date = dates.iter().max().copied();
    let span_in_years = first_date
        .zip(last_date)
        .map(|(first, last)| years_between(first, last));

    let ascents_per_active_year = (!activity_by_year.is_empty())
        .then(|| round_to(dates.len() as f64 / activity_by_year.len() as f64, 1));

    let (unique_area_count, unique_city_count) = unique_places(records);

    StatisticsSummary {
        total_count: records.len(),
        hardest_grade,
        grade_distribution,
        activity_by_year,
        unique_area_count,
        unique_city_count,
        average_rating: average_rating(records),
        first_date,
        last_date,
        span_in_years,
        ascents_per_active_year,
    }
}

/// Ascents per effective grade.
pub fn grade_distribution(records: &[AscentRecord]) -> BTreeMap<String, usize> {
    let mut distribution = BTreeMap::new();
    for grade in records.iter().filter_map(AscentRecord::effective_grade) {
        *distribution.entry(grade.to_string()).or_insert(0) += 1;
    }
    distribution
}

/// Highest-ranked grade among `grades`. Grades off the scale never win.
pub fn hardest_grade<'a>(grades: impl IntoIterator<Item = &'a str>) -> Option<String> {
    let scale = GradeScale::standard();
    grades
        .into_iter()
        .filter(|grade| scale.is_ranked(grade))
        .max_by_key(|grade| scale.rank(grade))
        .map(str::to_string)
}

/// Mean rating over rated ascents; unrated ones do not count as zero.
pub fn average_rating(records: &[AscentRecord]) -> Option<f64> {
    let ratings: Vec<f64> = records
        .iter()
        .filter_map(|r| r.rating)
        .map(f64::from)
        .collect();
    (!ratings.is_empty()).then(|| ratings.iter().sum::<f64>() / ratings.len() as f64)
}

/// Distinct areas and cities.
///
/// Only areas sent as structured objects count. The city id is only
/// reachable through such an area, so ascents whose area is a bare id
/// contribute to neither count, even when the API knows the city.
pub fn unique_places(records: &[AscentRecord]) -> (usize, usize) {
    let mut areas = HashSet::new();
    let mut cities = HashSet::new();

    for area in records
        .iter()
        .filter_map(|r| r.problem.area.as_ref().and_then(Reference::detail))
    {
        areas.insert(area.id.as_str());
        if let Some(city) = &area.city_id {
            cities.insert(city.as_str());
        }
    }

    (areas.len(), cities.len())
}

/// Ascents of one problem.
pub fn ticks_for_problem<'a>(
    ticks: &'a [AscentRecord],
    problem_id: &'a str,
) -> impl Iterator<Item = &'a AscentRecord> + 'a {
    ticks.iter().filter(move |tick| tick.problem.id == problem_id)
}

/// Grade votes and climber heights for the ascents of one problem.
///
/// Votes and heights off their scales are ignored, so the bucket counts
/// always add up to `grade_votes_count` and `height_data_count`.
pub fn problem_statistics(ticks: &[AscentRecord]) -> ProblemStatistics {
    let grade_voting = grade_voting(ticks);
    let height_distribution = height_distribution(ticks);

    let (suggested_grade, suggested_grade_votes) = consensus(&grade_voting)
        .map(|vote| (Some(vote.grade.clone()), vote.count))
        .unwrap_or((None, 0));

    ProblemStatistics {
        total_ticks: ticks.len(),
        grade_votes_count: grade_voting.iter().map(|g| g.count).sum(),
        height_data_count: height_distribution.iter().map(|h| h.count).sum(),
        grade_voting,
        height_distribution,
        suggested_grade,
        suggested_grade_votes,
        average_rating: average_rating(ticks),
    }
}

/// Suggested-grade votes ordered by the grade scale.
pub fn grade_voting(ticks: &[AscentRecord]) -> Vec<GradeCount> {
    let scale = GradeScale::standard();
    let mut counts = vec![0usize; scale.unranked()];
    for vote in ticks.iter().filter_map(|t| t.suggested_grade.as_deref()) {
        if let Some(count) = counts.get_mut(scale.rank(vote.trim())) {
            *count += 1;
        }
    }

    scale
        .labels()
        .iter()
        .zip(counts)
        .filter(|(_, count)| *count > 0)
        .map(|(grade, count)| GradeCount {
            grade: grade.to_string(),
            count,
        })
        .collect()
}

/// Climber heights ordered by the height scale.
pub fn height_distribution(ticks: &[AscentRecord]) -> Vec<HeightCount> {
    let mut counts: BTreeMap<usize, (&str, usize)> = BTreeMap::new();
    for category in ticks.iter().filter_map(|t| t.climber_height.as_deref()) {
        if let Some(rank) = height_rank(category) {
            counts.entry(rank).or_insert((category, 0)).1 += 1;
        }
    }

    counts
        .into_values()
        .map(|(category, count)| HeightCount {
            category: category.to_string(),
            label: height_label(category).unwrap_or(category).to_string(),
            count,
        })
        .collect()
}

/// The grade with the most votes; ties go to the easier grade.
fn consensus(voting: &[GradeCount]) -> Option<&GradeCount> {
    voting.iter().fold(None, |best: Option<&GradeCount>, vote| match best {
        Some(current) if current.count >= vote.count => Some(current),
        _ => Some(vote),
    })
}
