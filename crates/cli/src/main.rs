//! Command-line view of a climbing log.
//!
//! Usage:
//!     karst --input ticks.json summary
//!     karst --input problems.json list problems --min-grade 6C --sort grade
//!     karst pyramid --format json
//!     karst --input ticks.json problem-stats --problem 42

use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use karst_model::{
    AscentRecord, FilterCriteria, ProblemRecord, SortDirection, SortField, SortSpec, Status, Style,
};
use karst_query::{
    page_window, ticked_problem_ids, validate, Listable, Page, ViewState, DEFAULT_PAGE_SIZE,
};
use karst_report::{
    activity_bars, grade_pyramid, problem_line, summary_line, text_bar, GradeBar, YearBar,
};
use karst_source::{ApiConfig, ApiSource, FileSource, RecordSource};
use karst_stats::{problem_statistics, summarize, ticks_for_problem};
use serde::Serialize;

const BAR_COLUMNS: usize = 40;

#[derive(Parser)]
#[command(name = "karst")]
#[command(about = "Browse and summarize a bouldering log")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Read records from an exported JSON file instead of the API
    #[arg(long, global = true)]
    input: Option<PathBuf>,

    /// API base URL
    #[arg(long, env = "KARST_API_URL", global = true, default_value = "http://127.0.0.1:8000")]
    api_url: String,

    /// API bearer token
    #[arg(long, env = "KARST_API_TOKEN", global = true, hide_env_values = true)]
    token: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, global = true, default_value = "text")]
    format: Format,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Kind {
    Ticks,
    Problems,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize logged ascents
    Summary,

    /// Filter, sort and page through ticks or problems
    List {
        /// What to list
        #[arg(value_enum, default_value = "ticks")]
        kind: Kind,

        /// Match against names and places, ignoring case and accents
        #[arg(short, long)]
        search: Option<String>,

        #[arg(long)]
        min_grade: Option<String>,

        #[arg(long)]
        max_grade: Option<String>,

        /// Minimum rating (1-5)
        #[arg(long)]
        min_rating: Option<f32>,

        /// send, flash or solo
        #[arg(long)]
        style: Option<Style>,

        /// todo or sent
        #[arg(long)]
        status: Option<Status>,

        /// Ticks file used to decide which problems are sent
        #[arg(long)]
        ticked: Option<PathBuf>,

        /// grade, name, rating, tick-count or date
        #[arg(long, default_value = "date")]
        sort: SortField,

        /// Sort ascending instead of descending
        #[arg(long)]
        asc: bool,

        /// 1-based page number
        #[arg(short, long, default_value = "1")]
        page: usize,

        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
        page_size: NonZeroUsize,
    },

    /// Show the grade pyramid and yearly activity
    Pyramid,

    /// Grade votes and climber heights for one problem
    ProblemStats {
        /// Problem id
        #[arg(long)]
        problem: String,
    },
}

/// Listing options shared by both record kinds.
struct ListOptions {
    view: ViewState,
    ticked: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("karst=debug".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.input.clone() {
        Some(path) => run(&FileSource::new(path), cli).await,
        None => {
            let config = ApiConfig {
                base_url: cli.api_url.clone(),
                token: cli.token.clone(),
                ..Default::default()
            };
            run(&ApiSource::new(config)?, cli).await
        }
    }
}

async fn run<S: RecordSource>(source: &S, cli: Cli) -> Result<()> {
    let format = cli.format;

    match cli.command {
        Commands::Summary => run_summary(source, format).await,
        Commands::List {
            kind,
            search,
            min_grade,
            max_grade,
            min_rating,
            style,
            status,
            ticked,
            sort,
            asc,
            page,
            page_size,
        } => {
            let mut criteria = FilterCriteria::default()
                .with_grade_range(min_grade.as_deref(), max_grade.as_deref());
            criteria.search_text = search;
            criteria.min_rating = min_rating;
            criteria.style = style;
            criteria.status = status;
            validate(&criteria)?;

            let direction = if asc {
                SortDirection::Ascending
            } else {
                SortDirection::Descending
            };
            let options = ListOptions {
                view: ViewState {
                    criteria,
                    sort: SortSpec::new(sort, direction),
                    page,
                    page_size,
                },
                ticked,
            };

            match kind {
                Kind::Ticks => run_list_ticks(source, &options, format).await,
                Kind::Problems => run_list_problems(source, &options, format).await,
            }
        }
        Commands::Pyramid => run_pyramid(source, format).await,
        Commands::ProblemStats { problem } => run_problem_stats(source, &problem, format).await,
    }
}

async fn run_summary<S: RecordSource>(source: &S, format: Format) -> Result<()> {
    let ticks = source.fetch_ticks().await?.records;
    let summary = summarize(&ticks);

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        Format::Text => {
            println!("{}", summary_line(&summary));
            if let Some(rate) = summary.ascents_per_active_year {
                println!("{:.1} ascents per active year", rate);
            }
        }
    }

    Ok(())
}

async fn run_list_ticks<S: RecordSource>(
    source: &S,
    options: &ListOptions,
    format: Format,
) -> Result<()> {
    let ticks = source.fetch_ticks().await?.records;
    // Every logged tick is a sent problem.
    let page = options.view.apply(&ticks, |_| true);

    print_page(&page, format, |tick: &AscentRecord| {
        format!(
            "{:<10} {:<5} {:<6} {}",
            tick.date.map(|d| d.to_string()).unwrap_or_else(|| "-".into()),
            tick.effective_grade().unwrap_or("?"),
            tick.style().map(|s| s.to_string()).unwrap_or_default(),
            tick.problem.name
        )
    })
}

async fn run_list_problems<S: RecordSource>(
    source: &S,
    options: &ListOptions,
    format: Format,
) -> Result<()> {
    let problems = source.fetch_problems().await?.records;

    let ticks = if options.view.criteria.status.is_some() {
        match &options.ticked {
            Some(path) => FileSource::new(path).fetch_ticks().await?.records,
            None => source
                .fetch_ticks()
                .await
                .context("status filter needs ticks; pass --ticked <file>")?
                .records,
        }
    } else {
        Vec::new()
    };
    let sent: HashSet<&str> = ticked_problem_ids(&ticks);

    let page = options
        .view
        .apply(&problems, |problem: &ProblemRecord| sent.contains(problem.id.as_str()));

    print_page(&page, format, |problem: &ProblemRecord| {
        format!(
            "{:<5} {:>4} {:>4}  {}{}",
            problem.effective_grade().unwrap_or("?"),
            problem
                .rating
                .map(|r| format!("{:.1}", r))
                .unwrap_or_else(|| "-".into()),
            problem.tick_count.unwrap_or(0),
            problem.name,
            problem
                .area_name
                .as_deref()
                .map(|area| format!(" ({})", area))
                .unwrap_or_default()
        )
    })
}

fn print_page<T, F>(page: &Page<T>, format: Format, line: F) -> Result<()>
where
    T: Serialize,
    F: Fn(&T) -> String,
{
    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(page)?),
        Format::Text => {
            if page.items.is_empty() {
                println!("No matching records.");
            }
            for item in &page.items {
                println!("{}", line(item));
            }
            let window = page_window(page.current_page, page.total_pages, 2);
            println!("---");
            println!(
                "Page {} of {} ({} records){}{}",
                page.current_page,
                page.total_pages,
                page.total_items,
                if window.has_previous { ", previous available" } else { "" },
                if window.has_next { ", next available" } else { "" },
            );
        }
    }
    Ok(())
}

async fn run_pyramid<S: RecordSource>(source: &S, format: Format) -> Result<()> {
    let ticks = source.fetch_ticks().await?.records;
    let summary = summarize(&ticks);
    let pyramid = grade_pyramid(&summary);
    let activity = activity_bars(&summary);

    match format {
        Format::Json => {
            #[derive(Serialize)]
            struct Output<'a> {
                pyramid: &'a [GradeBar],
                activity: &'a [YearBar],
            }
            let output = Output {
                pyramid: &pyramid,
                activity: &activity,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Format::Text => {
            if pyramid.is_empty() {
                println!("No graded ascents.");
                return Ok(());
            }
            for bar in &pyramid {
                println!(
                    "{:<5} {:<width$} {:>4} ({:.1}%)",
                    bar.grade,
                    text_bar(bar.width, BAR_COLUMNS),
                    bar.count,
                    bar.percent,
                    width = BAR_COLUMNS
                );
            }
            println!();
            for bar in &activity {
                println!(
                    "{:<5} {:<width$} {:>4}",
                    bar.year,
                    text_bar(bar.width, BAR_COLUMNS),
                    bar.count,
                    width = BAR_COLUMNS
                );
            }
        }
    }

    Ok(())
}

async fn run_problem_stats<S: RecordSource>(
    source: &S,
    problem_id: &str,
    format: Format,
) -> Result<()> {
    let ticks = source.fetch_ticks().await?.records;
    let matching: Vec<AscentRecord> = ticks_for_problem(&ticks, problem_id).cloned().collect();
    tracing::debug!(problem = %problem_id, ticks = matching.len(), "Computing problem statistics");

    let stats = problem_statistics(&matching);

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
        Format::Text => {
            println!("{}", problem_line(&stats));
            for vote in &stats.grade_voting {
                println!("  {:<5} {}", vote.grade, vote.count);
            }
            if stats.height_data_count > 0 {
                println!("Climber heights:");
                for height in &stats.height_distribution {
                    println!("  {:<12} {}", height.label, height.count);
                }
            }
        }
    }

    Ok(())
}
