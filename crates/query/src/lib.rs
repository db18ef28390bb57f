//! List view pipeline: filter, sort and paginate records.
//!
//! Every stage is a pure function over an in-memory snapshot; rerunning
//! it on a fresh snapshot after a refetch is always safe. [`ViewState`]
//! bundles the transient page state and drives the stages together.

mod filter;
mod page;
mod sort;
mod view;

pub use filter::{filter, ticked_problem_ids};
pub use page::{clamp_page, page_window, paginate, total_pages, Page, PageWindow};
pub use sort::{compare, sort};
pub use view::{reduce, PagePolicy, ViewAction, ViewState, DEFAULT_PAGE_SIZE};

use chrono::NaiveDate;
use karst_features::style_of;
use karst_model::{AscentRecord, FilterCriteria, GradeScale, ProblemRecord, Style};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum QueryError {
    #[error("Unknown grade: {0}")]
    UnknownGrade(String),
    #[error("Grade range is inverted: {min} is harder than {max}")]
    InvertedGradeRange { min: String, max: String },
    #[error("Rating threshold out of range: {0}")]
    RatingOutOfRange(f32),
}

/// Uniform view of the records a list page can show.
pub trait Listable {
    fn name(&self) -> &str;

    /// Area, sector and wall names matched by text search.
    fn place_names(&self) -> Vec<&str>;

    fn effective_grade(&self) -> Option<&str>;

    fn rating(&self) -> Option<f32>;

    fn tick_count(&self) -> Option<u32>;

    fn date(&self) -> Option<NaiveDate>;

    /// Ascent style; `None` for records that are not ascents.
    fn style(&self) -> Option<Style>;
}

impl Listable for AscentRecord {
    fn name(&self) -> &str {
        &self.problem.name
    }

    fn place_names(&self) -> Vec<&str> {
        self.problem.place_names()
    }

    fn effective_grade(&self) -> Option<&str> {
        AscentRecord::effective_grade(self)
    }

    fn rating(&self) -> Option<f32> {
        self.rating
    }

    fn tick_count(&self) -> Option<u32> {
        None
    }

    fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    fn style(&self) -> Option<Style> {
        Some(style_of(self))
    }
}

impl Listable for ProblemRecord {
    fn name(&self) -> &str {
        &self.name
    }

    fn place_names(&self) -> Vec<&str> {
        ProblemRecord::place_names(self)
    }

    fn effective_grade(&self) -> Option<&str> {
        ProblemRecord::effective_grade(self)
    }

    fn rating(&self) -> Option<f32> {
        self.rating
    }

    fn tick_count(&self) -> Option<u32> {
        self.tick_count
    }

    fn date(&self) -> Option<NaiveDate> {
        None
    }

    fn style(&self) -> Option<Style> {
        None
    }
}

/// Check user-entered criteria before they reach the pipeline.
///
/// The filter itself ignores unknown grade bounds; this lets the caller
/// report them instead.
pub fn validate(criteria: &FilterCriteria) -> Result<(), QueryError> {
    let scale = GradeScale::standard();

    for bound in [&criteria.min_grade, &criteria.max_grade].into_iter().flatten() {
        if !scale.is_ranked(bound) {
            return Err(QueryError::UnknownGrade(bound.clone()));
        }
    }

    if let (Some(min), Some(max)) = (&criteria.min_grade, &criteria.max_grade) {
        if scale.rank(min) > scale.rank(max) {
            return Err(QueryError::InvertedGradeRange {
                min: min.clone(),
                max: max.clone(),
            });
        }
    }

    if let Some(rating) = criteria.min_rating {
        if !(0.0..=5.0).contains(&rating) {
            return Err(QueryError::RatingOutOfRange(rating));
        }
    }

    Ok(())
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::NaiveDate;
    use karst_model::{AscentRecord, ProblemRecord, ProblemRef};

    pub fn problem(id: &str, name: &str, grade: Option<&str>) -> ProblemRecord {
        let mut record = ProblemRecord::new(id, name);
        record.grade = grade.map(str::to_string);
        record
    }

    pub fn tick(id: &str, grade: Option<&str>, date: Option<(i32, u32, u32)>) -> AscentRecord {
        let mut problem = ProblemRef::new(format!("p{id}"), format!("Problem {id}"));
        problem.grade = grade.map(str::to_string);
        let mut tick = AscentRecord::new(id, problem);
        tick.date = date.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d));
        tick
    }

    pub fn ids<T: AsRef<str>>(items: impl IntoIterator<Item = T>) -> Vec<String> {
        items.into_iter().map(|i| i.as_ref().to_string()).collect()
    }
}
