//! Core domain model for the karst climbing pipeline.
//!
//! This crate defines the fundamental types used throughout the system:
//! - `GradeScale`: The fixed ordering of boulder grades
//! - `AscentRecord`: A logged ascent ("tick") of a problem
//! - `ProblemRecord`: A boulder problem as listed by the API
//! - `FilterCriteria` / `SortSpec`: Transient list view configuration
//! - `StatisticsSummary` / `ProblemStatistics`: Derived statistics
//!
//! Decoding of API documents into these types lives in [`wire`].

pub mod wire;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from parsing user-supplied model values.
#[derive(Debug, Error, PartialEq)]
pub enum ModelError {
    #[error("Unknown style: {0}")]
    UnknownStyle(String),
    #[error("Unknown status: {0}")]
    UnknownStatus(String),
    #[error("Unknown sort field: {0}")]
    UnknownSortField(String),
}

/// Boulder grades from easiest to hardest.
pub const BOULDER_GRADES: &[&str] = &[
    "3", "3+", "4", "4+", "5", "5+", "6A", "6A+", "6B", "6B+", "6C", "6C+", "7A", "7A+", "7B",
    "7B+", "7C", "7C+", "8A", "8A+", "8B", "8B+", "8C", "8C+", "9A", "9A+",
];

/// Climber height categories from shortest to tallest, with display labels.
pub const HEIGHT_CATEGORIES: &[(&str, &str)] = &[
    ("<150", "<150 cm"),
    ("150-155", "150-155 cm"),
    ("155-160", "155-160 cm"),
    ("160-165", "160-165 cm"),
    ("165-170", "165-170 cm"),
    ("170-175", "170-175 cm"),
    ("175-180", "175-180 cm"),
    ("180-185", "180-185 cm"),
    ("185-190", "185-190 cm"),
    ("190-195", "190-195 cm"),
    (">195", ">195 cm"),
];

/// Position of a height category in [`HEIGHT_CATEGORIES`].
pub fn height_rank(category: &str) -> Option<usize> {
    HEIGHT_CATEGORIES.iter().position(|(value, _)| *value == category)
}

/// Display label of a height category.
pub fn height_label(category: &str) -> Option<&'static str> {
    HEIGHT_CATEGORIES
        .iter()
        .find(|(value, _)| *value == category)
        .map(|(_, label)| *label)
}

/// A totally ordered list of grade labels, index 0 = easiest.
///
/// Labels match exactly. Anything not on the scale (including the empty
/// string) is unranked and gets [`GradeScale::unranked`], which is larger
/// than every valid rank so unranked entries sort after ranked ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GradeScale {
    labels: &'static [&'static str],
}

impl GradeScale {
    pub const fn new(labels: &'static [&'static str]) -> Self {
        Self { labels }
    }

    /// The boulder scale used across the application.
    pub const fn standard() -> Self {
        Self::new(BOULDER_GRADES)
    }

    /// Zero-based position of `grade`, or the unranked sentinel.
    pub fn rank(&self, grade: &str) -> usize {
        self.labels
            .iter()
            .position(|label| *label == grade)
            .unwrap_or_else(|| self.unranked())
    }

    /// Like [`rank`](Self::rank), treating `None` as unranked.
    pub fn rank_of(&self, grade: Option<&str>) -> usize {
        grade.map_or_else(|| self.unranked(), |g| self.rank(g))
    }

    /// Sentinel rank shared by every unrecognized grade.
    pub fn unranked(&self) -> usize {
        self.labels.len()
    }

    pub fn is_ranked(&self, grade: &str) -> bool {
        self.rank(grade) < self.unranked()
    }

    pub fn labels(&self) -> &'static [&'static str] {
        self.labels
    }
}

impl Default for GradeScale {
    fn default() -> Self {
        Self::standard()
    }
}

/// Ascent style, mined from tick notes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Style {
    /// Worked and sent (also "redpoint")
    #[default]
    Send,
    /// First try with beta
    Flash,
    /// Done without pads or spot
    Solo,
}

impl Style {
    /// Map a single note token to a style; "redpoint" is a synonym for send.
    pub fn from_token(token: &str) -> Option<Self> {
        match token.to_lowercase().as_str() {
            "send" | "redpoint" => Some(Self::Send),
            "flash" => Some(Self::Flash),
            "solo" => Some(Self::Solo),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Send => "send",
            Self::Flash => "flash",
            Self::Solo => "solo",
        }
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Style {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_token(s.trim()).ok_or_else(|| ModelError::UnknownStyle(s.to_string()))
    }
}

/// Completion status of a problem for the current user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Not ticked yet
    Todo,
    /// Ticked
    Sent,
}

impl FromStr for Status {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "todo" | "to-do" | "project" => Ok(Self::Todo),
            "sent" | "done" | "ticked" => Ok(Self::Sent),
            _ => Err(ModelError::UnknownStatus(s.to_string())),
        }
    }
}

/// An area as embedded in a problem payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaRef {
    pub id: String,

    #[serde(default)]
    pub name: String,

    /// City id, only reachable through a structured area
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city_name: Option<String>,
}

/// A reference that the API sends either expanded or as a bare id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reference<T> {
    Detailed(T),
    Id(String),
}

impl<T> Reference<T> {
    /// The expanded object, if the API sent one.
    pub fn detail(&self) -> Option<&T> {
        match self {
            Self::Detailed(detail) => Some(detail),
            Self::Id(_) => None,
        }
    }
}

/// Denormalized problem fields carried by an ascent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProblemRef {
    pub id: String,

    #[serde(default)]
    pub name: String,

    /// Canonical grade of the problem
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<Reference<AreaRef>>,

    /// Area name when the API only sends it flattened
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sector_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wall_name: Option<String>,
}

impl ProblemRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_grade(mut self, grade: impl Into<String>) -> Self {
        self.grade = Some(grade.into());
        self
    }

    pub fn with_area(mut self, area: Reference<AreaRef>) -> Self {
        self.area = Some(area);
        self
    }

    /// Area, sector and wall names available for display and search.
    pub fn place_names(&self) -> Vec<&str> {
        let area_name = self
            .area
            .as_ref()
            .and_then(Reference::detail)
            .map(|area| area.name.as_str())
            .or(self.area_name.as_deref());

        [area_name, self.sector_name.as_deref(), self.wall_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|name| !name.is_empty())
            .collect()
    }
}

/// A logged ascent ("tick") of one problem by one climber.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AscentRecord {
    /// Opaque id, unique per record
    pub id: String,

    /// The ticked problem
    pub problem: ProblemRef,

    /// Grade the climber reported for this ascent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tick_grade: Option<String>,

    /// Grade vote the climber cast for the problem
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_grade: Option<String>,

    /// Ascent date; `None` when missing or malformed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,

    /// Rating in 1.0..=5.0
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f32>,

    #[serde(default)]
    pub notes: String,

    /// Height category of the climber (see [`HEIGHT_CATEGORIES`])
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub climber_height: Option<String>,
}

impl AscentRecord {
    /// Create a minimal record for testing.
    pub fn new(id: impl Into<String>, problem: ProblemRef) -> Self {
        Self {
            id: id.into(),
            problem,
            ..Default::default()
        }
    }

    /// Grade used for ranking: the tick grade if set, else the problem grade.
    pub fn effective_grade(&self) -> Option<&str> {
        non_empty(self.tick_grade.as_deref()).or_else(|| non_empty(self.problem.grade.as_deref()))
    }
}

/// A boulder problem as listed by the API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProblemRecord {
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,

    /// Average tick rating, falling back to the problem's own rating
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tick_count: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<Reference<AreaRef>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sector_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wall_name: Option<String>,

    #[serde(default)]
    pub image_count: usize,
}

impl ProblemRecord {
    /// Create a minimal record for testing.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_grade(mut self, grade: impl Into<String>) -> Self {
        self.grade = Some(grade.into());
        self
    }

    pub fn effective_grade(&self) -> Option<&str> {
        non_empty(self.grade.as_deref())
    }

    pub fn place_names(&self) -> Vec<&str> {
        let area_name = self
            .area
            .as_ref()
            .and_then(Reference::detail)
            .map(|area| area.name.as_str())
            .or(self.area_name.as_deref());

        [area_name, self.sector_name.as_deref(), self.wall_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|name| !name.is_empty())
            .collect()
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Filter configuration for a list view. Every field defaults to "no constraint".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterCriteria {
    /// Case- and accent-insensitive substring of name or place names
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_grade: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_grade: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_rating: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<Style>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
}

impl FilterCriteria {
    pub fn with_search(mut self, text: impl Into<String>) -> Self {
        self.search_text = Some(text.into());
        self
    }

    pub fn with_grade_range(mut self, min: Option<&str>, max: Option<&str>) -> Self {
        self.min_grade = min.map(str::to_string);
        self.max_grade = max.map(str::to_string);
        self
    }

    pub fn with_min_rating(mut self, rating: f32) -> Self {
        self.min_rating = Some(rating);
        self
    }

    pub fn with_style(mut self, style: Style) -> Self {
        self.style = Some(style);
        self
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    /// True when no criterion is active.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Field a list view is sorted by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    Grade,
    Name,
    Rating,
    TickCount,
    #[default]
    Date,
}

impl FromStr for SortField {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', '_'], "").as_str() {
            "grade" => Ok(Self::Grade),
            "name" => Ok(Self::Name),
            "rating" => Ok(Self::Rating),
            "tickcount" | "ticks" => Ok(Self::TickCount),
            "date" => Ok(Self::Date),
            _ => Err(ModelError::UnknownSortField(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Ascending,
    #[default]
    Descending,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }
}

/// Sort configuration. Defaults to newest first, like the tick list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: SortField,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(field: SortField, direction: SortDirection) -> Self {
        Self { field, direction }
    }

    pub fn ascending(field: SortField) -> Self {
        Self::new(field, SortDirection::Ascending)
    }

    pub fn descending(field: SortField) -> Self {
        Self::new(field, SortDirection::Descending)
    }
}

/// Summary statistics over a collection of ascents.
///
/// Always recomputed from the current collection, never edited in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsSummary {
    pub total_count: usize,

    /// Highest-ranked effective grade, `None` when no ranked grade exists
    pub hardest_grade: Option<String>,

    /// Ascents per effective grade; ungraded ascents are left out
    pub grade_distribution: BTreeMap<String, usize>,

    /// Ascents per calendar year; undated ascents are left out
    pub activity_by_year: BTreeMap<i32, usize>,

    pub unique_area_count: usize,

    pub unique_city_count: usize,

    /// Mean over rated ascents only
    pub average_rating: Option<f64>,

    pub first_date: Option<NaiveDate>,

    pub last_date: Option<NaiveDate>,

    /// Years between first and last date, one decimal
    pub span_in_years: Option<f64>,

    /// Dated ascents per distinct active year
    pub ascents_per_active_year: Option<f64>,
}

impl StatisticsSummary {
    /// Grade distribution ordered from easiest to hardest, unranked last.
    pub fn distribution_by_difficulty(&self, scale: &GradeScale) -> Vec<GradeCount> {
        let mut counts: Vec<GradeCount> = self
            .grade_distribution
            .iter()
            .map(|(grade, count)| GradeCount {
                grade: grade.clone(),
                count: *count,
            })
            .collect();
        counts.sort_by_key(|c| scale.rank(&c.grade));
        counts
    }
}

/// A grade bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeCount {
    pub grade: String,
    pub count: usize,
}

/// A height bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeightCount {
    pub category: String,
    pub label: String,
    pub count: usize,
}

/// Statistics for the ascents of a single problem.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemStatistics {
    pub total_ticks: usize,

    /// Grade votes ordered by the grade scale, empty buckets omitted
    pub grade_voting: Vec<GradeCount>,

    /// Climber heights ordered by the height scale, empty buckets omitted
    pub height_distribution: Vec<HeightCount>,

    pub grade_votes_count: usize,

    pub height_data_count: usize,

    /// Grade with the most votes
    pub suggested_grade: Option<String>,

    pub suggested_grade_votes: usize,

    pub average_rating: Option<f64>,
}
