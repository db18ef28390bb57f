//! Feature extraction for ascent and problem records.
//!
//! Provides pure functions used by filtering, sorting and aggregation:
//! - Ascent style mined from free-text notes
//! - Accent-insensitive text folding for search
//! - Calendar arithmetic on ascent dates

use chrono::{Datelike, NaiveDate};
use karst_model::{AscentRecord, Style};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

const STYLE_MARKER: &str = "style:";

/// Style of an ascent.
///
/// Looks for `style: <word>` anywhere in the notes, case-insensitively.
/// Unknown words and missing annotations fall back to [`Style::Send`].
pub fn style_of(record: &AscentRecord) -> Style {
    style_from_notes(&record.notes)
}

/// Style annotation of a free-text note.
///
/// `style:` only counts at the start of a word; the first annotation naming
/// a known style wins.
pub fn style_from_notes(notes: &str) -> Style {
    let lowered = notes.to_lowercase();

    lowered
        .match_indices(STYLE_MARKER)
        .filter(|(start, _)| {
            !lowered[..*start]
                .chars()
                .next_back()
                .is_some_and(char::is_alphanumeric)
        })
        .find_map(|(start, _)| {
            let token: String = lowered[start + STYLE_MARKER.len()..]
                .trim_start()
                .chars()
                .take_while(|c| c.is_alphanumeric())
                .collect();
            Style::from_token(&token)
        })
        .unwrap_or_default()
}

/// Fold text for comparison: strip diacritics, lowercase, collapse whitespace.
///
/// "Dívčí  Válka" becomes "divci valka".
pub fn fold_text(text: &str) -> String {
    text.nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Calendar year of a date.
pub fn year_of(date: NaiveDate) -> i32 {
    date.year()
}

/// Years between two dates, rounded to one decimal.
pub fn years_between(first: NaiveDate, last: NaiveDate) -> f64 {
    let days = (last - first).num_days() as f64;
    round_to(days / 365.25, 1)
}

/// Round half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10_f64.powi(decimals);
    (value * factor).round() / factor
}
