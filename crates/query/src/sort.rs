use std::cmp::Ordering;

use karst_model::{GradeScale, SortDirection, SortField, SortSpec};

use crate::Listable;

/// Return a new, stably sorted copy of `records`.
pub fn sort<T: Listable + Clone>(records: &[T], spec: &SortSpec) -> Vec<T> {
    let mut sorted = records.to_vec();
    sorted.sort_by(|a, b| compare(a, b, spec));
    sorted
}

/// Ordering of two records under `spec`.
///
/// Grades off the scale and missing dates sort last in both directions.
/// Missing ratings and tick counts count as zero.
pub fn compare<T: Listable>(a: &T, b: &T, spec: &SortSpec) -> Ordering {
    let direction = spec.direction;
    match spec.field {
        SortField::Grade => {
            let scale = GradeScale::standard();
            let rank = |record: &T| {
                Some(scale.rank_of(record.effective_grade())).filter(|r| *r < scale.unranked())
            };
            missing_last(rank(a), rank(b), direction)
        }
        SortField::Name => directed(
            a.name()
                .chars()
                .flat_map(char::to_lowercase)
                .cmp(b.name().chars().flat_map(char::to_lowercase)),
            direction,
        ),
        SortField::Rating => directed(
            a.rating().unwrap_or(0.0).total_cmp(&b.rating().unwrap_or(0.0)),
            direction,
        ),
        SortField::TickCount => directed(
            a.tick_count().unwrap_or(0).cmp(&b.tick_count().unwrap_or(0)),
            direction,
        ),
        SortField::Date => missing_last(a.date(), b.date(), direction),
    }
}

fn directed(ordering: Ordering, direction: SortDirection) -> Ordering {
    match direction {
        SortDirection::Ascending => ordering,
        SortDirection::Descending => ordering.reverse(),
    }
}

fn missing_last<K: Ord>(a: Option<K>, b: Option<K>, direction: SortDirection) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => directed(a.cmp(&b), direction),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
