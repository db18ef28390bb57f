use std::num::NonZeroUsize;

use karst_model::{FilterCriteria, SortDirection, SortField, SortSpec, Status, Style};
use serde::{Deserialize, Serialize};

use crate::{clamp_page, filter, paginate, sort, total_pages, Listable, Page};

pub const DEFAULT_PAGE_SIZE: NonZeroUsize = match NonZeroUsize::new(20) {
    Some(size) => size,
    None => unreachable!(),
};

/// How page navigation outside `1..=total_pages` is handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PagePolicy {
    /// Jump back to page 1
    #[default]
    ResetToFirst,
    /// Stay on the current page
    Ignore,
}

/// Transient state of one list page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
    pub criteria: FilterCriteria,
    pub sort: SortSpec,
    /// 1-based
    pub page: usize,
    pub page_size: NonZeroUsize,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            criteria: FilterCriteria::default(),
            sort: SortSpec::default(),
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// User interactions that change a [`ViewState`].
#[derive(Debug, Clone, PartialEq)]
pub enum ViewAction {
    Search(String),
    GradeRange {
        min: Option<String>,
        max: Option<String>,
    },
    MinRating(Option<f32>),
    Style(Option<Style>),
    Status(Option<Status>),
    /// Sort by a field; choosing the current field flips the direction
    SortBy(SortField),
    ToggleDirection,
    GoToPage(usize),
    NextPage,
    PreviousPage,
    PageSize(NonZeroUsize),
    ClearFilters,
    Reset,
}

/// Apply `action` to `state`, returning the new state.
///
/// Filter, sort and page-size changes go back to page 1. Navigation to a
/// page outside `1..=total_pages` follows `policy`.
pub fn reduce(
    state: &ViewState,
    action: ViewAction,
    total_pages: usize,
    policy: PagePolicy,
) -> ViewState {
    let mut next = state.clone();

    match action {
        ViewAction::Search(text) => {
            next.criteria.search_text = Some(text).filter(|t| !t.trim().is_empty());
            next.page = 1;
        }
        ViewAction::GradeRange { min, max } => {
            next.criteria.min_grade = min;
            next.criteria.max_grade = max;
            next.page = 1;
        }
        ViewAction::MinRating(rating) => {
            next.criteria.min_rating = rating;
            next.page = 1;
        }
        ViewAction::Style(style) => {
            next.criteria.style = style;
            next.page = 1;
        }
        ViewAction::Status(status) => {
            next.criteria.status = status;
            next.page = 1;
        }
        ViewAction::SortBy(field) => {
            next.sort = if state.sort.field == field {
                SortSpec::new(field, state.sort.direction.toggled())
            } else {
                SortSpec::new(field, natural_direction(field))
            };
            next.page = 1;
        }
        ViewAction::ToggleDirection => {
            next.sort.direction = state.sort.direction.toggled();
            next.page = 1;
        }
        ViewAction::GoToPage(page) => next.page = navigate(state.page, page, total_pages, policy),
        ViewAction::NextPage => {
            next.page = navigate(state.page, state.page.saturating_add(1), total_pages, policy);
        }
        ViewAction::PreviousPage => {
            next.page = navigate(state.page, state.page.saturating_sub(1), total_pages, policy);
        }
        ViewAction::PageSize(size) => {
            next.page_size = size;
            next.page = 1;
        }
        ViewAction::ClearFilters => {
            next.criteria = FilterCriteria::default();
            next.page = 1;
        }
        ViewAction::Reset => next = ViewState::default(),
    }

    next
}

/// Names read A to Z; everything else reads best-first.
fn natural_direction(field: SortField) -> SortDirection {
    match field {
        SortField::Name => SortDirection::Ascending,
        _ => SortDirection::Descending,
    }
}

fn navigate(current: usize, target: usize, total_pages: usize, policy: PagePolicy) -> usize {
    if (1..=total_pages.max(1)).contains(&target) {
        return target;
    }
    match policy {
        PagePolicy::ResetToFirst => 1,
        PagePolicy::Ignore => current,
    }
}

impl ViewState {
    /// Run filter, sort and paginate over a snapshot.
    ///
    /// The stored page is clamped to the filtered page count first, so a
    /// shrinking snapshot never yields an empty page past the end.
    pub fn apply<T, F>(&self, records: &[T], completed: F) -> Page<T>
    where
        T: Listable + Clone,
        F: Fn(&T) -> bool,
    {
        let filtered = filter(records, &self.criteria, completed);
        let sorted = sort(&filtered, &self.sort);
        let page = clamp_page(self.page, total_pages(sorted.len(), self.page_size));
        paginate(&sorted, self.page_size, page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{ids, problem};
    use pretty_assertions::assert_eq;

    fn on_page(page: usize) -> ViewState {
        ViewState {
            page,
            ..ViewState::default()
        }
    }

    #[test]
    fn test_filter_change_resets_page() {
        let state = on_page(4);
        let next = reduce(&state, ViewAction::Search("roof".into()), 10, PagePolicy::Ignore);
        assert_eq!(next.page, 1);
        assert_eq!(next.criteria.search_text.as_deref(), Some("roof"));

        let cleared = reduce(&next, ViewAction::Search("  ".into()), 10, PagePolicy::Ignore);
        assert_eq!(cleared.criteria.search_text, None);
    }

    #[test]
    fn test_sort_by_same_field_toggles() {
        let state = ViewState::default();
        assert_eq!(state.sort, SortSpec::descending(SortField::Date));

        let flipped = reduce(&state, ViewAction::SortBy(SortField::Date), 1, PagePolicy::default());
        assert_eq!(flipped.sort, SortSpec::ascending(SortField::Date));

        let by_name = reduce(&flipped, ViewAction::SortBy(SortField::Name), 1, PagePolicy::default());
        assert_eq!(by_name.sort, SortSpec::ascending(SortField::Name));

        let by_grade = reduce(&by_name, ViewAction::SortBy(SortField::Grade), 1, PagePolicy::default());
        assert_eq!(by_grade.sort, SortSpec::descending(SortField::Grade));
    }

    #[test]
    fn test_out_of_range_navigation_policies() {
        let state = on_page(3);
        let reset = reduce(&state, ViewAction::GoToPage(9), 3, PagePolicy::ResetToFirst);
        assert_eq!(reset.page, 1);

        let ignored = reduce(&state, ViewAction::NextPage, 3, PagePolicy::Ignore);
        assert_eq!(ignored.page, 3);

        let back = reduce(&state, ViewAction::PreviousPage, 3, PagePolicy::Ignore);
        assert_eq!(back.page, 2);

        let first = on_page(1);
        let stay = reduce(&first, ViewAction::PreviousPage, 3, PagePolicy::Ignore);
        assert_eq!(stay.page, 1);
    }

    #[test]
    fn test_reducer_does_not_touch_input() {
        let state = on_page(2);
        let _ = reduce(&state, ViewAction::Reset, 5, PagePolicy::default());
        assert_eq!(state.page, 2);
    }

    #[test]
    fn test_apply_runs_pipeline() {
        let records = vec![
            problem("1", "a", Some("6A")),
            problem("2", "b", Some("8A")),
            problem("3", "c", None),
            problem("4", "d", Some("7A")),
        ];
        let state = ViewState {
            criteria: FilterCriteria::default().with_grade_range(Some("6A"), Some("7A")),
            sort: SortSpec::descending(SortField::Grade),
            page: 1,
            page_size: NonZeroUsize::new(2).unwrap(),
        };

        let first = state.apply(&records, |_| false);
        assert_eq!(ids(first.items.iter().map(|p| p.id.as_str())), vec!["4", "1"]);
        assert_eq!(first.total_pages, 2);

        let stale = ViewState { page: 7, ..state };
        let clamped = stale.apply(&records, |_| false);
        assert_eq!(clamped.current_page, 2);
        assert_eq!(ids(clamped.items.iter().map(|p| p.id.as_str())), vec!["3"]);
    }
}
