use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

/// One page of a list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_pages: usize,
    pub current_page: usize,
    pub total_items: usize,
}

/// Page numbers to show around the current page in pager controls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageWindow {
    pub pages: Vec<usize>,
    pub has_previous: bool,
    pub has_next: bool,
}

/// `ceil(count / page_size)`, never less than one.
pub fn total_pages(count: usize, page_size: NonZeroUsize) -> usize {
    count.div_ceil(page_size.get()).max(1)
}

/// Slice out page `page` (1-based).
///
/// Does not clamp: callers decide how to recover from an out-of-range
/// page (see [`clamp_page`]). Such a page comes back with no items.
pub fn paginate<T: Clone>(records: &[T], page_size: NonZeroUsize, page: usize) -> Page<T> {
    let size = page_size.get();
    let items = page
        .checked_sub(1)
        .and_then(|index| index.checked_mul(size))
        .and_then(|start| records.get(start..))
        .map(|rest| rest.iter().take(size).cloned().collect())
        .unwrap_or_default();

    Page {
        items,
        total_pages: total_pages(records.len(), page_size),
        current_page: page,
        total_items: records.len(),
    }
}

/// Clamp a page number into `1..=total_pages`.
pub fn clamp_page(page: usize, total_pages: usize) -> usize {
    page.clamp(1, total_pages.max(1))
}

/// Up to `radius` pages on each side of `current`.
pub fn page_window(current: usize, total_pages: usize, radius: usize) -> PageWindow {
    let total = total_pages.max(1);
    let current = clamp_page(current, total);
    let first = current.saturating_sub(radius).max(1);
    let last = current.saturating_add(radius).min(total);

    PageWindow {
        pages: (first..=last).collect(),
        has_previous: current > 1,
        has_next: current < total,
    }
}
