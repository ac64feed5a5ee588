//! Fixed-size page slicing with clamped page numbers.

use serde::{Deserialize, Serialize};

/// Rows per table page unless configured otherwise.
pub const DEFAULT_ITEMS_PER_PAGE: usize = 10;

/// Requested page of the cluster table. Page numbers are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationState {
    pub current_page: usize,
    pub items_per_page: usize,
}

impl Default for PaginationState {
    fn default() -> Self {
        Self::new(DEFAULT_ITEMS_PER_PAGE)
    }
}

impl PaginationState {
    pub fn new(items_per_page: usize) -> Self {
        Self {
            current_page: 1,
            items_per_page: items_per_page.max(1),
        }
    }

    /// Jump to `page`, clamped to `1..=total_pages`.
    pub fn jump(&mut self, page: usize, total_pages: usize) {
        self.current_page = page.clamp(1, total_pages.max(1));
    }

    pub fn next(&mut self, total_pages: usize) {
        self.jump(self.current_page.saturating_add(1), total_pages);
    }

    pub fn prev(&mut self, total_pages: usize) {
        self.jump(self.current_page.saturating_sub(1), total_pages);
    }
}

/// One page of an ordered sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page<'a, T> {
    pub items: &'a [T],
    /// The page actually served, after clamping.
    pub page: usize,
    pub total_pages: usize,
    pub total_count: usize,
    pub items_per_page: usize,
}

impl<T> Page<'_, T> {
    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    /// Index of the first item of this page within the full sequence.
    pub fn offset(&self) -> usize {
        (self.page - 1) * self.items_per_page
    }
}

/// `ceil(count / per_page)`, never less than 1.
pub fn total_pages(count: usize, items_per_page: usize) -> usize {
    count.div_ceil(items_per_page.max(1)).max(1)
}

/// Slice out `current_page`, clamping out-of-range requests.
pub fn paginate<T>(items: &[T], current_page: usize, items_per_page: usize) -> Page<'_, T> {
    let per_page = items_per_page.max(1);
    let total_pages = total_pages(items.len(), per_page);
    let page = current_page.clamp(1, total_pages);

    let start = ((page - 1) * per_page).min(items.len());
    let end = (start + per_page).min(items.len());

    Page {
        items: &items[start..end],
        page,
        total_pages,
        total_count: items.len(),
        items_per_page: per_page,
    }
}
