use super::page::{PageState, checked_offset};
use std::fmt;
use std::num::NonZeroUsize;
use std::ops::RangeInclusive;

/// Most page numbers shown at once.
pub const MAX_VISIBLE_PAGES: usize = 5;

/// A request to show a different page. The control only emits these;
/// fetching is up to whoever owns the page state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageChange {
    pub page: usize,
}

/// Pagination control state derived from the current page and the size of
/// the whole collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    current_page: usize,
    total_items: usize,
    page_size: NonZeroUsize,
}

impl Pagination {
    pub fn new(current_page: usize, total_items: usize, page_size: NonZeroUsize) -> Self {
        Self {
            current_page: current_page.max(1),
            total_items,
            page_size,
        }
    }

    pub fn for_state(state: &PageState, total_items: usize) -> Self {
        Self::new(state.page(), total_items, state.page_size())
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn total_items(&self) -> usize {
        self.total_items
    }

    pub fn page_size(&self) -> NonZeroUsize {
        self.page_size
    }

    pub fn total_pages(&self) -> usize {
        self.total_items.div_ceil(self.page_size.get())
    }

    /// A single page (or none) needs no control.
    pub fn is_visible(&self) -> bool {
        self.total_pages() > 1
    }

    /// Page numbers to show, at most [`MAX_VISIBLE_PAGES`] of them, keeping
    /// the current page centred when it is away from either end.
    pub fn window(&self) -> RangeInclusive<usize> {
        let total = self.total_pages();
        let current = self.current_page;
        let half = MAX_VISIBLE_PAGES / 2;

        if total <= MAX_VISIBLE_PAGES {
            1..=total
        } else if current <= half + 1 {
            1..=MAX_VISIBLE_PAGES
        } else if current.saturating_add(half) >= total {
            (total + 1 - MAX_VISIBLE_PAGES)..=total
        } else {
            (current - half)..=(current + half)
        }
    }

    pub fn is_current(&self, page: usize) -> bool {
        page == self.current_page
    }

    /// The current page lies beyond the last page of a non-empty collection.
    pub fn is_past_end(&self) -> bool {
        self.total_items > 0 && self.current_page > self.total_pages()
    }

    pub fn has_prev(&self) -> bool {
        self.current_page > 1
    }

    pub fn has_next(&self) -> bool {
        self.current_page < self.total_pages()
    }

    pub fn prev(&self) -> Option<PageChange> {
        self.has_prev().then(|| PageChange {
            page: self.current_page - 1,
        })
    }

    pub fn next(&self) -> Option<PageChange> {
        self.has_next().then(|| PageChange {
            page: self.current_page + 1,
        })
    }

    /// Click on a page number. Pages outside `1..=total_pages` emit nothing.
    pub fn select(&self, page: usize) -> Option<PageChange> {
        (1..=self.total_pages())
            .contains(&page)
            .then_some(PageChange { page })
    }

    /// 1-based positions of the first and last item on the current page.
    /// `None` when the page holds nothing.
    pub fn item_range(&self) -> Option<RangeInclusive<usize>> {
        let first = checked_offset(self.current_page, self.page_size)?.checked_add(1)?;
        let last = self
            .current_page
            .saturating_mul(self.page_size.get())
            .min(self.total_items);
        (first <= last).then_some(first..=last)
    }
}

impl fmt::Display for Pagination {
    /// "Showing 11 to 15 of 23 results"
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.item_range() {
            Some(range) => write!(
                f,
                "Showing {} to {} of {} results",
                range.start(),
                range.end(),
                self.total_items
            ),
            None if self.total_items == 0 => write!(f, "No results"),
            None => write!(f, "Showing 0 of {} results", self.total_items),
        }
    }
}
