use super::control::PageChange;
use std::num::NonZeroUsize;

/// Zero-based index of the first item on `page` (1-based).
///
/// Saturates at `usize::MAX`; [`PageState`] never holds a page past
/// [`max_page`], so its offsets are exact.
#[inline]
pub fn offset(page: usize, page_size: NonZeroUsize) -> usize {
    checked_offset(page, page_size).unwrap_or(usize::MAX)
}

/// Like [`offset`], but `None` when the offset does not fit in a `usize`.
#[inline]
pub fn checked_offset(page: usize, page_size: NonZeroUsize) -> Option<usize> {
    page.saturating_sub(1).checked_mul(page_size.get())
}

/// Highest page whose offset is representable.
pub fn max_page(page_size: NonZeroUsize) -> usize {
    (usize::MAX / page_size.get()).saturating_add(1)
}

/// Current page of one paginated view.
///
/// The page number never drops below 1. The collection size is unknown
/// here, so the only upper bound is [`max_page`]: distinct pages always
/// have distinct offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageState {
    page: usize,
    page_size: NonZeroUsize,
}

impl PageState {
    pub fn new(page_size: NonZeroUsize) -> Self {
        Self { page: 1, page_size }
    }

    pub fn with_page(page: usize, page_size: NonZeroUsize) -> Self {
        Self {
            page: page.clamp(1, max_page(page_size)),
            page_size,
        }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> NonZeroUsize {
        self.page_size
    }

    pub fn offset(&self) -> usize {
        offset(self.page, self.page_size)
    }

    /// Go to page `n`. Returns whether the page changed; `n < 1` and pages
    /// past [`max_page`] are ignored.
    pub fn set_page(&mut self, n: usize) -> bool {
        if n < 1 || n > max_page(self.page_size) || n == self.page {
            return false;
        }
        self.page = n;
        true
    }

    pub fn apply(&mut self, change: PageChange) -> bool {
        self.set_page(change.page)
    }

    pub fn next_page(&mut self) -> bool {
        self.set_page(self.page.saturating_add(1))
    }

    pub fn prev_page(&mut self) -> bool {
        self.set_page(self.page.saturating_sub(1).max(1))
    }

    pub fn reset(&mut self) -> bool {
        self.set_page(1)
    }
}
