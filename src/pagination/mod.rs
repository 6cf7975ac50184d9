//! Page arithmetic and the pagination control.
//!
//! Nothing here fetches. [`PageState`] tracks which page a view is on,
//! [`offset`] turns that into a fetch offset, and [`Pagination`] derives the
//! page-number window and prev/next affordances from the collection size.

pub mod control;
pub mod page;

pub use control::{MAX_VISIBLE_PAGES, PageChange, Pagination};
pub use page::{PageState, checked_offset, max_page, offset};
