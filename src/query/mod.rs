//! Query keys, the result cache and paginated views over it.

pub mod cache;
pub mod key;
pub mod source;
pub mod view;

pub use cache::{CacheStats, QueryCache, QueryState, QueryStatus};
pub use key::QueryKey;
pub use source::{PageRequest, PageSource};
pub use view::{FeedDisplay, FeedView};
