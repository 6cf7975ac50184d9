//! Resource names and key builders for everything the facade caches.
//!
//! Paged feeds build their keys through `PageRequest::query_key`; the
//! single-object reads below follow the same shape so that
//! `invalidate_resource` reaches all of them.

use crate::core::WeekId;
use crate::query::QueryKey;

pub const NEWS: &str = "news";
pub const NEWS_DETAIL: &str = "news-detail";
pub const NEWS_STATS: &str = "news-stats";
pub const WEEKLY_ANALYSES: &str = "weekly-analyses";
pub const ANALYSIS_DETAIL: &str = "analysis-detail";
pub const WEEKLY_STATS: &str = "weekly-stats";
pub const CRAWL_HISTORY: &str = "crawl-history";

/// Filter names used by the feeds.
pub const WEEK: &str = "week";
pub const PRIORITY: &str = "priority";

/// Resources made stale by a document crawl.
pub const AFTER_CRAWL: &[&str] = &[CRAWL_HISTORY, WEEKLY_ANALYSES, WEEKLY_STATS];

/// Resources made stale by a news crawl or a news post.
pub const AFTER_NEWS_CHANGE: &[&str] = &[NEWS, NEWS_STATS];

pub fn weekly_stats(week: Option<WeekId>) -> QueryKey {
    QueryKey::new(WEEKLY_STATS).opt_param(WEEK, week)
}

pub fn crawl_history() -> QueryKey {
    QueryKey::new(CRAWL_HISTORY)
}

pub fn news_stats() -> QueryKey {
    QueryKey::new(NEWS_STATS)
}

pub fn news_detail(id: &str) -> QueryKey {
    QueryKey::new(NEWS_DETAIL).param("id", id)
}

pub fn analysis_detail(id: &str) -> QueryKey {
    QueryKey::new(ANALYSIS_DETAIL).param("id", id)
}
