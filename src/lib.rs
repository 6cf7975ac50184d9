// ============================================================================
// TaxWatch Library
// ============================================================================

pub mod api;
pub mod core;
pub mod interface;
pub mod pagination;
pub mod query;

// Re-export main types for convenience
pub use api::{AnalysisFeed, ApiClient, ApiConfig, NewsFeed};
pub use core::{ClientError, PagedResult, Priority, Result, WeekId};
pub use interface::TaxApi;
pub use pagination::{PageChange, PageState, Pagination};
pub use query::{FeedDisplay, FeedView, QueryCache, QueryKey, QueryState, QueryStatus};

use crate::api::keys;
use crate::core::{
    AnalysisDetail, CrawlLog, CrawlTriggered, NewsArticle, NewsCrawlTriggered, NewsPostTriggered,
    NewsStats, WeeklyStats,
};
use std::sync::Arc;
use tracing::info;

// ============================================================================
// High-level Client API
// ============================================================================

/// Entry point: the API, the query cache and the feeds wired together.
///
/// Reads go through the cache, so two callers asking for the same thing at
/// the same time share one request. Triggers invalidate whatever they make
/// stale.
///
/// # Examples
///
/// ```no_run
/// use taxwatch::TaxWatch;
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let watch = TaxWatch::connect("http://localhost:3001/api")?;
///
/// let mut news = watch.news_feed();
/// news.open()?;
/// let display = news.settled().await?;
/// for article in display.items() {
///     println!("[{}] {}", article.priority, article.title);
/// }
/// if let Some(pagination) = display.pagination {
///     println!("{}", pagination);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct TaxWatch {
    api: Arc<dyn TaxApi>,
    cache: QueryCache,
    config: ApiConfig,
}

impl TaxWatch {
    /// Connect to the API at `base_url`, sharing the process-wide cache.
    pub fn connect(base_url: &str) -> Result<Self> {
        Self::connect_with_config(ApiConfig::new(base_url))
    }

    /// Connect with custom configuration, sharing the process-wide cache.
    ///
    /// The process-wide cache is sized from the environment when first
    /// used; `config.cache_capacity` only applies to
    /// [`TaxWatch::isolated`].
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use taxwatch::{ApiConfig, TaxWatch};
    /// # use std::time::Duration;
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let config = ApiConfig::new("https://tax.example.com/api")
    ///     .request_timeout(Duration::from_secs(10));
    /// let watch = TaxWatch::connect_with_config(config)?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn connect_with_config(config: ApiConfig) -> Result<Self> {
        let api = ApiClient::new(config.clone())?;
        Ok(Self::new(Arc::new(api), QueryCache::global().clone(), config))
    }

    /// Connect with a private cache built from `config`.
    pub fn isolated(config: ApiConfig) -> Result<Self> {
        let api = ApiClient::new(config.clone())?;
        let cache = QueryCache::from_config(&config);
        Ok(Self::new(Arc::new(api), cache, config))
    }

    /// Wire any [`TaxApi`] implementation to a cache.
    pub fn new(api: Arc<dyn TaxApi>, cache: QueryCache, config: ApiConfig) -> Self {
        Self { api, cache, config }
    }

    pub fn api(&self) -> &Arc<dyn TaxApi> {
        &self.api
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Paginated news, page 1, not yet opened.
    pub fn news_feed(&self) -> FeedView<NewsFeed> {
        let source = Arc::new(NewsFeed::new(Arc::clone(&self.api)));
        FeedView::new(source, self.cache.clone(), self.config.news_page_size)
    }

    /// Paginated analyses for `week` (`None`: current week), page 1, not yet
    /// opened.
    pub fn analyses_feed(&self, week: Option<WeekId>) -> FeedView<AnalysisFeed> {
        let source = Arc::new(AnalysisFeed::new(Arc::clone(&self.api)));
        FeedView::new(source, self.cache.clone(), self.config.analyses_page_size)
            .with_filter(keys::WEEK, week)
    }

    /// Cached weekly statistics, revalidated in the background.
    pub fn weekly_stats(&self, week: Option<WeekId>) -> Result<QueryState<WeeklyStats>> {
        let api = Arc::clone(&self.api);
        self.cache
            .query(&keys::weekly_stats(week), move || async move {
                api.weekly_stats(week).await
            })
    }

    pub async fn fetch_weekly_stats(&self, week: Option<WeekId>) -> Result<Arc<WeeklyStats>> {
        let api = Arc::clone(&self.api);
        self.cache
            .fetch(&keys::weekly_stats(week), move || async move {
                api.weekly_stats(week).await
            })
            .await
    }

    pub fn crawl_history(&self) -> Result<QueryState<Vec<CrawlLog>>> {
        let api = Arc::clone(&self.api);
        self.cache
            .query(&keys::crawl_history(), move || async move {
                api.crawl_history().await
            })
    }

    pub async fn fetch_crawl_history(&self) -> Result<Arc<Vec<CrawlLog>>> {
        let api = Arc::clone(&self.api);
        self.cache
            .fetch(&keys::crawl_history(), move || async move {
                api.crawl_history().await
            })
            .await
    }

    pub fn news_stats(&self) -> Result<QueryState<NewsStats>> {
        let api = Arc::clone(&self.api);
        self.cache
            .query(&keys::news_stats(), move || async move {
                api.news_stats().await
            })
    }

    pub async fn fetch_news_stats(&self) -> Result<Arc<NewsStats>> {
        let api = Arc::clone(&self.api);
        self.cache
            .fetch(&keys::news_stats(), move || async move {
                api.news_stats().await
            })
            .await
    }

    pub async fn news_detail(&self, id: &str) -> Result<Arc<NewsArticle>> {
        let api = Arc::clone(&self.api);
        let id = id.to_string();
        self.cache
            .fetch(&keys::news_detail(&id), move || async move {
                api.news_detail(&id).await
            })
            .await
    }

    pub async fn analysis_detail(&self, id: &str) -> Result<Arc<AnalysisDetail>> {
        let api = Arc::clone(&self.api);
        let id = id.to_string();
        self.cache
            .fetch(&keys::analysis_detail(&id), move || async move {
                api.analysis_detail(&id).await
            })
            .await
    }

    /// Run the document crawler. On success, crawl history, analyses and
    /// weekly stats are marked stale.
    pub async fn trigger_crawl(&self) -> Result<CrawlTriggered> {
        let result = self.api.trigger_crawl().await?;
        info!(saved = result.saved, "crawl finished");
        self.invalidate(keys::AFTER_CRAWL)?;
        Ok(result)
    }

    /// Crawl news sources. On success, the news feed and stats are marked
    /// stale.
    pub async fn trigger_news_crawl(&self) -> Result<NewsCrawlTriggered> {
        let result = self.api.trigger_news_crawl().await?;
        info!(saved = result.saved, total = result.total, "news crawl finished");
        self.invalidate(keys::AFTER_NEWS_CHANGE)?;
        Ok(result)
    }

    /// Post the next batch of news. On success, the news feed and stats are
    /// marked stale.
    pub async fn trigger_news_post(&self) -> Result<NewsPostTriggered> {
        let result = self.api.trigger_news_post().await?;
        info!(posted = result.posted, "news post finished");
        self.invalidate(keys::AFTER_NEWS_CHANGE)?;
        Ok(result)
    }

    fn invalidate(&self, resources: &[&str]) -> Result<()> {
        for resource in resources {
            self.cache.invalidate_resource(resource)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_isolated_feeds_start_on_page_one() {
        let watch = TaxWatch::isolated(ApiConfig::default()).unwrap();

        let news = watch.news_feed();
        assert_eq!(news.page(), 1);
        assert_eq!(news.key().to_string(), "news?limit=5&offset=0");

        let week = WeekId::new(2024, 5).unwrap();
        let analyses = watch.analyses_feed(Some(week));
        assert_eq!(
            analyses.key().to_string(),
            "weekly-analyses?limit=5&offset=0&week=2024-W05"
        );
        assert_eq!(analyses.filter("week"), Some("2024-W05"));

        assert!(watch.cache().is_empty().unwrap());
    }

    #[test]
    fn test_connect_rejects_bad_url() {
        assert!(TaxWatch::connect("localhost:3001").is_err());
    }
}
