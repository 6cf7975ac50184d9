use crate::core::{
    AnalysisDetail, AnalysisSummary, CrawlLog, CrawlTriggered, NewsArticle, NewsCrawlTriggered,
    NewsPostTriggered, NewsStats, PagedResult, Priority, Result, WeekId, WeeklyStats,
};
use async_trait::async_trait;

/// The tax-monitoring service as seen by this crate.
///
/// `ApiClient` implements it over HTTP. Anything else implementing it (an
/// in-memory fake, a recording wrapper) can be handed to the feeds and the
/// `TaxWatch` facade in its place.
#[async_trait]
pub trait TaxApi: Send + Sync {
    /// Aggregate statistics for `week`, or the current week when `None`.
    async fn weekly_stats(&self, week: Option<WeekId>) -> Result<WeeklyStats>;

    /// One page of document analyses for `week`.
    async fn weekly_analyses(
        &self,
        week: Option<WeekId>,
        offset: usize,
        limit: usize,
    ) -> Result<PagedResult<AnalysisSummary>>;

    async fn analysis_detail(&self, id: &str) -> Result<AnalysisDetail>;

    /// Recent crawler runs, newest first.
    async fn crawl_history(&self) -> Result<Vec<CrawlLog>>;

    /// Run the document crawler and wait for it to finish.
    async fn trigger_crawl(&self) -> Result<CrawlTriggered>;

    /// One page of news, optionally restricted to one priority.
    async fn news(
        &self,
        offset: usize,
        limit: usize,
        priority: Option<Priority>,
    ) -> Result<PagedResult<NewsArticle>>;

    async fn news_detail(&self, id: &str) -> Result<NewsArticle>;

    async fn news_stats(&self) -> Result<NewsStats>;

    async fn trigger_news_crawl(&self) -> Result<NewsCrawlTriggered>;

    async fn trigger_news_post(&self) -> Result<NewsPostTriggered>;
}
