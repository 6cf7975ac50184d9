use super::keys;
use crate::core::{AnalysisSummary, NewsArticle, PagedResult, Priority, Result, WeekId};
use crate::interface::TaxApi;
use crate::query::{PageRequest, PageSource};
use async_trait::async_trait;
use std::sync::Arc;

/// News articles, filterable by priority.
#[derive(Clone)]
pub struct NewsFeed {
    api: Arc<dyn TaxApi>,
}

impl NewsFeed {
    pub fn new(api: Arc<dyn TaxApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl PageSource for NewsFeed {
    type Item = NewsArticle;

    fn resource(&self) -> &str {
        keys::NEWS
    }

    async fn fetch_page(&self, request: PageRequest) -> Result<PagedResult<NewsArticle>> {
        let priority: Option<Priority> = request.filter(keys::PRIORITY)?;
        self.api.news(request.offset, request.limit, priority).await
    }
}

/// Weekly document analyses. No `week` filter means the current week.
#[derive(Clone)]
pub struct AnalysisFeed {
    api: Arc<dyn TaxApi>,
}

impl AnalysisFeed {
    pub fn new(api: Arc<dyn TaxApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl PageSource for AnalysisFeed {
    type Item = AnalysisSummary;

    fn resource(&self) -> &str {
        keys::WEEKLY_ANALYSES
    }

    async fn fetch_page(&self, request: PageRequest) -> Result<PagedResult<AnalysisSummary>> {
        let week: Option<WeekId> = request.filter(keys::WEEK)?;
        self.api
            .weekly_analyses(week, request.offset, request.limit)
            .await
    }
}
