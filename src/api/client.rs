use super::config::ApiConfig;
use crate::core::{
    AnalysisDetail, AnalysisSummary, ClientError, CrawlLog, CrawlTriggered, NewsArticle,
    NewsCrawlTriggered, NewsPostTriggered, NewsStats, PagedResult, Priority, Result, WeekId,
    WeeklyStats,
};
use crate::interface::TaxApi;
use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

/// List responses come either wrapped with a total or as a bare array of
/// the whole collection.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ListEnvelope<T> {
    Paged { items: Vec<T>, total: usize },
    Bare(Vec<T>),
}

impl<T> ListEnvelope<T> {
    /// A bare array is sliced here so callers always get one page.
    fn into_page(self, offset: usize, limit: usize) -> PagedResult<T> {
        match self {
            ListEnvelope::Paged { items, total } => PagedResult::new(items, total),
            ListEnvelope::Bare(all) => PagedResult::from_slice(all, offset, limit),
        }
    }
}

/// HTTP client for the tax-monitoring API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    config: ApiConfig,
}

impl ApiClient {
    pub fn new(config: ApiConfig) -> Result<Self> {
        config.validate()?;
        let http = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.as_str())
            .build()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = self.config.endpoint(segments)?;
        debug!(%url, ?query, "GET");
        let response = self.http.get(url.clone()).query(query).send().await?;
        decode(url, response).await
    }

    async fn post_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T> {
        let url = self.config.endpoint(segments)?;
        debug!(%url, "POST");
        let response = self.http.post(url.clone()).send().await?;
        decode(url, response).await
    }
}

async fn decode<T: DeserializeOwned>(url: Url, response: Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        warn!(%url, status = status.as_u16(), "request failed");
        return Err(ClientError::Status {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }
    let body = response.bytes().await?;
    serde_json::from_slice(&body)
        .map_err(|e| ClientError::Decode(format!("{} from {}", e, url)))
}

fn paging(offset: usize, limit: usize) -> Vec<(&'static str, String)> {
    vec![("limit", limit.to_string()), ("offset", offset.to_string())]
}

#[async_trait]
impl TaxApi for ApiClient {
    async fn weekly_stats(&self, week: Option<WeekId>) -> Result<WeeklyStats> {
        let query: Vec<(&str, String)> = week
            .map(|week| ("week", week.to_string()))
            .into_iter()
            .collect();
        self.get_json(&["weekly", "stats"], &query).await
    }

    async fn weekly_analyses(
        &self,
        week: Option<WeekId>,
        offset: usize,
        limit: usize,
    ) -> Result<PagedResult<AnalysisSummary>> {
        let mut query = paging(offset, limit);
        if let Some(week) = week {
            query.push(("week", week.to_string()));
        }
        let envelope: ListEnvelope<AnalysisSummary> =
            self.get_json(&["weekly", "analyses"], &query).await?;
        Ok(envelope.into_page(offset, limit))
    }

    async fn analysis_detail(&self, id: &str) -> Result<AnalysisDetail> {
        self.get_json(&["weekly", "analyses", id], &[]).await
    }

    async fn crawl_history(&self) -> Result<Vec<CrawlLog>> {
        self.get_json(&["history"], &[]).await
    }

    async fn trigger_crawl(&self) -> Result<CrawlTriggered> {
        self.post_json(&["crawler", "trigger"]).await
    }

    async fn news(
        &self,
        offset: usize,
        limit: usize,
        priority: Option<Priority>,
    ) -> Result<PagedResult<NewsArticle>> {
        let mut query = paging(offset, limit);
        if let Some(priority) = priority {
            query.push(("priority", priority.to_string()));
        }
        let envelope: ListEnvelope<NewsArticle> = self.get_json(&["news"], &query).await?;
        Ok(envelope.into_page(offset, limit))
    }

    async fn news_detail(&self, id: &str) -> Result<NewsArticle> {
        self.get_json(&["news", id], &[]).await
    }

    async fn news_stats(&self) -> Result<NewsStats> {
        self.get_json(&["news", "stats"], &[]).await
    }

    async fn trigger_news_crawl(&self) -> Result<NewsCrawlTriggered> {
        self.post_json(&["news", "trigger-crawl"]).await
    }

    async fn trigger_news_post(&self) -> Result<NewsPostTriggered> {
        self.post_json(&["news", "trigger-post"]).await
    }
}
