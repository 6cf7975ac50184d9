#![allow(dead_code)]

//! Shared fakes for the integration tests: an in-memory page source with
//! gates to hold individual pages back, and a recording `TaxApi`.

use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use taxwatch::core::{
    AnalysisDetail, AnalysisSummary, CrawlLog, CrawlTriggered, NewsArticle, NewsCrawlTriggered,
    NewsPostTriggered, NewsStats, WeeklyStats,
};
use taxwatch::query::{PageRequest, PageSource};
use taxwatch::{ClientError, PagedResult, Priority, QueryCache, Result, TaxApi, WeekId};
use tokio::sync::Notify;

pub fn size(n: usize) -> NonZeroUsize {
    NonZeroUsize::new(n).unwrap()
}

/// A cache whose data is always stale, like the default configuration.
pub fn cache() -> QueryCache {
    QueryCache::new(size(64), Duration::ZERO)
}

/// A cache where only invalidation makes data stale.
pub fn long_lived_cache() -> QueryCache {
    QueryCache::new(size(64), Duration::from_secs(3600))
}

// ============================================================================
// In-memory page source
// ============================================================================

/// Serves `1..=n` as a paged collection. A `parity` filter of `even` or
/// `odd` narrows it.
pub struct MemorySource {
    resource: String,
    items: Mutex<Vec<u32>>,
    calls: AtomicUsize,
    requests: Mutex<Vec<PageRequest>>,
    failing: AtomicBool,
    gates: Mutex<HashMap<usize, Arc<Notify>>>,
}

impl MemorySource {
    pub fn new(resource: &str, n: u32) -> Arc<Self> {
        Arc::new(Self {
            resource: resource.to_string(),
            items: Mutex::new((1..=n).collect()),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            failing: AtomicBool::new(false),
            gates: Mutex::new(HashMap::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<PageRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_items(&self, items: Vec<u32>) {
        *self.items.lock().unwrap() = items;
    }

    /// Requests for `offset` block until the returned gate is notified.
    pub fn hold(&self, offset: usize) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates.lock().unwrap().insert(offset, Arc::clone(&gate));
        gate
    }

    pub fn release_all(&self) {
        for (_, gate) in self.gates.lock().unwrap().drain() {
            gate.notify_one();
        }
    }
}

#[async_trait]
impl PageSource for MemorySource {
    type Item = u32;

    fn resource(&self) -> &str {
        &self.resource
    }

    async fn fetch_page(&self, request: PageRequest) -> Result<PagedResult<u32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        let gate = self.gates.lock().unwrap().get(&request.offset).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if self.failing.load(Ordering::SeqCst) {
            return Err(ClientError::Transport("connection refused".into()));
        }

        let items = self.items.lock().unwrap().clone();
        let items: Vec<u32> = match request.filters.get("parity").map(String::as_str) {
            Some("even") => items.into_iter().filter(|n| n % 2 == 0).collect(),
            Some("odd") => items.into_iter().filter(|n| n % 2 == 1).collect(),
            _ => items,
        };
        Ok(PagedResult::from_slice(items, request.offset, request.limit))
    }
}

// ============================================================================
// Recording API fake
// ============================================================================

/// `TaxApi` over fixtures. Counts calls per method and can be switched to
/// fail every call.
#[derive(Default)]
pub struct FakeApi {
    calls: Mutex<Vec<String>>,
    weeks: Mutex<Vec<Option<WeekId>>>,
    priorities: Mutex<Vec<Option<Priority>>>,
    failing: AtomicBool,
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self, method: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.as_str() == method)
            .count()
    }

    pub fn weeks(&self) -> Vec<Option<WeekId>> {
        self.weeks.lock().unwrap().clone()
    }

    pub fn priorities(&self) -> Vec<Option<Priority>> {
        self.priorities.lock().unwrap().clone()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn record(&self, method: &str) -> Result<()> {
        self.calls.lock().unwrap().push(method.to_string());
        if self.failing.load(Ordering::SeqCst) {
            return Err(ClientError::Status {
                status: 503,
                url: format!("http://fake/{}", method),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl TaxApi for FakeApi {
    async fn weekly_stats(&self, week: Option<WeekId>) -> Result<WeeklyStats> {
        self.record("weekly_stats")?;
        self.weeks.lock().unwrap().push(week);
        Ok(weekly_stats(week.map_or(5, |w| w.week())))
    }

    async fn weekly_analyses(
        &self,
        week: Option<WeekId>,
        offset: usize,
        limit: usize,
    ) -> Result<PagedResult<AnalysisSummary>> {
        self.record("weekly_analyses")?;
        self.weeks.lock().unwrap().push(week);
        let all: Vec<AnalysisSummary> = (1..=12).map(analysis).collect();
        Ok(PagedResult::from_slice(all, offset, limit))
    }

    async fn analysis_detail(&self, id: &str) -> Result<AnalysisDetail> {
        self.record("analysis_detail")?;
        Ok(analysis_detail(id))
    }

    async fn crawl_history(&self) -> Result<Vec<CrawlLog>> {
        self.record("crawl_history")?;
        Ok(vec![crawl_log(1)])
    }

    async fn trigger_crawl(&self) -> Result<CrawlTriggered> {
        self.record("trigger_crawl")?;
        Ok(CrawlTriggered {
            success: true,
            saved: 3,
        })
    }

    async fn news(
        &self,
        offset: usize,
        limit: usize,
        priority: Option<Priority>,
    ) -> Result<PagedResult<NewsArticle>> {
        self.record("news")?;
        self.priorities.lock().unwrap().push(priority);
        let all: Vec<NewsArticle> = (1..=8)
            .map(article)
            .filter(|a| priority.is_none_or(|p| a.priority == p))
            .collect();
        Ok(PagedResult::from_slice(all, offset, limit))
    }

    async fn news_detail(&self, id: &str) -> Result<NewsArticle> {
        self.record("news_detail")?;
        let mut found = article(1);
        found.id = id.to_string();
        Ok(found)
    }

    async fn news_stats(&self) -> Result<NewsStats> {
        self.record("news_stats")?;
        Ok(NewsStats {
            posted_today: 1,
            remaining_slots: 4,
            total_articles: 8,
        })
    }

    async fn trigger_news_crawl(&self) -> Result<NewsCrawlTriggered> {
        self.record("trigger_news_crawl")?;
        Ok(NewsCrawlTriggered {
            success: true,
            saved: 2,
            total: 10,
        })
    }

    async fn trigger_news_post(&self) -> Result<NewsPostTriggered> {
        self.record("trigger_news_post")?;
        Ok(NewsPostTriggered {
            success: true,
            posted: 1,
        })
    }
}

// ============================================================================
// Fixtures (wire format)
// ============================================================================

pub fn article_json(n: u32) -> serde_json::Value {
    let priority = match n % 3 {
        0 => "LOW",
        1 => "HIGH",
        _ => "MEDIUM",
    };
    json!({
        "id": format!("news-{}", n),
        "title": format!("Tax news {}", n),
        "summary": "Summary",
        "fullContent": "Full content",
        "sourceUrl": format!("https://example.gov/news/{}", n),
        "sourceName": "Ministry of Finance",
        "publishedAt": "2024-02-01T08:00:00Z",
        "taxTypes": ["VAT"],
        "affectedIndustries": ["Retail"],
        "priority": priority,
        "posted": false,
        "userViewed": false,
        "crawledAt": "2024-02-01T09:00:00Z"
    })
}

pub fn article(n: u32) -> NewsArticle {
    serde_json::from_value(article_json(n)).unwrap()
}

pub fn analysis_json(n: u32) -> serde_json::Value {
    json!({
        "id": format!("analysis-{}", n),
        "weekNumber": 5,
        "newDocument": {
            "id": format!("doc-{}", n),
            "title": format!("Circular {}", n),
            "documentNumber": format!("{}/2024/TT-BTC", n),
            "taxTypes": ["CIT"]
        },
        "oldDocument": null,
        "summary": "Adds a reporting requirement",
        "totalChanges": 2,
        "highPriorityCount": 1,
        "affectedIndustries": ["Manufacturing"],
        "userViewed": false,
        "analyzedAt": "2024-02-02T10:00:00Z"
    })
}

pub fn analysis(n: u32) -> AnalysisSummary {
    serde_json::from_value(analysis_json(n)).unwrap()
}

pub fn analysis_detail(id: &str) -> AnalysisDetail {
    serde_json::from_value(json!({
        "id": id,
        "weekNumber": 5,
        "newDocument": {
            "id": "doc-new",
            "title": "Circular 12",
            "documentNumber": "12/2024/TT-BTC",
            "taxTypes": ["VAT"],
            "fullContent": "Article 1 ..."
        },
        "oldDocument": {
            "id": "doc-old",
            "title": "Circular 219",
            "documentNumber": "219/2013/TT-BTC",
            "fullContent": "Article 1 ..."
        },
        "summary": "Rate change",
        "totalChanges": 1,
        "highPriorityCount": 1,
        "analyzedAt": "2024-02-02T10:00:00Z",
        "analysis": {
            "summary": "VAT rate reduced",
            "totalChanges": 1,
            "changes": [{
                "priority": "HIGH",
                "category": "Rates",
                "title": "VAT rate",
                "oldProvision": {"article": "Art. 11", "text": "10%"},
                "newProvision": {"article": "Art. 11", "text": "8%"},
                "impact": {"type": "DECREASE", "description": "Lower VAT"}
            }]
        }
    }))
    .unwrap()
}

pub fn weekly_stats_json(week: u32) -> serde_json::Value {
    json!({
        "weekNumber": week,
        "weekStartDate": "2024-01-29",
        "totalDocuments": 14,
        "newDocuments": 9,
        "revisedDocuments": 5,
        "highPriorityChanges": 3,
        "totalChanges": 21,
        "affectedIndustries": ["Retail"],
        "taxTypeBreakdown": {"VAT": 6, "CIT": 8}
    })
}

pub fn weekly_stats(week: u32) -> WeeklyStats {
    serde_json::from_value(weekly_stats_json(week)).unwrap()
}

pub fn crawl_log_json(n: u32) -> serde_json::Value {
    json!({
        "id": format!("crawl-{}", n),
        "startedAt": "2024-02-01T08:00:00Z",
        "completedAt": "2024-02-01T08:00:12Z",
        "status": "SUCCESS",
        "documentsFound": 14,
        "documentsSaved": 3
    })
}

pub fn crawl_log(n: u32) -> CrawlLog {
    serde_json::from_value(crawl_log_json(n)).unwrap()
}
