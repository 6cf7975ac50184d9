use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::error::ClientError;

/// One page of a larger collection.
///
/// `total` is the size of the whole collection, independent of which page
/// `items` came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    pub total: usize,
}

impl<T> PagedResult<T> {
    pub fn new(items: Vec<T>, total: usize) -> Self {
        Self { items, total }
    }

    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
        }
    }

    /// Slice a fully materialized collection down to one page.
    pub fn from_slice(all: Vec<T>, offset: usize, limit: usize) -> Self {
        let total = all.len();
        let items = all.into_iter().skip(offset).take(limit).collect();
        Self { items, total }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T> Default for PagedResult<T> {
    fn default() -> Self {
        Self::empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "HIGH",
            Priority::Medium => "MEDIUM",
            Priority::Low => "LOW",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HIGH" => Ok(Priority::High),
            "MEDIUM" => Ok(Priority::Medium),
            "LOW" => Ok(Priority::Low),
            other => Err(ClientError::InvalidInput(format!(
                "unknown priority '{}', expected HIGH, MEDIUM or LOW",
                other
            ))),
        }
    }
}

// ============================================================================
// News
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsArticle {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub full_content: String,
    pub source_url: String,
    pub source_name: String,
    pub published_at: DateTime<Utc>,
    #[serde(default)]
    pub tax_types: Vec<String>,
    #[serde(default)]
    pub affected_industries: Vec<String>,
    pub priority: Priority,
    #[serde(default)]
    pub posted: bool,
    #[serde(default)]
    pub user_viewed: bool,
    pub crawled_at: DateTime<Utc>,
    #[serde(default)]
    pub posted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub detailed_analysis: Option<DetailedAnalysis>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedAnalysis {
    pub signals: Signals,
    pub business_impact: BusinessImpact,
    #[serde(default)]
    pub concepts: Vec<TaxConcept>,
    #[serde(default)]
    pub action_checklist: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Signals {
    pub legal_hotspots: String,
    pub hidden_impacts: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessImpact {
    #[serde(default)]
    pub affected_business_types: Vec<String>,
    #[serde(default)]
    pub risk_areas: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxConcept {
    pub name: String,
    pub objective: String,
    #[serde(default)]
    pub steps: Vec<String>,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsStats {
    pub posted_today: u32,
    pub remaining_slots: u32,
    pub total_articles: u64,
}

// ============================================================================
// Weekly analyses
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyStats {
    pub week_number: u32,
    pub week_start_date: String,
    pub total_documents: u64,
    pub new_documents: u64,
    pub revised_documents: u64,
    pub high_priority_changes: u64,
    pub total_changes: u64,
    #[serde(default)]
    pub affected_industries: Vec<String>,
    #[serde(default)]
    pub tax_type_breakdown: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRef {
    pub id: String,
    pub title: String,
    pub document_number: String,
    #[serde(default)]
    pub tax_types: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSummary {
    pub id: String,
    pub week_number: u32,
    pub new_document: DocumentRef,
    #[serde(default)]
    pub old_document: Option<DocumentRef>,
    pub summary: String,
    pub total_changes: u32,
    pub high_priority_count: u32,
    #[serde(default)]
    pub affected_industries: Vec<String>,
    #[serde(default)]
    pub user_viewed: bool,
    pub analyzed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentDetail {
    pub id: String,
    pub title: String,
    pub document_number: String,
    #[serde(default)]
    pub doc_type: Option<String>,
    #[serde(default)]
    pub tax_types: Vec<String>,
    #[serde(default)]
    pub issue_date: Option<String>,
    #[serde(default)]
    pub effective_date: Option<String>,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub full_content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisDetail {
    pub id: String,
    pub week_number: u32,
    pub new_document: DocumentDetail,
    #[serde(default)]
    pub old_document: Option<DocumentDetail>,
    pub summary: String,
    pub total_changes: u32,
    pub high_priority_count: u32,
    #[serde(default)]
    pub affected_industries: Vec<String>,
    #[serde(default)]
    pub user_viewed: bool,
    pub analyzed_at: DateTime<Utc>,
    pub analysis: ChangeAnalysis,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeAnalysis {
    pub summary: String,
    pub total_changes: u32,
    #[serde(default)]
    pub changes: Vec<ProvisionChange>,
    #[serde(default)]
    pub affected_industries: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionChange {
    pub priority: Priority,
    pub category: String,
    pub title: String,
    #[serde(default)]
    pub old_provision: Option<Provision>,
    pub new_provision: Provision,
    pub impact: Impact,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provision {
    pub article: String,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ImpactKind {
    Increase,
    Decrease,
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Impact {
    #[serde(rename = "type")]
    pub kind: ImpactKind,
    pub description: String,
    #[serde(default)]
    pub example: Option<String>,
}

// ============================================================================
// Crawler
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CrawlStatus {
    Running,
    Success,
    Failed,
}

impl fmt::Display for CrawlStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CrawlStatus::Running => "RUNNING",
            CrawlStatus::Success => "SUCCESS",
            CrawlStatus::Failed => "FAILED",
        };
        f.pad(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlLog {
    pub id: String,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    pub status: CrawlStatus,
    pub documents_found: u32,
    pub documents_saved: u32,
    #[serde(default)]
    pub error: Option<String>,
}

impl CrawlLog {
    /// Wall time of the run, `None` while it is still running.
    pub fn duration(&self) -> Option<TimeDelta> {
        self.completed_at.map(|end| end - self.started_at)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlTriggered {
    pub success: bool,
    pub saved: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsCrawlTriggered {
    pub success: bool,
    pub saved: u32,
    pub total: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsPostTriggered {
    pub success: bool,
    pub posted: u32,
}
