pub mod error;
pub mod types;
pub mod week;

pub use error::{ClientError, Result};
pub use types::{
    AnalysisDetail, AnalysisSummary, BusinessImpact, ChangeAnalysis, CrawlLog, CrawlStatus,
    CrawlTriggered, DetailedAnalysis, DocumentDetail, DocumentRef, Impact, ImpactKind,
    NewsArticle, NewsCrawlTriggered, NewsPostTriggered, NewsStats, PagedResult, Priority,
    Provision, ProvisionChange, Signals, TaxConcept, WeeklyStats,
};
pub use week::WeekId;
