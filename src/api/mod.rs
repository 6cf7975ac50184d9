//! HTTP access to the tax-monitoring service.

pub mod client;
pub mod config;
pub mod feeds;
pub mod keys;

pub use client::ApiClient;
pub use config::ApiConfig;
pub use feeds::{AnalysisFeed, NewsFeed};
