use crate::core::{ClientError, Result};
use reqwest::Url;
use std::num::NonZeroUsize;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:3001/api";
pub const DEFAULT_PAGE_SIZE: NonZeroUsize = NonZeroUsize::new(5).unwrap();
pub const DEFAULT_CACHE_CAPACITY: NonZeroUsize = NonZeroUsize::new(256).unwrap();

/// Client configuration
///
/// Builder-style, with defaults matching the service's development setup.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL of the API, including the `/api` prefix
    pub base_url: String,

    /// Whole-request timeout
    pub request_timeout: Duration,

    /// TCP connect timeout
    pub connect_timeout: Duration,

    /// Items per page in the news feed
    pub news_page_size: NonZeroUsize,

    /// Items per page in the weekly analyses feed
    pub analyses_page_size: NonZeroUsize,

    /// Maximum number of cached query keys
    pub cache_capacity: NonZeroUsize,

    /// How long fetched data counts as fresh (zero: revalidate on every
    /// re-entry)
    pub stale_time: Duration,

    /// How often the dashboard re-polls crawl history
    pub history_poll_interval: Duration,

    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            news_page_size: DEFAULT_PAGE_SIZE,
            analyses_page_size: DEFAULT_PAGE_SIZE,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            stale_time: Duration::ZERO,
            history_poll_interval: Duration::from_secs(5),
            user_agent: format!("taxwatch/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ApiConfig {
    pub fn new(base_url: &str) -> Self {
        Self::default().base_url(base_url)
    }

    /// Defaults overridden by `TAXWATCH_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`ApiConfig::from_env`], reading variables through `lookup`.
    ///
    /// Recognized: `TAXWATCH_API_URL`, `TAXWATCH_TIMEOUT_SECS`,
    /// `TAXWATCH_PAGE_SIZE`, `TAXWATCH_CACHE_CAPACITY`,
    /// `TAXWATCH_STALE_SECS`, `TAXWATCH_POLL_SECS`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("TAXWATCH_API_URL") {
            config.base_url = url;
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "TAXWATCH_TIMEOUT_SECS")? {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(size) = parse_var::<NonZeroUsize>(&lookup, "TAXWATCH_PAGE_SIZE")? {
            config.news_page_size = size;
            config.analyses_page_size = size;
        }
        if let Some(capacity) = parse_var::<NonZeroUsize>(&lookup, "TAXWATCH_CACHE_CAPACITY")? {
            config.cache_capacity = capacity;
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "TAXWATCH_STALE_SECS")? {
            config.stale_time = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "TAXWATCH_POLL_SECS")? {
            config.history_poll_interval = Duration::from_secs(secs);
        }

        config.validate()?;
        Ok(config)
    }

    /// Set the base URL
    pub fn base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }

    /// Set the request timeout
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the connect timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the page size of both feeds
    pub fn page_size(mut self, size: NonZeroUsize) -> Self {
        self.news_page_size = size;
        self.analyses_page_size = size;
        self
    }

    pub fn news_page_size(mut self, size: NonZeroUsize) -> Self {
        self.news_page_size = size;
        self
    }

    pub fn analyses_page_size(mut self, size: NonZeroUsize) -> Self {
        self.analyses_page_size = size;
        self
    }

    pub fn cache_capacity(mut self, capacity: NonZeroUsize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    pub fn stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = stale_time;
        self
    }

    pub fn history_poll_interval(mut self, interval: Duration) -> Self {
        self.history_poll_interval = interval;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.base_url).map_err(|e| {
            ClientError::Config(format!("invalid base URL '{}': {}", self.base_url, e))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ClientError::Config(format!(
                "base URL must be http or https, got '{}'",
                url.scheme()
            )));
        }
        if url.cannot_be_a_base() {
            return Err(ClientError::Config(format!(
                "base URL '{}' cannot carry a path",
                self.base_url
            )));
        }
        if self.request_timeout.is_zero() {
            return Err(ClientError::Config("request timeout must be > 0".into()));
        }
        if self.connect_timeout.is_zero() {
            return Err(ClientError::Config("connect timeout must be > 0".into()));
        }
        if self.history_poll_interval.is_zero() {
            return Err(ClientError::Config("history poll interval must be > 0".into()));
        }
        Ok(())
    }

    /// URL of an endpoint below the base URL; every segment is
    /// percent-encoded.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ClientError::Config(format!("invalid base URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| ClientError::Config("base URL cannot carry a path".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

fn parse_var<V>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<V>>
where
    V: std::str::FromStr,
    V::Err: std::fmt::Display,
{
    lookup(name)
        .map(|raw| {
            raw.trim()
                .parse::<V>()
                .map_err(|e| ClientError::Config(format!("{}='{}': {}", name, raw, e)))
        })
        .transpose()
}
