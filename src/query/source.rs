use super::key::QueryKey;
use crate::core::{ClientError, PagedResult, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;

/// What a paginated view asks its source for.
///
/// `offset` and `limit` are reserved names: filters with those names are
/// shadowed by the paging parameters in the cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageRequest {
    pub offset: usize,
    pub limit: usize,
    pub filters: BTreeMap<String, String>,
}

impl PageRequest {
    pub fn new(offset: usize, limit: usize) -> Self {
        Self {
            offset,
            limit,
            filters: BTreeMap::new(),
        }
    }

    pub fn with_filter(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.filters.insert(name.into(), value.to_string());
        self
    }

    /// Parse filter `name`, `Ok(None)` when it is absent.
    pub fn filter<V>(&self, name: &str) -> Result<Option<V>>
    where
        V: FromStr,
        V::Err: Display,
    {
        self.filters
            .get(name)
            .map(|raw| {
                raw.parse::<V>().map_err(|e| {
                    ClientError::InvalidInput(format!("filter '{}' = '{}': {}", name, raw, e))
                })
            })
            .transpose()
    }

    pub fn query_key(&self, resource: &str) -> QueryKey {
        self.filters
            .iter()
            .fold(QueryKey::new(resource), |key, (name, value)| key.param(name, value))
            .param("offset", self.offset)
            .param("limit", self.limit)
    }
}

/// Anything that can produce one page of a collection.
///
/// Implemented by the feeds over the HTTP client, and by in-memory sources
/// in tests.
#[async_trait]
pub trait PageSource: Send + Sync + 'static {
    type Item: Send + Sync + 'static;

    /// Resource name, the first component of every cache key this source
    /// produces.
    fn resource(&self) -> &str;

    async fn fetch_page(&self, request: PageRequest) -> Result<PagedResult<Self::Item>>;
}
