use super::cache::{QueryCache, QueryStatus};
use super::key::QueryKey;
use super::source::{PageRequest, PageSource};
use crate::core::{ClientError, PagedResult, Result};
use crate::pagination::{PageChange, PageState, Pagination, max_page};
use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// What a feed should render right now.
#[derive(Debug)]
pub struct FeedDisplay<T> {
    /// The key this display belongs to (always the view's current key).
    pub key: QueryKey,
    pub status: QueryStatus,
    /// Data for the current key, or the previously shown page while the
    /// current key has none yet.
    pub page: Option<Arc<PagedResult<T>>>,
    pub is_placeholder: bool,
    pub is_fetching: bool,
    pub error: Option<ClientError>,
    /// `None` when there is at most one page.
    pub pagination: Option<Pagination>,
}

impl<T> FeedDisplay<T> {
    pub fn items(&self) -> &[T] {
        self.page
            .as_deref()
            .map(|page| page.items.as_slice())
            .unwrap_or(&[])
    }

    pub fn total(&self) -> Option<usize> {
        self.page.as_deref().map(|page| page.total)
    }

    /// Nothing to show yet and the first fetch is running.
    pub fn is_loading(&self) -> bool {
        self.page.is_none() && self.is_fetching
    }

    /// The current key resolved to zero items. Not an error.
    pub fn is_empty_state(&self) -> bool {
        !self.is_placeholder && self.page.as_deref().is_some_and(PagedResult::is_empty)
    }
}

/// One paginated feed: page state, filters and the cache glued together.
///
/// Every navigation recomputes the key and asks the cache for it; the view
/// only ever reads its current key, so a response for a page the user has
/// already left lands in that page's cache entry and is never displayed
/// here.
///
/// Navigation starts fetches on the current tokio runtime; outside one it
/// returns [`ClientError::TaskFailed`].
pub struct FeedView<S: PageSource> {
    source: Arc<S>,
    cache: QueryCache,
    state: PageState,
    filters: BTreeMap<String, String>,
    key: QueryKey,
    placeholder: Option<Arc<PagedResult<S::Item>>>,
}

impl<S: PageSource> FeedView<S> {
    /// Create a view on page 1. Nothing is fetched until [`FeedView::open`].
    pub fn new(source: Arc<S>, cache: QueryCache, page_size: NonZeroUsize) -> Self {
        let state = PageState::new(page_size);
        let filters = BTreeMap::new();
        let key = build_request(&state, &filters).query_key(source.resource());
        Self {
            source,
            cache,
            state,
            filters,
            key,
            placeholder: None,
        }
    }

    /// Set a filter before the view is opened.
    pub fn with_filter(mut self, name: &str, value: Option<impl ToString>) -> Self {
        match value {
            Some(value) => self.filters.insert(name.to_string(), value.to_string()),
            None => self.filters.remove(name),
        };
        self.key = build_request(&self.state, &self.filters).query_key(self.source.resource());
        self
    }

    /// Request the current page (mount).
    pub fn open(&mut self) -> Result<()> {
        self.request_current()
    }

    pub fn page_state(&self) -> &PageState {
        &self.state
    }

    pub fn page(&self) -> usize {
        self.state.page()
    }

    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    pub fn filter(&self, name: &str) -> Option<&str> {
        self.filters.get(name).map(String::as_str)
    }

    pub fn request(&self) -> PageRequest {
        build_request(&self.state, &self.filters)
    }

    /// Go to page `n`; `n < 1` is ignored. Returns whether the key changed.
    ///
    /// A page whose offset does not fit in a `usize` is rejected.
    pub fn go_to(&mut self, page: usize) -> Result<bool> {
        if page > max_page(self.state.page_size()) {
            return Err(ClientError::InvalidInput(format!(
                "page {} is out of range",
                page
            )));
        }
        let mut next = self.state;
        if !next.set_page(page) {
            return Ok(false);
        }
        self.switch(next, self.filters.clone())
    }

    pub fn apply(&mut self, change: PageChange) -> Result<bool> {
        self.go_to(change.page)
    }

    /// Only moves forward when the collection is known to have another page.
    pub fn next_page(&mut self) -> Result<bool> {
        match self.control().and_then(|control| control.next()) {
            Some(change) => self.apply(change),
            None => Ok(false),
        }
    }

    pub fn prev_page(&mut self) -> Result<bool> {
        let mut next = self.state;
        if !next.prev_page() {
            return Ok(false);
        }
        self.switch(next, self.filters.clone())
    }

    /// Change (or clear, with `None`) a filter. A different filter means a
    /// different collection, so the view goes back to page 1.
    pub fn set_filter(&mut self, name: &str, value: Option<String>) -> Result<bool> {
        let mut filters = self.filters.clone();
        let changed = match value {
            Some(value) => filters.insert(name.to_string(), value.clone()) != Some(value),
            None => filters.remove(name).is_some(),
        };
        if !changed {
            return Ok(false);
        }
        let mut state = self.state;
        state.reset();
        self.switch(state, filters)
    }

    /// Revalidate the current key if it is stale.
    pub fn refresh(&mut self) -> Result<()> {
        self.request_current()
    }

    /// Force a refetch of the current key.
    pub fn reload(&mut self) -> Result<()> {
        self.cache.invalidate(&self.key)?;
        self.request_current()
    }

    pub fn display(&self) -> Result<FeedDisplay<S::Item>> {
        let state = self.cache.peek::<PagedResult<S::Item>>(&self.key)?;
        Ok(self.compose(state.status, state.data, state.is_fetching, state.error))
    }

    /// Wait until the current key's fetch (if any) settles.
    pub async fn settled(&self) -> Result<FeedDisplay<S::Item>> {
        let state = self.cache.settled::<PagedResult<S::Item>>(&self.key).await?;
        Ok(self.compose(state.status, state.data, state.is_fetching, state.error))
    }

    /// Pagination for the best known total, hidden or not.
    pub fn control(&self) -> Option<Pagination> {
        let current = self
            .cache
            .peek::<PagedResult<S::Item>>(&self.key)
            .ok()
            .and_then(|state| state.data);
        current
            .or_else(|| self.placeholder.clone())
            .map(|page| Pagination::for_state(&self.state, page.total))
    }

    fn compose(
        &self,
        status: QueryStatus,
        data: Option<Arc<PagedResult<S::Item>>>,
        is_fetching: bool,
        error: Option<ClientError>,
    ) -> FeedDisplay<S::Item> {
        let (page, is_placeholder) = match data {
            Some(data) => (Some(data), false),
            None => (self.placeholder.clone(), self.placeholder.is_some()),
        };
        let pagination = page
            .as_deref()
            .map(|page| Pagination::for_state(&self.state, page.total))
            .filter(Pagination::is_visible);

        FeedDisplay {
            key: self.key.clone(),
            status,
            page,
            is_placeholder,
            is_fetching,
            error,
            pagination,
        }
    }

    fn switch(&mut self, state: PageState, filters: BTreeMap<String, String>) -> Result<bool> {
        let key = build_request(&state, &filters).query_key(self.source.resource());
        self.state = state;
        self.filters = filters;
        if key == self.key {
            return Ok(false);
        }

        // Keep what is on screen until the new key has data of its own.
        if let Some(shown) = self.cache.peek::<PagedResult<S::Item>>(&self.key)?.data {
            self.placeholder = Some(shown);
        }
        self.key = key;
        self.request_current()?;
        Ok(true)
    }

    fn request_current(&self) -> Result<()> {
        let source = Arc::clone(&self.source);
        let request = self.request();
        self.cache
            .query::<PagedResult<S::Item>, _, _>(&self.key, move || async move {
                source.fetch_page(request).await
            })?;
        Ok(())
    }
}

fn build_request(state: &PageState, filters: &BTreeMap<String, String>) -> PageRequest {
    PageRequest {
        offset: state.offset(),
        limit: state.page_size().get(),
        filters: filters.clone(),
    }
}
