use std::collections::BTreeMap;
use std::fmt;

/// Structural cache key: a resource name plus every parameter that affects
/// the result.
///
/// Parameters are kept sorted by name, so two keys built with the same
/// parameters in a different order are equal and hash the same. An absent
/// optional filter is simply not stored, which makes "no week" and "week
/// not specified" the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey {
    resource: String,
    params: BTreeMap<String, String>,
}

impl QueryKey {
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            params: BTreeMap::new(),
        }
    }

    /// Key for one page of `resource`.
    pub fn paged(resource: impl Into<String>, offset: usize, limit: usize) -> Self {
        Self::new(resource).param("offset", offset).param("limit", limit)
    }

    pub fn param(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.params.insert(name.into(), value.to_string());
        self
    }

    pub fn opt_param<V: ToString>(self, name: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(value) => self.param(name, value),
            None => self,
        }
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn params(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl fmt::Display for QueryKey {
    /// `news?limit=5&offset=10`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.resource)?;
        for (i, (name, value)) in self.params.iter().enumerate() {
            let sep = if i == 0 { '?' } else { '&' };
            write!(f, "{}{}={}", sep, name, value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_param_order_does_not_matter() {
        let a = QueryKey::new("weekly-analyses")
            .param("week", "2024-W05")
            .param("offset", 5)
            .param("limit", 5);
        let b = QueryKey::paged("weekly-analyses", 5, 5).param("week", "2024-W05");
        assert_eq!(a, b);

        let set: HashSet<_> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_distinct_parameters_are_distinct_keys() {
        let page1 = QueryKey::paged("news", 0, 5);
        let page2 = QueryKey::paged("news", 5, 5);
        let bigger = QueryKey::paged("news", 0, 10);
        let other = QueryKey::paged("weekly-analyses", 0, 5);
        assert_ne!(page1, page2);
        assert_ne!(page1, bigger);
        assert_ne!(page1, other);
    }

    #[test]
    fn test_absent_filter_is_omitted() {
        let none: Option<&str> = None;
        let key = QueryKey::new("weekly-stats").opt_param("week", none);
        assert_eq!(key, QueryKey::new("weekly-stats"));
        assert_eq!(key.get("week"), None);

        let with = QueryKey::new("weekly-stats").opt_param("week", Some("2024-W05"));
        assert_eq!(with.get("week"), Some("2024-W05"));
        assert_ne!(key, with);
    }

    #[test]
    fn test_display() {
        assert_eq!(QueryKey::paged("news", 10, 5).to_string(), "news?limit=5&offset=10");
        assert_eq!(QueryKey::new("crawl-history").to_string(), "crawl-history");
    }
}
