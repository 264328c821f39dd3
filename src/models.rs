//! Core data models for the catalog client

use std::fmt;
use std::str::FromStr;
use url::Url;

use crate::error::{FetchError, Result};

/// One entry of a list page: a display name and the URL of its detail resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntry {
    pub name: String,
    pub detail_ref: Url,
}

/// A decoded list response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListPage {
    /// Total number of items in the catalog
    pub total_count: u64,
    /// Link to the following page, if the server reported one
    pub next: Option<Url>,
    /// Link to the preceding page, if the server reported one
    pub previous: Option<Url>,
    /// Entries in server order
    pub entries: Vec<ListEntry>,
}

impl ListPage {
    /// Whether the catalog continues after this page
    pub fn has_more(&self) -> bool {
        self.next.is_some()
    }
}

/// A fully decoded catalog item
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DetailRecord {
    pub id: u64,
    pub name: String,
    pub weight: u32,
    pub height: u32,
    /// Official artwork, if the item has any
    pub image_url: Option<Url>,
}

impl DetailRecord {
    /// Cache key of the record's image, if it has one
    pub fn image_key(&self) -> Option<CacheKey> {
        self.image_url.clone().map(CacheKey::from)
    }
}

/// Result of a page fetch: records index-aligned with the list entries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchBatch {
    /// Total number of items in the catalog
    pub total_count: u64,
    /// Whether another page follows this one
    pub has_more: bool,
    /// Records in catalog order
    pub records: Vec<DetailRecord>,
}

impl FetchBatch {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DetailRecord> {
        self.records.iter()
    }

    /// Identifiers in batch order
    pub fn ids(&self) -> Vec<u64> {
        self.records.iter().map(|r| r.id).collect()
    }
}

impl IntoIterator for FetchBatch {
    type Item = DetailRecord;
    type IntoIter = std::vec::IntoIter<DetailRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a> IntoIterator for &'a FetchBatch {
    type Item = &'a DetailRecord;
    type IntoIter = std::slice::Iter<'a, DetailRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Opaque resource locator used as both cache index and dedup key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(Url);

impl CacheKey {
    pub fn new(url: Url) -> Self {
        CacheKey(url)
    }

    pub fn as_url(&self) -> &Url {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<Url> for CacheKey {
    fn from(url: Url) -> Self {
        CacheKey(url)
    }
}

impl FromStr for CacheKey {
    type Err = FetchError;

    fn from_str(s: &str) -> Result<Self> {
        Url::parse(s)
            .map(CacheKey)
            .map_err(|e| FetchError::InvalidRequest(format!("Invalid resource URL '{}': {}", s, e)))
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: u64) -> DetailRecord {
        DetailRecord {
            id,
            name: format!("item-{}", id),
            weight: 10,
            height: 3,
            image_url: None,
        }
    }

    #[test]
    fn test_cache_key_parse() {
        let key: CacheKey = "https://example.test/a.png".parse().unwrap();
        assert_eq!(key.as_str(), "https://example.test/a.png");
        assert_eq!(key.to_string(), "https://example.test/a.png");

        let err = "not a url".parse::<CacheKey>().unwrap_err();
        assert!(matches!(err, FetchError::InvalidRequest(_)));
    }

    #[test]
    fn test_image_key() {
        let mut rec = record(1);
        assert!(rec.image_key().is_none());

        rec.image_url = Some(Url::parse("https://example.test/1.png").unwrap());
        assert_eq!(rec.image_key().unwrap().as_str(), "https://example.test/1.png");
    }

    #[test]
    fn test_batch_accessors() {
        let batch = FetchBatch {
            total_count: 100,
            has_more: true,
            records: vec![record(21), record(7), record(150)],
        };
        assert_eq!(batch.len(), 3);
        assert!(!batch.is_empty());
        assert_eq!(batch.ids(), vec![21, 7, 150]);
        let names: Vec<_> = (&batch).into_iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["item-21", "item-7", "item-150"]);
    }

    #[test]
    fn test_list_page_has_more() {
        let page = ListPage {
            total_count: 2,
            next: None,
            previous: None,
            entries: Vec::new(),
        };
        assert!(!page.has_more());
    }
}
