//! # Result Items & Cache List
//!
//! A [`ResultItem`] is one parsed answer from one provider: raw bytes plus the
//! metadata the pipeline needs for filtering. A [`CacheList`] keeps items in
//! discovery order together with running totals.
//!
//! ## Usage
//!
//! ```ignore
//! use core_metadata::{CacheList, Category, ResultItem};
//!
//! let mut list = CacheList::new();
//! list.push(ResultItem::text(Category::Lyric, "lrclib", "la la la"));
//!
//! let list = list.into_non_empty().expect("one item");
//! assert_eq!(list.total_bytes(), 8);
//! ```

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::category::Category;

/// How the bytes of an item should be interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    /// UTF-8 text (lyrics, biographies, tag names...)
    Text,
    /// A URL pointing at the real payload, resolved by auto-download
    Link,
    /// Raw binary payload (images)
    Binary,
}

/// One fetched and parsed result
#[derive(Debug, Clone, PartialEq)]
pub struct ResultItem {
    pub data: Bytes,
    pub kind: ItemKind,
    pub category: Category,
    /// Provider name that produced the item
    pub source: String,
    /// URL the item was fetched from, if any
    pub source_url: Option<String>,
    /// Size announced by the provider (image edge length in pixels)
    pub declared_size: Option<u32>,
    /// Lowercase file format, e.g. `jpeg`
    pub format: Option<String>,
}

impl ResultItem {
    /// Create an empty item for `category`
    pub fn new(category: Category, source: impl Into<String>) -> Self {
        Self {
            data: Bytes::new(),
            kind: ItemKind::Text,
            category,
            source: source.into(),
            source_url: None,
            declared_size: None,
            format: None,
        }
    }

    pub fn text(category: Category, source: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            data: Bytes::from(text.into()),
            ..Self::new(category, source)
        }
    }

    pub fn link(category: Category, source: impl Into<String>, url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            data: Bytes::from(url.clone()),
            kind: ItemKind::Link,
            source_url: Some(url),
            ..Self::new(category, source)
        }
    }

    pub fn binary(category: Category, source: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            kind: ItemKind::Binary,
            ..Self::new(category, source)
        }
    }

    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }

    pub fn with_declared_size(mut self, size: u32) -> Self {
        self.declared_size = Some(size);
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into().to_ascii_lowercase());
        self
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Item bytes as text, if they are valid UTF-8
    pub fn as_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.data).ok()
    }

    /// SHA-256 of the payload, hex encoded
    pub fn content_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.data);
        format!("{:x}", hasher.finalize())
    }
}

/// Ordered collection of result items
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheList {
    items: Vec<ResultItem>,
    total_bytes: usize,
}

impl CacheList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an item, keeping discovery order
    pub fn push(&mut self, item: ResultItem) {
        self.total_bytes += item.len();
        self.items.push(item);
    }

    pub fn get(&self, index: usize) -> Option<&ResultItem> {
        self.items.get(index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of all payload lengths
    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ResultItem> {
        self.items.iter()
    }

    /// Whether an item with the given content hash is already present
    pub fn contains_hash(&self, hash: &str) -> bool {
        self.items.iter().any(|item| item.content_hash() == hash)
    }

    /// Absence is `None`, never an empty list
    pub fn into_non_empty(self) -> Option<Self> {
        if self.items.is_empty() {
            None
        } else {
            Some(self)
        }
    }

    pub fn into_items(self) -> Vec<ResultItem> {
        self.items
    }
}

impl FromIterator<ResultItem> for CacheList {
    fn from_iter<I: IntoIterator<Item = ResultItem>>(iter: I) -> Self {
        let mut list = CacheList::new();
        for item in iter {
            list.push(item);
        }
        list
    }
}

impl IntoIterator for CacheList {
    type Item = ResultItem;
    type IntoIter = std::vec::IntoIter<ResultItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a CacheList {
    type Item = &'a ResultItem;
    type IntoIter = std::slice::Iter<'a, ResultItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
