//! # Providers, Descriptors & Provider Tables
//!
//! A [`Provider`] knows how to talk to one data source for one category: it
//! builds the request URL for a query and turns the raw response into result
//! items. The engine never calls providers directly; it works on a
//! [`ProviderTable`], a per-query list of [`ProviderDescriptor`]s carrying the
//! enabled flag the selector language toggles.
//!
//! Tables are plain values. Every resolution produces a fresh one, so two
//! queries never share or mutate the same table.

use std::fmt;
use std::sync::Arc;

use crate::cache::ResultItem;
use crate::category::Category;
use crate::error::Result;
use crate::group::GroupMask;
use crate::query::Query;

/// Raw response handed to a provider's parser
#[derive(Debug, Clone, Copy)]
pub struct ParseContext<'a> {
    pub query: &'a Query,
    /// URL the body was downloaded from
    pub url: &'a str,
    pub body: &'a [u8],
}

impl<'a> ParseContext<'a> {
    pub fn new(query: &'a Query, url: &'a str, body: &'a [u8]) -> Self {
        Self { query, url, body }
    }

    /// Body as text, lossy
    pub fn text(&self) -> std::borrow::Cow<'a, str> {
        String::from_utf8_lossy(self.body)
    }

    /// Body decoded as JSON
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(self.body)?)
    }
}

/// A data source able to answer queries of one category
///
/// Implementations stay free of I/O: the pipeline downloads whatever
/// [`Provider::build_url`] returns and feeds the body to [`Provider::parse`].
pub trait Provider: Send + Sync {
    /// Display name, matched case-insensitively by the selector
    fn name(&self) -> &str;

    /// Short alias, also matched by the selector
    fn key(&self) -> &str;

    fn category(&self) -> Category;

    fn groups(&self) -> GroupMask;

    /// Request URL for `query`, or `None` when the query lacks required fields
    fn build_url(&self, query: &Query) -> Option<String>;

    /// Chain another request before parsing (search, then lookup).
    ///
    /// Returning `Some(url)` discards the current body and downloads `url`;
    /// the chain is short and bounded by the pipeline.
    fn follow_up(&self, _ctx: &ParseContext<'_>) -> Option<String> {
        None
    }

    /// Turn a downloaded body into result items
    fn parse(&self, ctx: &ParseContext<'_>) -> Result<Vec<ResultItem>>;
}

/// Entry of a provider table
#[derive(Clone)]
pub struct ProviderDescriptor {
    pub name: String,
    /// Short alias; entries without one are not touched by the `all` group
    pub key: Option<String>,
    pub groups: GroupMask,
    pub enabled: bool,
    pub category: Category,
    /// `None` for introspection entries, which cannot be fetched
    pub provider: Option<Arc<dyn Provider>>,
}

impl ProviderDescriptor {
    /// Describe a fetchable provider
    pub fn for_provider(provider: Arc<dyn Provider>) -> Self {
        Self {
            name: provider.name().to_string(),
            key: Some(provider.key().to_string()).filter(|key| !key.is_empty()),
            groups: provider.groups(),
            enabled: true,
            category: provider.category(),
            provider: Some(provider),
        }
    }

    /// Introspection entry naming a category
    pub fn for_category(category: Category) -> Self {
        Self {
            name: category.name().to_string(),
            key: category.key().map(str::to_string),
            groups: GroupMask::empty(),
            enabled: true,
            category,
            provider: None,
        }
    }

    /// Case-insensitive match against the name or the short key
    pub fn matches(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
            || self
                .key
                .as_deref()
                .is_some_and(|key| key.eq_ignore_ascii_case(name))
    }
}

impl fmt::Debug for ProviderDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderDescriptor")
            .field("name", &self.name)
            .field("key", &self.key)
            .field("groups", &self.groups)
            .field("enabled", &self.enabled)
            .field("category", &self.category)
            .field("fetchable", &self.provider.is_some())
            .finish()
    }
}

/// Ordered provider list for one category
#[derive(Debug, Clone)]
pub struct ProviderTable {
    category: Category,
    entries: Vec<ProviderDescriptor>,
}

impl ProviderTable {
    pub fn new(category: Category, entries: Vec<ProviderDescriptor>) -> Self {
        Self { category, entries }
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ProviderDescriptor> {
        self.entries.iter()
    }

    /// Enabled entries in table order
    pub fn enabled(&self) -> impl Iterator<Item = &ProviderDescriptor> {
        self.entries.iter().filter(|entry| entry.enabled)
    }

    /// First entry matching `name` by name or key
    pub fn find(&self, name: &str) -> Option<&ProviderDescriptor> {
        self.entries.iter().find(|entry| entry.matches(name))
    }

    /// Toggle entries by group.
    ///
    /// `GroupMask::ALL` toggles every keyed entry; any other mask toggles the
    /// entries whose groups intersect it.
    pub fn set_group_enabled(&mut self, mask: GroupMask, value: bool) {
        if mask.contains(GroupMask::ALL) {
            for entry in self.entries.iter_mut().filter(|entry| entry.key.is_some()) {
                entry.enabled = value;
            }
            return;
        }

        for entry in self
            .entries
            .iter_mut()
            .filter(|entry| entry.groups.intersects(mask))
        {
            entry.enabled = value;
        }
    }

    /// Toggle every entry whose name or key matches. Returns the match count.
    pub fn set_enabled_by_name(&mut self, name: &str, value: bool) -> usize {
        let mut matched = 0;
        for entry in self.entries.iter_mut().filter(|entry| entry.matches(name)) {
            entry.enabled = value;
            matched += 1;
        }
        matched
    }

    /// Names of the enabled entries, in order
    pub fn enabled_names(&self) -> Vec<&str> {
        self.enabled().map(|entry| entry.name.as_str()).collect()
    }
}

impl<'a> IntoIterator for &'a ProviderTable {
    type Item = &'a ProviderDescriptor;
    type IntoIter = std::slice::Iter<'a, ProviderDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
