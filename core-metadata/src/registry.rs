//! Provider registry
//!
//! Maps each category to the providers registered for it. Resolving a
//! category yields a fresh [`ProviderTable`] with every entry enabled; the
//! registry itself is never mutated by queries.

use std::collections::HashMap;
use std::sync::Arc;

use core_runtime::config::MetadataApiConfig;
use tracing::debug;

use crate::category::Category;
use crate::error::{MetadataError, Result};
use crate::provider::{Provider, ProviderDescriptor, ProviderTable};
use crate::providers::{DeezerProvider, LastFmProvider, LrcLibProvider, MusicBrainzProvider};

#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<Category, Vec<Arc<dyn Provider>>>,
}

impl ProviderRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in providers.
    ///
    /// Last.fm needs an API key and is only registered when one is configured.
    pub fn with_defaults(api_config: &MetadataApiConfig) -> Self {
        let mut registry = Self::new();

        registry.register(Arc::new(LrcLibProvider::new()));
        for provider in DeezerProvider::all() {
            registry.register(Arc::new(provider));
        }
        for provider in MusicBrainzProvider::all() {
            registry.register(Arc::new(provider));
        }

        match api_config.lastfm_api_key.as_deref() {
            Some(api_key) => {
                for provider in LastFmProvider::all(api_key) {
                    registry.register(Arc::new(provider));
                }
            }
            None => debug!("Last.fm API key not configured, provider disabled"),
        }

        registry
    }

    /// Add a provider to the end of its category's list.
    ///
    /// A provider with the same name in the same category is replaced in place.
    pub fn register(&mut self, provider: Arc<dyn Provider>) {
        let list = self.providers.entry(provider.category()).or_default();

        if let Some(slot) = list
            .iter_mut()
            .find(|existing| existing.name().eq_ignore_ascii_case(provider.name()))
        {
            debug!(
                provider = %provider.name(),
                category = %provider.category(),
                "Replacing registered provider"
            );
            *slot = provider;
            return;
        }

        debug!(
            provider = %provider.name(),
            category = %provider.category(),
            "Registered provider"
        );
        list.push(provider);
    }

    /// Registered providers of a category, in registration order
    pub fn providers_for(&self, category: Category) -> &[Arc<dyn Provider>] {
        self.providers
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Categories that have at least one provider
    pub fn categories(&self) -> Vec<Category> {
        Category::FETCHABLE
            .iter()
            .copied()
            .filter(|category| !self.providers_for(*category).is_empty())
            .collect()
    }

    /// Fresh table for `category`, every entry enabled.
    ///
    /// `Unresolved` yields the category introspection table. A category
    /// without providers fails with `NoProvider`.
    pub fn resolve_table(&self, category: Category) -> Result<ProviderTable> {
        if category == Category::Unresolved {
            return Ok(Self::meta_table());
        }

        let providers = self.providers_for(category);
        if providers.is_empty() {
            return Err(MetadataError::NoProvider(category));
        }

        let entries = providers
            .iter()
            .cloned()
            .map(ProviderDescriptor::for_provider)
            .collect();

        Ok(ProviderTable::new(category, entries))
    }

    /// Resolve by category name; unknown names fail with `UnknownGetter`
    pub fn resolve_table_by_name(&self, name: &str) -> Result<ProviderTable> {
        if name.eq_ignore_ascii_case(Category::Unresolved.name()) {
            return self.resolve_table(Category::Unresolved);
        }
        let category: Category = name.parse()?;
        self.resolve_table(category)
    }

    /// Table whose entries are the categories themselves
    pub fn meta_table() -> ProviderTable {
        ProviderTable::new(
            Category::Unresolved,
            Category::FETCHABLE
                .iter()
                .copied()
                .map(ProviderDescriptor::for_category)
                .collect(),
        )
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for category in Category::FETCHABLE {
            let names: Vec<&str> = self
                .providers_for(category)
                .iter()
                .map(|provider| provider.name())
                .collect();
            if !names.is_empty() {
                map.entry(&category, &names);
            }
        }
        map.finish()
    }
}
