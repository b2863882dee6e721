//! # Execution Dispatcher
//!
//! [`MetadataEngine`] routes a [`Query`] either through the category's fetch
//! pipeline or, when the direct-call override is enabled, straight to one
//! named provider.
//!
//! ## Usage
//!
//! ```ignore
//! use core_metadata::{Category, MetadataEngine, Query};
//! use core_runtime::config::CoreConfig;
//!
//! let config = CoreConfig::builder().build()?;
//! let engine = MetadataEngine::from_config(&config)?;
//!
//! let mut query = Query::from_defaults(&config.query_defaults);
//! query.set_category(Category::Lyric)?;
//! query.set_artist("Opeth");
//! query.set_title("Windowpane");
//! engine.apply_selector(&mut query, "-all +lrclib")?;
//!
//! if let Some(results) = engine.execute(&mut query).await? {
//!     for item in &results {
//!         println!("{}", item.as_text().unwrap_or_default());
//!     }
//! }
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bridge_traits::http::{HttpClient, RetryPolicy};
use core_runtime::config::{CoreConfig, MetadataApiConfig};
use core_runtime::logging::redact_url;
use tracing::{debug, info, instrument, warn};

use crate::cache::{CacheList, ResultItem};
use crate::category::Category;
use crate::error::{MetadataError, Result};
use crate::pipeline::{fetch_and_parse, FetchPipeline, StandardPipeline};
use crate::query::Query;
use crate::registry::ProviderRegistry;
use crate::selector;
use crate::transfer::Transfer;

/// Source name given to items produced by [`MetadataEngine::download`]
const DOWNLOAD_SOURCE: &str = "download";

pub struct MetadataEngine {
    registry: ProviderRegistry,
    transfer: Transfer,
    pipelines: HashMap<Category, Arc<dyn FetchPipeline>>,
}

impl MetadataEngine {
    pub fn builder() -> MetadataEngineBuilder {
        MetadataEngineBuilder::default()
    }

    /// Engine with the built-in providers, wired from runtime configuration
    pub fn from_config(config: &CoreConfig) -> Result<Self> {
        config.validate()?;
        Self::builder()
            .http_client(Arc::clone(&config.http_client))
            .api_config(config.metadata_api_config.clone())
            .build()
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Replace the pipeline used for `category`
    pub fn set_pipeline(&mut self, category: Category, pipeline: Arc<dyn FetchPipeline>) {
        self.pipelines.insert(category, pipeline);
    }

    /// Filter the query's providers with a selector expression.
    ///
    /// See [`crate::selector`] for the syntax.
    pub fn apply_selector(&self, query: &mut Query, expression: &str) -> Result<()> {
        selector::apply_selector(&self.registry, query, expression)
    }

    /// Set a query option by name; `from` is the selector expression
    pub fn apply_option(&self, query: &mut Query, name: &str, value: &str) -> Result<()> {
        if name.trim().eq_ignore_ascii_case("from") {
            return self.apply_selector(query, value);
        }
        query.apply_option(name, value)
    }

    /// Run the query.
    ///
    /// Returns `Ok(None)` when nothing was found; an empty list is never
    /// returned. The query's item counter is zero again afterwards.
    #[instrument(skip(self, query), fields(category = %query.category()))]
    pub async fn execute(&self, query: &mut Query) -> Result<Option<CacheList>> {
        if query.direct().enabled {
            return Ok(self.direct_call(query).await);
        }

        if query.providers().is_none() {
            let table = self.registry.resolve_table(query.category())?;
            query.set_providers(Some(table));
        }

        let pipeline = self
            .pipelines
            .get(&query.category())
            .cloned()
            .ok_or_else(|| MetadataError::UnknownGetter(query.category().name().to_string()))?;

        let query: &Query = query;
        let result = match query.providers() {
            Some(table) => pipeline.fetch(query, table).await,
            None => Err(MetadataError::NoProvider(query.category())),
        };
        query.reset_item_counter();

        let list = result?;
        if list.is_empty() {
            info!("No results");
        }
        Ok(list.into_non_empty())
    }

    /// Ask exactly one provider, named by the query's direct-call override.
    ///
    /// No group filtering, no parallelism, no fallback. Returns `None` when
    /// the provider is unknown, the URL cannot be built, the download fails
    /// or nothing was parsed.
    pub async fn direct_call(&self, query: &Query) -> Option<CacheList> {
        let Some(name) = query.direct().provider.as_deref() else {
            debug!("Direct call without provider name");
            return None;
        };

        let table = self.registry.resolve_table(query.category()).ok()?;
        let Some(descriptor) = table.find(name) else {
            debug!(
                provider = %name,
                category = %query.category(),
                "Direct call to unknown provider"
            );
            return None;
        };
        let provider = descriptor.provider.as_deref()?;

        let url = match query.direct().url.as_deref() {
            Some(url) => url.to_string(),
            None => provider.build_url(query)?,
        };

        info!(provider = %descriptor.name, url = %redact_url(&url), "Direct call");

        let cancel = query.cancellation_token();
        match fetch_and_parse(&self.transfer, provider, &url, query, cancel).await? {
            Ok(items) => items.into_iter().collect::<CacheList>().into_non_empty(),
            Err(err) => {
                warn!(provider = %descriptor.name, error = %err, "Direct call parse failed");
                None
            }
        }
    }

    /// Download a single URL with the query's network limits.
    ///
    /// Cancellation through the query's token is reported as
    /// `StoppedByCallback`; any other failure is `Ok(None)`.
    pub async fn download(&self, url: &str, query: &Query) -> Result<Option<ResultItem>> {
        match self
            .transfer
            .fetch(url, query, query.cancellation_token())
            .await
        {
            Ok(data) => Ok(Some(
                ResultItem::binary(query.category(), DOWNLOAD_SOURCE, data).with_source_url(url),
            )),
            Err(MetadataError::StoppedByCallback) => Err(MetadataError::StoppedByCallback),
            Err(err) => {
                debug!(url = %redact_url(url), error = %err, "Download failed");
                Ok(None)
            }
        }
    }
}

impl std::fmt::Debug for MetadataEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut pipelines: Vec<&str> = self.pipelines.keys().map(Category::name).collect();
        pipelines.sort_unstable();
        f.debug_struct("MetadataEngine")
            .field("registry", &self.registry)
            .field("pipelines", &pipelines)
            .finish_non_exhaustive()
    }
}

/// Builder for [`MetadataEngine`]
#[derive(Default)]
pub struct MetadataEngineBuilder {
    http_client: Option<Arc<dyn HttpClient>>,
    api_config: Option<MetadataApiConfig>,
    registry: Option<ProviderRegistry>,
    retry_policy: Option<RetryPolicy>,
    pipelines: HashMap<Category, Arc<dyn FetchPipeline>>,
}

impl MetadataEngineBuilder {
    /// HTTP client used for every transfer (required)
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// API keys and rate limit for the built-in providers
    pub fn api_config(mut self, config: MetadataApiConfig) -> Self {
        self.api_config = Some(config);
        self
    }

    /// Use a custom registry instead of the built-in providers
    pub fn registry(mut self, registry: ProviderRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    /// Override the pipeline of one category
    pub fn pipeline(mut self, category: Category, pipeline: Arc<dyn FetchPipeline>) -> Self {
        self.pipelines.insert(category, pipeline);
        self
    }

    pub fn build(self) -> Result<MetadataEngine> {
        let http_client = self.http_client.ok_or_else(|| {
            MetadataError::EmptyConfig("an HTTP client is required to build the engine".to_string())
        })?;

        let api_config = self.api_config.unwrap_or_default();
        api_config.validate()?;

        let mut transfer = Transfer::new(http_client)
            .with_rate_limit(Duration::from_millis(api_config.rate_limit_delay_ms));
        if let Some(policy) = self.retry_policy {
            transfer = transfer.with_retry_policy(policy);
        }

        let registry = self
            .registry
            .unwrap_or_else(|| ProviderRegistry::with_defaults(&api_config));

        let standard: Arc<dyn FetchPipeline> = Arc::new(StandardPipeline::new(transfer.clone()));
        let mut pipelines: HashMap<Category, Arc<dyn FetchPipeline>> = Category::FETCHABLE
            .iter()
            .map(|category| (*category, Arc::clone(&standard)))
            .collect();
        pipelines.extend(self.pipelines);

        debug!(registry = ?registry, "Metadata engine ready");

        Ok(MetadataEngine {
            registry,
            transfer,
            pipelines,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::http::{HttpRequest, HttpResponse};
    use mockall::mock;

    mock! {
        Client {}

        #[async_trait]
        impl HttpClient for Client {
            async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
        }
    }

    #[test]
    fn test_builder_requires_http_client() {
        let result = MetadataEngine::builder().build();
        assert!(matches!(result, Err(MetadataError::EmptyConfig(_))));
    }

    #[test]
    fn test_builder_wires_every_category() {
        let engine = MetadataEngine::builder()
            .http_client(Arc::new(MockClient::new()))
            .build()
            .unwrap();

        for category in Category::FETCHABLE {
            assert!(engine.pipelines.contains_key(&category));
        }
        assert!(!engine.pipelines.contains_key(&Category::Unresolved));
    }

    #[tokio::test]
    async fn test_unresolved_category_is_unknown_getter() {
        let mut client = MockClient::new();
        client.expect_execute().times(0);
        let engine = MetadataEngine::builder()
            .http_client(Arc::new(client))
            .build()
            .unwrap();

        let mut query = Query::new();
        let result = engine.execute(&mut query).await;

        assert!(matches!(result, Err(MetadataError::UnknownGetter(_))));
    }

    #[tokio::test]
    async fn test_download_wraps_body() {
        let mut client = MockClient::new();
        client
            .expect_execute()
            .returning(|_| Ok(HttpResponse::ok("payload")));
        let engine = MetadataEngine::builder()
            .http_client(Arc::new(client))
            .build()
            .unwrap();

        let item = engine
            .download("https://example.com/a.jpg", &Query::new())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(item.as_text(), Some("payload"));
        assert_eq!(item.source, DOWNLOAD_SOURCE);
        assert_eq!(item.source_url.as_deref(), Some("https://example.com/a.jpg"));
    }

    #[tokio::test]
    async fn test_download_reports_cancellation() {
        let engine = MetadataEngine::builder()
            .http_client(Arc::new(MockClient::new()))
            .build()
            .unwrap();

        let query = Query::new();
        query.cancellation_token().cancel();

        let result = engine.download("https://example.com/a.jpg", &query).await;
        assert!(matches!(result, Err(MetadataError::StoppedByCallback)));
    }

    #[tokio::test]
    async fn test_apply_option_routes_from_to_selector() {
        let engine = MetadataEngine::builder()
            .http_client(Arc::new(MockClient::new()))
            .build()
            .unwrap();

        let mut query = Query::new();
        engine.apply_option(&mut query, "type", "lyrics").unwrap();
        engine.apply_option(&mut query, "from", "-all +lrclib").unwrap();

        let table = query.providers().unwrap();
        assert_eq!(table.category(), Category::Lyric);
        assert_eq!(table.enabled_names(), vec!["lrclib"]);
    }
}
