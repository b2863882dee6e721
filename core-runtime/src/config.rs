//! # Core Configuration Module
//!
//! Provides configuration management for the metadata engine.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! instance that holds the host bridges and settings the engine needs. It
//! enforces fail-fast validation so a missing capability is reported before
//! the first query is executed.
//!
//! ## Required Dependencies
//!
//! - `HttpClient` - Transfer collaborator (desktop default: reqwest, enabled by
//!   the `desktop-shims` feature)
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::{CoreConfig, MetadataApiConfig, QueryDefaults};
//!
//! let config = CoreConfig::builder()
//!     .metadata_api_config(MetadataApiConfig::from_env())
//!     .query_defaults(QueryDefaults::from_json(r#"{ "number": 3, "parallel": 2 }"#)?)
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use bridge_traits::HttpClient;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Core configuration for the metadata engine.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// HTTP client used by every provider fetch
    pub http_client: Arc<dyn HttpClient>,

    /// External metadata API configuration (Last.fm, MusicBrainz)
    pub metadata_api_config: MetadataApiConfig,

    /// Defaults applied to freshly created queries
    pub query_defaults: QueryDefaults,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("http_client", &"HttpClient { ... }")
            .field("metadata_api_config", &self.metadata_api_config)
            .field("query_defaults", &self.query_defaults)
            .finish()
    }
}

/// Configuration for external metadata API services.
///
/// # Security Note
///
/// API keys should never be hardcoded in the binary. Load them from the
/// environment ([`MetadataApiConfig::from_env`]) or from the host's secure
/// configuration system.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataApiConfig {
    /// MusicBrainz user agent string (format: "AppName/Version (Contact)")
    ///
    /// MusicBrainz throttles or rejects anonymous clients.
    /// See: https://musicbrainz.org/doc/MusicBrainz_API/Rate_Limiting
    pub musicbrainz_user_agent: Option<String>,

    /// Last.fm API key; Last.fm providers are only registered when present
    ///
    /// Obtain an API key from: https://www.last.fm/api/account/create
    pub lastfm_api_key: Option<String>,

    /// Rate limit delay in milliseconds between API requests
    pub rate_limit_delay_ms: u64,
}

impl std::fmt::Debug for MetadataApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataApiConfig")
            .field("musicbrainz_user_agent", &self.musicbrainz_user_agent)
            .field(
                "lastfm_api_key",
                &self.lastfm_api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("rate_limit_delay_ms", &self.rate_limit_delay_ms)
            .finish()
    }
}

impl MetadataApiConfig {
    /// Creates a new MetadataApiConfig with no API keys configured
    pub fn new() -> Self {
        Self {
            musicbrainz_user_agent: None,
            lastfm_api_key: None,
            rate_limit_delay_ms: 1000,
        }
    }

    /// Reads `LASTFM_API_KEY` and `MUSICBRAINZ_USER_AGENT` from the environment
    pub fn from_env() -> Self {
        let mut config = Self::new();
        config.lastfm_api_key = std::env::var("LASTFM_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());
        config.musicbrainz_user_agent = std::env::var("MUSICBRAINZ_USER_AGENT")
            .ok()
            .filter(|ua| !ua.trim().is_empty());
        config
    }

    /// Sets the MusicBrainz user agent
    pub fn with_musicbrainz_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.musicbrainz_user_agent = Some(user_agent.into());
        self
    }

    /// Sets the Last.fm API key
    pub fn with_lastfm_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.lastfm_api_key = Some(api_key.into());
        self
    }

    /// Sets the rate limit delay in milliseconds
    pub fn with_rate_limit_delay_ms(mut self, delay_ms: u64) -> Self {
        self.rate_limit_delay_ms = delay_ms;
        self
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        if let Some(ref ua) = self.musicbrainz_user_agent {
            if ua.is_empty() {
                return Err(Error::Config(
                    "MusicBrainz user agent cannot be empty".to_string(),
                ));
            }
            if !ua.contains('/') || !ua.contains('(') || !ua.contains(')') {
                return Err(Error::Config(
                    "MusicBrainz user agent must follow format: 'AppName/Version (Contact)'"
                        .to_string(),
                ));
            }
        }

        if self.rate_limit_delay_ms > 60000 {
            return Err(Error::Config(
                "Rate limit delay exceeds maximum of 60 seconds (60,000ms)".to_string(),
            ));
        }

        Ok(())
    }

    /// Checks if MusicBrainz is configured
    pub fn has_musicbrainz(&self) -> bool {
        self.musicbrainz_user_agent.is_some()
    }

    /// Checks if Last.fm is configured
    pub fn has_lastfm(&self) -> bool {
        self.lastfm_api_key.is_some()
    }
}

/// Default values for a new query.
///
/// Deserializable from JSON so hosts can keep them in a settings file; every
/// field is optional in the serialized form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryDefaults {
    /// Maximum number of result items per query
    pub number: usize,
    /// Maximum number of concurrent provider fetches
    pub parallel: usize,
    /// Per-request network timeout in seconds
    pub timeout_secs: u64,
    /// Maximum redirects followed per request
    pub redirects: u32,
    /// Maximum number of providers attempted (`None` = all enabled)
    pub plugmax: Option<usize>,
    /// Log verbosity (0 = quiet .. 4 = trace)
    pub verbosity: u8,
    /// ISO 639-1 language code passed to providers that support it
    pub language: String,
    /// Accepted image formats
    pub formats: Vec<String>,
    /// Minimum cover edge in pixels, -1 for unbounded
    pub cover_min_size: i32,
    /// Maximum cover edge in pixels, -1 for unbounded
    pub cover_max_size: i32,
    /// Colourize terminal diagnostics
    pub color_output: bool,
    /// Download linked resources (e.g. image URLs) while fetching
    pub download: bool,
    /// Query providers group by group instead of all at once
    pub grouped_download: bool,
    /// Suppress duplicate result items
    pub duplicate_check: bool,
    /// Tolerance used by providers when matching names
    pub fuzzyness: u32,
}

impl Default for QueryDefaults {
    fn default() -> Self {
        Self {
            number: 1,
            parallel: 4,
            timeout_secs: 20,
            redirects: 1,
            plugmax: None,
            verbosity: 0,
            language: "en".to_string(),
            formats: vec!["jpeg".to_string(), "jpg".to_string(), "png".to_string()],
            cover_min_size: 125,
            cover_max_size: -1,
            color_output: true,
            download: true,
            grouped_download: true,
            duplicate_check: true,
            fuzzyness: 4,
        }
    }
}

impl QueryDefaults {
    /// Parse defaults from a JSON document and validate them
    pub fn from_json(json: &str) -> Result<Self> {
        let defaults: Self = serde_json::from_str(json)
            .map_err(|e| Error::Config(format!("Invalid query defaults: {}", e)))?;
        defaults.validate()?;
        Ok(defaults)
    }

    /// Validates the defaults
    pub fn validate(&self) -> Result<()> {
        if self.number == 0 {
            return Err(Error::Config("Result number must be at least 1".to_string()));
        }

        if self.parallel == 0 {
            return Err(Error::Config("Parallelism must be at least 1".to_string()));
        }

        if self.timeout_secs == 0 {
            return Err(Error::Config(
                "Timeout must be greater than 0 seconds".to_string(),
            ));
        }

        if self.language.trim().is_empty() {
            return Err(Error::Config("Language cannot be empty".to_string()));
        }

        if self.cover_min_size < -1 || self.cover_max_size < -1 {
            return Err(Error::Config(
                "Cover size bounds must be -1 (unbounded) or positive".to_string(),
            ));
        }

        if self.cover_max_size >= 0 && self.cover_min_size > self.cover_max_size {
            return Err(Error::Config(format!(
                "Cover minimum size {} exceeds maximum {}",
                self.cover_min_size, self.cover_max_size
            )));
        }

        Ok(())
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        self.metadata_api_config.validate()?;
        self.query_defaults.validate()
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn http_client_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: "HttpClient implementation is required for provider fetches. \
                 Desktop: ensure the 'desktop-shims' feature is enabled to use the default ReqwestHttpClient. \
                 Tests: inject a fake client with .http_client()."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client(api: &MetadataApiConfig) -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::{ReqwestHttpClient, DEFAULT_USER_AGENT};

    let user_agent = api
        .musicbrainz_user_agent
        .as_deref()
        .unwrap_or(DEFAULT_USER_AGENT);

    let client = ReqwestHttpClient::with_user_agent(user_agent).map_err(|e| {
        Error::Internal(format!("Failed to initialize default HttpClient: {}", e))
    })?;

    let client: Arc<dyn HttpClient> = Arc::new(client);
    Ok(client)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client(_api: &MetadataApiConfig) -> Result<Arc<dyn HttpClient>> {
    Err(http_client_missing_error())
}

/// Builder for constructing [`CoreConfig`] instances.
#[derive(Default)]
pub struct CoreConfigBuilder {
    http_client: Option<Arc<dyn HttpClient>>,
    metadata_api_config: Option<MetadataApiConfig>,
    query_defaults: Option<QueryDefaults>,
}

impl CoreConfigBuilder {
    /// Sets the HTTP client implementation.
    ///
    /// If not provided, the desktop default (reqwest-based) will be used when
    /// the `desktop-shims` feature is enabled.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Sets the metadata API configuration.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// use core_runtime::config::{CoreConfig, MetadataApiConfig};
    ///
    /// let api_config = MetadataApiConfig::new()
    ///     .with_musicbrainz_user_agent("MyApp/1.0 (contact@example.com)")
    ///     .with_lastfm_api_key("your_api_key");
    ///
    /// let builder = CoreConfig::builder()
    ///     .metadata_api_config(api_config);
    /// ```
    pub fn metadata_api_config(mut self, config: MetadataApiConfig) -> Self {
        self.metadata_api_config = Some(config);
        self
    }

    /// Sets the defaults used for new queries.
    pub fn query_defaults(mut self, defaults: QueryDefaults) -> Self {
        self.query_defaults = Some(defaults);
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// # Returns
    ///
    /// Returns `Ok(CoreConfig)` on success, or an error if:
    /// - No HTTP client was provided and no desktop default is available
    /// - Configuration values are invalid
    pub fn build(self) -> Result<CoreConfig> {
        let metadata_api_config = self
            .metadata_api_config
            .unwrap_or_else(MetadataApiConfig::new);

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client(&metadata_api_config)?,
        };

        let config = CoreConfig {
            http_client,
            metadata_api_config,
            query_defaults: self.query_defaults.unwrap_or_default(),
        };

        config.validate()?;

        Ok(config)
    }
}
