//! # Query Configuration
//!
//! A [`Query`] holds every parameter of one metadata request. String fields
//! are owned copies, released on overwrite and on [`Query::reset`]. The query
//! also owns its provider table (once resolved or filtered), its observer
//! hook and its cancellation token.
//!
//! ## Usage
//!
//! ```ignore
//! use core_metadata::{Category, Query};
//!
//! let mut query = Query::new();
//! query.set_category(Category::Lyric)?;
//! query.set_artist("Opeth");
//! query.set_title("Windowpane");
//! query.set_number(2);
//! ```

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use core_runtime::config::QueryDefaults;
use core_runtime::logging::{level_for_verbosity, LoggingConfig};
use tokio_util::sync::CancellationToken;

use crate::category::Category;
use crate::error::{MetadataError, Result};
use crate::observer::ItemObserver;
use crate::provider::ProviderTable;

/// Direct-call override: target one named provider, optionally with a fixed URL
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectCall {
    pub enabled: bool,
    pub provider: Option<String>,
    pub url: Option<String>,
}

pub struct Query {
    artist: Option<String>,
    album: Option<String>,
    title: Option<String>,
    category: Category,

    number: usize,
    parallel: usize,
    timeout: Duration,
    redirects: u32,
    plugmax: Option<usize>,
    verbosity: u8,
    language: String,
    formats: Vec<String>,
    cover_min_size: Option<u32>,
    cover_max_size: Option<u32>,

    color_output: bool,
    download: bool,
    grouped_download: bool,
    duplicate_check: bool,
    fuzzyness: u32,

    direct: DirectCall,
    observer: Option<Arc<dyn ItemObserver>>,
    cancellation: CancellationToken,
    providers: Option<ProviderTable>,
    item_counter: AtomicUsize,
    seed: QueryDefaults,
}

impl Query {
    /// A query with built-in defaults
    pub fn new() -> Self {
        Self::from_defaults(&QueryDefaults::default())
    }

    /// A query seeded from configuration
    pub fn from_defaults(defaults: &QueryDefaults) -> Self {
        Self {
            artist: None,
            album: None,
            title: None,
            category: Category::Unresolved,
            number: defaults.number,
            parallel: defaults.parallel.max(1),
            timeout: Duration::from_secs(defaults.timeout_secs),
            redirects: defaults.redirects,
            plugmax: defaults.plugmax,
            verbosity: defaults.verbosity,
            language: defaults.language.clone(),
            formats: defaults
                .formats
                .iter()
                .map(|format| format.to_ascii_lowercase())
                .collect(),
            cover_min_size: size_bound(defaults.cover_min_size),
            cover_max_size: size_bound(defaults.cover_max_size),
            color_output: defaults.color_output,
            download: defaults.download,
            grouped_download: defaults.grouped_download,
            duplicate_check: defaults.duplicate_check,
            fuzzyness: defaults.fuzzyness,
            direct: DirectCall::default(),
            observer: None,
            cancellation: CancellationToken::new(),
            providers: None,
            item_counter: AtomicUsize::new(0),
            seed: defaults.clone(),
        }
    }

    /// Release every owned value and return to the defaults the query was
    /// created from.
    ///
    /// Calling this twice is the same as calling it once.
    pub fn reset(&mut self) {
        let seed = std::mem::take(&mut self.seed);
        *self = Self::from_defaults(&seed);
    }

    /// Logging setup matching the query's verbosity and color flag
    pub fn logging_config(&self) -> LoggingConfig {
        LoggingConfig::default()
            .with_level(level_for_verbosity(self.verbosity))
            .with_ansi(self.color_output)
    }

    // ------------------------------------------------------------------
    // Identity
    // ------------------------------------------------------------------

    pub fn artist(&self) -> Option<&str> {
        self.artist.as_deref()
    }

    pub fn album(&self) -> Option<&str> {
        self.album.as_deref()
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn set_artist(&mut self, artist: impl Into<String>) {
        self.artist = Some(artist.into());
    }

    pub fn set_album(&mut self, album: impl Into<String>) {
        self.album = Some(album.into());
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = Some(title.into());
    }

    pub fn category(&self) -> Category {
        self.category
    }

    /// Select what to fetch. `Unresolved` is not a fetchable category.
    ///
    /// Switching to another category drops a provider table resolved for the
    /// previous one.
    pub fn set_category(&mut self, category: Category) -> Result<()> {
        if category == Category::Unresolved {
            return Err(MetadataError::BadValue(
                "category 'unresolved' cannot be fetched".to_string(),
            ));
        }

        if self
            .providers
            .as_ref()
            .is_some_and(|table| table.category() != category)
        {
            self.providers = None;
        }
        self.category = category;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Limits
    // ------------------------------------------------------------------

    pub fn number(&self) -> usize {
        self.number
    }

    pub fn set_number(&mut self, number: usize) {
        self.number = number;
    }

    pub fn parallel(&self) -> usize {
        self.parallel
    }

    /// Maximum concurrent fetches; zero is treated as one
    pub fn set_parallel(&mut self, parallel: usize) {
        self.parallel = parallel.max(1);
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    pub fn redirects(&self) -> u32 {
        self.redirects
    }

    pub fn set_redirects(&mut self, redirects: u32) {
        self.redirects = redirects;
    }

    /// Maximum number of providers attempted; `None` tries all of them
    pub fn plugmax(&self) -> Option<usize> {
        self.plugmax
    }

    pub fn set_plugmax(&mut self, plugmax: i64) -> Result<()> {
        let value = usize::try_from(plugmax).map_err(|_| {
            MetadataError::BadValue(format!("plugmax must not be negative, got {}", plugmax))
        })?;
        self.plugmax = Some(value);
        Ok(())
    }

    pub fn cover_min_size(&self) -> Option<u32> {
        self.cover_min_size
    }

    pub fn cover_max_size(&self) -> Option<u32> {
        self.cover_max_size
    }

    /// Smallest accepted image edge; `-1` removes the bound.
    ///
    /// Values below `-1` remove the bound as well but report `BadValue`.
    pub fn set_cover_min_size(&mut self, size: i64) -> Result<()> {
        set_size(&mut self.cover_min_size, size)
    }

    /// Largest accepted image edge; same conventions as the minimum
    pub fn set_cover_max_size(&mut self, size: i64) -> Result<()> {
        set_size(&mut self.cover_max_size, size)
    }

    // ------------------------------------------------------------------
    // Behaviour
    // ------------------------------------------------------------------

    pub fn verbosity(&self) -> u8 {
        self.verbosity
    }

    pub fn set_verbosity(&mut self, verbosity: u8) {
        self.verbosity = verbosity;
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn set_language(&mut self, language: &str) -> Result<()> {
        let language = language.trim();
        if language.is_empty() {
            return Err(MetadataError::BadValue("language must not be empty".to_string()));
        }
        self.language = language.to_ascii_lowercase();
        Ok(())
    }

    /// Accepted formats, lowercase
    pub fn formats(&self) -> &[String] {
        &self.formats
    }

    /// Accept formats from a `;`, `,` or whitespace separated list
    pub fn set_formats(&mut self, formats: &str) -> Result<()> {
        let parsed: Vec<String> = formats
            .split(|c: char| c == ';' || c == ',' || c.is_whitespace())
            .filter(|format| !format.is_empty())
            .map(|format| format.to_ascii_lowercase())
            .collect();

        if parsed.is_empty() {
            return Err(MetadataError::BadValue("format list must not be empty".to_string()));
        }
        self.formats = parsed;
        Ok(())
    }

    /// Whether `format` passes the format filter
    pub fn accepts_format(&self, format: &str) -> bool {
        self.formats
            .iter()
            .any(|accepted| accepted.eq_ignore_ascii_case(format))
    }

    pub fn color_output(&self) -> bool {
        self.color_output
    }

    pub fn set_color_output(&mut self, color: bool) {
        self.color_output = color;
    }

    /// Whether link items are replaced by the downloaded payload
    pub fn download(&self) -> bool {
        self.download
    }

    pub fn set_download(&mut self, download: bool) {
        self.download = download;
    }

    pub fn grouped_download(&self) -> bool {
        self.grouped_download
    }

    pub fn set_grouped_download(&mut self, grouped: bool) {
        self.grouped_download = grouped;
    }

    pub fn duplicate_check(&self) -> bool {
        self.duplicate_check
    }

    pub fn set_duplicate_check(&mut self, check: bool) {
        self.duplicate_check = check;
    }

    pub fn fuzzyness(&self) -> u32 {
        self.fuzzyness
    }

    pub fn set_fuzzyness(&mut self, fuzzyness: u32) {
        self.fuzzyness = fuzzyness;
    }

    // ------------------------------------------------------------------
    // Direct call
    // ------------------------------------------------------------------

    pub fn direct(&self) -> &DirectCall {
        &self.direct
    }

    pub fn set_direct_use(&mut self, enabled: bool) {
        self.direct.enabled = enabled;
    }

    pub fn set_direct_provider(&mut self, provider: &str) -> Result<()> {
        self.direct.provider = Some(non_empty(provider, "direct provider")?);
        Ok(())
    }

    pub fn set_direct_url(&mut self, url: &str) -> Result<()> {
        self.direct.url = Some(non_empty(url, "direct url")?);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Observer & cancellation
    // ------------------------------------------------------------------

    pub fn observer(&self) -> Option<&Arc<dyn ItemObserver>> {
        self.observer.as_ref()
    }

    pub fn set_observer<O>(&mut self, observer: O)
    where
        O: ItemObserver + 'static,
    {
        self.observer = Some(Arc::new(observer));
    }

    pub fn clear_observer(&mut self) {
        self.observer = None;
    }

    /// Token cancelling every transfer started on behalf of this query
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn set_cancellation_token(&mut self, token: CancellationToken) {
        self.cancellation = token;
    }

    // ------------------------------------------------------------------
    // Provider table
    // ------------------------------------------------------------------

    pub fn providers(&self) -> Option<&ProviderTable> {
        self.providers.as_ref()
    }

    pub fn providers_mut(&mut self) -> Option<&mut ProviderTable> {
        self.providers.as_mut()
    }

    /// Replace the provider table, dropping the previous one
    pub fn set_providers(&mut self, table: Option<ProviderTable>) {
        self.providers = table;
    }

    // ------------------------------------------------------------------
    // Item counter
    // ------------------------------------------------------------------

    /// Count one accepted item, returning the new total
    pub fn record_item(&self) -> usize {
        self.item_counter.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn item_count(&self) -> usize {
        self.item_counter.load(Ordering::SeqCst)
    }

    pub fn reset_item_counter(&self) {
        self.item_counter.store(0, Ordering::SeqCst);
    }

    // ------------------------------------------------------------------
    // Textual options
    // ------------------------------------------------------------------

    /// Set an option by name, as read from a command line or config file.
    ///
    /// Unknown names fail with `BadOption`, unparsable values with `BadValue`.
    /// The selector option `from` needs the provider registry and is handled
    /// by `MetadataEngine::apply_option`.
    pub fn apply_option(&mut self, name: &str, value: &str) -> Result<()> {
        match name.trim().to_ascii_lowercase().as_str() {
            "artist" => self.set_artist(value),
            "album" => self.set_album(value),
            "title" => self.set_title(value),
            "type" | "category" | "get" => {
                let category = value
                    .parse::<Category>()
                    .map_err(|_| MetadataError::BadValue(format!("unknown category '{}'", value)))?;
                self.set_category(category)?;
            }
            "number" => self.set_number(parse_value(name, value)?),
            "parallel" => self.set_parallel(parse_value(name, value)?),
            "timeout" => self.set_timeout(Duration::from_secs(parse_value(name, value)?)),
            "redirects" => self.set_redirects(parse_value(name, value)?),
            "plugmax" => self.set_plugmax(parse_value(name, value)?)?,
            "verbosity" => self.set_verbosity(parse_value(name, value)?),
            "lang" | "language" => self.set_language(value)?,
            "formats" => self.set_formats(value)?,
            "cminsize" => self.set_cover_min_size(parse_value(name, value)?)?,
            "cmaxsize" => self.set_cover_max_size(parse_value(name, value)?)?,
            "color" => self.set_color_output(parse_bool(name, value)?),
            "download" => self.set_download(parse_bool(name, value)?),
            "groupeddl" | "grouped-download" => self.set_grouped_download(parse_bool(name, value)?),
            "duplcheck" | "duplicate-check" => self.set_duplicate_check(parse_bool(name, value)?),
            "fuzzyness" => self.set_fuzzyness(parse_value(name, value)?),
            "direct-use" => self.set_direct_use(parse_bool(name, value)?),
            "direct-provider" => self.set_direct_provider(value)?,
            "direct-url" => self.set_direct_url(value)?,
            _ => return Err(MetadataError::BadOption(name.to_string())),
        }
        Ok(())
    }
}

impl Default for Query {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("artist", &self.artist)
            .field("album", &self.album)
            .field("title", &self.title)
            .field("category", &self.category)
            .field("number", &self.number)
            .field("parallel", &self.parallel)
            .field("timeout", &self.timeout)
            .field("redirects", &self.redirects)
            .field("plugmax", &self.plugmax)
            .field("language", &self.language)
            .field("formats", &self.formats)
            .field("cover_min_size", &self.cover_min_size)
            .field("cover_max_size", &self.cover_max_size)
            .field("direct", &self.direct)
            .field("observer", &self.observer.is_some())
            .field("providers", &self.providers.as_ref().map(ProviderTable::len))
            .field("item_count", &self.item_count())
            .finish()
    }
}

fn size_bound(size: i32) -> Option<u32> {
    u32::try_from(size).ok()
}

fn set_size(slot: &mut Option<u32>, size: i64) -> Result<()> {
    if size < -1 {
        *slot = None;
        return Err(MetadataError::BadValue(format!(
            "size must be -1 or positive, got {}",
            size
        )));
    }

    *slot = u32::try_from(size).ok();
    Ok(())
}

fn non_empty(value: &str, what: &str) -> Result<String> {
    if value.trim().is_empty() {
        return Err(MetadataError::BadValue(format!("{} must not be empty", what)));
    }
    Ok(value.to_string())
}

fn parse_value<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| MetadataError::BadValue(format!("invalid value '{}' for '{}'", value, name)))
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(MetadataError::BadValue(format!(
            "invalid value '{}' for '{}'",
            value, name
        ))),
    }
}
