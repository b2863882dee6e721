//! # Music Metadata Engine
//!
//! Fetches cover art, lyrics, artist photos, biographies, similar artists,
//! reviews, tags, relations, album lists and track lists from pluggable
//! web providers.
//!
//! ## Overview
//!
//! - [`Query`] carries what to look for and how (limits, filters, direct call,
//!   observer, cancellation)
//! - [`ProviderRegistry`] maps every [`Category`] to its providers and resolves
//!   a fresh [`ProviderTable`] per query
//! - The selector language (`"-all +lyrics +fast"`) enables and disables
//!   table entries by name or capability group
//! - [`MetadataEngine::execute`] runs the category's [`FetchPipeline`] and
//!   returns a [`CacheList`] of [`ResultItem`]s
//! - [`sink::write_out`] writes an item to `stdout`, `stderr`, `null` or a file
//!
//! ## Usage
//!
//! ```ignore
//! use core_metadata::{Category, MetadataEngine, Query};
//!
//! let engine = MetadataEngine::from_config(&config)?;
//!
//! let mut query = Query::new();
//! query.set_category(Category::Lyric)?;
//! query.set_artist("Porcupine Tree");
//! query.set_title("Trains");
//! engine.apply_selector(&mut query, "-all +lrclib")?;
//!
//! if let Some(results) = engine.execute(&mut query).await? {
//!     for item in results.iter() {
//!         core_metadata::sink::write_out(item, "stdout");
//!     }
//! }
//! ```

pub mod cache;
pub mod category;
pub mod dispatcher;
pub mod error;
pub mod group;
pub mod observer;
pub mod pipeline;
pub mod provider;
pub mod providers;
pub mod query;
pub mod registry;
pub mod selector;
pub mod sink;
pub mod transfer;

pub use cache::{CacheList, ItemKind, ResultItem};
pub use category::Category;
pub use dispatcher::{MetadataEngine, MetadataEngineBuilder};
pub use error::{ErrorCode, MetadataError, Result};
pub use group::{Group, GroupMask};
pub use observer::{Flow, ItemObserver};
pub use pipeline::{FetchPipeline, StandardPipeline};
pub use provider::{ParseContext, Provider, ProviderDescriptor, ProviderTable};
pub use query::{DirectCall, Query};
pub use registry::ProviderRegistry;
pub use selector::{apply_selector, Selector};
pub use sink::{write_out, OutputTarget};
pub use transfer::Transfer;

const CODENAME: &str = "Tunefetch";

/// Human readable build identity, e.g. `Version 0.1.0 (Tunefetch)`
pub fn version() -> String {
    format!("Version {} ({})", env!("CARGO_PKG_VERSION"), CODENAME)
}

/// Install the global subscriber at the query's verbosity and color setting.
///
/// Fails if a subscriber is already installed.
pub fn init_query_logging(query: &Query) -> core_runtime::Result<()> {
    core_runtime::logging::init_logging(query.logging_config())
}
