//! Workspace facade crate.
//!
//! Re-exports the metadata engine together with the runtime configuration and
//! bridge traits it needs, so host applications can depend on `tunefetch`
//! alone. The `desktop-shims` feature (on by default) wires the reqwest-based
//! HTTP client into [`CoreConfig`].

pub use bridge_traits;
pub use core_metadata;
pub use core_runtime;

pub use bridge_traits::http::{HttpClient, RetryPolicy};
pub use core_metadata::{
    init_query_logging, sink, version, CacheList, Category, ErrorCode, Flow, Group, GroupMask,
    ItemObserver, MetadataEngine, MetadataError, Provider, ProviderRegistry, Query, ResultItem,
};
pub use core_runtime::config::{CoreConfig, MetadataApiConfig, QueryDefaults};
pub use core_runtime::logging::{init_logging, LoggingConfig};
