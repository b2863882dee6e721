//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `HttpClient` using `reqwest`, with manual redirect following so the
//!   per-query redirect cap is honoured exactly
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::ReqwestHttpClient;
//! use std::sync::Arc;
//!
//! let http_client = Arc::new(ReqwestHttpClient::new()?);
//! let config = core_runtime::config::CoreConfig::builder()
//!     .http_client(http_client)
//!     .build()?;
//! ```

mod http;

pub use http::{ReqwestHttpClient, DEFAULT_USER_AGENT};
