//! # Host Bridge Traits
//!
//! Platform abstraction traits that the metadata core consumes but does not
//! implement itself.
//!
//! ## Overview
//!
//! The provider engine never talks to the network or to a host logger
//! directly. Instead it goes through the narrow contracts defined here, so a
//! desktop build can plug in `reqwest` while tests plug in canned responses.
//!
//! ## Traits
//!
//! - [`HttpClient`](http::HttpClient) - Async HTTP transfer honouring per-request
//!   timeout and redirect limits
//! - [`LoggerSink`](logging::LoggerSink) - Forward structured logs to host logging
//!
//! ## Platform Requirements
//!
//! | Platform | Implementation Crate | Status |
//! |----------|---------------------|--------|
//! | Desktop  | `bridge-desktop`    | ✅ Available |
//! | Tests    | hand-written fakes  | ✅ Available |
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type. Platform
//! implementations should convert their native errors and include enough
//! context (URL, limit that was hit) to make the failure actionable.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so a single client can serve many
//! concurrent provider fetches.
//!
//! ## Examples
//!
//! ### Implementing HttpClient
//!
//! ```ignore
//! use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
//! use bridge_traits::error::Result;
//! use async_trait::async_trait;
//!
//! pub struct CannedClient;
//!
//! #[async_trait]
//! impl HttpClient for CannedClient {
//!     async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
//!         Ok(HttpResponse::ok(format!("fetched {}", request.url)))
//!     }
//! }
//! ```

pub mod error;
pub mod http;
pub mod logging;

pub use error::BridgeError;

// Re-export commonly used types
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
pub use logging::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
