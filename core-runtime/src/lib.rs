//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the metadata engine:
//! - Logging and tracing infrastructure
//! - Configuration management (bridges, API credentials, query defaults)
//!
//! ## Overview
//!
//! This crate contains the runtime utilities that `core-metadata` depends on.
//! It establishes the logging conventions and the fail-fast configuration
//! builder used to wire host capabilities into the engine.

pub mod config;
pub mod error;
pub mod logging;

pub use error::{Error, Result};
