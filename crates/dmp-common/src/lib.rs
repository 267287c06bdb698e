//! DMP Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, utilities, and error handling for the DMP project.
//!
//! # Overview
//!
//! This crate provides common functionality used across all DMP workspace members:
//!
//! - **Error Handling**: Custom error types and result types
//! - **Types**: Disaster events, data sources, and sync result structures
//! - **Audit**: Audit trail entry types emitted by the sync core
//! - **Logging**: Centralized tracing configuration
//!
//! # Example
//!
//! ```no_run
//! use dmp_common::{Result, DmpError};
//! use dmp_common::config::SyncConfig;
//!
//! fn media_path(relative: &str) -> Result<std::path::PathBuf> {
//!     let config = SyncConfig::from_env()?;
//!     Ok(config.resolve(relative))
//! }
//! ```

pub mod audit;
pub mod config;
pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{DmpError, Result};
