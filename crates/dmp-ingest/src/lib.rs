//! DMP Ingest Library
//!
//! File-ingestion and normalization pipeline for the disaster
//! monitoring platform: reads uploaded CSV/JSON/XML/TXT files with
//! unknown schemas, maps their fields onto the canonical disaster
//! event schema, and upserts events with per-row error reporting.
//!
//! # Pipeline
//!
//! - **reader**: per-format parsers producing loosely-typed records
//! - **normalize**: alias mapping and type coercion into canonical fields
//! - **store**: collaborator traits for event and audit persistence
//! - **sync**: single-source and batch sync orchestration
//!
//! # Example
//!
//! ```no_run
//! use dmp_common::config::SyncConfig;
//! use dmp_common::types::{DataSource, SourceType};
//! use dmp_ingest::store::MemoryStore;
//! use dmp_ingest::sync::SyncManager;
//!
//! let manager = SyncManager::new(SyncConfig::from_env().unwrap());
//! let mut source = DataSource::new("uploads", SourceType::Csv, "uploads/events.csv");
//! let mut store = MemoryStore::new();
//!
//! let outcome = manager.sync_data_source(&mut source, &mut store, Some("admin"));
//! println!("{} records, {} errors", outcome.records_processed, outcome.errors.len());
//! ```

pub mod normalize;
pub mod reader;
pub mod store;
pub mod sync;

// Re-export commonly used types
pub use reader::{read_file, FileFormat, RawRecord};
pub use store::{AuditSink, EventStore, MemoryStore};
pub use sync::SyncManager;
