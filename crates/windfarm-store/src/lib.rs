//! Result store for the wind-farm analytics query layer.
//!
//! Provides read-only access to the pre-computed result files with:
//! - A registry of well-known result files scanned once at startup
//! - Columnar JSON decoding into typed records
//! - A bounded LRU cache shared by concurrent readers
//! - Per-read time budgets and sticky corrupt-source detection
//! - A startup survey of subjects, row counts and metric columns per file
//! - Case-insensitive search over column names, subjects and text values
//! - The `RecordLookup` seam plus a scripted mock for tests

pub mod cache;
pub mod codec;
pub mod error;
pub mod lookup;
pub mod reader;
pub mod registry;

pub use cache::{CacheStats, RecordCache};
pub use error::StoreError;
pub use lookup::{
    rank_hits, search_records, MissReason, MockRecordLookup, ReadOutcome, RecordLookup,
    ResultTypeStatus, SearchHit, SourceState, SourceSummary, StoreStatus,
};
pub use reader::{ResultStore, SourceLoader, StoreOptions};
pub use registry::ResultRegistry;
