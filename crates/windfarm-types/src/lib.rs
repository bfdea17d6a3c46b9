//! # windfarm-types
//!
//! Shared domain types for the wind-farm analytics query layer.
//!
//! This crate defines the data structures passed between the routing engine,
//! the result store and the query service:
//! - Subjects: canonical wind-farm identifiers (`wf1`..)
//! - Result records: immutable pre-computed metric sets with provenance
//! - Lookups: (result type, subject) addresses into the result store
//! - Settings: layered configuration
//!
//! ## Usage
//!
//! ```rust
//! use windfarm_types::{Lookup, ResultType, SubjectId};
//!
//! let lookup = Lookup::new(ResultType::CapacityFactor, SubjectId::parse("WF3"));
//! assert_eq!(lookup.to_string(), "capacity_factor/wf3");
//! ```

pub mod config;
pub mod error;
pub mod record;
pub mod subject;

pub use config::Settings;
pub use error::WindfarmError;
pub use record::{Lookup, MetricValue, Provenance, QualityFlag, ResultRecord, ResultType};
pub use subject::{subject_label, SubjectId, PORTFOLIO_LABEL};
