//! Query service for pre-computed wind-farm analytics.
//!
//! Provides:
//! - `QueryService::handle` for free-text queries with optional overrides
//! - Named analysis operations (power curves, forecast performance, ...)
//! - Guidance fallback when any required result is unavailable
//! - Status and per-intent request metrics

pub mod bootstrap;
pub mod context;
pub mod guidance;
pub mod metrics;
pub mod query;
pub mod response;
pub mod status;
pub mod telemetry;
pub mod tools;

pub use bootstrap::{bootstrap, bootstrap_from_config};
pub use guidance::{GuidanceDocument, GuidanceLibrary};
pub use metrics::{IntentStats, MetricsSnapshot, RequestMetrics};
pub use query::{apply_overrides, Query, QueryParams, QueryService};
pub use response::{
    DirectResponse, GuidedResponse, LookupMiss, ResponseBody, ResponseMode, ServiceResponse,
};
pub use status::StatusReport;
pub use telemetry::init_tracing;
pub use tools::{
    BusinessImpactParams, CompareModelsParams, ErrorDiagnosisParams, FeatureImportanceParams,
    ForecastPerformanceParams, PowerCurveParams, TemporalPatternParams, UncertaintyParams,
};
