//! Pre-computed result records and their addressing.
//!
//! Records are produced by the upstream analysis pipeline and are immutable
//! from the point of view of this layer. Each record is addressed by a
//! [`Lookup`]: a result type plus an optional subject (`None` = portfolio).

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::WindfarmError;
use crate::subject::{subject_label, SubjectId};

/// Named category of pre-computed metric sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultType {
    /// Cut-in/rated/cut-out speeds and rated power per farm
    PowerCurve,
    /// Capacity factors and related physical characteristics
    CapacityFactor,
    /// RMSE/MAE/skill scores of the forecasting models
    ForecastPerformance,
    /// Diurnal, seasonal and ramp-event statistics
    TemporalPatterns,
    /// Prediction intervals and calibration
    Uncertainty,
    /// CO2 displacement and economic value
    BusinessImpact,
    /// Head-to-head model rankings
    ModelComparison,
    /// Feature importance rankings
    FeatureImportance,
    /// Bias and residual diagnostics
    ErrorDiagnosis,
    /// Missing values, outliers, completeness
    DataQuality,
}

impl ResultType {
    /// Every result type, in registry order.
    pub const ALL: [ResultType; 10] = [
        ResultType::PowerCurve,
        ResultType::CapacityFactor,
        ResultType::ForecastPerformance,
        ResultType::TemporalPatterns,
        ResultType::Uncertainty,
        ResultType::BusinessImpact,
        ResultType::ModelComparison,
        ResultType::FeatureImportance,
        ResultType::ErrorDiagnosis,
        ResultType::DataQuality,
    ];

    /// Returns the snake_case name for this result type.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultType::PowerCurve => "power_curve",
            ResultType::CapacityFactor => "capacity_factor",
            ResultType::ForecastPerformance => "forecast_performance",
            ResultType::TemporalPatterns => "temporal_patterns",
            ResultType::Uncertainty => "uncertainty",
            ResultType::BusinessImpact => "business_impact",
            ResultType::ModelComparison => "model_comparison",
            ResultType::FeatureImportance => "feature_importance",
            ResultType::ErrorDiagnosis => "error_diagnosis",
            ResultType::DataQuality => "data_quality",
        }
    }

    /// Well-known file name of this result type inside the data directory.
    pub fn file_name(&self) -> String {
        format!("{}.json", self.as_str())
    }
}

impl fmt::Display for ResultType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ResultType {
    type Err = WindfarmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        ResultType::ALL
            .into_iter()
            .find(|rt| rt.as_str() == wanted)
            .ok_or_else(|| WindfarmError::InvalidInput(format!("unknown result type: {s:?}")))
    }
}

/// Address of a single record: (result type, subject or portfolio).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Lookup {
    pub result_type: ResultType,
    /// `None` addresses the portfolio-level aggregate
    pub subject: Option<SubjectId>,
}

impl Lookup {
    pub fn new(result_type: ResultType, subject: Option<SubjectId>) -> Self {
        Self {
            result_type,
            subject,
        }
    }

    pub fn portfolio(result_type: ResultType) -> Self {
        Self::new(result_type, None)
    }
}

impl fmt::Display for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}",
            self.result_type,
            subject_label(self.subject.as_ref())
        )
    }
}

/// A single metric value as exported by the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Flag(bool),
    Number(f64),
    Text(String),
}

impl MetricValue {
    /// Numeric view of the value, if it is a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetricValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Flag(b) => write!(f, "{b}"),
            MetricValue::Number(n) => write!(f, "{n}"),
            MetricValue::Text(s) => write!(f, "{s}"),
        }
    }
}

/// Data-quality flag attached to each record by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum QualityFlag {
    Ok,
    Degraded,
    #[default]
    Unknown,
}

impl QualityFlag {
    /// Interpret a pipeline label. Anything unrecognized is `Unknown`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "ok" | "good" | "valid" => QualityFlag::Ok,
            "degraded" | "poor" | "partial" => QualityFlag::Degraded,
            _ => QualityFlag::Unknown,
        }
    }
}

/// Where a record came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    /// Result file the record was read from
    pub source_file: String,
    /// Upstream artifact that produced the file (e.g. a notebook)
    pub source: String,
    /// When the upstream pipeline generated the file
    pub generated_at: DateTime<Utc>,
}

/// The unit served by the result store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub result_type: ResultType,

    /// `None` for the portfolio-level record
    pub subject: Option<SubjectId>,

    /// Metric name -> value
    pub metrics: BTreeMap<String, MetricValue>,

    pub provenance: Provenance,

    pub quality: QualityFlag,
}

impl ResultRecord {
    /// The lookup this record answers.
    pub fn lookup(&self) -> Lookup {
        Lookup::new(self.result_type, self.subject)
    }

    /// Numeric metric by name.
    pub fn number(&self, metric: &str) -> Option<f64> {
        self.metrics.get(metric).and_then(MetricValue::as_f64)
    }
}
