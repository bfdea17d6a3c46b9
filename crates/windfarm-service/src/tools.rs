//! Named analysis operations.
//!
//! Each operation validates its typed parameters, renders a canonical query
//! string and delegates to [`QueryService::handle`] pinned to its result
//! type. Classification still runs on the rendered text; nothing here picks
//! intents.

use serde::{Deserialize, Serialize};
use tracing::warn;
use windfarm_routing::{ModelName, HORIZON_RANGE};
use windfarm_store::RecordLookup;
use windfarm_types::{ResultType, SubjectId};

use crate::query::{Query, QueryParams, QueryService};
use crate::response::ServiceResponse;

/// Accepted confidence levels for uncertainty queries.
pub const CONFIDENCE_LEVEL_RANGE: std::ops::RangeInclusive<f64> = 0.5..=0.99;
pub const DEFAULT_CONFIDENCE_LEVEL: f64 = 0.95;
pub const TOP_FEATURES_RANGE: std::ops::RangeInclusive<u32> = 1..=50;

const POWER_CURVE_METRICS: &[&str] = &[
    "capacity_factor",
    "cut_in_speed",
    "rated_speed",
    "cut_out_speed",
    "power_coefficient",
];
const PERFORMANCE_METRICS: &[&str] = &["rmse", "mae", "mape", "skill_score"];
const WIND_REGIMES: &[&str] = &["low", "medium", "high"];
const TEMPORAL_PATTERNS: &[&str] = &["diurnal", "seasonal", "ramp_events", "autocorrelation"];
const TEMPORAL_RESOLUTIONS: &[&str] = &["hourly", "daily", "monthly"];
const AGGREGATIONS: &[&str] = &["turbine", "farm", "portfolio"];
const COMPARISON_CRITERIA: &[&str] = &[
    "accuracy",
    "complexity",
    "training_time",
    "inference_speed",
    "interpretability",
];
const IMPORTANCE_MODELS: &[ModelName] = &[ModelName::RandomForest, ModelName::XgBoost, ModelName::Ensemble];
const ERROR_TYPES: &[&str] = &["bias", "variance", "extreme_events", "seasonal"];
const ERROR_PERIODS: &[&str] = &["morning", "afternoon", "night", "summer", "winter"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerCurveParams {
    pub subject: Option<String>,
    /// Metrics to focus on; empty means all standard metrics
    pub metrics: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastPerformanceParams {
    pub model: Option<String>,
    pub horizon: Option<i64>,
    /// Defaults to RMSE
    pub metric: Option<String>,
    pub wind_regime: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemporalPatternParams {
    /// Empty means all temporal characteristics
    pub patterns: Vec<String>,
    pub resolution: String,
    pub seasonal_decomposition: bool,
}

impl Default for TemporalPatternParams {
    fn default() -> Self {
        Self {
            patterns: Vec::new(),
            resolution: "hourly".to_string(),
            seasonal_decomposition: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UncertaintyParams {
    pub confidence_level: f64,
    pub horizon: i64,
    pub aggregation: String,
}

impl Default for UncertaintyParams {
    fn default() -> Self {
        Self {
            confidence_level: DEFAULT_CONFIDENCE_LEVEL,
            horizon: 24,
            aggregation: "portfolio".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusinessImpactParams {
    pub improvement_percentage: f64,
    pub capacity_mw: f64,
}

impl Default for BusinessImpactParams {
    fn default() -> Self {
        Self {
            improvement_percentage: 10.0,
            capacity_mw: 100.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareModelsParams {
    pub models: Vec<String>,
    pub criteria: Vec<String>,
}

impl Default for CompareModelsParams {
    fn default() -> Self {
        Self {
            models: vec![
                "persistence".to_string(),
                "random forest".to_string(),
                "lstm".to_string(),
            ],
            criteria: vec!["accuracy".to_string(), "complexity".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureImportanceParams {
    pub model: String,
    pub top_n: i64,
    pub by_horizon: bool,
}

impl Default for FeatureImportanceParams {
    fn default() -> Self {
        Self {
            model: "ensemble".to_string(),
            top_n: 10,
            by_horizon: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorDiagnosisParams {
    /// bias, variance, extreme_events, seasonal or all
    pub error_type: String,
    pub subject: Option<String>,
    pub period: Option<String>,
}

impl Default for ErrorDiagnosisParams {
    fn default() -> Self {
        Self {
            error_type: "all".to_string(),
            subject: None,
            period: None,
        }
    }
}

/// Lower-case `raw` if it is one of `allowed`.
fn pick(raw: &str, allowed: &[&str], field: &'static str) -> Option<String> {
    let value = raw.trim().to_lowercase().replace([' ', '-'], "_");
    if allowed.contains(&value.as_str()) {
        Some(value)
    } else {
        warn!(field, value = %raw, "Ignoring unsupported option");
        None
    }
}

fn subject_phrase(raw: Option<&str>, fallback: &str) -> String {
    match raw.map(|r| (r, SubjectId::parse(r))) {
        Some((_, Some(subject))) => format!("for wind farm {subject}"),
        Some((r, None)) => {
            warn!(subject = %r, "Ignoring invalid subject");
            fallback.to_string()
        }
        None => fallback.to_string(),
    }
}

fn spaced(label: &str) -> String {
    label.replace('_', " ")
}

impl<L: RecordLookup> QueryService<L> {
    async fn handle_pinned(&self, text: String, result_type: ResultType) -> ServiceResponse {
        let query = Query::new(text).with_params(QueryParams {
            result_type: Some(result_type.as_str().to_string()),
            ..Default::default()
        });
        self.handle(&query).await
    }

    pub async fn analyze_power_curves(&self, params: &PowerCurveParams) -> ServiceResponse {
        let subject = subject_phrase(params.subject.as_deref(), "for all wind farms");
        let metrics: Vec<String> = params
            .metrics
            .iter()
            .filter_map(|m| pick(m, POWER_CURVE_METRICS, "metric"))
            .map(|m| spaced(&m))
            .collect();

        let focus = if metrics.is_empty() {
            "all standard metrics".to_string()
        } else {
            metrics.join(", ")
        };
        let text = format!("Analyze power curves {subject} including {focus}");
        self.handle_pinned(text, ResultType::PowerCurve).await
    }

    pub async fn evaluate_forecast_performance(
        &self,
        params: &ForecastPerformanceParams,
    ) -> ServiceResponse {
        let model = match params.model.as_deref().map(|m| (m, ModelName::from_label(m))) {
            Some((_, Some(model))) => format!("{model} model"),
            Some((raw, None)) => {
                warn!(model = %raw, "Ignoring unknown model");
                "all models".to_string()
            }
            None => "all models".to_string(),
        };

        let horizon = match params.horizon {
            Some(h) if u32::try_from(h).is_ok_and(|h| HORIZON_RANGE.contains(&h)) => {
                format!("at {h} hour ahead horizon")
            }
            Some(h) => {
                warn!(horizon = h, "Horizon out of range; evaluating all horizons");
                "across all horizons".to_string()
            }
            None => "across all horizons".to_string(),
        };

        let metric = params
            .metric
            .as_deref()
            .and_then(|m| pick(m, PERFORMANCE_METRICS, "metric"))
            .unwrap_or_else(|| "rmse".to_string());
        let metric = match metric.as_str() {
            "skill_score" => "skill score".to_string(),
            other => other.to_uppercase(),
        };

        let mut text = format!("Evaluate forecast performance for {model} {horizon} using {metric} metric");
        if let Some(regime) = params
            .wind_regime
            .as_deref()
            .and_then(|r| pick(r, WIND_REGIMES, "wind_regime"))
        {
            text.push_str(&format!(" in {regime} wind conditions"));
        }
        self.handle_pinned(text, ResultType::ForecastPerformance).await
    }

    pub async fn analyze_temporal_patterns(&self, params: &TemporalPatternParams) -> ServiceResponse {
        let patterns: Vec<String> = params
            .patterns
            .iter()
            .filter_map(|p| pick(p, TEMPORAL_PATTERNS, "pattern"))
            .map(|p| spaced(&p))
            .collect();
        let focus = if patterns.is_empty() {
            "including all temporal characteristics".to_string()
        } else {
            format!("focusing on {}", patterns.join(", "))
        };
        let resolution = pick(&params.resolution, TEMPORAL_RESOLUTIONS, "resolution")
            .unwrap_or_else(|| "hourly".to_string());

        let mut text = format!("Analyze temporal patterns {focus} at {resolution} resolution");
        if params.seasonal_decomposition {
            text.push_str(" with seasonal decomposition");
        }
        self.handle_pinned(text, ResultType::TemporalPatterns).await
    }

    pub async fn quantify_uncertainty(&self, params: &UncertaintyParams) -> ServiceResponse {
        let level = if CONFIDENCE_LEVEL_RANGE.contains(&params.confidence_level) {
            params.confidence_level
        } else {
            warn!(
                confidence_level = params.confidence_level,
                "Confidence level out of range; using default"
            );
            DEFAULT_CONFIDENCE_LEVEL
        };
        let lo = i64::from(*HORIZON_RANGE.start());
        let hi = i64::from(*HORIZON_RANGE.end());
        let horizon = params.horizon.clamp(lo, hi);
        if horizon != params.horizon {
            warn!(horizon = params.horizon, clamped = horizon, "Horizon clamped");
        }
        let aggregation = pick(&params.aggregation, AGGREGATIONS, "aggregation")
            .unwrap_or_else(|| "portfolio".to_string());

        // Rendered as a fraction so the extractor does not read it as a percentage.
        let level = (level * 100.0).round() / 100.0;
        let text = format!(
            "Quantify forecast uncertainty at {level} confidence level for {horizon} hour ahead \
             predictions aggregated at {aggregation} level"
        );
        self.handle_pinned(text, ResultType::Uncertainty).await
    }

    pub async fn calculate_business_impact(&self, params: &BusinessImpactParams) -> ServiceResponse {
        let pct = if params.improvement_percentage.is_nan() {
            0.0
        } else {
            params.improvement_percentage.clamp(0.0, 100.0)
        };
        if pct != params.improvement_percentage {
            warn!(
                percentage = params.improvement_percentage,
                clamped = pct,
                "Improvement percentage clamped"
            );
        }
        let capacity = if params.capacity_mw.is_finite() && params.capacity_mw > 0.0 {
            params.capacity_mw
        } else {
            warn!(capacity_mw = params.capacity_mw, "Invalid capacity; using 100MW");
            100.0
        };

        let text = format!(
            "Calculate business impact of {pct}% forecast improvement for {capacity}MW wind farm \
             with 0.5 tons CO2/MWh grid displacement"
        );
        let query = Query::new(text).with_params(QueryParams {
            result_type: Some(ResultType::BusinessImpact.as_str().to_string()),
            percentage: Some(pct),
            ..Default::default()
        });
        self.handle(&query).await
    }

    pub async fn compare_models(&self, params: &CompareModelsParams) -> ServiceResponse {
        let mut models: Vec<ModelName> = Vec::new();
        for raw in &params.models {
            match ModelName::from_label(raw) {
                Some(m) if !models.contains(&m) => models.push(m),
                Some(_) => {}
                None => warn!(model = %raw, "Dropping unknown model"),
            }
        }
        if models.is_empty() {
            models = vec![ModelName::Persistence, ModelName::RandomForest, ModelName::Lstm];
        }

        let mut criteria: Vec<String> = params
            .criteria
            .iter()
            .filter_map(|c| pick(c, COMPARISON_CRITERIA, "criterion"))
            .collect();
        criteria.dedup();
        if criteria.is_empty() {
            criteria = vec!["accuracy".to_string(), "complexity".to_string()];
        }

        let text = format!(
            "Compare models {} head-to-head based on {}",
            models
                .iter()
                .map(|m| m.display_name().to_lowercase())
                .collect::<Vec<_>>()
                .join(", "),
            criteria.iter().map(|c| spaced(c)).collect::<Vec<_>>().join(", ")
        );
        self.handle_pinned(text, ResultType::ModelComparison).await
    }

    pub async fn analyze_feature_importance(
        &self,
        params: &FeatureImportanceParams,
    ) -> ServiceResponse {
        let model = match ModelName::from_label(&params.model) {
            Some(m) if IMPORTANCE_MODELS.contains(&m) => m,
            _ => {
                warn!(model = %params.model, "Unsupported model; using ensemble");
                ModelName::Ensemble
            }
        };
        let lo = i64::from(*TOP_FEATURES_RANGE.start());
        let hi = i64::from(*TOP_FEATURES_RANGE.end());
        let top_n = params.top_n.clamp(lo, hi);

        let mut text = format!(
            "Analyze feature importance for {} model showing top {top_n} features",
            model.display_name()
        );
        if params.by_horizon {
            text.push_str(" broken down by forecast horizon");
        }
        self.handle_pinned(text, ResultType::FeatureImportance).await
    }

    pub async fn diagnose_errors(&self, params: &ErrorDiagnosisParams) -> ServiceResponse {
        let focus = if params.error_type.trim().eq_ignore_ascii_case("all") {
            "all error types".to_string()
        } else {
            pick(&params.error_type, ERROR_TYPES, "error_type")
                .map(|e| spaced(&e))
                .unwrap_or_else(|| "all error types".to_string())
        };
        let subject = subject_phrase(params.subject.as_deref(), "across all wind farms");
        let period = match params
            .period
            .as_deref()
            .and_then(|p| pick(p, ERROR_PERIODS, "period"))
        {
            Some(p) => format!("during {p} periods"),
            None => "across all periods".to_string(),
        };

        let text = format!("Diagnose forecast errors focusing on {focus} {subject} {period}");
        self.handle_pinned(text, ResultType::ErrorDiagnosis).await
    }
}
