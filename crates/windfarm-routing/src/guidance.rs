//! Guidance documents referenced by routing decisions.
//!
//! Each analysis category has a hand-authored document telling the consumer
//! which analysis artifacts to consult and which metric/code patterns to look
//! for. Routing only needs a stable identifier per document; the text itself
//! is loaded and served by the query service.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identifier of a guidance document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuidanceDoc {
    PowerCurveAnalysis,
    ForecastPerformance,
    TemporalPatterns,
    BusinessImpact,
    UncertaintyQuantification,
    ErrorDiagnosis,
    ModelComparison,
    DataQuality,
    FeatureImportance,
    QuickReference,
}

impl GuidanceDoc {
    pub const ALL: [GuidanceDoc; 10] = [
        GuidanceDoc::PowerCurveAnalysis,
        GuidanceDoc::ForecastPerformance,
        GuidanceDoc::TemporalPatterns,
        GuidanceDoc::BusinessImpact,
        GuidanceDoc::UncertaintyQuantification,
        GuidanceDoc::ErrorDiagnosis,
        GuidanceDoc::ModelComparison,
        GuidanceDoc::DataQuality,
        GuidanceDoc::FeatureImportance,
        GuidanceDoc::QuickReference,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            GuidanceDoc::PowerCurveAnalysis => "power_curve_analysis",
            GuidanceDoc::ForecastPerformance => "forecast_performance",
            GuidanceDoc::TemporalPatterns => "temporal_patterns",
            GuidanceDoc::BusinessImpact => "business_impact",
            GuidanceDoc::UncertaintyQuantification => "uncertainty_quantification",
            GuidanceDoc::ErrorDiagnosis => "error_diagnosis",
            GuidanceDoc::ModelComparison => "model_comparison",
            GuidanceDoc::DataQuality => "data_quality",
            GuidanceDoc::FeatureImportance => "feature_importance",
            GuidanceDoc::QuickReference => "quick_reference",
        }
    }

    /// File name inside the guidance directory.
    pub fn file_name(&self) -> &'static str {
        match self {
            GuidanceDoc::PowerCurveAnalysis => "02_power_curve_analysis.md",
            GuidanceDoc::ForecastPerformance => "03_forecast_performance.md",
            GuidanceDoc::BusinessImpact => "04_business_impact.md",
            GuidanceDoc::QuickReference => "05_quick_reference.md",
            GuidanceDoc::TemporalPatterns => "06_temporal_patterns.md",
            GuidanceDoc::UncertaintyQuantification => "07_uncertainty_quantification.md",
            GuidanceDoc::ErrorDiagnosis => "08_error_diagnosis.md",
            GuidanceDoc::ModelComparison => "09_model_comparison.md",
            GuidanceDoc::DataQuality => "10_data_quality.md",
            GuidanceDoc::FeatureImportance => "11_feature_importance.md",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            GuidanceDoc::PowerCurveAnalysis => "Power Curve Analysis",
            GuidanceDoc::ForecastPerformance => "Forecast Performance Analysis",
            GuidanceDoc::TemporalPatterns => "Temporal Pattern Analysis",
            GuidanceDoc::BusinessImpact => "Business Impact Analysis",
            GuidanceDoc::UncertaintyQuantification => "Uncertainty Quantification",
            GuidanceDoc::ErrorDiagnosis => "Error Diagnosis",
            GuidanceDoc::ModelComparison => "Model Comparison Analysis",
            GuidanceDoc::DataQuality => "Data Quality Assessment",
            GuidanceDoc::FeatureImportance => "Feature Importance Analysis",
            GuidanceDoc::QuickReference => "General Analysis",
        }
    }

    /// Analysis notebooks to consult.
    pub fn artifacts(&self) -> &'static [&'static str] {
        match self {
            GuidanceDoc::PowerCurveAnalysis => &["02_wind_physics_analysis.ipynb"],
            GuidanceDoc::ForecastPerformance => {
                &["10_model_evaluation.ipynb", "06_baseline_models.ipynb"]
            }
            GuidanceDoc::TemporalPatterns => &["03_temporal_patterns.ipynb"],
            GuidanceDoc::BusinessImpact => &["12_business_impact.ipynb"],
            GuidanceDoc::UncertaintyQuantification => &["09_ensemble_uncertainty.ipynb"],
            GuidanceDoc::ErrorDiagnosis => {
                &["10_model_evaluation.ipynb", "04_spatial_analysis.ipynb"]
            }
            GuidanceDoc::ModelComparison => &[
                "06_baseline_models.ipynb",
                "07_ml_models.ipynb",
                "08_deep_learning.ipynb",
            ],
            GuidanceDoc::DataQuality => &["01_data_foundation.ipynb"],
            GuidanceDoc::FeatureImportance => {
                &["05_feature_engineering.ipynb", "07_ml_models.ipynb"]
            }
            GuidanceDoc::QuickReference => {
                &["01_data_foundation.ipynb", "02_wind_physics_analysis.ipynb"]
            }
        }
    }

    /// Metric and code patterns worth searching for in the artifacts.
    pub fn look_for(&self) -> &'static [&'static str] {
        match self {
            GuidanceDoc::PowerCurveAnalysis => {
                &["groupby", "capacity_factor", "power_curve", "cut_in_speed"]
            }
            GuidanceDoc::ForecastPerformance => &["rmse", "mae", "model.evaluate", "test_results"],
            GuidanceDoc::TemporalPatterns => &["hourly_mean", "seasonal_decompose", "ramp_events"],
            GuidanceDoc::BusinessImpact => {
                &["co2_displacement", "economic_value", "annual_generation"]
            }
            GuidanceDoc::UncertaintyQuantification => {
                &["prediction_interval", "quantile", "coverage"]
            }
            GuidanceDoc::ErrorDiagnosis => &["residuals", "bias", "error_by_horizon"],
            GuidanceDoc::ModelComparison => &["model_comparison", "rmse", "training_time"],
            GuidanceDoc::DataQuality => &["missing_values", "outliers", "describe()", "info()"],
            GuidanceDoc::FeatureImportance => {
                &["feature_importances_", "permutation_importance", "shap"]
            }
            GuidanceDoc::QuickReference => &[],
        }
    }
}

impl fmt::Display for GuidanceDoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}
