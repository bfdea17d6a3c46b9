//! Core routing types.
//!
//! - `Intent`: analysis category a query belongs to
//! - `Confidence`: how unambiguous the intents/entities of a query were

use std::fmt;

use serde::{Deserialize, Serialize};

/// Analysis category of a query.
///
/// Declaration order is the priority order: classification emits intents in
/// this order regardless of where their triggers appear in the text, and the
/// composer concatenates lookups in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Intent {
    /// RMSE/MAE, skill scores, baselines.
    /// Examples: "What's the RMSE of the LSTM?"
    Performance,

    /// Power curves, capacity factors, turbine operating parameters.
    /// Examples: "What's the capacity factor for wind farm wf3?"
    PhysicalCharacteristics,

    /// Diurnal/seasonal cycles, ramps, autocorrelation.
    Temporal,

    /// CO2 displacement, economic value, grid integration.
    BusinessImpact,

    /// Prediction intervals, calibration, risk.
    Uncertainty,

    /// Bias, residuals, systematic error patterns.
    ErrorDiagnosis,

    /// Head-to-head comparisons and rankings.
    /// Examples: "Which model is best overall?"
    Comparison,

    /// Missing values, outliers, completeness.
    DataQuality,

    /// Which inputs drive the forecasts.
    FeatureImportance,

    /// Floor when nothing else matched. Never co-occurs with other intents.
    General,
}

impl Intent {
    /// Intents that can be triggered by text, in priority order.
    pub const PRIORITY: [Intent; 9] = [
        Intent::Performance,
        Intent::PhysicalCharacteristics,
        Intent::Temporal,
        Intent::BusinessImpact,
        Intent::Uncertainty,
        Intent::ErrorDiagnosis,
        Intent::Comparison,
        Intent::DataQuality,
        Intent::FeatureImportance,
    ];

    /// Returns the display name for this intent.
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Performance => "performance",
            Intent::PhysicalCharacteristics => "physical-characteristics",
            Intent::Temporal => "temporal",
            Intent::BusinessImpact => "business-impact",
            Intent::Uncertainty => "uncertainty",
            Intent::ErrorDiagnosis => "error-diagnosis",
            Intent::Comparison => "comparison",
            Intent::DataQuality => "data-quality",
            Intent::FeatureImportance => "feature-importance",
            Intent::General => "general",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Confidence in a routing decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_matches_declaration_order() {
        let mut sorted = Intent::PRIORITY;
        sorted.sort();
        assert_eq!(sorted, Intent::PRIORITY);
        assert!(Intent::PRIORITY.iter().all(|i| *i < Intent::General));
    }

    #[test]
    fn test_intent_serialization() {
        let json = serde_json::to_string(&Intent::PhysicalCharacteristics).unwrap();
        assert_eq!(json, "\"physical-characteristics\"");
        let decoded: Intent = serde_json::from_str("\"business-impact\"").unwrap();
        assert_eq!(decoded, Intent::BusinessImpact);
        assert_eq!(Intent::DataQuality.to_string(), "data-quality");
    }

    #[test]
    fn test_confidence_ordering() {
        assert!(Confidence::Low < Confidence::Medium);
        assert!(Confidence::Medium < Confidence::High);
        assert_eq!(serde_json::to_string(&Confidence::High).unwrap(), "\"high\"");
    }
}
