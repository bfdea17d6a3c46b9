//! Intent classification for queries.
//!
//! This module implements the `IntentClassifier`, a flat rule table mapping
//! each [`Intent`] to a set of trigger phrases. Every intent whose triggers
//! occur in the normalized query is emitted, in priority order. When nothing
//! matches, the result is the singleton `general` intent.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::extractor::{normalize, ModelName};
use crate::types::Intent;

/// A trigger phrase that fired for an intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerMatch {
    pub intent: Intent,
    pub phrase: String,
}

/// Result of intent classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// Matched intents in priority order; never empty
    pub intents: Vec<Intent>,

    /// Trigger phrases that influenced the classification
    pub matched: Vec<TriggerMatch>,

    /// True when nothing matched and `general` was used
    pub fell_back: bool,
}

/// Triggers this short must stand alone as a word (an optional plural `s` is allowed).
const WHOLE_WORD_MAX_LEN: usize = 4;

/// Configuration for intent classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Trigger phrases per intent. Phrases are matched as lower-case
    /// substrings starting at a word boundary; short phrases must match a
    /// whole word. Leading/trailing spaces act as explicit boundaries.
    pub triggers: BTreeMap<Intent, Vec<String>>,
}

fn phrases(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        let mut triggers = BTreeMap::new();

        triggers.insert(
            Intent::Performance,
            phrases(&[
                "rmse",
                "mae",
                "mape",
                "performance",
                "forecast accuracy",
                "forecast quality",
                "model accuracy",
                "baseline",
                "skill score",
                "best model",
                "worst model",
            ]),
        );
        triggers.insert(
            Intent::PhysicalCharacteristics,
            phrases(&[
                "power curve",
                "capacity factor",
                "cut-in",
                "cut in speed",
                "rated speed",
                "rated power",
                "cut-out",
                "wind speed",
                "turbine characteristics",
                "power output",
                "physical characteristic",
            ]),
        );
        triggers.insert(
            Intent::Temporal,
            phrases(&[
                "temporal",
                "hourly",
                "daily",
                "seasonal",
                "diurnal",
                "ramp",
                "trend",
                "time of day",
                "time series",
                "autocorrelation",
                "time lag",
            ]),
        );
        triggers.insert(
            Intent::BusinessImpact,
            phrases(&[
                "business impact",
                "business value",
                "co2",
                "carbon",
                "economic",
                "savings",
                "cost",
                "revenue",
                "environmental",
                "sustainability",
                "grid",
                "penetration",
                "emission",
            ]),
        );
        triggers.insert(
            Intent::Uncertainty,
            phrases(&[
                "uncertainty",
                "confidence",
                "prediction interval",
                "interval",
                "quantile",
                "risk",
                "reliability",
                "bounds",
                "calibration",
            ]),
        );
        triggers.insert(
            Intent::ErrorDiagnosis,
            phrases(&[
                "diagnos",
                "bias",
                "biased",
                "overpredict",
                "underpredict",
                "over-predict",
                "under-predict",
                "residual",
                "systematic",
                "error pattern",
                "forecast error",
            ]),
        );
        triggers.insert(
            Intent::Comparison,
            phrases(&[
                "compare model",
                "compare the model",
                "comparison of model",
                "versus",
                " vs ",
                "which model",
                "trade-off",
                "tradeoff",
                "better than",
                "best",
                "worst",
                "rank",
                "ranked",
                "ranking",
            ]),
        );
        triggers.insert(
            Intent::DataQuality,
            phrases(&[
                "data quality",
                "quality",
                "missing",
                "outlier",
                "completeness",
                "validation",
                "clean",
                "gaps",
            ]),
        );
        triggers.insert(
            Intent::FeatureImportance,
            phrases(&[
                "feature importance",
                "important feature",
                "feature ranking",
                "variable importance",
                "shap values",
                "shapley",
                "permutation importance",
                "feature contribution",
            ]),
        );

        Self { triggers }
    }
}

/// Intent classifier using a static trigger table.
pub struct IntentClassifier {
    /// (intent, lower-cased triggers) in priority order
    rules: Vec<(Intent, Vec<String>)>,
}

impl IntentClassifier {
    /// Create a new classifier with default configuration.
    pub fn new() -> Self {
        Self::with_config(ClassifierConfig::default())
    }

    /// Create a classifier with custom configuration.
    ///
    /// Entries for `general` are ignored: it is only ever the fallback.
    pub fn with_config(config: ClassifierConfig) -> Self {
        let rules = config
            .triggers
            .into_iter()
            .filter(|(intent, _)| *intent != Intent::General)
            .map(|(intent, list)| {
                let lowered = list
                    .into_iter()
                    .map(|p| p.to_lowercase())
                    .filter(|p| !p.trim().is_empty())
                    .collect();
                (intent, lowered)
            })
            .collect();

        Self { rules }
    }

    /// Classify a query into one or more intents.
    pub fn classify(&self, query: &str) -> Classification {
        // Pad so boundary-sensitive triggers (" vs ") match at the edges.
        let text = format!(" {} ", mask_model_names(&normalize(query)));

        let mut intents = Vec::new();
        let mut matched = Vec::new();

        // BTreeMap order is Intent order, which is the priority order.
        for (intent, triggers) in &self.rules {
            let hits: Vec<&String> = triggers.iter().filter(|t| trigger_matches(&text, t)).collect();
            if hits.is_empty() {
                continue;
            }
            intents.push(*intent);
            matched.extend(hits.into_iter().map(|phrase| TriggerMatch {
                intent: *intent,
                phrase: phrase.trim().to_string(),
            }));
        }

        let fell_back = intents.is_empty();
        if fell_back {
            intents.push(Intent::General);
        }

        debug!(
            query = query,
            intents = ?intents,
            matched = matched.len(),
            fell_back,
            "Intent classification"
        );

        Classification {
            intents,
            matched,
            fell_back,
        }
    }
}

/// Blank out model names so words inside them ("seasonal naive") do not fire triggers.
fn mask_model_names(text: &str) -> String {
    let mut masked = text.to_string();
    for model in ModelName::ALL {
        for alias in model.aliases() {
            if masked.contains(alias) {
                masked = masked.replace(alias, "#");
            }
        }
    }
    masked
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Whether `trigger` occurs in `text` starting at a word boundary.
fn trigger_matches(text: &str, trigger: &str) -> bool {
    let opens_boundary = trigger.starts_with(|c: char| !is_word_char(c));
    let closes_boundary = trigger.ends_with(|c: char| !is_word_char(c));
    let whole_word = !closes_boundary && trigger.chars().count() <= WHOLE_WORD_MAX_LEN;

    text.match_indices(trigger).any(|(start, _)| {
        let starts_word = opens_boundary
            || !text[..start].chars().next_back().is_some_and(is_word_char);
        if !starts_word {
            return false;
        }
        if !whole_word {
            return true;
        }
        let rest = &text[start + trigger.len()..];
        let rest = rest.strip_prefix('s').unwrap_or(rest);
        !rest.chars().next().is_some_and(is_word_char)
    })
}

impl Default for IntentClassifier {
    fn default() -> Self {
        Self::new()
    }
}
