//! Entity extraction from free-text queries.
//!
//! Pulls farm identifiers, forecast horizons, percentages and model names out
//! of a query. Extraction never fails: a kind with no matches is an empty list.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;
use windfarm_types::SubjectId;

/// Accepted forecast horizons, in hours.
pub const HORIZON_RANGE: std::ops::RangeInclusive<u32> = 1..=48;

static PREFIXED_SUBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bw[fp][-_ ]?([1-9])\b").expect("valid subject regex"));

static FARM_CONTEXT_SUBJECT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:wind[\s_-]?)?farms?\s*(?:#|no\.?|number)?\s*([1-7](?:\s*(?:,|and|&|or)\s*[1-7])*)\b",
    )
    .expect("valid farm context regex")
});

static HORIZON_UNIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^\w.])(\d+)\s*-?\s*(?:hours?|hrs?|h)\b").expect("valid horizon regex")
});

static HORIZON_KEYWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bhorizons?\s*(?:of|=|:)?\s*(\d+)\b").expect("valid horizon keyword regex")
});

static PERCENTAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^\w.])(\d+(?:\.\d+)?)\s*(?:%|percent\b|per cent\b)")
        .expect("valid percentage regex")
});

/// Lower-case the query and collapse runs of whitespace to a single space.
pub fn normalize(query: &str) -> String {
    query
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Closed vocabulary of forecasting models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ModelName {
    #[serde(rename = "Persistence")]
    Persistence,
    #[serde(rename = "Seasonal Naive")]
    SeasonalNaive,
    #[serde(rename = "Random Forest")]
    RandomForest,
    #[serde(rename = "XGBoost")]
    XgBoost,
    #[serde(rename = "LSTM")]
    Lstm,
    #[serde(rename = "Transformer")]
    Transformer,
    #[serde(rename = "Ensemble")]
    Ensemble,
}

impl ModelName {
    pub const ALL: [ModelName; 7] = [
        ModelName::Persistence,
        ModelName::SeasonalNaive,
        ModelName::RandomForest,
        ModelName::XgBoost,
        ModelName::Lstm,
        ModelName::Transformer,
        ModelName::Ensemble,
    ];

    /// Canonical display form.
    pub fn display_name(&self) -> &'static str {
        match self {
            ModelName::Persistence => "Persistence",
            ModelName::SeasonalNaive => "Seasonal Naive",
            ModelName::RandomForest => "Random Forest",
            ModelName::XgBoost => "XGBoost",
            ModelName::Lstm => "LSTM",
            ModelName::Transformer => "Transformer",
            ModelName::Ensemble => "Ensemble",
        }
    }

    /// Lower-case spellings recognized in normalized text.
    pub(crate) fn aliases(&self) -> &'static [&'static str] {
        match self {
            ModelName::Persistence => &["persistence"],
            ModelName::SeasonalNaive => &["seasonal naive", "seasonal_naive", "seasonal-naive"],
            ModelName::RandomForest => &["random forest", "random_forest", "randomforest"],
            ModelName::XgBoost => &["xgboost", "xgb"],
            ModelName::Lstm => &["lstm"],
            ModelName::Transformer => &["transformer"],
            ModelName::Ensemble => &["ensemble"],
        }
    }

    /// Resolve a single model label (e.g. a named-operation parameter).
    pub fn from_label(label: &str) -> Option<Self> {
        let normalized = normalize(label);
        ModelName::ALL
            .into_iter()
            .find(|m| m.aliases().iter().any(|a| *a == normalized))
    }

    /// Position of the earliest alias occurrence in normalized text.
    fn first_position(&self, text: &str) -> Option<usize> {
        self.aliases().iter().filter_map(|a| text.find(a)).min()
    }
}

impl fmt::Display for ModelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Kind of an extracted entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Subject,
    Horizon,
    Percentage,
    Model,
}

/// A numeric mention that was recognized but fell outside its accepted range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedEntity {
    pub kind: EntityKind,
    pub raw: String,
}

/// Extracted entities, each kind in order of first appearance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityMap {
    pub subjects: Vec<SubjectId>,
    /// Hours ahead, always within 1..=48
    pub horizons: Vec<u8>,
    /// Always within 0..=100
    pub percentages: Vec<f64>,
    pub models: Vec<ModelName>,
    /// Out-of-range mentions, kept for confidence scoring only
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rejected: Vec<RejectedEntity>,
}

impl EntityMap {
    /// True when no entity of any kind was accepted.
    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
            && self.horizons.is_empty()
            && self.percentages.is_empty()
            && self.models.is_empty()
    }

    /// Number of accepted entities across all kinds.
    pub fn len(&self) -> usize {
        self.subjects.len() + self.horizons.len() + self.percentages.len() + self.models.len()
    }

    /// A horizon was mentioned but rejected as out of range.
    pub fn has_conflict(&self) -> bool {
        self.rejected.iter().any(|r| r.kind == EntityKind::Horizon)
    }

    pub fn push_subject(&mut self, subject: SubjectId) {
        if !self.subjects.contains(&subject) {
            self.subjects.push(subject);
        }
    }

    pub fn push_horizon(&mut self, hours: u8) {
        if !self.horizons.contains(&hours) {
            self.horizons.push(hours);
        }
    }

    pub fn push_percentage(&mut self, value: f64) {
        if !self.percentages.contains(&value) {
            self.percentages.push(value);
        }
    }

    pub fn push_model(&mut self, model: ModelName) {
        if !self.models.contains(&model) {
            self.models.push(model);
        }
    }
}

/// Pattern-based entity extractor.
#[derive(Debug, Clone, Default)]
pub struct EntityExtractor;

impl EntityExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract all entities from a query.
    pub fn extract(&self, query: &str) -> EntityMap {
        let text = normalize(query);
        let mut entities = EntityMap::default();

        for subject in extract_subjects(&text) {
            entities.push_subject(subject);
        }
        extract_horizons(&text, &mut entities);
        extract_percentages(&text, &mut entities);
        for model in extract_models(&text) {
            entities.push_model(model);
        }

        debug!(
            subjects = ?entities.subjects,
            horizons = ?entities.horizons,
            percentages = ?entities.percentages,
            models = ?entities.models,
            rejected = entities.rejected.len(),
            "Entities extracted"
        );

        entities
    }
}

fn extract_subjects(text: &str) -> Vec<SubjectId> {
    let mut found: Vec<(usize, SubjectId)> = Vec::new();

    for caps in PREFIXED_SUBJECT.captures_iter(text) {
        if let Some(m) = caps.get(1) {
            if let Some(subject) = SubjectId::parse(m.as_str()) {
                found.push((m.start(), subject));
            }
        }
    }

    // A list member followed by an hour unit ("farm 2 or 3 hours") is a horizon.
    let horizon_starts: Vec<usize> = HORIZON_UNIT
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).map(|m| m.start()))
        .collect();

    for caps in FARM_CONTEXT_SUBJECT.captures_iter(text) {
        if let Some(list) = caps.get(1) {
            for (offset, c) in list.as_str().char_indices() {
                let pos = list.start() + offset;
                if horizon_starts.contains(&pos) {
                    continue;
                }
                if let Some(subject) = c.to_digit(10).and_then(|d| SubjectId::new(d as u8)) {
                    found.push((pos, subject));
                }
            }
        }
    }

    found.sort_by_key(|(pos, _)| *pos);
    found.into_iter().map(|(_, s)| s).collect()
}

fn extract_horizons(text: &str, entities: &mut EntityMap) {
    let mut found: Vec<(usize, &str)> = Vec::new();
    for re in [&*HORIZON_UNIT, &*HORIZON_KEYWORD] {
        for caps in re.captures_iter(text) {
            if let Some(m) = caps.get(1) {
                found.push((m.start(), m.as_str()));
            }
        }
    }
    found.sort_by_key(|(pos, _)| *pos);
    found.dedup();

    for (_, raw) in found {
        match raw.parse::<u32>() {
            Ok(hours) if HORIZON_RANGE.contains(&hours) => entities.push_horizon(hours as u8),
            _ => entities.rejected.push(RejectedEntity {
                kind: EntityKind::Horizon,
                raw: raw.to_string(),
            }),
        }
    }
}

fn extract_percentages(text: &str, entities: &mut EntityMap) {
    for caps in PERCENTAGE.captures_iter(text) {
        let Some(m) = caps.get(1) else { continue };
        match m.as_str().parse::<f64>() {
            Ok(value) if (0.0..=100.0).contains(&value) => entities.push_percentage(value),
            _ => entities.rejected.push(RejectedEntity {
                kind: EntityKind::Percentage,
                raw: m.as_str().to_string(),
            }),
        }
    }
}

fn extract_models(text: &str) -> Vec<ModelName> {
    let mut found: Vec<(usize, ModelName)> = ModelName::ALL
        .into_iter()
        .filter_map(|m| m.first_position(text).map(|pos| (pos, m)))
        .collect();
    found.sort_by_key(|(pos, _)| *pos);
    found.into_iter().map(|(_, m)| m).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wf(n: u8) -> SubjectId {
        SubjectId::new(n).unwrap()
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("  What's   the\tRMSE\n"), "what's the rmse");
    }

    #[test]
    fn test_subject_spellings() {
        let extractor = EntityExtractor::new();
        for query in [
            "capacity factor for WF3",
            "capacity factor for wf3",
            "capacity factor for wp3",
            "capacity factor for wind farm 3",
            "capacity factor for farm #3",
        ] {
            assert_eq!(extractor.extract(query).subjects, vec![wf(3)], "{query}");
        }
    }

    #[test]
    fn test_subjects_deduped_in_order() {
        let entities = EntityExtractor::new().extract("wf3 vs WF1, then wf3 again and farm 2");
        assert_eq!(entities.subjects, vec![wf(3), wf(1), wf(2)]);
    }

    #[test]
    fn test_farm_list() {
        let entities = EntityExtractor::new().extract("Compare farms 1, 4 and 6");
        assert_eq!(entities.subjects, vec![wf(1), wf(4), wf(6)]);
    }

    #[test]
    fn test_hour_unit_wins_over_farm_list() {
        let entities = EntityExtractor::new().extract("farm 2 or 3 hours ahead");
        assert_eq!(entities.subjects, vec![wf(2)]);
        assert_eq!(entities.horizons, vec![3]);
    }

    #[test]
    fn test_bare_digit_without_context_is_ignored() {
        let entities = EntityExtractor::new().extract("show me 3 things about 100mw turbines");
        assert!(entities.subjects.is_empty());
    }

    #[test]
    fn test_horizons() {
        let extractor = EntityExtractor::new();
        assert_eq!(extractor.extract("24 hour ahead forecast").horizons, vec![24]);
        assert_eq!(extractor.extract("6h and 12-hour horizons").horizons, vec![6, 12]);
        assert_eq!(extractor.extract("at a horizon of 36").horizons, vec![36]);
        assert_eq!(extractor.extract("horizon of 24 hours").horizons, vec![24]);
    }

    #[test]
    fn test_out_of_range_horizon_rejected() {
        let entities = EntityExtractor::new().extract("RMSE at 72 hours and 0h");
        assert!(entities.horizons.is_empty());
        assert_eq!(entities.rejected.len(), 2);
        assert!(entities.has_conflict());
    }

    #[test]
    fn test_percentages() {
        let extractor = EntityExtractor::new();
        assert_eq!(
            extractor.extract("a 15.5% improvement").percentages,
            vec![15.5]
        );
        assert_eq!(extractor.extract("improve by 20 percent").percentages, vec![20.0]);
        assert_eq!(extractor.extract("0% and 100%").percentages, vec![0.0, 100.0]);
    }

    #[test]
    fn test_out_of_range_percentage_dropped_without_conflict() {
        let entities =
            EntityExtractor::new().extract("Calculate CO2 savings if we improve accuracy by 150%");
        assert!(entities.percentages.is_empty());
        assert!(entities.is_empty());
        assert!(!entities.has_conflict());
        assert_eq!(entities.rejected[0].kind, EntityKind::Percentage);
    }

    #[test]
    fn test_models_in_order_of_appearance() {
        let entities =
            EntityExtractor::new().extract("Is XGBoost better than the LSTM or random_forest?");
        assert_eq!(
            entities.models,
            vec![ModelName::XgBoost, ModelName::Lstm, ModelName::RandomForest]
        );
        assert_eq!(entities.models[0].to_string(), "XGBoost");
    }

    #[test]
    fn test_model_from_label() {
        assert_eq!(ModelName::from_label("Random Forest"), Some(ModelName::RandomForest));
        assert_eq!(ModelName::from_label("seasonal_naive"), Some(ModelName::SeasonalNaive));
        assert_eq!(ModelName::from_label("prophet"), None);
    }

    #[test]
    fn test_nothing_recognized() {
        let entities = EntityExtractor::new().extract("asdfasdf nonsense");
        assert_eq!(entities, EntityMap::default());
    }

    #[test]
    fn test_model_serializes_display_form() {
        let json = serde_json::to_string(&ModelName::SeasonalNaive).unwrap();
        assert_eq!(json, "\"Seasonal Naive\"");
    }
}
