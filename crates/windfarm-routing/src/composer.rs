//! Routing composition.
//!
//! Turns classified intents plus extracted entities into a [`RoutingDecision`]:
//! the (result type, subject) lookups to attempt, the guidance documents to
//! fall back on, a confidence grade and a deterministic response scaffold.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use tracing::debug;
use windfarm_types::{Lookup, ResultType, SubjectId};

use crate::extractor::EntityMap;
use crate::guidance::GuidanceDoc;
use crate::types::{Confidence, Intent};

const RESPONSE_TEMPLATE: &str = "## RESPONSE TEMPLATE
Structure your response as:

1. **Direct Answer**: Specific metric or finding
2. **Source**: Which analysis artifact and section
3. **Methodology**: How the result was calculated
4. **Business Context**: Why this matters for sustainability
5. **Confidence Level**: High/Medium/Low based on data quality
6. **Next Steps**: Related analyses to consider
";

/// Static routing entry for one intent.
#[derive(Debug, Clone, Copy)]
pub struct IntentRoute {
    /// Canonical result type; `None` for `general`
    pub result_type: Option<ResultType>,
    pub documents: &'static [GuidanceDoc],
    pub heading: &'static str,
}

/// The hand-authored intent table.
pub fn route(intent: Intent) -> IntentRoute {
    let (result_type, documents, heading): (_, &'static [GuidanceDoc], _) = match intent {
        Intent::Performance => (
            Some(ResultType::ForecastPerformance),
            &[GuidanceDoc::ForecastPerformance],
            "FORECAST PERFORMANCE ANALYSIS",
        ),
        Intent::PhysicalCharacteristics => (
            Some(ResultType::CapacityFactor),
            &[GuidanceDoc::PowerCurveAnalysis],
            "POWER CURVE ANALYSIS",
        ),
        Intent::Temporal => (
            Some(ResultType::TemporalPatterns),
            &[GuidanceDoc::TemporalPatterns],
            "TEMPORAL PATTERN ANALYSIS",
        ),
        Intent::BusinessImpact => (
            Some(ResultType::BusinessImpact),
            &[GuidanceDoc::BusinessImpact],
            "BUSINESS IMPACT ANALYSIS",
        ),
        Intent::Uncertainty => (
            Some(ResultType::Uncertainty),
            &[GuidanceDoc::UncertaintyQuantification],
            "UNCERTAINTY ANALYSIS",
        ),
        Intent::ErrorDiagnosis => (
            Some(ResultType::ErrorDiagnosis),
            &[GuidanceDoc::ErrorDiagnosis],
            "ERROR DIAGNOSIS",
        ),
        Intent::Comparison => (
            Some(ResultType::ModelComparison),
            &[GuidanceDoc::ModelComparison, GuidanceDoc::ForecastPerformance],
            "MODEL COMPARISON ANALYSIS",
        ),
        Intent::DataQuality => (
            Some(ResultType::DataQuality),
            &[GuidanceDoc::DataQuality],
            "DATA QUALITY ANALYSIS",
        ),
        Intent::FeatureImportance => (
            Some(ResultType::FeatureImportance),
            &[GuidanceDoc::FeatureImportance],
            "FEATURE IMPORTANCE ANALYSIS",
        ),
        Intent::General => (None, &[GuidanceDoc::QuickReference], "GENERAL ANALYSIS"),
    };

    IntentRoute {
        result_type,
        documents,
        heading,
    }
}

/// Output of the composer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingDecision {
    /// Matched intents, priority order
    pub intents: Vec<Intent>,

    /// Entities that shaped the lookups
    pub entities: EntityMap,

    /// Lookups to attempt, deduplicated, intent-priority order
    pub lookups: Vec<Lookup>,

    /// Guidance documents to fall back on
    pub documents: Vec<GuidanceDoc>,

    /// Analysis artifacts named by the documents
    pub artifacts: Vec<String>,

    /// Metric/code patterns worth looking for
    pub patterns_to_find: Vec<String>,

    pub confidence: Confidence,

    /// Natural-language scaffold for the consumer's answer
    pub scaffold: String,
}

/// Grade how unambiguous a classification was.
///
/// - `general` fallback or a rejected horizon: low
/// - one intent: high with entities, medium without
/// - several intents: medium with entities, low without
pub fn grade_confidence(intents: &[Intent], entities: &EntityMap) -> Confidence {
    let fell_back = intents.is_empty() || intents.contains(&Intent::General);
    if fell_back || entities.has_conflict() {
        return Confidence::Low;
    }

    match (intents.len(), entities.is_empty()) {
        (1, false) => Confidence::High,
        (1, true) => Confidence::Medium,
        (_, false) => Confidence::Medium,
        (_, true) => Confidence::Low,
    }
}

/// Assembles routing decisions from the static intent table.
#[derive(Debug, Clone, Default)]
pub struct RoutingComposer;

impl RoutingComposer {
    pub fn new() -> Self {
        Self
    }

    /// Compose a decision using each intent's canonical result type.
    pub fn compose(&self, intents: &[Intent], entities: &EntityMap) -> RoutingDecision {
        let result_types: Vec<ResultType> = intents
            .iter()
            .filter_map(|i| route(*i).result_type)
            .collect();
        self.assemble(intents, entities, &result_types)
    }

    /// Compose a decision whose lookups are pinned to a single result type.
    ///
    /// Documents and confidence still follow the classified intents.
    pub fn compose_pinned(
        &self,
        intents: &[Intent],
        entities: &EntityMap,
        result_type: ResultType,
    ) -> RoutingDecision {
        self.assemble(intents, entities, &[result_type])
    }

    fn assemble(
        &self,
        intents: &[Intent],
        entities: &EntityMap,
        result_types: &[ResultType],
    ) -> RoutingDecision {
        let lookups = expand_lookups(result_types, &entities.subjects);

        let mut documents: Vec<GuidanceDoc> = Vec::new();
        for intent in intents {
            for doc in route(*intent).documents {
                if !documents.contains(doc) {
                    documents.push(*doc);
                }
            }
        }

        let artifacts = unique_strings(documents.iter().flat_map(|d| d.artifacts().iter()));
        let patterns_to_find = unique_strings(documents.iter().flat_map(|d| d.look_for().iter()));
        let confidence = grade_confidence(intents, entities);
        let scaffold = build_scaffold(intents, entities, &documents);

        debug!(
            intents = ?intents,
            lookups = lookups.len(),
            documents = documents.len(),
            confidence = %confidence,
            "Routing decision composed"
        );

        RoutingDecision {
            intents: intents.to_vec(),
            entities: entities.clone(),
            lookups,
            documents,
            artifacts,
            patterns_to_find,
            confidence,
            scaffold,
        }
    }
}

/// One lookup per (result type, subject); portfolio when no subject.
fn expand_lookups(result_types: &[ResultType], subjects: &[SubjectId]) -> Vec<Lookup> {
    let mut lookups: Vec<Lookup> = Vec::new();
    for result_type in result_types {
        let candidates: Vec<Lookup> = if subjects.is_empty() {
            vec![Lookup::portfolio(*result_type)]
        } else {
            subjects
                .iter()
                .map(|s| Lookup::new(*result_type, Some(*s)))
                .collect()
        };
        for lookup in candidates {
            if !lookups.contains(&lookup) {
                lookups.push(lookup);
            }
        }
    }
    lookups
}

fn unique_strings<'a>(items: impl Iterator<Item = &'a &'static str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for item in items {
        if !out.iter().any(|s| s == item) {
            out.push(item.to_string());
        }
    }
    out
}

fn build_scaffold(intents: &[Intent], entities: &EntityMap, documents: &[GuidanceDoc]) -> String {
    let mut out = String::new();

    for intent in intents {
        let route = route(*intent);
        let _ = writeln!(out, "## {}", route.heading);
        for doc in route.documents {
            let _ = writeln!(out, "Consult: {} ({})", doc.title(), doc.file_name());
        }
        out.push('\n');
    }

    if !entities.is_empty() {
        out.push_str("## ENTITY-SPECIFIC GUIDANCE\n");
        if !entities.subjects.is_empty() {
            let subjects: Vec<String> = entities.subjects.iter().map(ToString::to_string).collect();
            let _ = writeln!(out, "Focus specifically on: {}", subjects.join(", "));
        }
        if !entities.horizons.is_empty() {
            let horizons: Vec<String> = entities.horizons.iter().map(ToString::to_string).collect();
            let _ = writeln!(out, "Analyze forecast horizons: {} hours", horizons.join(", "));
        }
        if !entities.percentages.is_empty() {
            let pcts: Vec<String> = entities.percentages.iter().map(ToString::to_string).collect();
            let _ = writeln!(out, "Apply improvement percentages: {}%", pcts.join(", "));
        }
        if !entities.models.is_empty() {
            let models: Vec<String> = entities.models.iter().map(ToString::to_string).collect();
            let _ = writeln!(out, "Focus on models: {}", models.join(", "));
        }
        out.push('\n');
    }

    if documents.is_empty() {
        out.push_str("No guidance documents apply.\n\n");
    }

    out.push_str(RESPONSE_TEMPLATE);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::IntentClassifier;
    use crate::extractor::EntityExtractor;

    fn decide(query: &str) -> RoutingDecision {
        let intents = IntentClassifier::new().classify(query).intents;
        let entities = EntityExtractor::new().extract(query);
        RoutingComposer::new().compose(&intents, &entities)
    }

    fn wf(n: u8) -> Option<SubjectId> {
        SubjectId::new(n)
    }

    #[test]
    fn test_single_intent_single_subject() {
        let decision = decide("What's the capacity factor for wind farm wf3?");
        assert_eq!(decision.intents, vec![Intent::PhysicalCharacteristics]);
        assert_eq!(
            decision.lookups,
            vec![Lookup::new(ResultType::CapacityFactor, wf(3))]
        );
        assert_eq!(decision.confidence, Confidence::High);
        assert_eq!(decision.documents, vec![GuidanceDoc::PowerCurveAnalysis]);
        assert!(decision.scaffold.contains("Focus specifically on: wf3"));
    }

    #[test]
    fn test_two_intents_two_subjects() {
        let decision = decide("Compare capacity factors and check data quality for wf1 and wf3");
        assert_eq!(
            decision.lookups,
            vec![
                Lookup::new(ResultType::CapacityFactor, wf(1)),
                Lookup::new(ResultType::CapacityFactor, wf(3)),
                Lookup::new(ResultType::DataQuality, wf(1)),
                Lookup::new(ResultType::DataQuality, wf(3)),
            ]
        );
        assert_eq!(decision.confidence, Confidence::Medium);
    }

    #[test]
    fn test_general_has_no_lookups() {
        let decision = decide("asdfasdf nonsense");
        assert_eq!(decision.intents, vec![Intent::General]);
        assert!(decision.lookups.is_empty());
        assert_eq!(decision.documents, vec![GuidanceDoc::QuickReference]);
        assert_eq!(decision.confidence, Confidence::Low);
        assert!(decision.scaffold.contains("## GENERAL ANALYSIS"));
    }

    #[test]
    fn test_business_without_entities_is_portfolio_medium() {
        let decision = decide("Calculate CO2 savings if we improve accuracy by 150%");
        assert_eq!(
            decision.lookups,
            vec![Lookup::portfolio(ResultType::BusinessImpact)]
        );
        assert!(decision.entities.percentages.is_empty());
        assert_eq!(decision.confidence, Confidence::Medium);
    }

    #[test]
    fn test_subject_spellings_give_same_decision() {
        let a = decide("capacity factor for farm 3");
        let b = decide("capacity factor for WF3");
        let c = decide("capacity factor for wf3");
        assert_eq!(a.lookups, b.lookups);
        assert_eq!(b, c);
    }

    #[test]
    fn test_rejected_horizon_lowers_confidence() {
        let decision = decide("RMSE for wf2 at 72 hours ahead");
        assert_eq!(decision.intents, vec![Intent::Performance]);
        assert_eq!(decision.confidence, Confidence::Low);
    }

    #[test]
    fn test_duplicate_lookups_collapse() {
        let entities = EntityMap {
            subjects: vec![SubjectId::new(2).unwrap()],
            ..Default::default()
        };
        let decision = RoutingComposer::new().compose_pinned(
            &[Intent::Performance, Intent::Comparison],
            &entities,
            ResultType::ForecastPerformance,
        );
        assert_eq!(
            decision.lookups,
            vec![Lookup::new(ResultType::ForecastPerformance, wf(2))]
        );
        assert_eq!(
            decision.documents,
            vec![GuidanceDoc::ForecastPerformance, GuidanceDoc::ModelComparison]
        );
    }

    #[test]
    fn test_comparison_without_subjects_is_portfolio() {
        let decision = decide("Which model is best overall?");
        assert!(decision
            .lookups
            .contains(&Lookup::portfolio(ResultType::ModelComparison)));
        assert!(decision.lookups.iter().all(|l| l.subject.is_none()));
    }

    #[test]
    fn test_patterns_are_deduplicated() {
        let decision = RoutingComposer::new().compose(
            &[Intent::Performance, Intent::Comparison],
            &EntityMap::default(),
        );
        let rmse = decision
            .patterns_to_find
            .iter()
            .filter(|p| p.as_str() == "rmse")
            .count();
        assert_eq!(rmse, 1);
        assert!(decision
            .artifacts
            .contains(&"10_model_evaluation.ipynb".to_string()));
    }

    #[test]
    fn test_grade_confidence_table() {
        let some = EntityMap {
            horizons: vec![24],
            ..Default::default()
        };
        let none = EntityMap::default();
        let multi = [Intent::Performance, Intent::Uncertainty];

        assert_eq!(grade_confidence(&[Intent::Temporal], &some), Confidence::High);
        assert_eq!(grade_confidence(&[Intent::Temporal], &none), Confidence::Medium);
        assert_eq!(grade_confidence(&multi, &some), Confidence::Medium);
        assert_eq!(grade_confidence(&multi, &none), Confidence::Low);
        assert_eq!(grade_confidence(&[Intent::General], &some), Confidence::Low);
    }

    #[test]
    fn test_scaffold_ends_with_template() {
        let decision = decide("hourly ramp statistics for wf4 at 6h with the LSTM");
        assert!(decision.scaffold.contains("Analyze forecast horizons: 6 hours"));
        assert!(decision.scaffold.contains("Focus on models: LSTM"));
        assert!(decision.scaffold.ends_with(RESPONSE_TEMPLATE));
    }
}
