//! The query service facade.
//!
//! `handle` runs one request end to end:
//!
//! ```text
//! query ──┬─ EntityExtractor ─┐
//!         └─ IntentClassifier ┴─> RoutingComposer ─> RecordLookup (all lookups)
//!                                                      │
//!                      all found ─> direct ◄───────────┤
//!                      any miss  ─> guided ◄───────────┘
//! ```
//!
//! The response is all-or-nothing: one miss among N lookups makes the whole
//! response guided, and no record is returned alongside the guidance.

use std::time::Instant;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use windfarm_routing::{
    EntityExtractor, EntityMap, IntentClassifier, ModelName, RoutingComposer, RoutingDecision,
    HORIZON_RANGE,
};
use windfarm_store::{ReadOutcome, RecordLookup, SearchHit};
use windfarm_types::{ResultType, SubjectId};

use crate::context::business_context;
use crate::guidance::GuidanceLibrary;
use crate::metrics::{MetricsSnapshot, RequestMetrics};
use crate::response::{DirectResponse, GuidedResponse, LookupMiss, ResponseBody, ServiceResponse};
use crate::status::StatusReport;

/// Optional structured overrides accompanying a query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryParams {
    /// Any accepted farm spelling ("3", "WF3", "wind farm 3")
    pub subject: Option<String>,
    /// Pins lookups to one result type
    pub result_type: Option<String>,
    pub horizon: Option<i64>,
    pub percentage: Option<f64>,
    pub model: Option<String>,
}

/// A request: free text plus optional overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub text: String,
    #[serde(default)]
    pub params: QueryParams,
}

impl Query {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            params: QueryParams::default(),
        }
    }

    pub fn with_params(mut self, params: QueryParams) -> Self {
        self.params = params;
        self
    }
}

/// Merge valid overrides into `entities`; returns the pinned result type.
///
/// Invalid overrides are dropped with a warning, never an error.
pub fn apply_overrides(params: &QueryParams, entities: &mut EntityMap) -> Option<ResultType> {
    if let Some(raw) = &params.subject {
        match SubjectId::parse(raw) {
            Some(subject) => entities.push_subject(subject),
            None => warn!(subject = %raw, "Ignoring invalid subject override"),
        }
    }

    if let Some(hours) = params.horizon {
        match u32::try_from(hours) {
            Ok(h) if HORIZON_RANGE.contains(&h) => entities.push_horizon(h as u8),
            _ => warn!(horizon = hours, "Ignoring out-of-range horizon override"),
        }
    }

    if let Some(pct) = params.percentage {
        if (0.0..=100.0).contains(&pct) {
            entities.push_percentage(pct);
        } else {
            warn!(percentage = pct, "Ignoring out-of-range percentage override");
        }
    }

    if let Some(raw) = &params.model {
        match ModelName::from_label(raw) {
            Some(model) => entities.push_model(model),
            None => warn!(model = %raw, "Ignoring unknown model override"),
        }
    }

    params.result_type.as_deref().and_then(|raw| {
        raw.parse::<ResultType>()
            .map_err(|e| warn!(error = %e, "Ignoring result type override"))
            .ok()
    })
}

/// Query service over any record source.
pub struct QueryService<L: RecordLookup> {
    extractor: EntityExtractor,
    classifier: IntentClassifier,
    composer: RoutingComposer,
    lookup: L,
    guidance: GuidanceLibrary,
    metrics: RequestMetrics,
}

impl<L: RecordLookup> QueryService<L> {
    pub fn new(lookup: L, guidance: GuidanceLibrary) -> Self {
        Self {
            extractor: EntityExtractor::new(),
            classifier: IntentClassifier::new(),
            composer: RoutingComposer::new(),
            lookup,
            guidance,
            metrics: RequestMetrics::new(),
        }
    }

    /// Replace the default trigger table.
    pub fn with_classifier(mut self, classifier: IntentClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn lookup(&self) -> &L {
        &self.lookup
    }

    pub fn guidance(&self) -> &GuidanceLibrary {
        &self.guidance
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Plain-text query without overrides.
    pub async fn handle_text(&self, text: &str) -> ServiceResponse {
        self.handle(&Query::new(text)).await
    }

    /// Route one query and serve it directly or as guidance.
    pub async fn handle(&self, query: &Query) -> ServiceResponse {
        let start = Instant::now();

        let (mut entities, classification) = tokio::join!(
            async { self.extractor.extract(&query.text) },
            async { self.classifier.classify(&query.text) },
        );

        let pinned = apply_overrides(&query.params, &mut entities);
        let decision = match pinned {
            Some(result_type) => {
                self.composer
                    .compose_pinned(&classification.intents, &entities, result_type)
            }
            None => self.composer.compose(&classification.intents, &entities),
        };

        debug!(
            query = %query.text,
            intents = ?decision.intents,
            lookups = decision.lookups.len(),
            confidence = %decision.confidence,
            "Query routed"
        );

        let confidence = decision.confidence;
        let body = self.resolve(decision).await;
        let latency = start.elapsed();

        let response = ServiceResponse {
            query: query.text.clone(),
            confidence,
            latency_ms: latency.as_millis() as u64,
            body,
        };

        self.metrics
            .record(response.intents(), response.mode(), latency);

        info!(
            mode = %response.mode(),
            confidence = %response.confidence,
            latency_ms = response.latency_ms,
            "Query handled"
        );

        response
    }

    /// Attempt every lookup; all found is direct, anything else is guided.
    async fn resolve(&self, decision: RoutingDecision) -> ResponseBody {
        if decision.lookups.is_empty() {
            return self.guided(
                decision,
                Vec::new(),
                "No pre-computed result type applies to this query; follow the guidance documents."
                    .to_string(),
            );
        }

        let outcomes = join_all(
            decision
                .lookups
                .iter()
                .map(|l| self.lookup.read(l.subject, l.result_type)),
        )
        .await;

        let mut records = Vec::with_capacity(outcomes.len());
        let mut misses = Vec::new();
        for (lookup, outcome) in decision.lookups.iter().zip(outcomes) {
            match outcome {
                ReadOutcome::Found(record) => records.push((*record).clone()),
                ReadOutcome::NotFound(reason) => misses.push(LookupMiss {
                    lookup: *lookup,
                    reason,
                }),
            }
        }

        if misses.is_empty() {
            let context = business_context(&decision.intents, &records, &decision.entities);
            return ResponseBody::Direct(DirectResponse {
                intents: decision.intents,
                entities: decision.entities,
                records,
                context,
            });
        }

        let detail = misses
            .iter()
            .map(|m| format!("{}: {}", m.lookup, m.reason))
            .collect::<Vec<_>>()
            .join("; ");
        let explanation = format!(
            "{} of {} required results unavailable ({detail}); no partial results are returned.",
            misses.len(),
            decision.lookups.len()
        );
        self.guided(decision, misses, explanation)
    }

    fn guided(
        &self,
        decision: RoutingDecision,
        misses: Vec<LookupMiss>,
        explanation: String,
    ) -> ResponseBody {
        let guidance = self.guidance.documents(&decision.documents);
        ResponseBody::Guided(GuidedResponse {
            decision,
            guidance,
            misses,
            explanation,
        })
    }

    /// Find the result types whose data mentions any word of `text`.
    ///
    /// Words shorter than two characters are ignored. Nothing is routed or
    /// counted in the request metrics.
    pub async fn search_results(&self, text: &str) -> Vec<SearchHit> {
        let terms: Vec<String> = text
            .split(|c: char| !(c.is_alphanumeric() || c == '_'))
            .filter(|word| word.chars().count() >= 2)
            .map(str::to_lowercase)
            .collect();
        if terms.is_empty() {
            return Vec::new();
        }

        let hits = self.lookup.search(&terms).await;
        info!(
            terms = terms.len(),
            hits = hits.len(),
            best = hits.first().map(|h| h.result_type.as_str()).unwrap_or("none"),
            "Searched result sources"
        );
        hits
    }

    /// Introspection: result-type states, cache statistics, request counters.
    pub fn status(&self) -> StatusReport {
        StatusReport::build(
            self.lookup.status(),
            self.metrics.snapshot(),
            self.guidance.missing(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::ResponseMode;
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeMap;
    use std::time::Duration;
    use windfarm_routing::{Confidence, GuidanceDoc, Intent};
    use windfarm_store::{MissReason, MockRecordLookup};
    use windfarm_types::{Lookup, MetricValue, Provenance, QualityFlag, ResultRecord};

    fn record(result_type: ResultType, subject: Option<u8>, metrics: &[(&str, f64)]) -> ResultRecord {
        ResultRecord {
            result_type,
            subject: subject.and_then(SubjectId::new),
            metrics: metrics
                .iter()
                .map(|(k, v)| (k.to_string(), MetricValue::Number(*v)))
                .collect::<BTreeMap<_, _>>(),
            provenance: Provenance {
                source_file: result_type.file_name(),
                source: "test".to_string(),
                generated_at: Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
            },
            quality: QualityFlag::Ok,
        }
    }

    fn service(mock: MockRecordLookup) -> QueryService<MockRecordLookup> {
        QueryService::new(mock, GuidanceLibrary::placeholders())
    }

    #[tokio::test]
    async fn test_direct_when_record_exists() {
        let svc = service(MockRecordLookup::default().with_record(record(
            ResultType::CapacityFactor,
            Some(3),
            &[("capacity_factor", 0.312)],
        )));

        let response = svc
            .handle_text("What's the capacity factor for wind farm wf3?")
            .await;
        assert_eq!(response.mode(), ResponseMode::Direct);
        assert_eq!(response.confidence, Confidence::High);

        let direct = response.direct().unwrap();
        assert_eq!(direct.records.len(), 1);
        assert_eq!(direct.records[0].number("capacity_factor"), Some(0.312));
        assert!(direct.context.contains("2733.1 MWh"));
    }

    #[tokio::test]
    async fn test_one_miss_makes_everything_guided() {
        let svc = service(
            MockRecordLookup::default()
                .with_record(record(ResultType::CapacityFactor, Some(1), &[("capacity_factor", 0.28)]))
                .with_record(record(ResultType::CapacityFactor, Some(3), &[("capacity_factor", 0.31)]))
                .with_record(record(ResultType::DataQuality, Some(1), &[("missing_pct", 0.4)])),
        );

        let response = svc
            .handle_text("Compare capacity factors and check data quality for wf1 and wf3")
            .await;
        assert_eq!(response.mode(), ResponseMode::Guided);

        let guided = response.guided().unwrap();
        assert_eq!(guided.decision.lookups.len(), 4);
        assert_eq!(guided.misses.len(), 1);
        assert_eq!(
            guided.misses[0].lookup,
            Lookup::new(ResultType::DataQuality, SubjectId::new(3))
        );
        assert!(guided.explanation.starts_with("1 of 4 required results unavailable"));
        assert_eq!(
            guided.guidance.iter().map(|g| g.id).collect::<Vec<_>>(),
            vec![GuidanceDoc::PowerCurveAnalysis, GuidanceDoc::DataQuality]
        );
    }

    #[tokio::test]
    async fn test_general_is_guided_without_reads() {
        let svc = service(MockRecordLookup::default());
        let response = svc.handle_text("asdfasdf nonsense").await;

        assert_eq!(response.mode(), ResponseMode::Guided);
        assert_eq!(response.confidence, Confidence::Low);
        assert_eq!(response.intents(), &[Intent::General]);
        assert_eq!(svc.lookup().read_count(), 0);
        assert!(response.guided().unwrap().misses.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_miss_reason_is_reported() {
        let svc = service(MockRecordLookup::default().with_miss(
            Lookup::portfolio(ResultType::Uncertainty),
            MissReason::CorruptSource {
                detail: "Parse error".to_string(),
            },
        ));
        let response = svc.handle_text("Show the prediction interval coverage").await;
        let guided = response.guided().unwrap();
        assert!(matches!(
            guided.misses[0].reason,
            MissReason::CorruptSource { .. }
        ));
    }

    #[tokio::test]
    async fn test_idempotent_modulo_latency() {
        let svc = service(MockRecordLookup::default().with_record(record(
            ResultType::BusinessImpact,
            None,
            &[("co2_reduction_t", 1000.0)],
        )));
        let query = "Calculate CO2 savings if we improve accuracy by 150%";

        let mut first = svc.handle_text(query).await;
        let mut second = svc.handle_text(query).await;
        first.latency_ms = 0;
        second.latency_ms = 0;
        assert_eq!(first, second);
        assert_eq!(first.confidence, Confidence::Medium);
        assert!(first.entities().percentages.is_empty());
    }

    #[tokio::test]
    async fn test_overrides_pin_and_merge() {
        let svc = service(MockRecordLookup::default().with_record(record(
            ResultType::PowerCurve,
            Some(2),
            &[("rated_speed_ms", 12.5)],
        )));
        let query = Query::new("Describe the power curve").with_params(QueryParams {
            subject: Some("WF2".to_string()),
            result_type: Some("power_curve".to_string()),
            horizon: Some(96),
            ..Default::default()
        });

        let response = svc.handle(&query).await;
        assert_eq!(response.mode(), ResponseMode::Direct);
        assert_eq!(response.entities().subjects, vec![SubjectId::new(2).unwrap()]);
        assert!(response.entities().horizons.is_empty());
        assert_eq!(response.confidence, Confidence::High);
    }

    #[test]
    fn test_apply_overrides_validation() {
        let mut entities = EntityMap::default();
        let pinned = apply_overrides(
            &QueryParams {
                subject: Some("nope".to_string()),
                result_type: Some("no_such_type".to_string()),
                horizon: Some(12),
                percentage: Some(120.0),
                model: Some("random forest".to_string()),
            },
            &mut entities,
        );
        assert_eq!(pinned, None);
        assert!(entities.subjects.is_empty());
        assert_eq!(entities.horizons, vec![12]);
        assert!(entities.percentages.is_empty());
        assert_eq!(entities.models, vec![ModelName::RandomForest]);
    }

    #[tokio::test]
    async fn test_metrics_recorded_per_intent() {
        let svc = service(MockRecordLookup::default());
        svc.handle_text("RMSE and CO2 for the portfolio").await;
        svc.handle_text("hello").await;

        let metrics = svc.metrics();
        assert_eq!(metrics.total(), 2);
        assert_eq!(metrics.guided, 2);
        assert_eq!(metrics.per_intent[&Intent::Performance].requests, 1);
        assert_eq!(metrics.per_intent[&Intent::BusinessImpact].requests, 1);
        assert_eq!(metrics.per_intent[&Intent::General].requests, 1);
    }

    #[tokio::test]
    async fn test_lookups_run_concurrently() {
        let mut mock = MockRecordLookup::default().with_delay(Duration::from_millis(100));
        for n in 1..=4u8 {
            mock = mock.with_record(record(ResultType::TemporalPatterns, Some(n), &[("ramp_rate", 0.1)]));
        }
        let svc = service(mock);

        let start = std::time::Instant::now();
        let response = svc
            .handle_text("Temporal patterns for wf1, wf2, wf3 and wf4")
            .await;
        assert_eq!(response.mode(), ResponseMode::Direct);
        assert_eq!(response.direct().unwrap().records.len(), 4);
        assert!(start.elapsed() < Duration::from_millis(350));
    }

    #[tokio::test]
    async fn test_search_results_splits_words() {
        let svc = service(
            MockRecordLookup::default()
                .with_record(record(ResultType::CapacityFactor, Some(3), &[("capacity_factor", 0.31)]))
                .with_record(record(ResultType::ForecastPerformance, Some(2), &[("rmse", 0.12)])),
        );

        let hits = svc.search_results("Which files mention RMSE?").await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].result_type, ResultType::ForecastPerformance);
        assert_eq!(hits[0].columns, vec!["rmse".to_string()]);

        let hits = svc.search_results("capacity, wf2").await;
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].result_type, ResultType::CapacityFactor);

        assert!(svc.search_results("a ? !").await.is_empty());
        assert_eq!(svc.metrics().total(), 0);
    }
}
