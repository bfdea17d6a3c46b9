//! Routing E2E tests: free-text queries through the bootstrapped service.
//!
//! Result files and guidance documents live on disk in a temp directory;
//! the service under test is built exactly as a host process would build it.

use pretty_assertions::assert_eq;

use e2e_tests::TestHarness;
use windfarm_routing::{Confidence, GuidanceDoc, Intent};
use windfarm_service::ResponseMode;
use windfarm_types::{Lookup, ResultType, SubjectId};

fn wf(n: u8) -> SubjectId {
    SubjectId::new(n).unwrap()
}

/// Single intent, single subject, record present: served directly.
#[tokio::test]
async fn test_capacity_factor_for_one_farm_is_direct() {
    let harness = TestHarness::new();
    harness.write_result_file(
        ResultType::CapacityFactor,
        &[
            ("wf1", &[("capacity_factor", 0.281)]),
            ("wf3", &[("capacity_factor", 0.312)]),
            ("portfolio", &[("capacity_factor", 0.297)]),
        ],
    );
    let service = harness.service();

    let response = service
        .handle_text("What's the capacity factor for wind farm wf3?")
        .await;

    assert_eq!(response.mode(), ResponseMode::Direct);
    assert_eq!(response.confidence, Confidence::High);
    assert_eq!(response.intents(), &[Intent::PhysicalCharacteristics]);
    assert_eq!(response.entities().subjects, vec![wf(3)]);

    let direct = response.direct().unwrap();
    assert_eq!(direct.records.len(), 1);
    assert_eq!(direct.records[0].subject, Some(wf(3)));
    assert_eq!(direct.records[0].number("capacity_factor"), Some(0.312));
    assert_eq!(direct.records[0].provenance.source_file, "capacity_factor.json");
    assert!(direct.context.contains("wf3: capacity factor 0.312"));
}

/// Two intents over two subjects expand into four lookups.
#[tokio::test]
async fn test_multi_intent_multi_subject_expansion() {
    let harness = TestHarness::new();
    let service = harness.service();

    let response = service
        .handle_text("Compare capacity factors and check data quality for wf1 and wf3")
        .await;

    assert_eq!(
        response.intents(),
        &[Intent::PhysicalCharacteristics, Intent::DataQuality]
    );
    assert_eq!(response.entities().subjects, vec![wf(1), wf(3)]);
    assert_eq!(response.confidence, Confidence::Medium);

    let guided = response.guided().unwrap();
    assert_eq!(
        guided.decision.lookups,
        vec![
            Lookup::new(ResultType::CapacityFactor, Some(wf(1))),
            Lookup::new(ResultType::CapacityFactor, Some(wf(3))),
            Lookup::new(ResultType::DataQuality, Some(wf(1))),
            Lookup::new(ResultType::DataQuality, Some(wf(3))),
        ]
    );
    assert_eq!(guided.misses.len(), 4);
}

/// Unmatched text falls back to the general intent and never reads a file.
#[tokio::test]
async fn test_nonsense_is_general_and_guided() {
    let harness = TestHarness::new();
    harness.write_guidance(GuidanceDoc::QuickReference, "# Quick reference\nStart here.");
    let service = harness.service();

    let response = service.handle_text("asdfasdf nonsense").await;

    assert_eq!(response.mode(), ResponseMode::Guided);
    assert_eq!(response.confidence, Confidence::Low);
    assert_eq!(response.intents(), &[Intent::General]);
    assert!(response.entities().is_empty());

    let guided = response.guided().unwrap();
    assert!(guided.decision.lookups.is_empty());
    assert_eq!(guided.guidance.len(), 1);
    assert_eq!(guided.guidance[0].content, "# Quick reference\nStart here.");
    assert_eq!(service.status().cache.misses, 0);
}

/// Out-of-range percentage is rejected without lowering confidence.
#[tokio::test]
async fn test_rejected_percentage_still_routes_business_impact() {
    let harness = TestHarness::new();
    harness.write_result_file(
        ResultType::BusinessImpact,
        &[("portfolio", &[("co2_reduction_t", 1200.0)])],
    );
    let service = harness.service();

    let response = service
        .handle_text("Calculate CO2 savings if we improve accuracy by 150%")
        .await;

    assert_eq!(response.intents(), &[Intent::BusinessImpact]);
    assert!(response.entities().percentages.is_empty());
    assert_eq!(response.entities().rejected.len(), 1);
    assert_eq!(response.confidence, Confidence::Medium);
    assert_eq!(response.mode(), ResponseMode::Direct);
}

/// Out-of-range horizon is a conflict: confidence drops to low.
#[tokio::test]
async fn test_rejected_horizon_lowers_confidence() {
    let harness = TestHarness::new();
    let service = harness.service();

    let response = service
        .handle_text("What is the RMSE at 96 hour ahead for wf2?")
        .await;

    assert_eq!(response.intents(), &[Intent::Performance]);
    assert!(response.entities().horizons.is_empty());
    assert_eq!(response.confidence, Confidence::Low);
}
