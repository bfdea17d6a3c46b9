//! # windfarm-routing
//!
//! Query routing engine for the wind-farm analytics layer.
//!
//! Everything in this crate is pure and synchronous: no I/O, no shared state.
//!
//! ## Core Concepts
//!
//! - **Entity Extractor**: farm ids, horizons, percentages and model names from free text
//! - **Intent Classifier**: trigger-phrase rule table, multi-intent, `general` floor
//! - **Routing Composer**: lookups, guidance documents, confidence and scaffold
//!
//! ## Usage
//!
//! ```rust
//! use windfarm_routing::{Confidence, EntityExtractor, Intent, IntentClassifier, RoutingComposer};
//!
//! let query = "What's the capacity factor for wind farm wf3?";
//! let intents = IntentClassifier::new().classify(query).intents;
//! let entities = EntityExtractor::new().extract(query);
//! let decision = RoutingComposer::new().compose(&intents, &entities);
//!
//! assert_eq!(decision.intents, vec![Intent::PhysicalCharacteristics]);
//! assert_eq!(decision.confidence, Confidence::High);
//! assert_eq!(decision.lookups[0].to_string(), "capacity_factor/wf3");
//! ```

pub mod classifier;
pub mod composer;
pub mod extractor;
pub mod guidance;
pub mod types;

pub use classifier::{Classification, ClassifierConfig, IntentClassifier, TriggerMatch};
pub use composer::{grade_confidence, route, IntentRoute, RoutingComposer, RoutingDecision};
pub use extractor::{
    normalize, EntityExtractor, EntityKind, EntityMap, ModelName, RejectedEntity, HORIZON_RANGE,
};
pub use guidance::GuidanceDoc;
pub use types::{Confidence, Intent};
