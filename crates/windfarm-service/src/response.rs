//! Response shapes returned by the query service.
//!
//! Every call yields a [`ServiceResponse`]; its body is a tagged union so
//! callers handle the direct and guided cases exhaustively. Serialized, the
//! discriminator appears as `"mode": "direct" | "guided"`.

use std::fmt;

use serde::{Deserialize, Serialize};
use windfarm_routing::{Confidence, EntityMap, Intent, RoutingDecision};
use windfarm_store::MissReason;
use windfarm_types::{Lookup, ResultRecord};

use crate::guidance::GuidanceDocument;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseMode {
    Direct,
    Guided,
}

impl ResponseMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseMode::Direct => "direct",
            ResponseMode::Guided => "guided",
        }
    }
}

impl fmt::Display for ResponseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Every lookup was served from pre-computed records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectResponse {
    pub intents: Vec<Intent>,
    pub entities: EntityMap,
    pub records: Vec<ResultRecord>,
    /// Templated business-context text
    pub context: String,
}

/// A lookup that produced no record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupMiss {
    pub lookup: Lookup,
    #[serde(flatten)]
    pub reason: MissReason,
}

/// Routing metadata only; no computed values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuidedResponse {
    pub decision: RoutingDecision,
    pub guidance: Vec<GuidanceDocument>,
    pub misses: Vec<LookupMiss>,
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ResponseBody {
    Direct(DirectResponse),
    Guided(GuidedResponse),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceResponse {
    /// The query text as received
    pub query: String,
    pub confidence: Confidence,
    /// Wall time spent in the service
    pub latency_ms: u64,
    #[serde(flatten)]
    pub body: ResponseBody,
}

impl ServiceResponse {
    pub fn mode(&self) -> ResponseMode {
        match self.body {
            ResponseBody::Direct(_) => ResponseMode::Direct,
            ResponseBody::Guided(_) => ResponseMode::Guided,
        }
    }

    pub fn direct(&self) -> Option<&DirectResponse> {
        match &self.body {
            ResponseBody::Direct(d) => Some(d),
            ResponseBody::Guided(_) => None,
        }
    }

    pub fn guided(&self) -> Option<&GuidedResponse> {
        match &self.body {
            ResponseBody::Guided(g) => Some(g),
            ResponseBody::Direct(_) => None,
        }
    }

    /// Intents the response was routed by.
    pub fn intents(&self) -> &[Intent] {
        match &self.body {
            ResponseBody::Direct(d) => &d.intents,
            ResponseBody::Guided(g) => &g.decision.intents,
        }
    }

    /// Entities the response was routed by.
    pub fn entities(&self) -> &EntityMap {
        match &self.body {
            ResponseBody::Direct(d) => &d.entities,
            ResponseBody::Guided(g) => &g.decision.entities,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use windfarm_types::ResultType;

    #[test]
    fn test_mode_discriminator_in_json() {
        let response = ServiceResponse {
            query: "q".to_string(),
            confidence: Confidence::Medium,
            latency_ms: 3,
            body: ResponseBody::Direct(DirectResponse {
                intents: vec![Intent::Temporal],
                entities: EntityMap::default(),
                records: vec![],
                context: "ctx".to_string(),
            }),
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["mode"], "direct");
        assert_eq!(json["confidence"], "medium");
        assert_eq!(json["context"], "ctx");
        assert_eq!(response.mode(), ResponseMode::Direct);
        assert!(response.guided().is_none());
    }

    #[test]
    fn test_lookup_miss_flattens_reason() {
        let miss = LookupMiss {
            lookup: Lookup::portfolio(ResultType::Uncertainty),
            reason: MissReason::Timeout { budget_ms: 10 },
        };
        let json = serde_json::to_value(&miss).unwrap();
        assert_eq!(json["reason"], "timeout");
        assert_eq!(json["budget_ms"], 10);
        assert_eq!(json["lookup"]["result_type"], "uncertainty");
    }
}
