//! Service introspection report.

use serde::{Deserialize, Serialize};
use windfarm_routing::GuidanceDoc;
use windfarm_store::{CacheStats, ResultTypeStatus, SourceState, StoreStatus};
use windfarm_types::SubjectId;

use crate::metrics::MetricsSnapshot;

/// Snapshot of the service's data sources and counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    pub result_types: Vec<ResultTypeStatus>,
    pub populated: usize,
    pub pending: usize,
    pub corrupt: usize,
    pub cache: CacheStats,
    pub subjects: Vec<SubjectId>,
    pub requests: MetricsSnapshot,
    /// Guidance documents served as placeholders
    pub guidance_missing: Vec<GuidanceDoc>,
}

impl StatusReport {
    pub fn build(store: StoreStatus, requests: MetricsSnapshot, guidance_missing: &[GuidanceDoc]) -> Self {
        let count = |state: SourceState| {
            store
                .result_types
                .iter()
                .filter(|s| s.state == state)
                .count()
        };
        let populated = count(SourceState::Populated);
        let pending = count(SourceState::Pending);
        let corrupt = count(SourceState::Corrupt);

        Self {
            result_types: store.result_types,
            populated,
            pending,
            corrupt,
            cache: store.cache,
            subjects: store.subjects,
            requests,
            guidance_missing: guidance_missing.to_vec(),
        }
    }

    /// True once every result type has a decodable file.
    pub fn is_complete(&self) -> bool {
        self.pending == 0 && self.corrupt == 0
    }
}
