//! Per-intent request counters.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use windfarm_routing::Intent;

use crate::response::ResponseMode;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentStats {
    pub requests: u64,
    pub total_latency_us: u64,
}

impl IntentStats {
    pub fn mean_latency_ms(&self) -> f64 {
        if self.requests == 0 {
            return 0.0;
        }
        self.total_latency_us as f64 / self.requests as f64 / 1000.0
    }
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub per_intent: BTreeMap<Intent, IntentStats>,
    pub direct: u64,
    pub guided: u64,
}

impl MetricsSnapshot {
    pub fn total(&self) -> u64 {
        self.direct + self.guided
    }
}

/// Request counters shared by concurrent calls.
#[derive(Debug, Default)]
pub struct RequestMetrics {
    per_intent: DashMap<Intent, IntentStats>,
    direct: AtomicU64,
    guided: AtomicU64,
}

impl RequestMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one request against each of its intents.
    pub fn record(&self, intents: &[Intent], mode: ResponseMode, latency: Duration) {
        let micros = latency.as_micros().min(u64::MAX as u128) as u64;
        for intent in intents {
            let mut stats = self.per_intent.entry(*intent).or_default();
            stats.requests += 1;
            stats.total_latency_us = stats.total_latency_us.saturating_add(micros);
        }

        let counter = match mode {
            ResponseMode::Direct => &self.direct,
            ResponseMode::Guided => &self.guided,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            per_intent: self
                .per_intent
                .iter()
                .map(|entry| (*entry.key(), *entry.value()))
                .collect(),
            direct: self.direct.load(Ordering::Relaxed),
            guided: self.guided.load(Ordering::Relaxed),
        }
    }
}
