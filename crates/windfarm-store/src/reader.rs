//! Cached reader over the result registry.
//!
//! ## Read path
//!
//! 1. LRU cache hit: served immediately
//! 2. Result type already known corrupt: `CorruptSource`, no I/O
//! 3. No file at scan time: `Absent`
//! 4. Otherwise the file is decoded on the blocking pool under the read
//!    budget; the requested row is cached, other rows are not
//!
//! A decode failure marks the whole result type corrupt for the rest of the
//! process. Budget overruns are not remembered: the next read tries again.
//!
//! Every registered file is surveyed once when the store is built, so status
//! reports subjects, row counts and metric columns before any query runs.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use tracing::{debug, info, warn};
use windfarm_types::{Lookup, ResultRecord, ResultType, Settings, SubjectId};

use crate::cache::{CacheStats, RecordCache};
use crate::codec::decode_records;
use crate::error::StoreError;
use crate::lookup::{
    rank_hits, search_records, MissReason, ReadOutcome, RecordLookup, ResultTypeStatus,
    SearchHit, SourceState, SourceSummary, StoreStatus,
};
use crate::registry::ResultRegistry;

/// Blocking load of one result file: `(path, result_type, max_bytes)`.
pub type SourceLoader =
    Arc<dyn Fn(&Path, ResultType, u64) -> Result<Vec<ResultRecord>, StoreError> + Send + Sync>;

/// Tuning knobs for [`ResultStore`].
#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub cache_capacity: usize,
    pub read_budget: Duration,
    pub max_source_bytes: u64,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            cache_capacity: 256,
            read_budget: Duration::from_millis(2000),
            max_source_bytes: 64 * 1024 * 1024,
        }
    }
}

impl From<&Settings> for StoreOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            cache_capacity: settings.cache_capacity,
            read_budget: settings.read_budget(),
            max_source_bytes: settings.max_source_bytes,
        }
    }
}

/// Read-only, cached access to pre-computed result records.
pub struct ResultStore {
    registry: ResultRegistry,
    cache: RecordCache,
    /// Result types that failed to decode, with the failure detail
    corrupt: DashMap<ResultType, String>,
    /// Subjects seen in successfully decoded files
    subjects: DashSet<SubjectId>,
    /// Shape of each file that decoded when the store was built
    summaries: BTreeMap<ResultType, SourceSummary>,
    loader: SourceLoader,
    options: StoreOptions,
}

impl ResultStore {
    pub fn new(registry: ResultRegistry, options: StoreOptions) -> Self {
        Self::with_loader(registry, options, Arc::new(read_file))
    }

    /// Build a store whose files are loaded through `loader`.
    pub fn with_loader(
        registry: ResultRegistry,
        options: StoreOptions,
        loader: SourceLoader,
    ) -> Self {
        let subjects = DashSet::new();
        let mut summaries = BTreeMap::new();

        for result_type in registry.populated() {
            let Some(path) = registry.path(result_type) else {
                continue;
            };
            match loader(path, result_type, options.max_source_bytes) {
                Ok(records) => {
                    for subject in records.iter().filter_map(|r| r.subject) {
                        subjects.insert(subject);
                    }
                    let bytes = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
                    summaries.insert(result_type, SourceSummary::of(bytes, &records));
                }
                Err(err) => {
                    warn!(result_type = %result_type, error = %err, "Result file not surveyed");
                }
            }
        }

        info!(
            surveyed = summaries.len(),
            subjects = subjects.len(),
            "Surveyed result files"
        );

        Self {
            cache: RecordCache::new(options.cache_capacity),
            registry,
            corrupt: DashMap::new(),
            subjects,
            summaries,
            loader,
            options,
        }
    }

    /// Scan `settings.data_dir` and build a store over it.
    pub fn open(settings: &Settings) -> Self {
        let registry = ResultRegistry::scan(&settings.data_path());
        Self::new(registry, StoreOptions::from(settings))
    }

    pub fn registry(&self) -> &ResultRegistry {
        &self.registry
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Subjects present in any decodable file, sorted.
    pub fn known_subjects(&self) -> Vec<SubjectId> {
        let mut subjects: Vec<SubjectId> = self.subjects.iter().map(|s| *s).collect();
        subjects.sort();
        subjects
    }

    /// Shape of `result_type`'s file, if it decoded when the store was built.
    pub fn summary(&self, result_type: ResultType) -> Option<&SourceSummary> {
        self.summaries.get(&result_type)
    }

    /// Read one record. Never fails; misses carry their reason.
    pub async fn read(&self, subject: Option<SubjectId>, result_type: ResultType) -> ReadOutcome {
        let lookup = Lookup::new(result_type, subject);

        if let Some(record) = self.cache.get(&lookup) {
            debug!(lookup = %lookup, "Result cache hit");
            return ReadOutcome::Found(record);
        }

        match self.load(result_type).await {
            Ok(records) => self.admit(lookup, records),
            Err(reason) => ReadOutcome::NotFound(reason),
        }
    }

    /// Search every readable result file for `terms`, best match first.
    ///
    /// Files are loaded under the same budget as reads; rows are not cached.
    pub async fn search(&self, terms: &[String]) -> Vec<SearchHit> {
        let mut hits = Vec::new();
        for result_type in self.registry.populated() {
            match self.load(result_type).await {
                Ok(records) => hits.extend(search_records(result_type, &records, terms)),
                Err(reason) => {
                    debug!(result_type = %result_type, reason = %reason, "Skipped in search");
                }
            }
        }
        rank_hits(&mut hits);
        hits
    }

    /// Load every row of `result_type` under the read budget.
    async fn load(&self, result_type: ResultType) -> Result<Vec<ResultRecord>, MissReason> {
        if let Some(detail) = self.corrupt.get(&result_type) {
            return Err(MissReason::CorruptSource {
                detail: detail.clone(),
            });
        }

        let Some(path) = self.registry.path(result_type) else {
            return Err(MissReason::Absent);
        };

        let limit = self.options.max_source_bytes;
        let path = path.to_path_buf();
        let loader = Arc::clone(&self.loader);
        let task = tokio::task::spawn_blocking(move || loader(&path, result_type, limit));

        let loaded = match tokio::time::timeout(self.options.read_budget, task).await {
            Ok(joined) => joined.map_err(StoreError::from).and_then(|decoded| decoded),
            Err(_) => {
                warn!(result_type = %result_type, "Result read exceeded budget");
                return Err(self.timeout_reason());
            }
        };

        match loaded {
            Ok(records) => Ok(records),
            Err(StoreError::Oversized { bytes, limit }) => {
                warn!(result_type = %result_type, bytes, limit, "Result file exceeds size limit");
                Err(self.timeout_reason())
            }
            Err(err) => Err(self.mark_corrupt(result_type, err)),
        }
    }

    fn admit(&self, lookup: Lookup, records: Vec<ResultRecord>) -> ReadOutcome {
        for record in &records {
            if let Some(subject) = record.subject {
                self.subjects.insert(subject);
            }
        }

        match records.into_iter().find(|r| r.lookup() == lookup) {
            Some(record) => {
                let record = Arc::new(record);
                self.cache.insert(Arc::clone(&record));
                debug!(lookup = %lookup, "Result loaded into cache");
                ReadOutcome::Found(record)
            }
            None => ReadOutcome::NotFound(MissReason::Absent),
        }
    }

    fn timeout_reason(&self) -> MissReason {
        MissReason::Timeout {
            budget_ms: self.options.read_budget.as_millis() as u64,
        }
    }

    fn mark_corrupt(&self, result_type: ResultType, err: StoreError) -> MissReason {
        let detail = err.to_string();
        // Only the first failure per result type is logged.
        let first = self
            .corrupt
            .insert(result_type, detail.clone())
            .is_none();
        if first {
            warn!(
                result_type = %result_type,
                error = %detail,
                "Corrupt result source; serving guided responses until redeploy"
            );
        }
        MissReason::CorruptSource { detail }
    }
}

/// Blocking read + decode of one result file.
fn read_file(
    path: &Path,
    result_type: ResultType,
    limit: u64,
) -> Result<Vec<ResultRecord>, StoreError> {
    let bytes = std::fs::metadata(path)?.len();
    if bytes > limit {
        return Err(StoreError::Oversized { bytes, limit });
    }

    let contents = std::fs::read(path)?;
    let source_file = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| result_type.file_name());
    decode_records(result_type, &source_file, &contents)
}

#[async_trait]
impl RecordLookup for ResultStore {
    async fn read(&self, subject: Option<SubjectId>, result_type: ResultType) -> ReadOutcome {
        ResultStore::read(self, subject, result_type).await
    }

    fn status(&self) -> StoreStatus {
        let result_types = ResultType::ALL
            .into_iter()
            .map(|result_type| {
                let state = if self.corrupt.contains_key(&result_type) {
                    SourceState::Corrupt
                } else if self.registry.contains(result_type) {
                    SourceState::Populated
                } else {
                    SourceState::Pending
                };
                let summary = match state {
                    SourceState::Populated => self.summaries.get(&result_type).cloned(),
                    SourceState::Pending | SourceState::Corrupt => None,
                };
                ResultTypeStatus {
                    result_type,
                    state,
                    summary,
                }
            })
            .collect();

        StoreStatus {
            result_types,
            cache: self.cache.stats(),
            subjects: self.known_subjects(),
        }
    }

    async fn search(&self, terms: &[String]) -> Vec<SearchHit> {
        ResultStore::search(self, terms).await
    }
}
