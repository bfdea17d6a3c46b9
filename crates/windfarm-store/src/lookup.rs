//! The read contract between the query service and the result store.
//!
//! [`RecordLookup`] is the seam the service is generic over; [`ResultStore`]
//! implements it against files on disk and [`MockRecordLookup`] scripts hits,
//! misses and latency for tests.
//!
//! [`ResultStore`]: crate::ResultStore

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use windfarm_types::{subject_label, Lookup, MetricValue, ResultRecord, ResultType, SubjectId};

use crate::cache::CacheStats;

/// Why a lookup produced no record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum MissReason {
    /// No file for the result type, or no row for the subject
    Absent,
    /// The file exists but cannot be decoded; not retried this run
    CorruptSource { detail: String },
    /// The read exceeded its budget
    Timeout { budget_ms: u64 },
}

impl fmt::Display for MissReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissReason::Absent => write!(f, "absent"),
            MissReason::CorruptSource { detail } => write!(f, "corrupt source: {detail}"),
            MissReason::Timeout { budget_ms } => write!(f, "timed out after {budget_ms}ms"),
        }
    }
}

/// Outcome of a single read. Never an error.
#[derive(Debug, Clone, PartialEq)]
pub enum ReadOutcome {
    Found(Arc<ResultRecord>),
    NotFound(MissReason),
}

impl ReadOutcome {
    pub fn is_found(&self) -> bool {
        matches!(self, ReadOutcome::Found(_))
    }

    pub fn record(&self) -> Option<&Arc<ResultRecord>> {
        match self {
            ReadOutcome::Found(record) => Some(record),
            ReadOutcome::NotFound(_) => None,
        }
    }
}

/// Whether a result type currently has data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceState {
    /// File present and not known to be corrupt
    Populated,
    /// File not produced yet
    Pending,
    /// File present but failed to decode
    Corrupt,
}

/// Shape of a decodable result file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSummary {
    /// File size on disk
    pub bytes: u64,
    pub rows: usize,
    /// Metric columns holding at least one value, sorted
    pub metrics: Vec<String>,
}

impl SourceSummary {
    pub fn of<'a>(bytes: u64, records: impl IntoIterator<Item = &'a ResultRecord>) -> Self {
        let mut rows = 0;
        let mut metrics = BTreeSet::new();
        for record in records {
            rows += 1;
            metrics.extend(record.metrics.keys().cloned());
        }
        Self {
            bytes,
            rows,
            metrics: metrics.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultTypeStatus {
    pub result_type: ResultType,
    pub state: SourceState,
    /// Present while the file is populated and decodable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<SourceSummary>,
}

/// A result type whose data mentions at least one search term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub result_type: ResultType,
    /// Metric columns whose name contains a term
    pub columns: Vec<String>,
    /// Row labels whose subject or text values contain a term
    pub rows: Vec<String>,
    /// True when the result type's own name contains a term
    pub name_matched: bool,
}

impl SearchHit {
    pub fn score(&self) -> usize {
        self.columns.len() + self.rows.len() + usize::from(self.name_matched)
    }
}

/// Match `terms` case-insensitively against one result type's records.
pub fn search_records<'a>(
    result_type: ResultType,
    records: impl IntoIterator<Item = &'a ResultRecord>,
    terms: &[String],
) -> Option<SearchHit> {
    let terms: Vec<String> = terms
        .iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();
    if terms.is_empty() {
        return None;
    }
    let mentions = |text: &str| {
        let text = text.to_lowercase();
        terms.iter().any(|t| text.contains(t.as_str()))
    };

    let mut columns = BTreeSet::new();
    let mut rows = Vec::new();
    for record in records {
        columns.extend(record.metrics.keys().filter(|name| mentions(name.as_str())).cloned());

        let label = subject_label(record.subject.as_ref());
        let text_match = record.metrics.values().any(|value| match value {
            MetricValue::Text(text) => mentions(text.as_str()),
            _ => false,
        });
        if (mentions(label.as_str()) || text_match) && !rows.contains(&label) {
            rows.push(label);
        }
    }

    let hit = SearchHit {
        result_type,
        columns: columns.into_iter().collect(),
        rows,
        name_matched: mentions(result_type.as_str()),
    };
    (hit.score() > 0).then_some(hit)
}

/// Order hits by score, best first.
pub fn rank_hits(hits: &mut [SearchHit]) {
    hits.sort_by(|a, b| {
        b.score()
            .cmp(&a.score())
            .then(a.result_type.cmp(&b.result_type))
    });
}

/// Introspection snapshot of a record source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreStatus {
    /// Every known result type, registry order
    pub result_types: Vec<ResultTypeStatus>,
    pub cache: CacheStats,
    /// Subjects present in any decodable file
    pub subjects: Vec<SubjectId>,
}

/// Read access to pre-computed result records.
#[async_trait]
pub trait RecordLookup: Send + Sync {
    /// Read the record for `(result_type, subject)`; `None` is the portfolio.
    async fn read(&self, subject: Option<SubjectId>, result_type: ResultType) -> ReadOutcome;

    /// Current state of every result type plus cache statistics.
    fn status(&self) -> StoreStatus;

    /// Result types whose data mentions any of `terms`, best match first.
    async fn search(&self, terms: &[String]) -> Vec<SearchHit>;
}

#[async_trait]
impl<T: RecordLookup + ?Sized> RecordLookup for Arc<T> {
    async fn read(&self, subject: Option<SubjectId>, result_type: ResultType) -> ReadOutcome {
        (**self).read(subject, result_type).await
    }

    fn status(&self) -> StoreStatus {
        (**self).status()
    }

    async fn search(&self, terms: &[String]) -> Vec<SearchHit> {
        (**self).search(terms).await
    }
}

/// Scripted record source for testing.
#[derive(Default)]
pub struct MockRecordLookup {
    /// Records returned as hits
    pub records: HashMap<Lookup, Arc<ResultRecord>>,
    /// Explicit misses; any other unknown lookup is `Absent`
    pub misses: HashMap<Lookup, MissReason>,
    /// Simulated latency applied to every read
    pub delay: Option<Duration>,
    reads: AtomicUsize,
}

impl MockRecordLookup {
    /// Serve `record` for its own lookup.
    pub fn with_record(mut self, record: ResultRecord) -> Self {
        self.records.insert(record.lookup(), Arc::new(record));
        self
    }

    /// Answer `lookup` with a specific miss.
    pub fn with_miss(mut self, lookup: Lookup, reason: MissReason) -> Self {
        self.misses.insert(lookup, reason);
        self
    }

    /// Delay every read.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of reads served so far.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }

    fn corrupt_types(&self) -> BTreeSet<ResultType> {
        self.misses
            .iter()
            .filter(|(_, r)| matches!(r, MissReason::CorruptSource { .. }))
            .map(|(l, _)| l.result_type)
            .collect()
    }

    fn records_by_type(&self) -> BTreeMap<ResultType, Vec<&ResultRecord>> {
        let mut grouped: BTreeMap<ResultType, Vec<&ResultRecord>> = BTreeMap::new();
        for record in self.records.values() {
            grouped.entry(record.result_type).or_default().push(record.as_ref());
        }
        grouped
    }
}

#[async_trait]
impl RecordLookup for MockRecordLookup {
    async fn read(&self, subject: Option<SubjectId>, result_type: ResultType) -> ReadOutcome {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.reads.fetch_add(1, Ordering::Relaxed);

        let lookup = Lookup::new(result_type, subject);
        if let Some(reason) = self.misses.get(&lookup) {
            return ReadOutcome::NotFound(reason.clone());
        }
        match self.records.get(&lookup) {
            Some(record) => ReadOutcome::Found(Arc::clone(record)),
            None => ReadOutcome::NotFound(MissReason::Absent),
        }
    }

    fn status(&self) -> StoreStatus {
        let grouped = self.records_by_type();
        let corrupt = self.corrupt_types();

        let result_types = ResultType::ALL
            .into_iter()
            .map(|result_type| {
                if corrupt.contains(&result_type) {
                    return ResultTypeStatus {
                        result_type,
                        state: SourceState::Corrupt,
                        summary: None,
                    };
                }
                match grouped.get(&result_type) {
                    Some(records) => ResultTypeStatus {
                        result_type,
                        state: SourceState::Populated,
                        summary: Some(SourceSummary::of(0, records.iter().copied())),
                    },
                    None => ResultTypeStatus {
                        result_type,
                        state: SourceState::Pending,
                        summary: None,
                    },
                }
            })
            .collect();

        let subjects: BTreeSet<SubjectId> =
            self.records.keys().filter_map(|l| l.subject).collect();

        StoreStatus {
            result_types,
            cache: CacheStats {
                entries: self.records.len(),
                capacity: self.records.len(),
                hits: 0,
                misses: 0,
                hit_rate: 0.0,
            },
            subjects: subjects.into_iter().collect(),
        }
    }

    async fn search(&self, terms: &[String]) -> Vec<SearchHit> {
        let corrupt = self.corrupt_types();
        let mut hits: Vec<SearchHit> = self
            .records_by_type()
            .into_iter()
            .filter(|(result_type, _)| !corrupt.contains(result_type))
            .filter_map(|(result_type, records)| {
                search_records(result_type, records, terms)
            })
            .collect();
        rank_hits(&mut hits);
        hits
    }
}
