//! Columnar result file decoding.
//!
//! A result file holds one column per metric plus a `subject` column naming
//! the row, and an optional `quality_flag` column:
//!
//! ```json
//! {
//!   "source": "02_wind_physics_analysis.ipynb",
//!   "generated_at": "2025-03-01T12:00:00Z",
//!   "columns": {
//!     "subject": ["wf1", "portfolio"],
//!     "capacity_factor": [0.281, 0.297],
//!     "quality_flag": ["ok", "degraded"]
//!   }
//! }
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};
use windfarm_types::{
    MetricValue, Provenance, QualityFlag, ResultRecord, ResultType, SubjectId, PORTFOLIO_LABEL,
};

use crate::error::StoreError;

/// Column naming the row's subject.
pub const SUBJECT_COLUMN: &str = "subject";

/// Column holding the per-row data-quality flag.
pub const QUALITY_COLUMN: &str = "quality_flag";

#[derive(Deserialize)]
struct ResultFile {
    source: String,
    generated_at: DateTime<Utc>,
    columns: Map<String, Value>,
}

/// Decode a result file into one record per row.
pub fn decode_records(
    result_type: ResultType,
    source_file: &str,
    bytes: &[u8],
) -> Result<Vec<ResultRecord>, StoreError> {
    let file: ResultFile = serde_json::from_slice(bytes)?;

    let mut columns: BTreeMap<&str, &Vec<Value>> = BTreeMap::new();
    for (name, value) in &file.columns {
        let Value::Array(cells) = value else {
            return Err(StoreError::Schema(format!("column {name:?} is not an array")));
        };
        columns.insert(name.as_str(), cells);
    }

    let subjects = columns
        .remove(SUBJECT_COLUMN)
        .ok_or_else(|| StoreError::Schema("missing subject column".to_string()))?;
    let quality = columns.remove(QUALITY_COLUMN);

    let rows = subjects.len();
    let ragged = columns
        .iter()
        .map(|(name, cells)| (*name, cells.len()))
        .chain(quality.map(|q| (QUALITY_COLUMN, q.len())))
        .find(|(_, len)| *len != rows);
    if let Some((name, len)) = ragged {
        return Err(StoreError::Schema(format!(
            "column {name:?} has {len} rows, expected {rows}"
        )));
    }

    let provenance = Provenance {
        source_file: source_file.to_string(),
        source: file.source,
        generated_at: file.generated_at,
    };

    let mut seen: Vec<Option<SubjectId>> = Vec::with_capacity(rows);
    let mut records = Vec::with_capacity(rows);

    for (row, cell) in subjects.iter().enumerate() {
        let subject = parse_subject(cell, row)?;
        if seen.contains(&subject) {
            return Err(StoreError::Schema(format!("duplicate row for {cell} at row {row}")));
        }
        seen.push(subject);

        let mut metrics = BTreeMap::new();
        for (name, cells) in &columns {
            if let Some(value) = parse_metric(&cells[row], name, row)? {
                metrics.insert((*name).to_string(), value);
            }
        }

        let quality = match quality.map(|q| &q[row]) {
            Some(Value::String(label)) => QualityFlag::from_label(label),
            _ => QualityFlag::Unknown,
        };

        records.push(ResultRecord {
            result_type,
            subject,
            metrics,
            provenance: provenance.clone(),
            quality,
        });
    }

    Ok(records)
}

fn parse_subject(cell: &Value, row: usize) -> Result<Option<SubjectId>, StoreError> {
    let raw = match cell {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        other => {
            return Err(StoreError::Schema(format!(
                "subject at row {row} is not a string: {other}"
            )))
        }
    };

    if raw.trim().eq_ignore_ascii_case(PORTFOLIO_LABEL) {
        return Ok(None);
    }

    SubjectId::parse(&raw)
        .map(Some)
        .ok_or_else(|| StoreError::Schema(format!("unrecognized subject {raw:?} at row {row}")))
}

fn parse_metric(cell: &Value, column: &str, row: usize) -> Result<Option<MetricValue>, StoreError> {
    match cell {
        Value::Null => Ok(None),
        Value::Bool(b) => Ok(Some(MetricValue::Flag(*b))),
        Value::String(s) => Ok(Some(MetricValue::Text(s.clone()))),
        Value::Number(n) => n
            .as_f64()
            .map(|v| Some(MetricValue::Number(v)))
            .ok_or_else(|| StoreError::Schema(format!("{column}[{row}] is not representable"))),
        Value::Array(_) | Value::Object(_) => Err(StoreError::Schema(format!(
            "{column}[{row}] is nested; metrics must be scalars"
        ))),
    }
}
