//! End-to-end test infrastructure for the wind-farm query service.
//!
//! Provides a shared TestHarness that lays out a processed-results directory
//! and a guidance directory on disk, then bootstraps the real service over
//! them.

use std::path::{Path, PathBuf};

use serde_json::{json, Value};

use windfarm_routing::GuidanceDoc;
use windfarm_service::{bootstrap, QueryService};
use windfarm_store::ResultStore;
use windfarm_types::{ResultType, Settings};

/// Shared test harness for E2E tests.
pub struct TestHarness {
    /// Keeps temp dir alive for the lifetime of the harness
    pub _temp_dir: tempfile::TempDir,
    /// Directory of columnar result files
    pub data_dir: PathBuf,
    /// Directory of guidance documents
    pub guidance_dir: PathBuf,
}

impl TestHarness {
    /// Create a harness with empty data and guidance directories.
    pub fn new() -> Self {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let data_dir = temp_dir.path().join("processed");
        let guidance_dir = temp_dir.path().join("prompts");

        std::fs::create_dir_all(&data_dir).expect("Failed to create data dir");
        std::fs::create_dir_all(&guidance_dir).expect("Failed to create guidance dir");

        Self {
            _temp_dir: temp_dir,
            data_dir,
            guidance_dir,
        }
    }

    pub fn settings(&self) -> Settings {
        Settings {
            data_dir: self.data_dir.to_string_lossy().to_string(),
            guidance_dir: self.guidance_dir.to_string_lossy().to_string(),
            ..Default::default()
        }
    }

    /// Bootstrap the real service over the harness directories.
    pub fn service(&self) -> QueryService<ResultStore> {
        self.service_with(self.settings())
    }

    pub fn service_with(&self, settings: Settings) -> QueryService<ResultStore> {
        bootstrap(&settings).expect("Failed to bootstrap service")
    }

    /// Write a result file from `(subject, metrics)` rows.
    ///
    /// Every row must name the same metrics.
    pub fn write_result_file(&self, result_type: ResultType, rows: &[(&str, &[(&str, f64)])]) {
        let mut columns = serde_json::Map::new();
        columns.insert(
            "subject".to_string(),
            Value::Array(rows.iter().map(|(s, _)| json!(s)).collect()),
        );
        if let Some((_, first)) = rows.first() {
            for (idx, (metric, _)) in first.iter().enumerate() {
                let cells = rows.iter().map(|(_, metrics)| json!(metrics[idx].1)).collect();
                columns.insert(metric.to_string(), Value::Array(cells));
            }
        }

        let file = json!({
            "source": "02_wind_physics_analysis.ipynb",
            "generated_at": "2025-03-01T12:00:00Z",
            "columns": columns,
        });
        self.write_raw(result_type, file.to_string().as_bytes());
    }

    /// Write arbitrary bytes as a result type's file.
    pub fn write_raw(&self, result_type: ResultType, bytes: &[u8]) {
        std::fs::write(self.result_path(result_type), bytes).expect("Failed to write result file");
    }

    pub fn result_path(&self, result_type: ResultType) -> PathBuf {
        self.data_dir.join(result_type.file_name())
    }

    pub fn write_guidance(&self, doc: GuidanceDoc, content: &str) {
        write_file(&self.guidance_dir.join(doc.file_name()), content);
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

fn write_file(path: &Path, content: &str) {
    std::fs::write(path, content).expect("Failed to write file");
}
