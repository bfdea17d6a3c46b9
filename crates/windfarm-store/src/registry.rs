//! Startup registry of result files.
//!
//! The set of result types is fixed; the registry records which of their
//! well-known files were present in the data directory when it was scanned.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{info, warn};
use windfarm_types::ResultType;

/// Result files discovered in a data directory.
#[derive(Debug, Clone)]
pub struct ResultRegistry {
    root: PathBuf,
    files: BTreeMap<ResultType, PathBuf>,
}

impl ResultRegistry {
    /// Scan `root` for the well-known file of every result type.
    ///
    /// A missing directory is not an error: every result type is pending.
    pub fn scan(root: &Path) -> Self {
        if !root.is_dir() {
            warn!(path = %root.display(), "Result directory not found; all result types pending");
        }

        let files: BTreeMap<ResultType, PathBuf> = ResultType::ALL
            .into_iter()
            .map(|rt| (rt, root.join(rt.file_name())))
            .filter(|(_, path)| path.is_file())
            .collect();

        info!(
            path = %root.display(),
            populated = files.len(),
            known = ResultType::ALL.len(),
            "Scanned result registry"
        );

        Self {
            root: root.to_path_buf(),
            files,
        }
    }

    /// Directory the registry was built from.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file backing `result_type`, if it was present at scan time.
    pub fn path(&self, result_type: ResultType) -> Option<&Path> {
        self.files.get(&result_type).map(PathBuf::as_path)
    }

    pub fn contains(&self, result_type: ResultType) -> bool {
        self.files.contains_key(&result_type)
    }

    /// Result types whose file was present, in registry order.
    pub fn populated(&self) -> impl Iterator<Item = ResultType> + '_ {
        self.files.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_scan_finds_known_files_only() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("capacity_factor.json"), "{}").unwrap();
        std::fs::write(dir.path().join("business_impact.json"), "{}").unwrap();
        std::fs::write(dir.path().join("notes.json"), "{}").unwrap();
        std::fs::create_dir(dir.path().join("uncertainty.json")).unwrap();

        let registry = ResultRegistry::scan(dir.path());
        assert!(registry.contains(ResultType::CapacityFactor));
        assert!(registry.contains(ResultType::BusinessImpact));
        assert!(!registry.contains(ResultType::Uncertainty));
        assert_eq!(
            registry.populated().collect::<Vec<_>>(),
            vec![ResultType::CapacityFactor, ResultType::BusinessImpact]
        );
        assert_eq!(
            registry.path(ResultType::CapacityFactor),
            Some(dir.path().join("capacity_factor.json").as_path())
        );
    }

    #[test]
    fn test_scan_missing_directory() {
        let registry = ResultRegistry::scan(Path::new("/definitely/not/a/result/dir"));
        assert_eq!(registry.populated().count(), 0);
        assert_eq!(registry.path(ResultType::PowerCurve), None);
    }
}
