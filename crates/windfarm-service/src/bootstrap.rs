//! Service construction from settings.

use anyhow::{Context, Result};
use tracing::info;
use windfarm_store::ResultStore;
use windfarm_types::Settings;

use crate::guidance::GuidanceLibrary;
use crate::query::QueryService;

/// Build a service over the result files and guidance named by `settings`.
///
/// Missing files are not fatal: absent result types are reported as pending
/// and missing guidance documents are served as placeholders.
pub fn bootstrap(settings: &Settings) -> Result<QueryService<ResultStore>> {
    settings.validate().context("Invalid configuration")?;

    let store = ResultStore::open(settings);
    let guidance = GuidanceLibrary::load(&settings.guidance_path());

    info!(
        data_dir = %settings.data_path().display(),
        populated = store.registry().populated().count(),
        cache_capacity = settings.cache_capacity,
        read_budget_ms = settings.read_budget_ms,
        "Query service ready"
    );

    Ok(QueryService::new(store, guidance))
}

/// Load settings (optionally from an explicit file) and bootstrap.
pub fn bootstrap_from_config(config_path: Option<&str>) -> Result<QueryService<ResultStore>> {
    let settings = Settings::load(config_path).context("Failed to load configuration")?;
    bootstrap(&settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use windfarm_types::ResultType;

    #[tokio::test]
    async fn test_bootstrap_over_empty_dirs() {
        let dir = TempDir::new().unwrap();
        let settings = Settings {
            data_dir: dir.path().join("processed").to_string_lossy().to_string(),
            guidance_dir: dir.path().join("prompts").to_string_lossy().to_string(),
            ..Default::default()
        };

        let service = bootstrap(&settings).unwrap();
        let status = service.status();
        assert_eq!(status.pending, ResultType::ALL.len());
        assert_eq!(status.guidance_missing.len(), 10);

        let response = service.handle_text("capacity factor for wf1").await;
        assert!(response.guided().is_some());
    }

    #[test]
    fn test_bootstrap_rejects_invalid_settings() {
        let settings = Settings {
            cache_capacity: 0,
            ..Default::default()
        };
        assert!(bootstrap(&settings).is_err());
    }
}
