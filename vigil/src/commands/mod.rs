// vigil/src/commands/mod.rs

pub mod check;
pub mod check_all;
pub mod ingest;
pub mod list;
pub mod report;
pub mod trend;

use std::path::Path;

use anyhow::Context;
use vigil_core::infrastructure::adapters::DuckDbStore;
use vigil_core::infrastructure::config::{load_config, ProjectConfig};
use vigil_core::infrastructure::history::{BaselineFile, CheckHistory};

/// Load the project configuration and open its store.
pub(crate) fn open_project(project_dir: &Path) -> anyhow::Result<(ProjectConfig, DuckDbStore)> {
    let config = load_config(project_dir)
        .with_context(|| format!("Failed to load configuration from {project_dir:?}"))?;
    let db_path = config.db_path(project_dir);
    let store = DuckDbStore::open(&db_path.to_string_lossy())
        .with_context(|| format!("Failed to open store at {db_path:?}"))?;
    Ok((config, store))
}

pub(crate) fn check_history(config: &ProjectConfig, project_dir: &Path) -> CheckHistory {
    CheckHistory::new(config.history_dir(project_dir))
}

pub(crate) fn baseline_file(config: &ProjectConfig, project_dir: &Path) -> BaselineFile {
    BaselineFile::new(config.history_dir(project_dir).join("baselines.json"))
}
