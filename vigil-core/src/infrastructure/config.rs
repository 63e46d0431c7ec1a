// vigil-core/src/infrastructure/config.rs

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

use crate::infrastructure::error::InfrastructureError;

/// Project configuration, loaded from `vigil.yaml` at the project root.
/// Every field has a default so a bare directory is a valid project.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// DuckDB database file. `:memory:` is accepted for throwaway runs.
    pub db_path: String,
    /// Directory holding one JSON file per quality check.
    pub history_dir: String,
    /// Directory for Markdown quality reports.
    pub reports_dir: String,
    /// Directory for rendered trend charts, referenced from reports.
    pub charts_dir: String,
    pub ingestion: IngestionConfig,
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    /// Memory budget one chunk should stay under.
    pub target_chunk_mb: usize,
    /// Rows read when estimating per-row memory cost.
    pub sample_rows: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Lookback window for reports and trend charts.
    pub default_days: i64,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            db_path: "vigil.db".into(),
            history_dir: "quality_checks".into(),
            reports_dir: "reports".into(),
            charts_dir: "reports/charts".into(),
            ingestion: IngestionConfig::default(),
            report: ReportConfig::default(),
        }
    }
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            target_chunk_mb: 100,
            sample_rows: 1000,
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self { default_days: 30 }
    }
}

impl ProjectConfig {
    pub fn db_path(&self, project_dir: &Path) -> PathBuf {
        resolve(project_dir, &self.db_path)
    }

    pub fn history_dir(&self, project_dir: &Path) -> PathBuf {
        resolve(project_dir, &self.history_dir)
    }

    pub fn reports_dir(&self, project_dir: &Path) -> PathBuf {
        resolve(project_dir, &self.reports_dir)
    }

    pub fn charts_dir(&self, project_dir: &Path) -> PathBuf {
        resolve(project_dir, &self.charts_dir)
    }
}

fn resolve(project_dir: &Path, value: &str) -> PathBuf {
    let p = Path::new(value);
    if p.is_absolute() || value == ":memory:" {
        PathBuf::from(value)
    } else {
        project_dir.join(p)
    }
}

/// Load `vigil.yaml` from the project directory. A missing file is not an
/// error: defaults apply, so `vigil check-all` works out of the box.
#[instrument(skip(project_dir))]
pub fn load_config(project_dir: &Path) -> Result<ProjectConfig, InfrastructureError> {
    let mut config = match find_main_config(project_dir) {
        Some(config_path) => {
            info!(path = ?config_path, "Loading project configuration");
            let content = fs::read_to_string(&config_path)?;
            serde_yaml::from_str(&content)?
        }
        None => {
            info!(dir = ?project_dir, "No configuration file found, using defaults");
            ProjectConfig::default()
        }
    };

    apply_env_overrides(&mut config);

    Ok(config)
}

fn find_main_config(root: &Path) -> Option<PathBuf> {
    let candidates = ["vigil.yaml", "vigil.yml"];
    candidates
        .iter()
        .map(|filename| root.join(filename))
        .find(|p| p.exists())
}

fn apply_env_overrides(config: &mut ProjectConfig) {
    // Layering: environment beats file. Lets CI point the same project at a
    // scratch database without editing it.
    if let Ok(val) = std::env::var("VIGIL_DB_PATH") {
        info!(old = ?config.db_path, new = ?val, "Overriding database path via ENV");
        config.db_path = val;
    }
    if let Ok(val) = std::env::var("VIGIL_HISTORY_DIR") {
        info!(old = ?config.history_dir, new = ?val, "Overriding history dir via ENV");
        config.history_dir = val;
    }
}
