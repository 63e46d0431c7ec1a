// vigil-core/src/infrastructure/history.rs
//
// On-disk persistence for quality checks and baselines. One JSON file per
// check, named by check_id; one baseline document per project.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::domain::baseline::BaselineStatistics;
use crate::domain::check::QualityCheck;
use crate::infrastructure::error::InfrastructureError;
use crate::infrastructure::fs::atomic_write;

pub struct CheckHistory {
    dir: PathBuf,
}

impl CheckHistory {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist one check. Whole-file atomic replace, so a crash mid-write
    /// never leaves a truncated check behind.
    pub fn save(&self, check: &QualityCheck) -> Result<PathBuf, InfrastructureError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(format!("{}.json", check.check_id));
        atomic_write(&path, check.to_json()?)?;
        debug!(path = ?path, "Persisted quality check");
        Ok(path)
    }

    /// All checks at or after `cutoff`, oldest first, optionally filtered to
    /// a table set. Unreadable files are skipped with a warning so one
    /// corrupt check never hides the rest of the history.
    pub fn load_since(
        &self,
        cutoff: DateTime<Utc>,
        tables: Option<&[String]>,
    ) -> Result<Vec<QualityCheck>, InfrastructureError> {
        let mut checks = Vec::new();
        if !self.dir.exists() {
            return Ok(checks);
        }

        for entry in WalkDir::new(&self.dir)
            .max_depth(1)
            .into_iter()
            .filter_map(Result::ok)
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let check: QualityCheck = match fs::read_to_string(path)
                .map_err(InfrastructureError::Io)
                .and_then(|content| Ok(serde_json::from_str(&content)?))
            {
                Ok(check) => check,
                Err(e) => {
                    warn!(path = ?path, error = %e, "Skipping unreadable check file");
                    continue;
                }
            };

            if check.timestamp < cutoff {
                continue;
            }
            if let Some(tables) = tables {
                if !tables.iter().any(|t| t == &check.table) {
                    continue;
                }
            }
            checks.push(check);
        }

        checks.sort_by_key(|c| c.timestamp);
        Ok(checks)
    }
}

pub struct BaselineFile {
    path: PathBuf,
}

impl BaselineFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Missing file means a fresh installation: an empty baseline, not an
    /// error. A present-but-corrupt file is an error.
    pub fn load(&self) -> Result<BaselineStatistics, InfrastructureError> {
        if !self.path.exists() {
            return Ok(BaselineStatistics::new());
        }
        let content = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn flush(&self, baselines: &BaselineStatistics) -> Result<(), InfrastructureError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        atomic_write(&self.path, serde_json::to_string_pretty(baselines)?)?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use anyhow::Result;
    use chrono::Duration;
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    fn check_at(table: &str, timestamp: DateTime<Utc>) -> QualityCheck {
        QualityCheck::at(table, vec![], BTreeMap::new(), timestamp)
    }

    #[test]
    fn test_save_and_load_window() -> Result<()> {
        let dir = tempdir()?;
        let history = CheckHistory::new(dir.path().join("quality_checks"));

        let now = Utc::now();
        history.save(&check_at("payments", now))?;
        history.save(&check_at("claims", now - Duration::days(2)))?;
        history.save(&check_at("payments", now - Duration::days(40)))?;

        let recent = history.load_since(now - Duration::days(30), None)?;
        assert_eq!(recent.len(), 2);
        // Oldest first.
        assert_eq!(recent[0].table, "claims");

        let payments_only =
            history.load_since(now - Duration::days(30), Some(&["payments".to_string()]))?;
        assert_eq!(payments_only.len(), 1);
        Ok(())
    }

    #[test]
    fn test_corrupt_check_file_is_skipped() -> Result<()> {
        let dir = tempdir()?;
        let history = CheckHistory::new(dir.path());
        history.save(&check_at("payments", Utc::now()))?;
        fs::write(dir.path().join("broken.json"), "{not json")?;

        let checks = history.load_since(Utc::now() - Duration::days(1), None)?;
        assert_eq!(checks.len(), 1);
        Ok(())
    }

    #[test]
    fn test_missing_history_dir_is_empty() -> Result<()> {
        let history = CheckHistory::new("/nonexistent/quality_checks");
        assert!(history
            .load_since(Utc::now() - Duration::days(1), None)?
            .is_empty());
        Ok(())
    }

    #[test]
    fn test_baseline_file_round_trip() -> Result<()> {
        let dir = tempdir()?;
        let file = BaselineFile::new(dir.path().join("nested").join("baselines.json"));

        // Fresh installation.
        assert!(file.load()?.is_empty());

        let mut stats = crate::domain::baseline::StatisticMap::new();
        stats.insert("mean".into(), serde_json::json!(120.5));
        let mut baselines = BaselineStatistics::new();
        baselines.update("payments", "cash_applied", stats);
        file.flush(&baselines)?;

        let reloaded = file.load()?;
        assert_eq!(
            reloaded.statistic("payments", "cash_applied", "mean"),
            Some(120.5)
        );
        Ok(())
    }
}
