// vigil-core/src/application/monitor.rs
//
// Orchestration: builds the standard rule set for a table, runs checks,
// persists them, and keeps baselines fresh. Baselines load once at
// construction, mutate in memory, and flush to disk after each table's
// refresh.

use std::collections::BTreeMap;

use tracing::{info, warn};

use crate::domain::baseline::BaselineStatistics;
use crate::domain::check::QualityCheck;
use crate::domain::rules::{
    thresholds, CompletenessRule, DriftStatistic, MissingValuesRule, NegativeValuesRule,
    OutlierMethod, OutlierRule, PatternMatchRule, QualityRule, ReferenceLookup, RuleContext,
    StatisticalChangeRule,
};
use crate::domain::snapshot::{ColumnKind, TableSnapshot};
use crate::domain::stats::profile_column;
use crate::error::VigilError;
use crate::infrastructure::history::{BaselineFile, CheckHistory};
use crate::ports::{IssueSink, TableStore};

/// Drift is tracked for these statistics when a baseline exists.
const DRIFT_STATISTICS: [DriftStatistic; 3] = [
    DriftStatistic::Mean,
    DriftStatistic::Median,
    DriftStatistic::Std,
];

/// Semantic text columns with a known format. Patterns are start-anchored by
/// the rule, so each ends with `$` to require a full match.
fn semantic_pattern(column: &str) -> Option<(&'static str, &'static str)> {
    if column.contains("email") {
        Some(("email_format", r"[\w.+-]+@[\w-]+(\.[\w-]+)+$"))
    } else if column.contains("phone") {
        Some(("phone_format", r"\(?\d{3}\)?[-. ]?\d{3}[-. ]?\d{4}$"))
    } else if column.contains("zip") {
        Some(("zip_format", r"\d{5}(-\d{4})?$"))
    } else if column.contains("npi") {
        Some(("npi_format", r"\d{10}$"))
    } else {
        None
    }
}

pub struct QualityMonitor<'a> {
    store: &'a dyn TableStore,
    reference: Option<&'a dyn ReferenceLookup>,
    issues: Option<&'a dyn IssueSink>,
    history: CheckHistory,
    baseline_file: BaselineFile,
    baselines: BaselineStatistics,
}

impl<'a> QualityMonitor<'a> {
    pub fn new(
        store: &'a dyn TableStore,
        history: CheckHistory,
        baseline_file: BaselineFile,
    ) -> Result<Self, VigilError> {
        let baselines = baseline_file.load()?;
        Ok(Self {
            store,
            reference: None,
            issues: None,
            history,
            baseline_file,
            baselines,
        })
    }

    pub fn with_reference(mut self, reference: &'a dyn ReferenceLookup) -> Self {
        self.reference = Some(reference);
        self
    }

    pub fn with_issue_sink(mut self, issues: &'a dyn IssueSink) -> Self {
        self.issues = Some(issues);
        self
    }

    pub fn baselines(&self) -> &BaselineStatistics {
        &self.baselines
    }

    pub fn history(&self) -> &CheckHistory {
        &self.history
    }

    /// The default rule set for a table: completeness over all columns, a
    /// missing-values rule per column, outlier/negative/drift rules for
    /// numeric columns, format rules for recognized text columns.
    pub fn standard_rules(&self, snapshot: &TableSnapshot) -> Vec<Box<dyn QualityRule>> {
        let mut rules: Vec<Box<dyn QualityRule>> = Vec::new();
        rules.push(Box::new(CompletenessRule::new(snapshot.column_names())));

        for column in snapshot.columns() {
            let name = column.name().to_string();
            rules.push(Box::new(MissingValuesRule::new(&name, None)));

            match column.kind() {
                ColumnKind::Numeric => {
                    if crate::application::validator::is_monetary_column(&name) {
                        rules.push(Box::new(NegativeValuesRule::new(
                            &name,
                            Some(thresholds::NEGATIVE_VALUES),
                        )));
                    }
                    rules.push(Box::new(OutlierRule::new(
                        &name,
                        OutlierMethod::Iqr,
                        None,
                        None,
                    )));
                    for statistic in DRIFT_STATISTICS {
                        if self
                            .baselines
                            .has_statistic(&snapshot.table, &name, statistic.as_str())
                        {
                            rules.push(Box::new(StatisticalChangeRule::new(
                                &name, statistic, None,
                            )));
                        }
                    }
                }
                ColumnKind::Text | ColumnKind::Date => {
                    if let Some((label, pattern)) = semantic_pattern(&name) {
                        match PatternMatchRule::new(
                            &name,
                            pattern,
                            Some(format!("{label}_{name}")),
                            None,
                        ) {
                            Ok(rule) => rules.push(Box::new(rule)),
                            Err(e) => warn!(column = %name, error = %e, "Skipping pattern rule"),
                        }
                    }
                }
            }
        }
        rules
    }

    /// Run one check. The check is persisted before returning; a persistence
    /// failure is logged and the check still returned.
    pub fn check_table(
        &self,
        table: &str,
        rules: Option<Vec<Box<dyn QualityRule>>>,
    ) -> Result<QualityCheck, VigilError> {
        let snapshot = self.store.fetch_table(table)?;

        // An empty table yields an empty check rather than a wall of
        // missing-data violations.
        let check = if snapshot.row_count() == 0 {
            info!(table, "Table is empty, recording empty check");
            QualityCheck::new(table, Vec::new(), BTreeMap::new())
        } else {
            let rules = rules.unwrap_or_else(|| self.standard_rules(&snapshot));
            let ctx = RuleContext {
                baseline: Some(&self.baselines),
                reference: self.reference,
            };
            let reports = rules.iter().map(|r| r.report(&snapshot, &ctx)).collect();
            let statistics = snapshot
                .columns()
                .iter()
                .map(|c| (c.name().to_string(), profile_column(c)))
                .collect();
            QualityCheck::new(table, reports, statistics)
        };

        info!(
            table,
            violations = check.violation_count,
            rules = check.total_rules,
            "Quality check complete"
        );
        if let Some(sink) = self.issues {
            check.log_violations(sink);
        }
        if let Err(e) = self.history.save(&check) {
            warn!(table, error = %e, "Failed to persist quality check");
        }
        Ok(check)
    }

    /// Check every table (or the given subset), then refresh baselines for
    /// all of them. The refresh is unconditional so the next run has a
    /// current drift reference even for tables that just violated.
    pub fn check_all_tables(
        &mut self,
        tables: Option<Vec<String>>,
    ) -> Result<Vec<QualityCheck>, VigilError> {
        let tables = match tables {
            Some(tables) => tables,
            None => self.store.list_tables()?,
        };

        let mut checks = Vec::new();
        for table in &tables {
            match self.check_table(table, None) {
                Ok(check) => checks.push(check),
                Err(e) => warn!(table, error = %e, "Check failed, continuing with remaining tables"),
            }
        }

        for table in &tables {
            if let Err(e) = self.refresh_baselines(table) {
                warn!(table, error = %e, "Baseline refresh failed");
            }
        }
        Ok(checks)
    }

    /// Recompute and persist baseline statistics for every column of a table.
    pub fn refresh_baselines(&mut self, table: &str) -> Result<(), VigilError> {
        let snapshot = self.store.fetch_table(table)?;
        for column in snapshot.columns() {
            self.baselines
                .update(table, column.name(), profile_column(column));
        }
        self.baseline_file.flush(&self.baselines)?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::snapshot::{CellValue, Column, ColumnMeta};
    use crate::infrastructure::adapters::DuckDbStore;
    use crate::ports::TableStore;
    use anyhow::Result;
    use tempfile::tempdir;

    fn seeded_store() -> Result<DuckDbStore> {
        let store = DuckDbStore::in_memory()?;
        let columns = vec![
            ColumnMeta {
                name: "cash_applied".into(),
                kind: ColumnKind::Numeric,
            },
            ColumnMeta {
                name: "billing_email".into(),
                kind: ColumnKind::Text,
            },
        ];
        store.ensure_table("payments", &columns)?;
        let rows: Vec<Vec<CellValue>> = (0..20)
            .map(|i| {
                vec![
                    CellValue::Number(100.0 + i as f64),
                    CellValue::Text(format!("payer{i}@example.com")),
                ]
            })
            .collect();
        store.append_rows("payments", &columns, &rows)?;
        Ok(store)
    }

    fn monitor_in<'a>(
        store: &'a DuckDbStore,
        dir: &std::path::Path,
    ) -> Result<QualityMonitor<'a>> {
        Ok(QualityMonitor::new(
            store,
            CheckHistory::new(dir.join("quality_checks")),
            BaselineFile::new(dir.join("baselines.json")),
        )?)
    }

    #[test]
    fn test_standard_rules_composition() -> Result<()> {
        let store = seeded_store()?;
        let dir = tempdir()?;
        let monitor = monitor_in(&store, dir.path())?;
        let snapshot = store.fetch_table("payments")?;

        let rules = monitor.standard_rules(&snapshot);
        let names: Vec<String> = rules.iter().map(|r| r.meta().name.clone()).collect();

        // No baseline yet, so no drift rules.
        assert!(names.contains(&"completeness".to_string()));
        assert!(names.contains(&"missing_values_cash_applied".to_string()));
        assert!(names.contains(&"negative_values_cash_applied".to_string()));
        assert!(names.contains(&"outliers_cash_applied".to_string()));
        assert!(names.contains(&"email_format_billing_email".to_string()));
        assert!(!names.iter().any(|n| n.starts_with("statistical_change")));
        Ok(())
    }

    #[test]
    fn test_drift_rules_appear_after_baseline_refresh() -> Result<()> {
        let store = seeded_store()?;
        let dir = tempdir()?;
        let mut monitor = monitor_in(&store, dir.path())?;

        monitor.refresh_baselines("payments")?;
        let snapshot = store.fetch_table("payments")?;
        let names: Vec<String> = monitor
            .standard_rules(&snapshot)
            .iter()
            .map(|r| r.meta().name.clone())
            .collect();
        assert!(names.contains(&"statistical_change_mean_cash_applied".to_string()));
        assert!(names.contains(&"statistical_change_std_cash_applied".to_string()));
        Ok(())
    }

    #[test]
    fn test_check_table_persists_and_embeds_statistics() -> Result<()> {
        let store = seeded_store()?;
        let dir = tempdir()?;
        let monitor = monitor_in(&store, dir.path())?;

        let check = monitor.check_table("payments", None)?;
        assert!(check.total_rules > 0);
        assert!(check.statistics.contains_key("cash_applied"));
        assert_eq!(
            check.statistics["cash_applied"]["count"],
            serde_json::json!(20)
        );

        let persisted = monitor.history().load_since(
            chrono::Utc::now() - chrono::Duration::days(1),
            None,
        )?;
        assert_eq!(persisted.len(), 1);
        assert_eq!(persisted[0].check_id, check.check_id);
        Ok(())
    }

    #[test]
    fn test_check_all_refreshes_baselines() -> Result<()> {
        let store = seeded_store()?;
        let dir = tempdir()?;
        let mut monitor = monitor_in(&store, dir.path())?;

        let checks = monitor.check_all_tables(None)?;
        assert_eq!(checks.len(), 1);
        assert!(monitor
            .baselines()
            .has_statistic("payments", "cash_applied", "mean"));

        // The flush hit disk too.
        let reloaded = BaselineFile::new(dir.path().join("baselines.json")).load()?;
        assert!(reloaded.has_statistic("payments", "cash_applied", "mean"));
        Ok(())
    }

    #[test]
    fn test_empty_table_yields_empty_check() -> Result<()> {
        let store = DuckDbStore::in_memory()?;
        store.ensure_table(
            "empty",
            &[ColumnMeta {
                name: "x".into(),
                kind: ColumnKind::Numeric,
            }],
        )?;
        let dir = tempdir()?;
        let monitor = monitor_in(&store, dir.path())?;

        let check = monitor.check_table("empty", None)?;
        assert_eq!(check.total_rules, 0);
        assert_eq!(check.violation_count, 0);
        Ok(())
    }

    #[test]
    fn test_missing_table_is_an_error() -> Result<()> {
        let store = DuckDbStore::in_memory()?;
        let dir = tempdir()?;
        let monitor = monitor_in(&store, dir.path())?;
        assert!(monitor.check_table("nope", None).is_err());
        Ok(())
    }

    #[test]
    fn test_custom_rules_override_standard_set() -> Result<()> {
        let store = seeded_store()?;
        let dir = tempdir()?;
        let monitor = monitor_in(&store, dir.path())?;

        let rules: Vec<Box<dyn QualityRule>> = vec![Box::new(MissingValuesRule::new(
            "cash_applied",
            Some(0.5),
        ))];
        let check = monitor.check_table("payments", Some(rules))?;
        assert_eq!(check.total_rules, 1);
        assert_eq!(check.rules[0].name, "missing_values_cash_applied");
        Ok(())
    }

    #[test]
    fn test_drift_detected_after_distribution_shift() -> Result<()> {
        let store = seeded_store()?;
        let dir = tempdir()?;
        let mut monitor = monitor_in(&store, dir.path())?;
        monitor.refresh_baselines("payments")?;

        // Shift the mean well past the 20% drift threshold.
        let columns = vec![
            ColumnMeta {
                name: "cash_applied".into(),
                kind: ColumnKind::Numeric,
            },
            ColumnMeta {
                name: "billing_email".into(),
                kind: ColumnKind::Text,
            },
        ];
        let rows: Vec<Vec<CellValue>> = (0..200)
            .map(|i| {
                vec![
                    CellValue::Number(10_000.0 + i as f64),
                    CellValue::Text(format!("p{i}@example.com")),
                ]
            })
            .collect();
        store.append_rows("payments", &columns, &rows)?;

        let check = monitor.check_table("payments", None)?;
        assert!(check
            .violations
            .iter()
            .any(|v| v.name == "statistical_change_mean_cash_applied"));
        Ok(())
    }
}
