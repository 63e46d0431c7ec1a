// vigil-core/src/application/report.rs
//
// Markdown quality reports over the persisted check history.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::{Duration, Utc};
use tracing::info;

use crate::domain::check::QualityCheck;
use crate::domain::rules::Severity;
use crate::error::VigilError;
use crate::infrastructure::fs::atomic_write;
use crate::infrastructure::history::CheckHistory;

#[derive(Debug, Clone, Default)]
pub struct ReportOptions {
    /// Restrict to these tables; all tables otherwise.
    pub tables: Option<Vec<String>>,
    pub days: i64,
}

struct RuleAggregate {
    column: Option<String>,
    severity: Severity,
    violation_count: usize,
}

/// Render the quality report for the lookback window. Chart PNGs found under
/// `charts_dir` for a covered table are referenced by relative path.
pub fn generate_quality_report(
    history: &CheckHistory,
    charts_dir: &Path,
    options: &ReportOptions,
) -> Result<String, VigilError> {
    let cutoff = Utc::now() - Duration::days(options.days);
    let checks = history.load_since(cutoff, options.tables.as_deref())?;

    let mut by_table: BTreeMap<&str, Vec<&QualityCheck>> = BTreeMap::new();
    for check in &checks {
        by_table.entry(&check.table).or_default().push(check);
    }
    let total_violations: usize = checks.iter().map(|c| c.violation_count).sum();

    let mut out = String::new();
    let _ = writeln!(out, "# Data Quality Report");
    let _ = writeln!(out);
    let _ = writeln!(out, "Generated: {}", Utc::now().format("%Y-%m-%d %H:%M UTC"));
    let _ = writeln!(out, "Window: last {} days", options.days);
    let _ = writeln!(out);
    let _ = writeln!(out, "## Summary");
    let _ = writeln!(out);
    let _ = writeln!(out, "- Checks run: {}", checks.len());
    let _ = writeln!(out, "- Tables covered: {}", by_table.len());
    let _ = writeln!(out, "- Total violations: {total_violations}");
    let _ = writeln!(out);

    if checks.is_empty() {
        let _ = writeln!(out, "No checks were recorded in this window.");
        return Ok(out);
    }

    let _ = writeln!(out, "## Violations by Table");
    let _ = writeln!(out);
    let _ = writeln!(out, "| Table | Checks | Violations | Last Check |");
    let _ = writeln!(out, "|---|---|---|---|");
    for (table, table_checks) in &by_table {
        let violations: usize = table_checks.iter().map(|c| c.violation_count).sum();
        let last = table_checks
            .iter()
            .map(|c| c.timestamp)
            .max()
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        let _ = writeln!(
            out,
            "| {table} | {} | {violations} | {last} |",
            table_checks.len()
        );
    }
    let _ = writeln!(out);

    for (table, table_checks) in &by_table {
        let _ = writeln!(out, "## Table: {table}");
        let _ = writeln!(out);
        render_table_detail(&mut out, table_checks);
        render_chart_references(&mut out, table, charts_dir);
    }

    Ok(out)
}

/// Per-rule aggregation, ranked by severity then violation count.
fn render_table_detail(out: &mut String, checks: &[&QualityCheck]) {
    let mut by_rule: BTreeMap<&str, RuleAggregate> = BTreeMap::new();
    for check in checks {
        for rule in &check.rules {
            let agg = by_rule.entry(&rule.name).or_insert_with(|| RuleAggregate {
                column: rule.column.clone(),
                severity: rule.severity,
                violation_count: 0,
            });
            if rule.violated {
                agg.violation_count += 1;
            }
        }
    }

    let mut violated: Vec<(&str, &RuleAggregate)> = by_rule
        .iter()
        .filter(|(_, agg)| agg.violation_count > 0)
        .map(|(name, agg)| (*name, agg))
        .collect();
    violated.sort_by(|a, b| {
        a.1.severity
            .rank()
            .cmp(&b.1.severity.rank())
            .then(b.1.violation_count.cmp(&a.1.violation_count))
            .then(a.0.cmp(b.0))
    });

    if violated.is_empty() {
        let _ = writeln!(out, "No violations in this window.");
        let _ = writeln!(out);
        return;
    }

    let _ = writeln!(out, "| Rule | Column | Severity | Violations |");
    let _ = writeln!(out, "|---|---|---|---|");
    for (name, agg) in violated {
        let _ = writeln!(
            out,
            "| {name} | {} | {} | {} |",
            agg.column.as_deref().unwrap_or("-"),
            agg.severity.as_str(),
            agg.violation_count
        );
    }
    let _ = writeln!(out);
}

/// Reference existing `{table}_*.png` charts by path relative to the report.
fn render_chart_references(out: &mut String, table: &str, charts_dir: &Path) {
    let Ok(entries) = std::fs::read_dir(charts_dir) else {
        return;
    };
    let prefix = format!("{table}_");
    let mut charts: Vec<String> = entries
        .filter_map(Result::ok)
        .filter_map(|e| e.file_name().into_string().ok())
        .filter(|name| name.starts_with(&prefix) && name.ends_with(".png"))
        .collect();
    charts.sort();

    if charts.is_empty() {
        return;
    }
    let _ = writeln!(out, "### Trend Charts");
    let _ = writeln!(out);
    let dir_name = charts_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| charts_dir.display().to_string());
    for chart in charts {
        let stem = chart.trim_end_matches(".png");
        let _ = writeln!(out, "![{stem}]({dir_name}/{chart})");
    }
    let _ = writeln!(out);
}

pub fn write_quality_report(
    history: &CheckHistory,
    charts_dir: &Path,
    options: &ReportOptions,
    path: &Path,
) -> Result<PathBuf, VigilError> {
    let markdown = generate_quality_report(history, charts_dir, options)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    atomic_write(path, markdown)?;
    info!(path = ?path, "Quality report written");
    Ok(path.to_path_buf())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::rules::{Details, RuleReport};
    use anyhow::Result;
    use std::collections::BTreeMap as Map;
    use tempfile::tempdir;

    fn report(name: &str, severity: Severity, violated: bool) -> RuleReport {
        RuleReport {
            name: name.into(),
            description: format!("checks {name}"),
            severity,
            column: Some("cash_applied".into()),
            violated,
            details: Details::new(),
            remediation: None,
        }
    }

    fn seeded_history(dir: &Path) -> Result<CheckHistory> {
        let history = CheckHistory::new(dir.join("quality_checks"));
        history.save(&QualityCheck::new(
            "payments",
            vec![
                report("missing_values_cash_applied", Severity::Medium, true),
                report("negative_values_cash_applied", Severity::High, true),
                report("outliers_cash_applied", Severity::Medium, false),
            ],
            Map::new(),
        ))?;
        history.save(&QualityCheck::new(
            "claims",
            vec![report("completeness", Severity::High, false)],
            Map::new(),
        ))?;
        Ok(history)
    }

    #[test]
    fn test_report_structure_and_severity_order() -> Result<()> {
        let dir = tempdir()?;
        let history = seeded_history(dir.path())?;

        let markdown = generate_quality_report(
            &history,
            &dir.path().join("charts"),
            &ReportOptions {
                tables: None,
                days: 30,
            },
        )?;

        assert!(markdown.contains("# Data Quality Report"));
        assert!(markdown.contains("- Checks run: 2"));
        assert!(markdown.contains("- Total violations: 2"));
        assert!(markdown.contains("## Table: payments"));
        assert!(markdown.contains("No violations in this window."));

        // High severity rows come before medium ones.
        let negative = markdown.find("negative_values_cash_applied").unwrap();
        let missing = markdown.find("missing_values_cash_applied").unwrap();
        assert!(negative < missing);
        Ok(())
    }

    #[test]
    fn test_table_filter() -> Result<()> {
        let dir = tempdir()?;
        let history = seeded_history(dir.path())?;

        let markdown = generate_quality_report(
            &history,
            &dir.path().join("charts"),
            &ReportOptions {
                tables: Some(vec!["claims".into()]),
                days: 30,
            },
        )?;
        assert!(markdown.contains("## Table: claims"));
        assert!(!markdown.contains("## Table: payments"));
        Ok(())
    }

    #[test]
    fn test_empty_window_renders_note() -> Result<()> {
        let dir = tempdir()?;
        let history = CheckHistory::new(dir.path().join("quality_checks"));
        let markdown = generate_quality_report(
            &history,
            &dir.path().join("charts"),
            &ReportOptions {
                tables: None,
                days: 7,
            },
        )?;
        assert!(markdown.contains("No checks were recorded in this window."));
        Ok(())
    }

    #[test]
    fn test_chart_references_included() -> Result<()> {
        let dir = tempdir()?;
        let history = seeded_history(dir.path())?;
        let charts_dir = dir.path().join("charts");
        std::fs::create_dir_all(&charts_dir)?;
        std::fs::write(charts_dir.join("payments_cash_applied_mean.png"), b"png")?;
        std::fs::write(charts_dir.join("other_table.png"), b"png")?;

        let markdown = generate_quality_report(
            &history,
            &charts_dir,
            &ReportOptions {
                tables: None,
                days: 30,
            },
        )?;
        assert!(markdown.contains("![payments_cash_applied_mean](charts/payments_cash_applied_mean.png)"));
        assert!(!markdown.contains("other_table.png"));
        Ok(())
    }

    #[test]
    fn test_write_report_creates_file() -> Result<()> {
        let dir = tempdir()?;
        let history = seeded_history(dir.path())?;
        let path = dir.path().join("reports").join("quality.md");

        write_quality_report(
            &history,
            &dir.path().join("charts"),
            &ReportOptions {
                tables: None,
                days: 30,
            },
            &path,
        )?;
        assert!(std::fs::read_to_string(path)?.contains("# Data Quality Report"));
        Ok(())
    }
}
