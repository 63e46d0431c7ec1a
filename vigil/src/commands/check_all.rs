// vigil/src/commands/check_all.rs
//
// USE CASE: Check every table, then refresh drift baselines.

use std::path::PathBuf;

use vigil_core::application::QualityMonitor;

use super::{baseline_file, check_history, open_project};

pub fn execute(project_dir: PathBuf, tables: Vec<String>) -> anyhow::Result<()> {
    let (config, store) = open_project(&project_dir)?;

    let mut monitor = QualityMonitor::new(
        &store,
        check_history(&config, &project_dir),
        baseline_file(&config, &project_dir),
    )?
    .with_reference(&store)
    .with_issue_sink(&store);

    let tables = if tables.is_empty() { None } else { Some(tables) };
    let checks = monitor.check_all_tables(tables)?;

    if checks.is_empty() {
        println!("No tables to check.");
        return Ok(());
    }

    let total_violations: usize = checks.iter().map(|c| c.violation_count).sum();
    for check in &checks {
        let marker = if check.violation_count == 0 { "✅" } else { "⚠️" };
        println!(
            "{marker} {}: {}/{} rules violated",
            check.table, check.violation_count, check.total_rules
        );
    }
    println!(
        "\nChecked {} table(s), {} violation(s). Baselines refreshed.",
        checks.len(),
        total_violations
    );
    Ok(())
}
