// vigil/src/commands/check.rs
//
// USE CASE: Run the standard quality rules against one table.

use std::path::PathBuf;

use vigil_core::application::QualityMonitor;

use super::{baseline_file, check_history, open_project};

pub fn execute(table: String, project_dir: PathBuf) -> anyhow::Result<()> {
    let (config, store) = open_project(&project_dir)?;

    let monitor = QualityMonitor::new(
        &store,
        check_history(&config, &project_dir),
        baseline_file(&config, &project_dir),
    )?
    .with_reference(&store)
    .with_issue_sink(&store);

    let check = monitor.check_table(&table, None)?;
    println!("{}", check.summary());
    println!(
        "Evaluated {} rules, {} violated. Check persisted as {}.",
        check.total_rules, check.violation_count, check.check_id
    );
    Ok(())
}
