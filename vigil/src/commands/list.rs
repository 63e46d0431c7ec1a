// vigil/src/commands/list.rs
//
// USE CASE: Show the data tables in the store.

use std::path::PathBuf;

use comfy_table::{presets::UTF8_FULL, Table};
use vigil_core::ports::TableStore;

use super::open_project;

pub fn execute(project_dir: PathBuf) -> anyhow::Result<()> {
    let (_config, store) = open_project(&project_dir)?;

    let tables = store.list_tables()?;
    if tables.is_empty() {
        println!("No data tables yet. Load one with 'vigil ingest <file>'.");
        return Ok(());
    }

    let mut out = Table::new();
    out.load_preset(UTF8_FULL);
    out.set_header(["Table", "Columns", "Rows"]);
    for name in &tables {
        let snapshot = store.fetch_table(name)?;
        out.add_row([
            name.clone(),
            snapshot.columns().len().to_string(),
            snapshot.row_count().to_string(),
        ]);
    }
    println!("{out}");
    Ok(())
}
