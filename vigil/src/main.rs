// vigil/src/main.rs

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};

fn main() -> anyhow::Result<()> {
    // RUST_LOG=debug vigil check-all ... for the details
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Ingest {
            file,
            table,
            project_dir,
            chunk_size,
            max_chunks,
            report_out,
        } => commands::ingest::execute(file, table, project_dir, chunk_size, max_chunks, report_out),

        Commands::List { project_dir } => commands::list::execute(project_dir),

        Commands::Check { table, project_dir } => commands::check::execute(table, project_dir),

        Commands::CheckAll {
            project_dir,
            tables,
        } => commands::check_all::execute(project_dir, tables),

        Commands::Report {
            project_dir,
            days,
            output,
            tables,
        } => commands::report::execute(project_dir, days, output, tables),

        Commands::Trend {
            table,
            column,
            statistic,
            project_dir,
            days,
        } => commands::trend::execute(table, column, statistic, project_dir, days),
    }
}
