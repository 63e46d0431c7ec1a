// vigil-core/src/infrastructure/mod.rs

pub mod adapters;
pub mod chart;
pub mod config;
pub mod csv_source;
pub mod error;
pub mod fs;
pub mod history;
