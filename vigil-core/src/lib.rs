// vigil-core/src/lib.rs

#![allow(missing_docs)]
// Memory safety
#![deny(unsafe_code)]
// Robustness
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
// Performance
#![warn(clippy::perf)]

// --- HEXAGONAL MODULES ---

// 1. Ports (Interfaces / Traits)
// What the application needs from the outside world (table store, issue sink).
pub mod ports;

// 2. Domain (pure logic)
// Snapshots, statistics, the rule hierarchy, checks, baselines.
// Depends on nothing else (no infra, no app).
pub mod domain;

// 3. Infrastructure (Adapters)
// DuckDB store, CSV source, check history, config, charts.
pub mod infrastructure;

// 4. Application (Use Cases)
// Ingestion pipeline, record validation, quality monitor, reports, trends.
pub mod application;

// --- GLOBAL ERROR ---
pub mod error;

// --- RE-EXPORTS (FACADE) ---
pub use error::VigilError;
