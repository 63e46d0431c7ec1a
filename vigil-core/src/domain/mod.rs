// vigil-core/src/domain/mod.rs

pub mod baseline;
pub mod check;
pub mod error;
pub mod rules;
pub mod snapshot;
pub mod stats;

pub use error::DomainError;
