// vigil-core/src/ports/mod.rs

pub mod store;

pub use store::{IssueSink, TableStore, UploadLog};
