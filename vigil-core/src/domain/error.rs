// vigil-core/src/domain/error.rs

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum DomainError {
    #[error("Schema Error: {0}")]
    #[diagnostic(
        code(vigil::domain::schema),
        help("Check that the table and column exist in the store.")
    )]
    Schema(String),

    #[error("Type mismatch: {0}")]
    #[diagnostic(
        code(vigil::domain::type_mismatch),
        help("This rule only applies to columns of a different kind.")
    )]
    TypeMismatch(String),

    #[error("Computation Error: {0}")]
    #[diagnostic(
        code(vigil::domain::computation),
        help("Valid outlier methods: 'iqr', 'std'. Valid statistics: mean, median, std, min, max, count, sum.")
    )]
    Computation(String),

    #[error("Invalid pattern '{pattern}': {source}")]
    #[diagnostic(code(vigil::domain::pattern))]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}
