//! Pipeline error taxonomy.

use crate::types::Mismatch;

/// Errors produced by the verification pipeline.
///
/// Agent calls fail closed: a chunk that exhausts its retries aborts the
/// whole document rather than shipping a partially verified record.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// A pure-algorithm failure from the core crate.
    #[error(transparent)]
    Core(#[from] srx_core::CoreError),

    /// An agent call failed after all retry attempts.
    #[error("{role} call failed after {attempts} attempts: {source}")]
    ExternalCall {
        /// Which agent role was being called (driver, verifier, adjudicator).
        role: &'static str,
        /// Attempts made, including the first.
        attempts: u32,
        /// The final underlying failure.
        #[source]
        source: anyhow::Error,
    },

    /// An agent returned a payload that does not parse as the expected shape.
    #[error("malformed {role} response: {detail}")]
    MalformedResponse {
        /// Which agent role produced the payload.
        role: &'static str,
        /// What was wrong with it.
        detail: String,
    },

    /// Output writing refused: no verifier pass completed for this document.
    #[error("refusing to write outputs: no verifier pass completed")]
    RefusedNoVerifierPasses,

    /// Cross-driver comparison left mismatches no adjudication resolved.
    #[error("{} cross-driver mismatch(es) left unresolved", .0.len())]
    UnresolvedMismatches(Vec<Mismatch>),

    /// Filesystem failure while reading inputs or writing outputs.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization or deserialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias for pipeline results.
pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;
    use srx_core::Scalar;

    #[test]
    fn test_unresolved_mismatches_display_counts() {
        let err = PipelineError::UnresolvedMismatches(vec![Mismatch {
            path: "/study_type".to_string(),
            value_a: Scalar::Str("rct".to_string()),
            value_b: Scalar::Str("cohort".to_string()),
        }]);
        assert!(err.to_string().contains("1 cross-driver mismatch"));
    }

    #[test]
    fn test_core_error_converts() {
        let core = srx_core::CoreError::EmptyPointer;
        let err: PipelineError = core.into();
        assert!(matches!(err, PipelineError::Core(_)));
    }
}
