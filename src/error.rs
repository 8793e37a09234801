//! Error types for the analysis pipeline.

use thiserror::Error;

/// Failures surfaced by the analysis pipeline.
///
/// Each variant is tagged with the algorithm of the offending request so a
/// caller can report it without aborting the rest of the session. Cache
/// invalidation is informational and is reported through the component
/// counters and the log, not through this type.
#[derive(Debug, Clone, Error)]
pub enum AnalysisError {
    /// Fewer usable routes than the operation requires.
    #[error("{algorithm}: need at least {required} routes with 2 or more points, got {available}")]
    InsufficientData {
        algorithm: &'static str,
        required: usize,
        available: usize,
    },

    /// An algorithm parameter is out of its valid range.
    #[error("invalid {parameter} for {algorithm}: {reason}")]
    InvalidParameter {
        algorithm: &'static str,
        parameter: &'static str,
        reason: String,
    },

    /// The underlying numerical routine did not converge or raised.
    #[error("{algorithm} failed: {reason}")]
    AlgorithmFailure {
        algorithm: &'static str,
        reason: String,
    },
}

impl AnalysisError {
    /// Name of the algorithm the failing request targeted.
    pub fn algorithm(&self) -> &'static str {
        match self {
            AnalysisError::InsufficientData { algorithm, .. }
            | AnalysisError::InvalidParameter { algorithm, .. }
            | AnalysisError::AlgorithmFailure { algorithm, .. } => algorithm,
        }
    }
}
