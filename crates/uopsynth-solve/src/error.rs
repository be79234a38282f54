//! Synthesis errors.

use std::path::PathBuf;

use thiserror::Error;
use uopsynth_model::ModelError;

/// Errors that can occur while synthesizing or emitting uops.
#[derive(Debug, Error)]
pub enum SolveError {
    /// A family's policy cannot drive its algorithm.
    #[error("configuration error in family '{family}': {detail}")]
    Configuration {
        /// Family name.
        family: String,
        /// Description of the problem.
        detail: String,
    },

    /// The budget is smaller than the number of representative ports.
    #[error("family '{family}': uop budget {budget} cannot cover {required} representative ports")]
    InfeasibleBudget {
        /// Family name.
        family: String,
        /// Effective budget.
        budget: usize,
        /// Minimum number of runs needed.
        required: usize,
    },

    /// Error from the data model, e.g. while loading counts.
    #[error("model error: {0}")]
    Model(#[from] ModelError),

    /// I/O error writing an output file.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// The path being written.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The report could not be serialized.
    #[error("report serialization failed: {0}")]
    Report(#[from] serde_json::Error),
}

/// Result type alias for synthesis.
pub type Result<T> = std::result::Result<T, SolveError>;
