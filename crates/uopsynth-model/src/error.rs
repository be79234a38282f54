//! Error types for model loading and validation.

use std::path::PathBuf;

/// Errors that can occur while building instruction records or loading
/// policy and count files.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// TOML deserialization error.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// I/O error reading a policy or counts file.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// The path being read.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// Policy or counts file not found.
    #[error("file not found: {}", path.display())]
    NotFound {
        /// The path that was not found.
        path: PathBuf,
    },

    /// The policy is structurally invalid.
    #[error("configuration error: {detail}")]
    Configuration {
        /// Description of the problem.
        detail: String,
    },

    /// A port-usage string names a port outside the declared port set.
    #[error("unknown port '{port}' in port usage '{usage}'")]
    UnknownPort {
        /// The undeclared port name.
        port: String,
        /// The full port-usage string it appeared in.
        usage: String,
    },

    /// A port-usage term is not of the form `count*port`.
    #[error("malformed port usage term '{term}'")]
    MalformedPortUsage {
        /// The offending term.
        term: String,
    },

    /// A row of a counts file could not be parsed.
    #[error("malformed counts row {line} in {}: {detail}", path.display())]
    MalformedCounts {
        /// The counts file.
        path: PathBuf,
        /// 1-based line number.
        line: usize,
        /// Description of the problem.
        detail: String,
    },
}

/// Result type for model operations.
pub type Result<T> = std::result::Result<T, ModelError>;
