//! Ingestion error types.

use std::path::PathBuf;

use uopsynth_model::ModelError;

/// Errors that can occur while reading characterization inputs.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// The characterization document is not well-formed XML.
    #[error("XML parse error: {0}")]
    Xml(#[from] roxmltree::Error),

    /// TOML parsing error in the code mapping.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// I/O error reading an input file.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// The path being read.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// Input file not found.
    #[error("file not found: {}", path.display())]
    NotFound {
        /// The path that was not found.
        path: PathBuf,
    },

    /// An instruction string has no entry in the code mapping.
    #[error("no internal code for instruction '{instr}'")]
    MissingCode {
        /// The instruction string.
        instr: String,
    },

    /// The same internal code was produced for two different families.
    #[error("internal code '{icode}' appears in families '{first}' and '{second}'")]
    DuplicateCode {
        /// The shared internal code.
        icode: String,
        /// Family that produced the code first.
        first: String,
        /// Family that produced it again.
        second: String,
    },

    /// A required attribute is missing.
    #[error("<{element}> is missing attribute '{attribute}'")]
    MissingAttribute {
        /// Element tag name.
        element: &'static str,
        /// Name of the missing attribute.
        attribute: &'static str,
    },

    /// An attribute value could not be parsed.
    #[error("attribute '{attribute}' has invalid value '{value}'")]
    MalformedAttribute {
        /// Attribute name.
        attribute: String,
        /// The value as written.
        value: String,
    },

    /// A record could not be built for an instruction.
    #[error("instruction '{name}': {source}")]
    InvalidInstruction {
        /// The instruction string.
        name: String,
        /// Why the record could not be built.
        #[source]
        source: ModelError,
    },
}

/// Result type alias for ingestion.
pub type Result<T> = std::result::Result<T, IngestError>;
