//! Ingestion of instruction characterizations.
//!
//! Turns a uops.info style characterization document into [`Instruction`]
//! records, translating each instruction string to its internal code through
//! an [`IcodeMapping`] produced by an external decoder toolchain.
//!
//! [`Instruction`]: uopsynth_model::Instruction

pub mod characterization;
pub mod error;
pub mod icode;

pub use characterization::{load_characterization, parse_characterization, LATENCY_ATTRIBUTES};
pub use error::{IngestError, Result};
pub use icode::IcodeMapping;
