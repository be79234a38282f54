//! Data model for uop synthesis.
//!
//! - **Instructions:** characterized instruction forms with port usage and latency bounds
//! - **Policy:** ports, functional units and per-family algorithm parameters
//! - **Counts:** per-internal-code dynamic execution frequencies

pub mod counts;
pub mod error;
pub mod instruction;
pub mod policy;

pub use counts::DynamicCounts;
pub use error::{ModelError, Result};
pub use instruction::{Instruction, PortUsage};
pub use policy::{
    AlgorithmKind, AlgorithmParams, FamilyPolicy, FunctionalUnit, LatencyFix, OperandFix,
    PolicyConfig, Sample, ValidationIssue,
};
