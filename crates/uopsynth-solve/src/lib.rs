//! Uop synthesis for characterized instruction sets.
//!
//! Each instruction family is handled by the algorithm its policy names:
//!
//! - **Direct mapping:** one uop per active port, fixed latencies
//! - **Representative port:** latencies quantized under a uop budget, with
//!   functional units disambiguated by internal-code samples
//!
//! Family results are merged into one [`SynthesisResult`] and written out as
//! simulator configuration files.

pub mod algorithm;
pub mod direct;
pub mod emit;
pub mod error;
pub mod functional_unit;
pub mod generator;
pub mod quantize;
pub mod rep_port;
pub mod report;
pub mod result;

pub use algorithm::{Algorithm, FamilySolution};
pub use direct::DirectMapping;
pub use emit::{render_functional_units, render_instructions, render_uops, write_outputs};
pub use error::{Result, SolveError};
pub use generator::{Generation, Generator};
pub use quantize::{LatencyLadder, Quantization, Run, Solver};
pub use rep_port::RepresentativePort;
pub use report::{FamilyReport, PortReport, QuantizationReport};
pub use result::{ResInstruction, ResUop, SynthesisResult};
