//! Quantization report aggregating every family's solution.

use std::fmt;
use std::path::Path;

use serde::Serialize;

use crate::error::{Result, SolveError};

/// Latency ladder of one representative port before and after quantization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortReport {
    /// Representative port name.
    pub port: String,
    /// Uop kind the port maps to.
    pub uop_kind: String,
    /// Distinct adjusted latencies, ascending.
    pub latencies: Vec<u32>,
    /// Quantized latency of each entry of `latencies`.
    pub quantized: Vec<u32>,
    /// `quantized - latencies`, entry by entry.
    pub deviation: Vec<i64>,
    /// Aggregate (floored) weight of each latency.
    pub weights: Vec<u64>,
    /// Number of runs, i.e. distinct uops created on this port.
    pub runs: usize,
    /// Weighted absolute deviation of this port.
    pub cost: u64,
}

impl PortReport {
    pub fn new(
        port: impl Into<String>,
        uop_kind: impl Into<String>,
        latencies: Vec<u32>,
        quantized: Vec<u32>,
        weights: Vec<u64>,
        runs: usize,
        cost: u64,
    ) -> Self {
        let deviation = latencies
            .iter()
            .zip(&quantized)
            .map(|(&l, &q)| i64::from(q) - i64::from(l))
            .collect();
        Self {
            port: port.into(),
            uop_kind: uop_kind.into(),
            latencies,
            quantized,
            deviation,
            weights,
            runs,
            cost,
        }
    }
}

/// Summary of one family's synthesis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FamilyReport {
    pub family: String,
    /// Algorithm kind, as written in the policy.
    pub algorithm: String,
    /// Instructions emitted by the family.
    pub instructions: usize,
    /// Uop records created by the family.
    pub uops: usize,
    /// Budget from the policy, if any.
    pub configured_budget: Option<usize>,
    /// Budget after clamping.
    pub effective_budget: Option<usize>,
    pub total_cost: u64,
    pub ports: Vec<PortReport>,
}

/// Report over every family of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QuantizationReport {
    pub arch: String,
    pub families: Vec<FamilyReport>,
}

impl QuantizationReport {
    pub fn new(arch: impl Into<String>) -> Self {
        Self {
            arch: arch.into(),
            families: Vec::new(),
        }
    }

    /// Pretty-printed JSON rendering.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the JSON rendering to `path`.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = self.to_json()?;
        std::fs::write(path, json + "\n").map_err(|source| SolveError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl fmt::Display for QuantizationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Quantization Report ===")?;
        writeln!(f, "Architecture: {}", self.arch)?;

        for family in &self.families {
            writeln!(f)?;
            writeln!(f, "--- {} ({}) ---", family.family, family.algorithm)?;
            writeln!(
                f,
                "  Instructions: {}, uops: {}",
                family.instructions, family.uops
            )?;
            if let Some(effective) = family.effective_budget {
                match family.configured_budget {
                    Some(configured) if configured != effective => writeln!(
                        f,
                        "  Budget: {effective} (clamped from {configured})"
                    )?,
                    _ => writeln!(f, "  Budget: {effective}")?,
                }
                writeln!(f, "  Total cost: {}", family.total_cost)?;
            }
            for port in &family.ports {
                writeln!(
                    f,
                    "  {:<6} {:<10} runs={:<3} cost={}",
                    port.port, port.uop_kind, port.runs, port.cost
                )?;
                for ((l, q), w) in port.latencies.iter().zip(&port.quantized).zip(&port.weights) {
                    writeln!(f, "    {l:>4} -> {q:<4} (weight {w})")?;
                }
            }
        }
        Ok(())
    }
}
