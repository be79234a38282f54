//! Characterized instruction records.
//!
//! An [`Instruction`] is one measured instruction form: its display string,
//! the opaque internal code the simulator knows it by, the ISA extension that
//! selects its family, its latency bounds and how many cycles it occupies on
//! each declared execution port.

use indexmap::IndexMap;

use crate::error::{ModelError, Result};

/// Usage count per execution port, one entry per declared port.
///
/// Iteration follows the declared port order, which makes representative
/// port selection and direct mapping deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PortUsage {
    usage: IndexMap<String, u32>,
}

impl PortUsage {
    /// A usage vector with every declared port set to zero.
    pub fn zeroed<S: AsRef<str>>(ports: &[S]) -> Self {
        let usage = ports
            .iter()
            .map(|p| (p.as_ref().to_string(), 0))
            .collect();
        Self { usage }
    }

    /// Parse the `count*port[+count*port...]` notation against the declared
    /// port set. Repeated ports accumulate.
    pub fn parse<S: AsRef<str>>(notation: &str, ports: &[S]) -> Result<Self> {
        let mut usage = Self::zeroed(ports);
        let notation = notation.trim();
        if notation.is_empty() {
            return Ok(usage);
        }

        for term in notation.split('+') {
            let term = term.trim();
            let (count, port) =
                term.split_once('*')
                    .ok_or_else(|| ModelError::MalformedPortUsage {
                        term: term.to_string(),
                    })?;
            let count: u32 = count
                .trim()
                .parse()
                .map_err(|_| ModelError::MalformedPortUsage {
                    term: term.to_string(),
                })?;
            let slot = usage
                .usage
                .get_mut(port.trim())
                .ok_or_else(|| ModelError::UnknownPort {
                    port: port.trim().to_string(),
                    usage: notation.to_string(),
                })?;
            *slot = slot
                .checked_add(count)
                .ok_or_else(|| ModelError::MalformedPortUsage {
                    term: term.to_string(),
                })?;
        }
        Ok(usage)
    }

    /// Builder-style setter, used mostly by tests and fixtures.
    ///
    /// Ports outside the declared set are ignored.
    pub fn with(mut self, port: &str, count: u32) -> Self {
        if let Some(slot) = self.usage.get_mut(port) {
            *slot = count;
        }
        self
    }

    /// Usage count for a port (zero for undeclared ports).
    pub fn get(&self, port: &str) -> u32 {
        self.usage.get(port).copied().unwrap_or(0)
    }

    /// Force a port's usage to zero.
    pub fn zero(&mut self, port: &str) {
        if let Some(slot) = self.usage.get_mut(port) {
            *slot = 0;
        }
    }

    /// Iterate `(port, count)` pairs in declared order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.usage.iter().map(|(p, c)| (p.as_str(), *c))
    }

    /// Ports with positive usage, in declared order.
    pub fn active_ports(&self) -> impl Iterator<Item = &str> {
        self.iter().filter(|(_, c)| *c > 0).map(|(p, _)| p)
    }

    /// The port with maximum usage, or `None` when every port is idle.
    ///
    /// Ties resolve to the earliest declared port.
    pub fn representative(&self) -> Option<&str> {
        let mut best: Option<(&str, u32)> = None;
        for (port, count) in self.iter() {
            if best.map_or(true, |(_, c)| count > c) {
                best = Some((port, count));
            }
        }
        best.filter(|(_, c)| *c > 0).map(|(p, _)| p)
    }

    /// Whether every port is idle.
    pub fn is_idle(&self) -> bool {
        self.usage.values().all(|&c| c == 0)
    }
}

/// One characterized instruction form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    /// Display string, e.g. `"VADDPS (XMM, XMM, M128)"`.
    pub name: String,
    /// Opaque simulator-level identifier; unique across families.
    pub icode: String,
    /// ISA extension, used as the family key.
    pub extension: String,
    /// Minimum measured latency in cycles.
    pub min_latency: u32,
    /// Maximum measured latency in cycles.
    pub max_latency: u32,
    /// Measured uop count.
    pub uop_count: u32,
    /// Per-port usage.
    pub ports: PortUsage,
    /// Operand tokens parsed from `name`.
    pub operands: Vec<String>,
}

impl Instruction {
    /// Build a record; operands are derived from the display string.
    pub fn new(
        name: impl Into<String>,
        icode: impl Into<String>,
        extension: impl Into<String>,
        min_latency: u32,
        max_latency: u32,
        uop_count: u32,
        ports: PortUsage,
    ) -> Self {
        let name = name.into();
        let operands = parse_operands(&name);
        Self {
            name,
            icode: icode.into(),
            extension: extension.into(),
            min_latency,
            max_latency,
            uop_count,
            ports,
            operands,
        }
    }

    /// Whether one of the operand tokens equals `pattern`.
    pub fn has_operand(&self, pattern: &str) -> bool {
        self.operands.iter().any(|op| op == pattern)
    }
}

/// Extract operand tokens from the trailing `(a, b, c)` group of a name.
fn parse_operands(name: &str) -> Vec<String> {
    let last = name.rsplit(" (").next().unwrap_or(name);
    match last.strip_suffix(')') {
        Some(inner) if !inner.is_empty() => inner.split(", ").map(str::to_string).collect(),
        _ => Vec::new(),
    }
}
