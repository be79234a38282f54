//! Functional-unit disambiguation.
//!
//! A uop kind may list several candidate units (e.g. a vector port that feeds
//! both an adder and a multiplier). Each instruction is bound to one of them
//! by matching its internal code against the family's sample substrings.

use uopsynth_model::FamilyPolicy;

use crate::result::ResUop;

/// Index of the candidate unit an instruction binds to.
///
/// Candidates are scanned in declared order; the first one with a sample
/// contained in `icode` wins. Without a match the first candidate is used.
pub fn bind_unit(family: &FamilyPolicy, units: &[String], icode: &str) -> usize {
    units
        .iter()
        .position(|unit| family.samples_for(unit).any(|s| icode.contains(s)))
        .unwrap_or(0)
}

/// Name of the uop an instruction carries once bound to `index`.
///
/// Only ambiguous kinds get an index suffix.
pub fn bound_name(base: &str, units: &[String], index: usize) -> String {
    if units.len() > 1 {
        format!("{base}_{index}")
    } else {
        base.to_string()
    }
}

/// Uop records for one `(kind, latency)` pair, one per candidate unit.
pub fn uop_records(base: &str, latency: u32, units: &[String], port: &str) -> Vec<ResUop> {
    units
        .iter()
        .enumerate()
        .map(|(i, unit)| ResUop::new(bound_name(base, units, i), latency, unit.as_str(), port))
        .collect()
}

/// Port label used in uop records: the port name without its prefix letter.
pub fn port_label(port: &str) -> &str {
    match port.chars().next() {
        Some(c) if c.is_ascii_alphabetic() => &port[1..],
        _ => port,
    }
}
