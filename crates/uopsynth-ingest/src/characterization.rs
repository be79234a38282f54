//! Characterization document parsing.
//!
//! The document lists `<instruction>` elements, each with per-architecture
//! `<measurement>` blocks:
//!
//! ```xml
//! <instruction string="ADD (R64, R64)" extension="BASE">
//!   <architecture name="SKL">
//!     <measurement ports="1*p0156" uops="1" TP="0.25">
//!       <latency start_op="1" target_op="1" cycles="1"/>
//!     </measurement>
//!   </architecture>
//! </instruction>
//! ```
//!
//! Only instructions whose extension belongs to a policy family and that
//! carry at least one latency attribute for the policy's architecture are
//! kept.

use std::collections::HashMap;
use std::path::Path;

use roxmltree::{Document, Node};
use uopsynth_model::{Instruction, PolicyConfig, PortUsage};

use crate::error::{IngestError, Result};
use crate::icode::IcodeMapping;

/// Latency attributes scanned for the minimum and maximum latency.
pub const LATENCY_ATTRIBUTES: [&str; 8] = [
    "cycles",
    "cycles_addr",
    "cycles_mem",
    "max_cycles",
    "max_cycles_addr",
    "min_cycles",
    "min_cycles_addr",
    "cycles_same_reg",
];

/// The data extracted from one measurement block.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Measurement {
    ports: String,
    uops: u32,
    latency: Option<(u32, u32)>,
}

/// Load and parse a characterization document from a file.
pub fn load_characterization(
    path: &Path,
    policy: &PolicyConfig,
    mapping: &IcodeMapping,
) -> Result<Vec<Instruction>> {
    if !path.exists() {
        return Err(IngestError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let content = std::fs::read_to_string(path).map_err(|source| IngestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_characterization(&content, policy, mapping)
}

/// Parse a characterization document into instruction records, in document
/// order.
///
/// String variants of one instruction form share an internal code; only the
/// first is kept. An internal code reached from two different families is an
/// error.
pub fn parse_characterization(
    xml: &str,
    policy: &PolicyConfig,
    mapping: &IcodeMapping,
) -> Result<Vec<Instruction>> {
    let doc = Document::parse(xml)?;

    let mut instructions = Vec::new();
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut dropped = 0usize;

    for node in doc.descendants().filter(|n| n.has_tag_name("instruction")) {
        let extension = required(node, "instruction", "extension")?;
        let Some(family) = policy.family_index(extension) else {
            continue;
        };
        let name = required(node, "instruction", "string")?;

        let Some(measurement) = find_measurement(node, &policy.arch)? else {
            dropped += 1;
            continue;
        };
        let Some((min_latency, max_latency)) = measurement.latency else {
            dropped += 1;
            continue;
        };

        let icode = mapping.require(name)?;
        if let Some(&owner) = seen.get(icode) {
            if owner != family {
                return Err(IngestError::DuplicateCode {
                    icode: icode.to_string(),
                    first: policy.families[owner].name.clone(),
                    second: policy.families[family].name.clone(),
                });
            }
            log::debug!("skipping '{name}': internal code {icode} already ingested");
            continue;
        }
        seen.insert(icode.to_string(), family);

        let ports = if measurement.uops > 0 {
            PortUsage::parse(&measurement.ports, &policy.ports).map_err(|source| {
                IngestError::InvalidInstruction {
                    name: name.to_string(),
                    source,
                }
            })?
        } else {
            PortUsage::zeroed(&policy.ports)
        };

        instructions.push(Instruction::new(
            name,
            icode,
            extension,
            min_latency,
            max_latency,
            measurement.uops,
            ports,
        ));
    }

    log::info!(
        "ingested {} instructions for {} ({} without latency data)",
        instructions.len(),
        policy.arch,
        dropped
    );
    Ok(instructions)
}

fn required<'a>(
    node: Node<'a, '_>,
    element: &'static str,
    attribute: &'static str,
) -> Result<&'a str> {
    node.attribute(attribute)
        .ok_or(IngestError::MissingAttribute { element, attribute })
}

/// The last measurement of the first `<architecture>` block for `arch` that
/// has one.
fn find_measurement(instr: Node<'_, '_>, arch: &str) -> Result<Option<Measurement>> {
    let arch_nodes = instr
        .children()
        .filter(|n| n.has_tag_name("architecture") && n.attribute("name") == Some(arch));

    for arch_node in arch_nodes {
        let mut last = None;
        for m in arch_node.descendants().filter(|n| n.has_tag_name("measurement")) {
            last = Some(parse_measurement(m)?);
        }
        if last.is_some() {
            return Ok(last);
        }
    }
    Ok(None)
}

fn parse_measurement(node: Node<'_, '_>) -> Result<Measurement> {
    let uops = match node.attribute("uops") {
        Some(v) => parse_cycles(v, "uops")?,
        None => 0,
    };

    let mut bounds: Option<(u32, u32)> = None;
    for lat in node.descendants().filter(|n| n.has_tag_name("latency")) {
        for attr in LATENCY_ATTRIBUTES {
            if let Some(v) = lat.attribute(attr) {
                let cycles = parse_cycles(v, attr)?;
                bounds = Some(match bounds {
                    Some((lo, hi)) => (lo.min(cycles), hi.max(cycles)),
                    None => (cycles, cycles),
                });
            }
        }
    }

    Ok(Measurement {
        ports: node.attribute("ports").unwrap_or("").to_string(),
        uops,
        latency: bounds,
    })
}

/// Parse a non-negative count attribute. Negative values read as zero;
/// values beyond `u32` are rejected.
fn parse_cycles(value: &str, attribute: &str) -> Result<u32> {
    let malformed = || IngestError::MalformedAttribute {
        attribute: attribute.to_string(),
        value: value.to_string(),
    };
    let n: i64 = value.trim().parse().map_err(|_| malformed())?;
    u32::try_from(n.max(0)).map_err(|_| malformed())
}
