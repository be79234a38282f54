//! Direct mapping: one uop per active port.
//!
//! Each port with positive usage (after `port-fix`) contributes one uop of
//! the kind it maps to. Latencies are fixed per kind by the policy.

use indexmap::IndexMap;
use log::debug;
use uopsynth_model::{FamilyPolicy, Instruction};

use crate::error::{Result, SolveError};
use crate::functional_unit::port_label;
use crate::result::{ResInstruction, ResUop, SynthesisResult};

/// Direct-mapping algorithm bound to one family.
#[derive(Debug, Clone)]
pub struct DirectMapping {
    family: FamilyPolicy,
}

impl DirectMapping {
    /// Check the family's direct-mapping requirements and build the algorithm.
    pub fn new(family: FamilyPolicy) -> Result<Self> {
        for kind in family.port_to_uop.values() {
            match family.functional_units(kind) {
                Some([_]) => {}
                Some(units) => {
                    return Err(SolveError::Configuration {
                        family: family.name.clone(),
                        detail: format!(
                            "direct kind '{kind}' has {} functional units, expected one",
                            units.len()
                        ),
                    })
                }
                None => {
                    return Err(SolveError::Configuration {
                        family: family.name.clone(),
                        detail: format!("uop kind '{kind}' has no functional units"),
                    })
                }
            }
            if !family.algorithm.uop_latency.contains_key(kind) {
                return Err(SolveError::Configuration {
                    family: family.name.clone(),
                    detail: format!("direct kind '{kind}' has no uop-latency entry"),
                });
            }
        }
        Ok(Self { family })
    }

    pub fn family(&self) -> &FamilyPolicy {
        &self.family
    }

    fn uop_name(&self, kind: &str) -> String {
        format!("{}_{kind}", self.family.name)
    }

    /// Decompose every instruction into its per-port uops.
    pub fn solve(&self, instructions: &[Instruction]) -> Result<SynthesisResult> {
        let mut result = SynthesisResult::new();

        for instr in instructions {
            let mut ports = instr.ports.clone();
            for port in &self.family.algorithm.port_fix {
                ports.zero(port);
            }

            let mut res = ResInstruction::new(instr.icode.as_str());
            for port in ports.active_ports() {
                let kind = self
                    .family
                    .uop_kind(port)
                    .ok_or_else(|| SolveError::Configuration {
                        family: self.family.name.clone(),
                        detail: format!(
                            "instruction '{}' uses port '{port}' which has no port-to-uop entry",
                            instr.icode
                        ),
                    })?;
                res.add_uop(self.uop_name(kind));
            }
            debug!("{}: {} uops", instr.icode, res.uops.len());
            result.add_instruction(res);
        }

        for uop in self.uop_records() {
            result.add_uop(uop);
        }
        Ok(result)
    }

    /// One record per kind; the first port mapped to a kind labels it.
    fn uop_records(&self) -> Vec<ResUop> {
        let mut first_port: IndexMap<&str, &str> = IndexMap::new();
        for (port, kind) in &self.family.port_to_uop {
            first_port.entry(kind.as_str()).or_insert(port.as_str());
        }

        first_port
            .into_iter()
            .filter_map(|(kind, port)| {
                let latency = *self.family.algorithm.uop_latency.get(kind)?;
                let unit = self.family.functional_units(kind)?.first()?;
                Some(ResUop::new(
                    self.uop_name(kind),
                    latency,
                    unit.as_str(),
                    port_label(port),
                ))
            })
            .collect()
    }
}
