//! Whole-policy synthesis: route instructions to families, run each family's
//! algorithm and merge the results.

use std::collections::HashMap;
use std::path::PathBuf;

use log::{info, warn};
use uopsynth_model::{AlgorithmKind, DynamicCounts, Instruction, PolicyConfig};

use crate::algorithm::Algorithm;
use crate::error::Result;
use crate::report::QuantizationReport;
use crate::result::SynthesisResult;

/// Merged output of every family.
#[derive(Debug, Clone)]
pub struct Generation {
    pub result: SynthesisResult,
    pub report: QuantizationReport,
}

/// Runs a policy over a set of characterized instructions.
#[derive(Debug)]
pub struct Generator<'p> {
    policy: &'p PolicyConfig,
}

impl<'p> Generator<'p> {
    pub fn new(policy: &'p PolicyConfig) -> Self {
        Self { policy }
    }

    /// Synthesize every family in declaration order.
    ///
    /// Instructions whose extension no family claims are ignored. Within a
    /// family instructions are processed in internal-code order.
    pub fn run(&self, instructions: &[Instruction]) -> Result<Generation> {
        let mut per_family: Vec<Vec<Instruction>> = vec![Vec::new(); self.policy.families.len()];
        for instr in instructions {
            if let Some(index) = self.policy.family_index(&instr.extension) {
                per_family[index].push(instr.clone());
            }
        }
        for family in &mut per_family {
            family.sort_by(|a, b| a.icode.cmp(&b.icode));
        }

        let counts = self.load_counts()?;
        let empty = DynamicCounts::new();

        let mut result = SynthesisResult::new();
        let mut report = QuantizationReport::new(self.policy.arch.as_str());

        for (family, instrs) in self.policy.families.iter().zip(&per_family) {
            let table = family
                .algorithm
                .counts_path
                .as_ref()
                .and_then(|path| counts.get(path))
                .unwrap_or(&empty);
            let algorithm = Algorithm::new(family, table)?;
            let solution = algorithm.solve_with_report(instrs)?;
            info!(
                "{}: {} instructions, {} uops ({})",
                family.name,
                solution.result.instruction_count(),
                solution.result.uop_count(),
                algorithm.kind()
            );
            result.merge(&solution.result);
            report.families.push(solution.report);
        }

        info!(
            "synthesized {} instructions and {} uops for {}",
            result.instruction_count(),
            result.uop_count(),
            self.policy.arch
        );
        Ok(Generation { result, report })
    }

    /// Load each distinct counts directory once.
    fn load_counts(&self) -> Result<HashMap<PathBuf, DynamicCounts>> {
        let mut cache = HashMap::new();
        for family in &self.policy.families {
            if family.algorithm.kind != AlgorithmKind::RepresentativePort {
                continue;
            }
            match &family.algorithm.counts_path {
                Some(path) if !cache.contains_key(path) => {
                    let counts = DynamicCounts::load_dir(path)?;
                    info!("loaded {} counts from {}", counts.len(), path.display());
                    cache.insert(path.clone(), counts);
                }
                Some(_) => {}
                None => warn!(
                    "{}: no counts-path, every latency weighs the same",
                    family.name
                ),
            }
        }
        Ok(cache)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uopsynth_model::policy::parse_policy_toml;
    use uopsynth_model::PortUsage;

    fn policy(counts: Option<&std::path::Path>) -> PolicyConfig {
        let mut policy = parse_policy_toml(
            r#"
arch = "SKL"
ports = ["p0", "p1", "p5"]

[[families]]
name = "BASE"
extensions = ["BASE"]

[families.algorithm]
kind = "direct"

[families.algorithm.uop-latency]
ALU = 1

[families.port-to-uop]
p0 = "ALU"
p1 = "ALU"
p5 = "ALU"

[families.uop-to-fu]
ALU = ["ALU"]

[[families]]
name = "AVX"
extensions = ["AVX", "AVX2"]

[families.algorithm]
kind = "representative-port"
uop-budget = 1

[families.port-to-uop]
p0 = "VEC"

[families.uop-to-fu]
VEC = ["FP"]
"#,
        )
        .unwrap();
        policy.families[1].algorithm.counts_path = counts.map(|p| p.to_path_buf());
        policy
    }

    fn instructions(policy: &PolicyConfig) -> Vec<Instruction> {
        let ports = PortUsage::zeroed(&policy.ports);
        vec![
            Instruction::new("VMULPS", "VMULPS", "AVX", 5, 5, 1, ports.clone().with("p0", 1)),
            Instruction::new("ADD", "ADD", "BASE", 1, 1, 1, ports.clone().with("p5", 1)),
            Instruction::new("VPADDD", "VPADDD", "AVX2", 1, 1, 1, ports.clone().with("p0", 1)),
            Instruction::new("FADD", "FADD", "X87", 3, 3, 1, ports.with("p0", 1)),
        ]
    }

    #[test]
    fn merges_families_in_order() {
        let policy = policy(None);
        let g = Generator::new(&policy).run(&instructions(&policy)).unwrap();
        assert_eq!(g.result.instruction_count(), 3);
        assert!(g.result.instruction("FADD").is_none());
        let codes: Vec<_> = g.result.instructions().map(|i| i.icode.as_str()).collect();
        assert_eq!(codes, vec!["ADD", "VMULPS", "VPADDD"]);
        assert_eq!(g.report.families.len(), 2);
        assert_eq!(g.report.arch, "SKL");
    }

    #[test]
    fn unweighted_without_counts() {
        let policy = policy(None);
        let g = Generator::new(&policy).run(&instructions(&policy)).unwrap();
        // {1, 5} with unit weights -> 3.
        assert_eq!(g.result.uop("AVX_VEC_0").unwrap().latency, 3);
    }

    #[test]
    fn counts_directory_weights_family() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("run.csv"), "icode,count\nVPADDD,100\nVMULPS,1\n").unwrap();
        let policy = policy(Some(dir.path()));
        let g = Generator::new(&policy).run(&instructions(&policy)).unwrap();
        assert_eq!(g.result.uop("AVX_VEC_0").unwrap().latency, 1);
        assert_eq!(g.report.families[1].ports[0].weights, vec![100, 1]);
    }

    #[test]
    fn missing_counts_directory_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let policy = policy(Some(&dir.path().join("absent")));
        assert!(Generator::new(&policy).run(&instructions(&policy)).is_err());
    }

    #[test]
    fn output_is_independent_of_input_order() {
        let policy = policy(None);
        let mut reversed = instructions(&policy);
        reversed.reverse();
        let a = Generator::new(&policy).run(&instructions(&policy)).unwrap();
        let b = Generator::new(&policy).run(&reversed).unwrap();
        assert_eq!(a.result, b.result);
    }
}
