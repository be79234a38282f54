//! Per-family algorithm dispatch.

use uopsynth_model::{AlgorithmKind, DynamicCounts, FamilyPolicy, Instruction};

use crate::direct::DirectMapping;
use crate::error::Result;
use crate::rep_port::RepresentativePort;
use crate::report::FamilyReport;
use crate::result::SynthesisResult;

/// A family's synthesized records and how they were obtained.
#[derive(Debug, Clone)]
pub struct FamilySolution {
    pub result: SynthesisResult,
    pub report: FamilyReport,
}

/// The synthesis algorithm configured for a family.
#[derive(Debug, Clone)]
pub enum Algorithm<'c> {
    Direct(DirectMapping),
    RepresentativePort(RepresentativePort<'c>),
}

impl<'c> Algorithm<'c> {
    /// Build the algorithm a family's policy asks for.
    ///
    /// `counts` weighs representative-port ladders; direct mapping ignores it.
    pub fn new(family: &FamilyPolicy, counts: &'c DynamicCounts) -> Result<Self> {
        match family.algorithm.kind {
            AlgorithmKind::Direct => Ok(Self::Direct(DirectMapping::new(family.clone())?)),
            AlgorithmKind::RepresentativePort => Ok(Self::RepresentativePort(
                RepresentativePort::new(family.clone(), counts)?,
            )),
        }
    }

    pub fn kind(&self) -> AlgorithmKind {
        match self {
            Self::Direct(_) => AlgorithmKind::Direct,
            Self::RepresentativePort(_) => AlgorithmKind::RepresentativePort,
        }
    }

    pub fn family(&self) -> &FamilyPolicy {
        match self {
            Self::Direct(algo) => algo.family(),
            Self::RepresentativePort(algo) => algo.family(),
        }
    }

    /// Synthesize the family's instructions.
    pub fn solve(&self, instructions: &[Instruction]) -> Result<SynthesisResult> {
        Ok(self.solve_with_report(instructions)?.result)
    }

    /// Synthesize the family's instructions and report on the outcome.
    pub fn solve_with_report(&self, instructions: &[Instruction]) -> Result<FamilySolution> {
        match self {
            Self::Direct(algo) => {
                let result = algo.solve(instructions)?;
                let report = FamilyReport {
                    family: algo.family().name.clone(),
                    algorithm: AlgorithmKind::Direct.to_string(),
                    instructions: result.instruction_count(),
                    uops: result.uop_count(),
                    configured_budget: None,
                    effective_budget: None,
                    total_cost: 0,
                    ports: Vec::new(),
                };
                Ok(FamilySolution { result, report })
            }
            Self::RepresentativePort(algo) => algo.solve(instructions),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uopsynth_model::policy::parse_policy_toml;
    use uopsynth_model::PortUsage;

    const POLICY: &str = r#"
arch = "SKL"
ports = ["p0", "p1"]

[[families]]
name = "BASE"
extensions = ["BASE"]

[families.algorithm]
kind = "direct_binary"

[families.algorithm.uop-latency]
ALU = 1

[families.port-to-uop]
p0 = "ALU"
p1 = "ALU"

[families.uop-to-fu]
ALU = ["ALU"]

[[families]]
name = "SSE"
extensions = ["SSE"]

[families.algorithm]
kind = "group_rep_port"
uop-budget = 2

[families.port-to-uop]
p0 = "VEC"
p1 = "VEC"

[families.uop-to-fu]
VEC = ["FP"]
"#;

    #[test]
    fn dispatches_on_kind() {
        let policy = parse_policy_toml(POLICY).unwrap();
        let counts = DynamicCounts::new();
        let base = Algorithm::new(&policy.families[0], &counts).unwrap();
        let sse = Algorithm::new(&policy.families[1], &counts).unwrap();
        assert_eq!(base.kind(), AlgorithmKind::Direct);
        assert_eq!(sse.kind(), AlgorithmKind::RepresentativePort);
        assert_eq!(sse.family().name, "SSE");
    }

    #[test]
    fn direct_report_has_no_budget() {
        let policy = parse_policy_toml(POLICY).unwrap();
        let counts = DynamicCounts::new();
        let algo = Algorithm::new(&policy.families[0], &counts).unwrap();
        let ports = PortUsage::zeroed(&policy.ports).with("p0", 1).with("p1", 1);
        let add = Instruction::new("ADD (GPR, GPR)", "ADD_GPR", "BASE", 1, 1, 2, ports);
        let s = algo.solve_with_report(&[add]).unwrap();
        assert_eq!(s.report.algorithm, "direct");
        assert_eq!(s.report.effective_budget, None);
        assert_eq!(
            s.result.instruction("ADD_GPR").unwrap().uops,
            vec!["BASE_ALU", "BASE_ALU"]
        );
    }

    #[test]
    fn solve_is_deterministic() {
        let policy = parse_policy_toml(POLICY).unwrap();
        let counts = DynamicCounts::new();
        let algo = Algorithm::new(&policy.families[1], &counts).unwrap();
        let ports = PortUsage::zeroed(&policy.ports);
        let instrs = vec![
            Instruction::new("ADDPS", "ADDPS", "SSE", 4, 4, 1, ports.clone().with("p0", 1)),
            Instruction::new("MULPS", "MULPS", "SSE", 5, 5, 1, ports.clone().with("p1", 1)),
            Instruction::new("DIVPS", "DIVPS", "SSE", 11, 11, 1, ports.with("p0", 1)),
        ];
        assert_eq!(algo.solve(&instrs).unwrap(), algo.solve(&instrs).unwrap());
    }
}
