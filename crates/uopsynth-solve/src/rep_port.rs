//! Representative-port synthesis.
//!
//! Every instruction is reduced to one `(representative port, latency)` pair.
//! The distinct latencies seen on each port form a ladder; the family's uop
//! budget is spread over all ladders by the quantization solver, and each
//! resulting run becomes one uop shared by every instruction in it.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use log::{debug, warn};
use uopsynth_model::{DynamicCounts, FamilyPolicy, Instruction};

use crate::algorithm::FamilySolution;
use crate::error::{Result, SolveError};
use crate::functional_unit::{bind_unit, bound_name, port_label, uop_records};
use crate::quantize::{LatencyLadder, Solver};
use crate::report::{FamilyReport, PortReport};
use crate::result::{ResInstruction, SynthesisResult};

/// Instructions that share a representative port and latency.
#[derive(Debug, Default)]
struct Bucket<'i> {
    icodes: Vec<&'i str>,
    count: u64,
}

/// Representative-port algorithm bound to one family and its counts.
#[derive(Debug, Clone)]
pub struct RepresentativePort<'c> {
    family: FamilyPolicy,
    budget: usize,
    counts: &'c DynamicCounts,
}

impl<'c> RepresentativePort<'c> {
    pub fn new(family: FamilyPolicy, counts: &'c DynamicCounts) -> Result<Self> {
        let budget = match family.algorithm.uop_budget {
            Some(budget) if budget > 0 => budget,
            Some(_) => {
                return Err(SolveError::Configuration {
                    family: family.name.clone(),
                    detail: "uop-budget must be positive".into(),
                })
            }
            None => {
                return Err(SolveError::Configuration {
                    family: family.name.clone(),
                    detail: "representative-port requires uop-budget".into(),
                })
            }
        };
        Ok(Self {
            family,
            budget,
            counts,
        })
    }

    pub fn family(&self) -> &FamilyPolicy {
        &self.family
    }

    /// Adjusted latency and representative port of an instruction.
    ///
    /// Returns `None` when no port is left in use.
    pub fn classify(&self, instr: &Instruction) -> Option<(String, u32)> {
        let params = &self.family.algorithm;
        let mut ports = instr.ports.clone();
        for port in &params.port_fix {
            ports.zero(port);
        }

        let mut latency = i64::from(instr.max_latency);
        for fix in &params.latency_fix {
            if ports.get(&fix.port) == 0 {
                continue;
            }
            latency -= i64::from(fix.latency);
            ports.zero(&fix.port);
            for operand in &fix.operands {
                if instr.has_operand(&operand.name) {
                    latency -= i64::from(operand.latency);
                }
            }
        }

        let port = ports.representative()?.to_string();
        Some((port, latency.max(1) as u32))
    }

    /// Synthesize the family and describe the quantization.
    pub fn solve(&self, instructions: &[Instruction]) -> Result<FamilySolution> {
        let family = &self.family.name;
        let mut result = SynthesisResult::new();
        let mut groups: IndexMap<String, BTreeMap<u32, Bucket<'_>>> = IndexMap::new();

        for instr in instructions {
            result.add_instruction(ResInstruction::new(instr.icode.as_str()));
            let Some((port, latency)) = self.classify(instr) else {
                debug!("{family}: {} has no representative port", instr.icode);
                continue;
            };
            let bucket = groups.entry(port).or_default().entry(latency).or_default();
            bucket.icodes.push(instr.icode.as_str());
            bucket.count = bucket.count.saturating_add(self.counts.get(&instr.icode));
        }

        let ladders: Vec<LatencyLadder> = groups
            .iter()
            .map(|(port, buckets)| {
                LatencyLadder::new(
                    port.as_str(),
                    buckets.iter().map(|(&lat, b)| (lat, b.count)),
                )
            })
            .collect();
        for ladder in &ladders {
            debug!(
                "{family}: ladder {} = {:?}",
                ladder.port,
                ladder
                    .points()
                    .iter()
                    .map(|p| (p.latency, p.weight))
                    .collect::<Vec<_>>()
            );
        }

        let solver = Solver::new(&ladders);
        let mut budget = self.budget;
        if budget > solver.max_runs() {
            warn!(
                "{family}: uop budget {budget} exceeds {} distinct latencies, clamping",
                solver.max_runs()
            );
            budget = solver.max_runs();
        }
        if budget < solver.min_runs() {
            return Err(SolveError::InfeasibleBudget {
                family: family.clone(),
                budget,
                required: solver.min_runs(),
            });
        }
        let quantization = solver
            .solve(budget)
            .ok_or_else(|| SolveError::InfeasibleBudget {
                family: family.clone(),
                budget,
                required: solver.min_runs(),
            })?;

        let mut counters: IndexMap<String, usize> = IndexMap::new();
        let mut ports = Vec::with_capacity(ladders.len());

        for (index, ((port, buckets), ladder)) in groups.iter().zip(&ladders).enumerate() {
            let kind = self
                .family
                .uop_kind(port)
                .ok_or_else(|| SolveError::Configuration {
                    family: family.clone(),
                    detail: format!("representative port '{port}' has no port-to-uop entry"),
                })?;
            let units = self
                .family
                .functional_units(kind)
                .ok_or_else(|| SolveError::Configuration {
                    family: family.clone(),
                    detail: format!("uop kind '{kind}' has no functional units"),
                })?;

            let mut created: BTreeMap<u32, String> = BTreeMap::new();
            let latencies: Vec<&Bucket<'_>> = buckets.values().collect();
            for run in &quantization.runs[index] {
                let base = match created.get(&run.latency) {
                    Some(base) => base.clone(),
                    None => {
                        let counter = counters.entry(kind.to_string()).or_insert(0);
                        let base = format!("{family}_{kind}_{counter}");
                        *counter += 1;
                        for uop in uop_records(&base, run.latency, units, port_label(port)) {
                            result.add_uop(uop);
                        }
                        created.insert(run.latency, base.clone());
                        base
                    }
                };

                for bucket in &latencies[run.start..run.end] {
                    for icode in &bucket.icodes {
                        let unit = bind_unit(&self.family, units, icode);
                        result.attach_uop(icode, bound_name(&base, units, unit));
                    }
                }
            }

            let cost: u128 = quantization.runs[index].iter().map(|r| r.cost).sum();
            ports.push(PortReport::new(
                port.as_str(),
                kind,
                ladder.points().iter().map(|p| p.latency).collect(),
                quantization.quantized(index),
                ladder.points().iter().map(|p| p.weight).collect(),
                quantization.runs[index].len(),
                u64::try_from(cost).unwrap_or(u64::MAX),
            ));
        }

        let report = FamilyReport {
            family: family.clone(),
            algorithm: self.family.algorithm.kind.to_string(),
            instructions: result.instruction_count(),
            uops: result.uop_count(),
            configured_budget: Some(self.budget),
            effective_budget: Some(budget),
            total_cost: u64::try_from(quantization.cost).unwrap_or(u64::MAX),
            ports,
        };
        Ok(FamilySolution { result, report })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uopsynth_model::policy::parse_policy_toml;
    use uopsynth_model::PortUsage;

    const PORTS: [&str; 4] = ["p0", "p1", "p5", "p23"];

    const POLICY: &str = r#"
arch = "SKL"
ports = ["p0", "p1", "p5", "p23"]

[[families]]
name = "AVX"
extensions = ["AVX"]

[families.algorithm]
kind = "representative-port"
uop-budget = 8
port-fix = ["p1"]

[[families.algorithm.latency-fix]]
port = "p23"
latency = 5
operands = [{ name = "M256", latency = 1 }]

[[families.algorithm.samples]]
functional-unit = "FP_MUL"
instructions = ["MUL"]

[families.port-to-uop]
p0 = "VEC"
p5 = "SHUF"
p23 = "LOAD"

[families.uop-to-fu]
VEC = ["FP_ADD", "FP_MUL"]
SHUF = ["SHUF"]
LOAD = ["AGU"]
"#;

    fn family(budget: usize) -> FamilyPolicy {
        let mut f = parse_policy_toml(POLICY).unwrap().families[0].clone();
        f.algorithm.uop_budget = Some(budget);
        f
    }

    fn usage(terms: &[(&str, u32)]) -> PortUsage {
        terms
            .iter()
            .fold(PortUsage::zeroed(&PORTS), |u, &(p, c)| u.with(p, c))
    }

    fn instr(name: &str, icode: &str, latency: u32, ports: &[(&str, u32)]) -> Instruction {
        Instruction::new(name, icode, "AVX", latency, latency, 1, usage(ports))
    }

    fn instructions() -> Vec<Instruction> {
        vec![
            instr("VADDPS (YMM, YMM, YMM)", "VADDPS_YMM", 4, &[("p0", 1)]),
            instr(
                "VMULPS (YMM, YMM, M256)",
                "VMULPS_YMM_MEM",
                11,
                &[("p0", 1), ("p23", 1)],
            ),
            instr("VSHUFPS (YMM, YMM, YMM, I8)", "VSHUFPS_YMM", 1, &[("p5", 1)]),
            instr("VZEROUPPER", "VZEROUPPER", 1, &[]),
            instr("VZEROALL", "VZEROALL", 1, &[("p1", 1)]),
        ]
    }

    fn uops_of(solution: &FamilySolution, icode: &str) -> Vec<String> {
        solution.result.instruction(icode).unwrap().uops.clone()
    }

    #[test]
    fn classify_applies_latency_and_operand_fixes() {
        let empty = DynamicCounts::new();
        let algo = RepresentativePort::new(family(8), &empty).unwrap();
        let instrs = instructions();
        assert_eq!(algo.classify(&instrs[0]), Some(("p0".into(), 4)));
        // 11 - 5 (p23) - 1 (M256)
        assert_eq!(algo.classify(&instrs[1]), Some(("p0".into(), 5)));
        assert_eq!(algo.classify(&instrs[3]), None);
        assert_eq!(algo.classify(&instrs[4]), None);
    }

    #[test]
    fn latency_is_floored_at_one() {
        let empty = DynamicCounts::new();
        let algo = RepresentativePort::new(family(8), &empty).unwrap();
        let i = instr(
            "VPBROADCASTQ (YMM, M256)",
            "VPBROADCASTQ_YMM_MEM",
            4,
            &[("p5", 1), ("p23", 1)],
        );
        assert_eq!(algo.classify(&i), Some(("p5".into(), 1)));
    }

    #[test]
    fn budget_is_clamped_to_distinct_latencies() {
        let empty = DynamicCounts::new();
        let algo = RepresentativePort::new(family(8), &empty).unwrap();
        let s = algo.solve(&instructions()).unwrap();

        assert_eq!(s.report.effective_budget, Some(3));
        assert_eq!(s.report.configured_budget, Some(8));
        assert_eq!(s.report.total_cost, 0);

        let names: Vec<_> = s.result.uops().map(|u| u.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["AVX_VEC_0_0", "AVX_VEC_0_1", "AVX_VEC_1_0", "AVX_VEC_1_1", "AVX_SHUF_0"]
        );
        assert_eq!(uops_of(&s, "VADDPS_YMM"), vec!["AVX_VEC_0_0"]);
        assert_eq!(uops_of(&s, "VMULPS_YMM_MEM"), vec!["AVX_VEC_1_1"]);
        assert_eq!(uops_of(&s, "VSHUFPS_YMM"), vec!["AVX_SHUF_0"]);

        let mul = s.result.uop("AVX_VEC_1_1").unwrap();
        assert_eq!((mul.latency, mul.functional_unit.as_str(), mul.port.as_str()), (5, "FP_MUL", "0"));
    }

    #[test]
    fn idle_instructions_get_no_uops() {
        let empty = DynamicCounts::new();
        let algo = RepresentativePort::new(family(8), &empty).unwrap();
        let s = algo.solve(&instructions()).unwrap();
        assert_eq!(s.result.instruction_count(), 5);
        assert!(uops_of(&s, "VZEROUPPER").is_empty());
        assert!(uops_of(&s, "VZEROALL").is_empty());
    }

    #[test]
    fn tight_budget_merges_latencies() {
        let empty = DynamicCounts::new();
        let algo = RepresentativePort::new(family(2), &empty).unwrap();
        let s = algo.solve(&instructions()).unwrap();

        // {4, 5} with unit weights: 4.5 rounds up to 5.
        assert_eq!(s.result.uop("AVX_VEC_0_0").unwrap().latency, 5);
        assert!(s.result.uop("AVX_VEC_1_0").is_none());
        assert_eq!(uops_of(&s, "VADDPS_YMM"), vec!["AVX_VEC_0_0"]);
        assert_eq!(uops_of(&s, "VMULPS_YMM_MEM"), vec!["AVX_VEC_0_1"]);

        let p0 = &s.report.ports[0];
        assert_eq!(p0.port, "p0");
        assert_eq!(p0.latencies, vec![4, 5]);
        assert_eq!(p0.quantized, vec![5, 5]);
        assert_eq!(p0.runs, 1);
        assert_eq!(s.report.total_cost, 1);
    }

    #[test]
    fn counts_weight_the_average() {
        let mut counts = DynamicCounts::new();
        counts.add("VADDPS_YMM", 10);
        let algo = RepresentativePort::new(family(2), &counts).unwrap();
        let s = algo.solve(&instructions()).unwrap();
        // (10 * 4 + 1 * 5) / 11 = 4.09
        assert_eq!(s.result.uop("AVX_VEC_0_0").unwrap().latency, 4);
        assert_eq!(s.report.ports[0].weights, vec![10, 1]);
    }

    #[test]
    fn budget_below_port_count_is_infeasible() {
        let empty = DynamicCounts::new();
        let algo = RepresentativePort::new(family(1), &empty).unwrap();
        let err = algo.solve(&instructions()).unwrap_err();
        assert!(matches!(
            err,
            SolveError::InfeasibleBudget {
                budget: 1,
                required: 2,
                ..
            }
        ));
    }

    #[test]
    fn every_represented_instruction_gets_one_uop() {
        let empty = DynamicCounts::new();
        for budget in 2..=3 {
            let algo = RepresentativePort::new(family(budget), &empty).unwrap();
            let s = algo.solve(&instructions()).unwrap();
            for icode in ["VADDPS_YMM", "VMULPS_YMM_MEM", "VSHUFPS_YMM"] {
                let uops = uops_of(&s, icode);
                assert_eq!(uops.len(), 1);
                assert!(s.result.uop(&uops[0]).is_some());
            }
            let runs: usize = s.report.ports.iter().map(|p| p.runs).sum();
            assert_eq!(runs, budget);
        }
    }

    #[test]
    fn unmapped_representative_port_is_an_error() {
        let mut f = family(4);
        f.algorithm.port_fix.clear();
        let empty = DynamicCounts::new();
        let algo = RepresentativePort::new(f, &empty).unwrap();
        let err = algo.solve(&instructions()).unwrap_err();
        assert!(matches!(err, SolveError::Configuration { .. }));
        assert!(err.to_string().contains("p1"));
    }

    #[test]
    fn shared_kind_keeps_names_distinct() {
        let mut f = family(8);
        f.port_to_uop.insert("p5".into(), "VEC".into());
        let empty = DynamicCounts::new();
        let algo = RepresentativePort::new(f, &empty).unwrap();
        let s = algo.solve(&instructions()).unwrap();
        assert_eq!(uops_of(&s, "VSHUFPS_YMM"), vec!["AVX_VEC_2_0"]);
        assert_eq!(s.result.uop("AVX_VEC_2_0").unwrap().port, "5");
    }

    #[test]
    fn requires_budget() {
        let mut f = family(8);
        f.algorithm.uop_budget = None;
        let empty = DynamicCounts::new();
        let err = RepresentativePort::new(f, &empty).unwrap_err();
        assert!(err.to_string().contains("uop-budget"));
    }
}
