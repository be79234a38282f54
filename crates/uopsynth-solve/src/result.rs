//! Synthesis results and their aggregation.
//!
//! A [`SynthesisResult`] holds instructions keyed by internal code and uops
//! keyed by name. Both keep insertion order and ignore re-insertion of an
//! existing key, so per-family results merge into one without collisions.

use indexmap::IndexMap;
use serde::Serialize;

/// An instruction and the ordered uops it decomposes into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResInstruction {
    pub icode: String,
    pub uops: Vec<String>,
}

impl ResInstruction {
    pub fn new(icode: impl Into<String>) -> Self {
        Self {
            icode: icode.into(),
            uops: Vec::new(),
        }
    }

    pub fn add_uop(&mut self, uop: impl Into<String>) {
        self.uops.push(uop.into());
    }
}

/// A synthetic uop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResUop {
    pub name: String,
    pub latency: u32,
    pub functional_unit: String,
    /// Port label without its prefix character.
    pub port: String,
}

impl ResUop {
    pub fn new(
        name: impl Into<String>,
        latency: u32,
        functional_unit: impl Into<String>,
        port: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            latency,
            functional_unit: functional_unit.into(),
            port: port.into(),
        }
    }
}

/// Deduplicated instruction and uop records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SynthesisResult {
    instructions: IndexMap<String, ResInstruction>,
    uops: IndexMap<String, ResUop>,
}

impl SynthesisResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an instruction. Returns `false` if its internal code is already present.
    pub fn add_instruction(&mut self, instr: ResInstruction) -> bool {
        if self.instructions.contains_key(&instr.icode) {
            return false;
        }
        self.instructions.insert(instr.icode.clone(), instr);
        true
    }

    /// Add a uop. Returns `false` if its name is already present.
    pub fn add_uop(&mut self, uop: ResUop) -> bool {
        if self.uops.contains_key(&uop.name) {
            return false;
        }
        self.uops.insert(uop.name.clone(), uop);
        true
    }

    /// Append a uop name to an existing instruction.
    pub fn attach_uop(&mut self, icode: &str, uop: impl Into<String>) -> bool {
        match self.instructions.get_mut(icode) {
            Some(instr) => {
                instr.add_uop(uop);
                true
            }
            None => false,
        }
    }

    /// Fold `other` into `self`; entries already present win.
    pub fn merge(&mut self, other: &SynthesisResult) {
        for uop in other.uops.values() {
            self.add_uop(uop.clone());
        }
        for instr in other.instructions.values() {
            self.add_instruction(instr.clone());
        }
    }

    pub fn instruction(&self, icode: &str) -> Option<&ResInstruction> {
        self.instructions.get(icode)
    }

    pub fn uop(&self, name: &str) -> Option<&ResUop> {
        self.uops.get(name)
    }

    /// Instructions in insertion order.
    pub fn instructions(&self) -> impl Iterator<Item = &ResInstruction> {
        self.instructions.values()
    }

    /// Uops in insertion order.
    pub fn uops(&self) -> impl Iterator<Item = &ResUop> {
        self.uops.values()
    }

    /// Instructions sorted by internal code.
    pub fn sorted_instructions(&self) -> Vec<&ResInstruction> {
        let mut sorted: Vec<_> = self.instructions.values().collect();
        sorted.sort_by(|a, b| a.icode.cmp(&b.icode));
        sorted
    }

    /// Uops sorted by name.
    pub fn sorted_uops(&self) -> Vec<&ResUop> {
        let mut sorted: Vec<_> = self.uops.values().collect();
        sorted.sort_by(|a, b| a.name.cmp(&b.name));
        sorted
    }

    pub fn instruction_count(&self) -> usize {
        self.instructions.len()
    }

    pub fn uop_count(&self) -> usize {
        self.uops.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result_a() -> SynthesisResult {
        let mut r = SynthesisResult::new();
        let mut add = ResInstruction::new("ADD");
        add.add_uop("BASE_ALU");
        r.add_instruction(add);
        r.add_uop(ResUop::new("BASE_ALU", 1, "ALU", "0"));
        r
    }

    fn result_b() -> SynthesisResult {
        let mut r = SynthesisResult::new();
        let mut vadd = ResInstruction::new("VADDPS");
        vadd.add_uop("AVX_VEC_0");
        r.add_instruction(vadd);
        r.add_uop(ResUop::new("AVX_VEC_0", 4, "FP_ADD", "01"));
        r
    }

    #[test]
    fn duplicates_are_ignored() {
        let mut r = result_a();
        assert!(!r.add_instruction(ResInstruction::new("ADD")));
        assert!(!r.add_uop(ResUop::new("BASE_ALU", 9, "OTHER", "5")));
        assert_eq!(r.instruction("ADD").unwrap().uops, vec!["BASE_ALU"]);
        assert_eq!(r.uop("BASE_ALU").unwrap().latency, 1);
    }

    #[test]
    fn attach_to_existing_only() {
        let mut r = result_a();
        assert!(r.attach_uop("ADD", "BASE_AGU"));
        assert!(!r.attach_uop("SUB", "BASE_ALU"));
        assert_eq!(r.instruction("ADD").unwrap().uops, vec!["BASE_ALU", "BASE_AGU"]);
    }

    #[test]
    fn merge_combines_families() {
        let mut r = result_a();
        r.merge(&result_b());
        assert_eq!(r.instruction_count(), 2);
        assert_eq!(r.uop_count(), 2);
    }

    #[test]
    fn merge_is_idempotent() {
        let a = result_a();
        let mut r = a.clone();
        r.merge(&result_b());
        let once = r.clone();
        r.merge(&a);
        assert_eq!(r, once);
    }

    #[test]
    fn merge_first_writer_wins() {
        let mut r = result_a();
        let mut other = SynthesisResult::new();
        other.add_uop(ResUop::new("BASE_ALU", 3, "MUL", "1"));
        r.merge(&other);
        assert_eq!(r.uop("BASE_ALU").unwrap().latency, 1);
    }

    #[test]
    fn sorted_views() {
        let mut r = result_b();
        r.merge(&result_a());
        let codes: Vec<_> = r.sorted_instructions().iter().map(|i| i.icode.as_str()).collect();
        assert_eq!(codes, vec!["ADD", "VADDPS"]);
        let names: Vec<_> = r.sorted_uops().iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["AVX_VEC_0", "BASE_ALU"]);
    }
}
