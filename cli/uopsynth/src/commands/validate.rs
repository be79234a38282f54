//! `uopsynth validate`: policy checks and family summary.

use std::path::Path;

use anyhow::{bail, Context, Result};
use uopsynth_model::policy::{parse_policy_toml, validate_policy};
use uopsynth_model::{AlgorithmKind, PolicyConfig};

pub fn run(config: &Path) -> Result<()> {
    if !config.exists() {
        bail!("policy file not found: {}", config.display());
    }
    let content = std::fs::read_to_string(config)
        .with_context(|| format!("reading {}", config.display()))?;
    let policy =
        parse_policy_toml(&content).with_context(|| format!("parsing {}", config.display()))?;

    let issues = validate_policy(&policy).err().unwrap_or_default();
    let errors = issues.iter().filter(|i| i.severity == "error").count();
    for issue in &issues {
        println!("  [{}] {}", issue.severity, issue.message);
    }
    if errors > 0 {
        bail!("{} has {errors} error(s)", config.display());
    }

    print_summary(&policy);
    Ok(())
}

fn print_summary(policy: &PolicyConfig) {
    println!("=== Policy: {} ===", policy.arch);
    println!("Ports: {}", policy.ports.join(", "));
    println!("Functional units:");
    for fu in &policy.functional_units {
        println!("  {:<12} size={} wait-next={}", fu.name, fu.size, fu.wait_next);
    }
    println!("Families:");
    for family in &policy.families {
        let budget = match (family.algorithm.kind, family.algorithm.uop_budget) {
            (AlgorithmKind::RepresentativePort, Some(b)) => format!(", budget {b}"),
            _ => String::new(),
        };
        println!(
            "  {:<8} {}{budget} [{}]",
            family.name,
            family.algorithm.kind,
            family.extensions.join(", ")
        );
    }
}
