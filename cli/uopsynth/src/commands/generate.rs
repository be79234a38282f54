//! `uopsynth generate`: characterization + policy -> simulator tables.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use uopsynth_ingest::{load_characterization, IcodeMapping};
use uopsynth_model::policy::load_policy_toml;
use uopsynth_solve::{write_outputs, Generation, Generator};

pub fn run(
    config: &Path,
    xml: &Path,
    icode: &Path,
    output: &str,
    report: Option<&Path>,
) -> Result<()> {
    let policy = load_policy_toml(config)
        .with_context(|| format!("loading policy {}", config.display()))?;
    let mapping =
        IcodeMapping::load(icode).with_context(|| format!("loading {}", icode.display()))?;
    let instructions = load_characterization(xml, &policy, &mapping)
        .with_context(|| format!("reading characterization {}", xml.display()))?;
    log::info!(
        "{} instructions characterized for {}",
        instructions.len(),
        policy.arch
    );

    let generation = Generator::new(&policy)
        .run(&instructions)
        .with_context(|| format!("synthesizing uops for {}", policy.arch))?;

    let written = write_outputs(&generation.result, &policy.functional_units, output)
        .with_context(|| format!("writing outputs with prefix '{output}'"))?;

    if let Some(path) = report {
        generation
            .report
            .write_json(path)
            .with_context(|| format!("writing report {}", path.display()))?;
    }

    print!("{}", summary(&generation, &written, report));
    Ok(())
}

/// Quantization report followed by the list of files written.
fn summary(generation: &Generation, written: &[PathBuf], report: Option<&Path>) -> String {
    let mut out = format!("{}\n", generation.report);
    out.push_str(&format!(
        "Generated {} instructions and {} uops for {}:\n",
        generation.result.instruction_count(),
        generation.result.uop_count(),
        generation.report.arch
    ));
    for path in written {
        out.push_str(&format!("  {}\n", path.display()));
    }
    if let Some(path) = report {
        out.push_str(&format!("Quantization report → {}\n", path.display()));
    }
    out
}
