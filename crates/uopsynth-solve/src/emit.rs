//! Simulator configuration output.
//!
//! Three libconfig-style files are written per run: instructions, uops and
//! functional units. Entries are sorted by key so output is byte-stable.

use std::path::{Path, PathBuf};

use uopsynth_model::FunctionalUnit;

use crate::error::{Result, SolveError};
use crate::result::SynthesisResult;

fn render_list(header: &str, lines: &[String]) -> String {
    format!("{header} = (\n{}\n);\n", lines.join(",\n"))
}

/// `INSTRUCTIONS = ( ... );`, sorted by internal code.
pub fn render_instructions(result: &SynthesisResult) -> String {
    let lines: Vec<String> = result
        .sorted_instructions()
        .into_iter()
        .map(|instr| {
            let uops: Vec<String> = instr.uops.iter().map(|u| format!("\"{u}\"")).collect();
            format!(
                "\t{{ NAME = \"{}\"; UOPS = [{}] }}",
                instr.icode,
                uops.join(", ")
            )
        })
        .collect();
    render_list("INSTRUCTIONS", &lines)
}

/// `UOPS = ( ... );`, sorted by name.
pub fn render_uops(result: &SynthesisResult) -> String {
    let lines: Vec<String> = result
        .sorted_uops()
        .into_iter()
        .map(|uop| {
            format!(
                "\t{{ NAME = \"{}\"; LATENCY = {}; FU = \"{}\"; PORT = \"{}\"; }}",
                uop.name, uop.latency, uop.functional_unit, uop.port
            )
        })
        .collect();
    render_list("UOPS", &lines)
}

/// `FUNCTIONAL_UNITS = ( ... );`, sorted by name.
pub fn render_functional_units(units: &[FunctionalUnit]) -> String {
    let mut sorted: Vec<&FunctionalUnit> = units.iter().collect();
    sorted.sort_by(|a, b| a.name.cmp(&b.name));
    let lines: Vec<String> = sorted
        .into_iter()
        .map(|fu| {
            format!(
                "\t{{ NAME = \"{}\"; SIZE = {}; WAIT_NEXT = {}; }}",
                fu.name, fu.size, fu.wait_next
            )
        })
        .collect();
    render_list("FUNCTIONAL_UNITS", &lines)
}

/// Path of one output file: `<prefix>_<suffix>.cfg`.
pub fn output_path(prefix: &str, suffix: &str) -> PathBuf {
    PathBuf::from(format!("{prefix}_{suffix}.cfg"))
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    std::fs::write(path, content).map_err(|source| SolveError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Write the three configuration files and return their paths.
pub fn write_outputs(
    result: &SynthesisResult,
    units: &[FunctionalUnit],
    prefix: &str,
) -> Result<Vec<PathBuf>> {
    let outputs = [
        (output_path(prefix, "instructions"), render_instructions(result)),
        (output_path(prefix, "uops"), render_uops(result)),
        (output_path(prefix, "functional_units"), render_functional_units(units)),
    ];
    let mut written = Vec::with_capacity(outputs.len());
    for (path, content) in outputs {
        write_file(&path, &content)?;
        log::info!("wrote {}", path.display());
        written.push(path);
    }
    Ok(written)
}
