//! Dynamic execution counts per internal code.
//!
//! Counts come from a directory of CSV files, one per benchmark run, each with
//! a header row naming at least an `icode` and a `count` column. Values for the
//! same internal code are summed across rows and files.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{ModelError, Result};

/// Accumulated execution counts, keyed by internal code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DynamicCounts {
    counts: HashMap<String, u64>,
}

impl DynamicCounts {
    /// An empty table; every lookup weighs zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load and sum every CSV file in a directory.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(ModelError::NotFound {
                path: dir.to_path_buf(),
            });
        }
        let io_err = |source| ModelError::Io {
            path: dir.to_path_buf(),
            source,
        };

        let mut files: Vec<PathBuf> = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            if path.is_file() {
                files.push(path);
            }
        }
        files.sort();

        let mut counts = Self::new();
        for path in &files {
            let content = std::fs::read_to_string(path).map_err(|source| ModelError::Io {
                path: path.clone(),
                source,
            })?;
            counts.add_csv(&content, path)?;
        }
        log::debug!(
            "loaded counts for {} internal codes from {} files in {}",
            counts.len(),
            files.len(),
            dir.display()
        );
        Ok(counts)
    }

    /// Parse one CSV document and add its rows. `origin` is used in errors.
    pub fn add_csv(&mut self, content: &str, origin: &Path) -> Result<()> {
        let malformed = |line: usize, detail: String| ModelError::MalformedCounts {
            path: origin.to_path_buf(),
            line,
            detail,
        };

        let mut lines = content
            .lines()
            .enumerate()
            .filter(|(_, l)| !l.trim().is_empty());

        let Some((header_line, header)) = lines.next() else {
            return Ok(());
        };
        let columns = split_fields(header);
        let column = |name: &str| {
            columns
                .iter()
                .position(|c| *c == name)
                .ok_or_else(|| malformed(header_line + 1, format!("missing '{name}' column")))
        };
        let icode_col = column("icode")?;
        let count_col = column("count")?;

        for (idx, line) in lines {
            let fields = split_fields(line);
            let (Some(icode), Some(count)) = (fields.get(icode_col), fields.get(count_col)) else {
                return Err(malformed(idx + 1, format!("expected {} fields", columns.len())));
            };
            let count = parse_count(count)
                .ok_or_else(|| malformed(idx + 1, format!("invalid count '{count}'")))?;
            self.add(icode, count);
        }
        Ok(())
    }

    /// Add `count` executions of `icode`.
    pub fn add(&mut self, icode: &str, count: u64) {
        let slot = self.counts.entry(icode.to_string()).or_insert(0);
        *slot = slot.saturating_add(count);
    }

    /// Execution count for an internal code, zero when absent.
    pub fn get(&self, icode: &str) -> u64 {
        self.counts.get(icode).copied().unwrap_or(0)
    }

    /// Number of distinct internal codes seen.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

/// Split one CSV record into fields.
///
/// Commas inside `"..."` do not separate fields and `""` inside quotes is a
/// literal quote. Whitespace around unquoted fields is trimmed.
fn split_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if quoted => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    quoted = false;
                }
            }
            '"' if field.trim().is_empty() => {
                field.clear();
                quoted = true;
            }
            ',' if !quoted => fields.push(std::mem::take(&mut field).trim().to_string()),
            _ => field.push(c),
        }
    }
    fields.push(field.trim().to_string());
    fields
}

/// Counts may be written as integers or as floats (`"1.2e6"`).
fn parse_count(field: &str) -> Option<u64> {
    if let Ok(n) = field.parse::<u64>() {
        return Some(n);
    }
    let f: f64 = field.parse().ok()?;
    (f.is_finite() && f >= 0.0).then(|| f.round() as u64)
}
