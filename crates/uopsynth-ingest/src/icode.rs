//! Instruction string to internal code mapping.
//!
//! The mapping is generated by assembling every instruction string and
//! decoding the result; this crate only reads the generated table:
//!
//! ```toml
//! [[instructions]]
//! instr = "ADD (R64, R64)"
//! icode = "ADD_GPRv_GPRv"
//! ```

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::{IngestError, Result};

#[derive(Debug, Deserialize)]
struct MappingFile {
    #[serde(default)]
    instructions: Vec<MappingEntry>,
}

#[derive(Debug, Deserialize)]
struct MappingEntry {
    instr: String,
    icode: String,
}

/// Lookup table from instruction string to internal code.
#[derive(Debug, Clone, Default)]
pub struct IcodeMapping {
    codes: HashMap<String, String>,
}

impl IcodeMapping {
    /// Load a mapping from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(IngestError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path).map_err(|source| IngestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Parse a mapping from a TOML string. Later entries override earlier ones.
    pub fn parse(toml_str: &str) -> Result<Self> {
        let file: MappingFile = toml::from_str(toml_str)?;
        let codes = file
            .instructions
            .into_iter()
            .map(|e| (e.instr, e.icode))
            .collect();
        Ok(Self { codes })
    }

    /// Add or replace one entry.
    pub fn insert(&mut self, instr: impl Into<String>, icode: impl Into<String>) {
        self.codes.insert(instr.into(), icode.into());
    }

    /// Internal code for an instruction string.
    pub fn get(&self, instr: &str) -> Option<&str> {
        self.codes.get(instr).map(String::as_str)
    }

    /// Internal code for an instruction string, or [`IngestError::MissingCode`].
    pub fn require(&self, instr: &str) -> Result<&str> {
        self.get(instr).ok_or_else(|| IngestError::MissingCode {
            instr: instr.to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}
