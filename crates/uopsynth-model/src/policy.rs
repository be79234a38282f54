//! Policy configuration: declared ports and functional units, plus one
//! parameter block per instruction family.
//!
//! Policies are stored as TOML. This module loads, parses and validates them.
//! Validation collects every problem it finds rather than stopping at the
//! first one; `load_policy_toml` turns error-severity issues into a single
//! [`ModelError::Configuration`] and logs the warnings.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

/// Which synthesis algorithm a family uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AlgorithmKind {
    /// One uop per active port with a fixed latency.
    #[serde(alias = "direct_binary")]
    Direct,
    /// Quantized latency ladders per representative port.
    #[serde(alias = "group_rep_port")]
    RepresentativePort,
}

impl AlgorithmKind {
    /// Look up a kind by its policy name, including the legacy aliases.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "direct" | "direct_binary" => Some(AlgorithmKind::Direct),
            "representative-port" | "group_rep_port" => Some(AlgorithmKind::RepresentativePort),
            _ => None,
        }
    }
}

impl std::fmt::Display for AlgorithmKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlgorithmKind::Direct => write!(f, "direct"),
            AlgorithmKind::RepresentativePort => write!(f, "representative-port"),
        }
    }
}

/// A functional unit the simulator models for structural hazards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FunctionalUnit {
    pub name: String,
    /// Number of instances.
    pub size: u32,
    /// Cycles before the unit accepts the next uop.
    pub wait_next: u32,
}

/// Extra latency deduction applied when an operand token matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OperandFix {
    /// Operand token, compared for equality (e.g. `"M128"`).
    pub name: String,
    pub latency: u32,
}

/// Latency correction for instructions that use a given port.
///
/// Typically strips the load-port contribution out of a memory form so the
/// remaining latency reflects the compute part only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LatencyFix {
    pub port: String,
    /// Cycles subtracted when the port is in use.
    pub latency: u32,
    #[serde(default)]
    pub operands: Vec<OperandFix>,
}

/// Internal-code substrings that identify instructions bound to a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Sample {
    pub functional_unit: String,
    pub instructions: Vec<String>,
}

/// Algorithm parameters for one family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AlgorithmParams {
    pub kind: AlgorithmKind,
    /// Maximum number of distinct uops (representative-port only).
    #[serde(default)]
    pub uop_budget: Option<usize>,
    /// Directory of dynamic count CSV files.
    #[serde(default)]
    pub counts_path: Option<PathBuf>,
    /// Ports forced to zero usage before analysis.
    #[serde(default)]
    pub port_fix: Vec<String>,
    #[serde(default)]
    pub latency_fix: Vec<LatencyFix>,
    #[serde(default)]
    pub samples: Vec<Sample>,
    /// Fixed latency per uop kind (direct only).
    #[serde(default)]
    pub uop_latency: IndexMap<String, u32>,
}

/// Parameters for one instruction family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FamilyPolicy {
    /// Family name; prefixes every uop the family creates.
    pub name: String,
    /// ISA extensions routed to this family.
    pub extensions: Vec<String>,
    pub algorithm: AlgorithmParams,
    /// Port -> uop kind.
    #[serde(default)]
    pub port_to_uop: IndexMap<String, String>,
    /// Uop kind -> candidate functional units, in priority order.
    #[serde(default)]
    pub uop_to_fu: IndexMap<String, Vec<String>>,
}

impl FamilyPolicy {
    /// Uop kind mapped to a port.
    pub fn uop_kind(&self, port: &str) -> Option<&str> {
        self.port_to_uop.get(port).map(String::as_str)
    }

    /// Candidate functional units for a uop kind.
    pub fn functional_units(&self, kind: &str) -> Option<&[String]> {
        self.uop_to_fu.get(kind).map(Vec::as_slice)
    }

    /// Sample substrings configured for a functional unit, in declared order.
    pub fn samples_for<'a>(&'a self, unit: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.algorithm
            .samples
            .iter()
            .filter(move |s| s.functional_unit == unit)
            .flat_map(|s| s.instructions.iter().map(String::as_str))
    }
}

/// A complete policy document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PolicyConfig {
    /// Architecture whose measurements are used (e.g. `"SKL"`).
    pub arch: String,
    /// Declared port set, in canonical order.
    pub ports: Vec<String>,
    #[serde(default)]
    pub functional_units: Vec<FunctionalUnit>,
    #[serde(default)]
    pub families: Vec<FamilyPolicy>,
}

impl PolicyConfig {
    /// The family that claims an extension.
    pub fn family_for_extension(&self, extension: &str) -> Option<&FamilyPolicy> {
        self.family_index(extension).map(|i| &self.families[i])
    }

    /// Index of the family that claims an extension.
    pub fn family_index(&self, extension: &str) -> Option<usize> {
        self.families
            .iter()
            .position(|f| f.extensions.iter().any(|e| e == extension))
    }

    /// Look up a declared functional unit.
    pub fn functional_unit(&self, name: &str) -> Option<&FunctionalUnit> {
        self.functional_units.iter().find(|fu| fu.name == name)
    }
}

/// A validation issue found in a policy.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Severity: "error" or "warning".
    pub severity: &'static str,
    /// Human-readable description.
    pub message: String,
}

impl ValidationIssue {
    fn error(message: String) -> Self {
        Self {
            severity: "error",
            message,
        }
    }

    fn warning(message: String) -> Self {
        Self {
            severity: "warning",
            message,
        }
    }
}

/// Load a policy from a TOML file, validate it, and resolve relative
/// counts paths against the file's directory.
pub fn load_policy_toml(path: &Path) -> Result<PolicyConfig> {
    if !path.exists() {
        return Err(ModelError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let content = std::fs::read_to_string(path).map_err(|source| ModelError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut policy = parse_policy_toml(&content)?;

    if let Some(base) = path.parent() {
        for family in &mut policy.families {
            if let Some(counts) = family.algorithm.counts_path.as_mut() {
                if counts.is_relative() {
                    *counts = base.join(&*counts);
                }
            }
        }
    }

    check_policy(&policy)?;
    log::debug!(
        "loaded policy for {} with {} families",
        policy.arch,
        policy.families.len()
    );
    Ok(policy)
}

/// Parse a policy from a TOML string without validating it.
///
/// An unknown algorithm kind is a [`ModelError::Configuration`]; other
/// malformed input is a [`ModelError::Toml`].
pub fn parse_policy_toml(toml_str: &str) -> Result<PolicyConfig> {
    let table: toml::Table = toml::from_str(toml_str)?;
    check_algorithm_kinds(&table)?;
    let policy: PolicyConfig = toml::Value::Table(table).try_into()?;
    Ok(policy)
}

fn check_algorithm_kinds(table: &toml::Table) -> Result<()> {
    let Some(families) = table.get("families").and_then(toml::Value::as_array) else {
        return Ok(());
    };
    for family in families {
        let kind = family
            .get("algorithm")
            .and_then(|a| a.get("kind"))
            .and_then(toml::Value::as_str);
        if let Some(kind) = kind {
            if AlgorithmKind::from_name(kind).is_none() {
                let name = family
                    .get("name")
                    .and_then(toml::Value::as_str)
                    .unwrap_or("<unnamed>");
                return Err(ModelError::Configuration {
                    detail: format!("family '{name}': unknown algorithm kind '{kind}'"),
                });
            }
        }
    }
    Ok(())
}

/// Validate a policy, log its warnings, and fail on any error.
pub fn check_policy(policy: &PolicyConfig) -> Result<()> {
    let issues = match validate_policy(policy) {
        Ok(()) => return Ok(()),
        Err(issues) => issues,
    };

    let mut errors = Vec::new();
    for issue in issues {
        if issue.severity == "error" {
            errors.push(issue.message);
        } else {
            log::warn!("policy: {}", issue.message);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ModelError::Configuration {
            detail: errors.join("; "),
        })
    }
}

/// Validate a policy for structural correctness.
///
/// Returns `Ok(())` if there is nothing to report, or `Err(issues)` with
/// every error and warning found.
pub fn validate_policy(policy: &PolicyConfig) -> std::result::Result<(), Vec<ValidationIssue>> {
    let mut issues = Vec::new();

    if policy.ports.is_empty() {
        issues.push(ValidationIssue::error("no ports declared".into()));
    }
    for (i, port) in policy.ports.iter().enumerate() {
        if policy.ports[..i].contains(port) {
            issues.push(ValidationIssue::error(format!(
                "port '{port}' declared more than once"
            )));
        }
    }

    for (i, fu) in policy.functional_units.iter().enumerate() {
        if policy.functional_units[..i].iter().any(|f| f.name == fu.name) {
            issues.push(ValidationIssue::error(format!(
                "functional unit '{}' declared more than once",
                fu.name
            )));
        }
    }
    if policy.functional_units.is_empty() {
        issues.push(ValidationIssue::warning(
            "no functional units declared; unit names are not checked".into(),
        ));
    }

    let mut claimed: Vec<(&str, &str)> = Vec::new();
    for family in &policy.families {
        if family.extensions.is_empty() {
            issues.push(ValidationIssue::warning(format!(
                "family '{}' claims no extensions",
                family.name
            )));
        }
        for ext in &family.extensions {
            if let Some((_, owner)) = claimed.iter().find(|(e, _)| *e == ext.as_str()) {
                issues.push(ValidationIssue::error(format!(
                    "extension '{ext}' claimed by both '{owner}' and '{}'",
                    family.name
                )));
            } else {
                claimed.push((ext.as_str(), family.name.as_str()));
            }
        }
        if policy.families.iter().filter(|f| f.name == family.name).count() > 1 {
            issues.push(ValidationIssue::error(format!(
                "family name '{}' is not unique",
                family.name
            )));
        }

        validate_family(policy, family, &mut issues);
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(issues)
    }
}

fn validate_family(policy: &PolicyConfig, family: &FamilyPolicy, issues: &mut Vec<ValidationIssue>) {
    let name = &family.name;
    let declared = |port: &str| policy.ports.iter().any(|p| p == port);

    for port in family.port_to_uop.keys() {
        if !declared(port) {
            issues.push(ValidationIssue::error(format!(
                "family '{name}': port-to-uop names undeclared port '{port}'"
            )));
        }
    }
    for port in &family.algorithm.port_fix {
        if !declared(port) {
            issues.push(ValidationIssue::error(format!(
                "family '{name}': port-fix names undeclared port '{port}'"
            )));
        }
    }
    for fix in &family.algorithm.latency_fix {
        if !declared(&fix.port) {
            issues.push(ValidationIssue::error(format!(
                "family '{name}': latency-fix names undeclared port '{}'",
                fix.port
            )));
        }
    }

    for kind in family.port_to_uop.values() {
        match family.functional_units(kind) {
            None | Some([]) => issues.push(ValidationIssue::error(format!(
                "family '{name}': uop kind '{kind}' has no functional units"
            ))),
            Some(units) => {
                if !policy.functional_units.is_empty() {
                    for unit in units {
                        if policy.functional_unit(unit).is_none() {
                            issues.push(ValidationIssue::error(format!(
                                "family '{name}': uop kind '{kind}' uses undeclared functional unit '{unit}'"
                            )));
                        }
                    }
                }
            }
        }
    }

    for sample in &family.algorithm.samples {
        let known = family
            .uop_to_fu
            .values()
            .any(|units| units.contains(&sample.functional_unit));
        if !known {
            issues.push(ValidationIssue::warning(format!(
                "family '{name}': samples for '{}' match no candidate unit",
                sample.functional_unit
            )));
        }
    }

    match family.algorithm.kind {
        AlgorithmKind::Direct => {
            for kind in family.port_to_uop.values() {
                if let Some(units) = family.functional_units(kind) {
                    if units.len() > 1 {
                        issues.push(ValidationIssue::error(format!(
                            "family '{name}': direct uop kind '{kind}' has {} functional units, expected one",
                            units.len()
                        )));
                    }
                }
                if !family.algorithm.uop_latency.contains_key(kind) {
                    issues.push(ValidationIssue::error(format!(
                        "family '{name}': direct uop kind '{kind}' has no uop-latency entry"
                    )));
                }
            }
            if family.algorithm.uop_budget.is_some() {
                issues.push(ValidationIssue::warning(format!(
                    "family '{name}': uop-budget is ignored by the direct algorithm"
                )));
            }
        }
        AlgorithmKind::RepresentativePort => {
            match family.algorithm.uop_budget {
                None => issues.push(ValidationIssue::error(format!(
                    "family '{name}': representative-port requires uop-budget"
                ))),
                Some(0) => issues.push(ValidationIssue::error(format!(
                    "family '{name}': uop-budget must be positive"
                ))),
                Some(_) => {}
            }
            if family.algorithm.counts_path.is_none() {
                issues.push(ValidationIssue::warning(format!(
                    "family '{name}': no counts-path, every latency weighs the same"
                )));
            }
            if !family.algorithm.uop_latency.is_empty() {
                issues.push(ValidationIssue::warning(format!(
                    "family '{name}': uop-latency is ignored by the representative-port algorithm"
                )));
            }
        }
    }
}
