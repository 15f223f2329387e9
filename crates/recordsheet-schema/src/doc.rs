use std::collections::HashSet;
use std::error::Error;
use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::registry::normalize_member;

/// Declarative registry document.
///
/// This is the serde-facing form: names are still strings and field types are
/// still the raw grammar (`int`, `string[]`, `enum:Rarity`, `ref:Card`, …).
/// Call [`RegistryDoc::validate`] for structural checks, then bind it with
/// [`crate::KindRegistry::new`] to resolve every name.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistryDoc {
    /// Enumerations referenced by `enum:` field types.
    #[serde(default)]
    pub enums: Vec<EnumDef>,
    /// Ordered list of record kinds.
    pub kinds: Vec<KindDef>,
}

impl RegistryDoc {
    /// Construct a registry document by reading YAML from any reader.
    pub fn from_yaml_reader<R: std::io::Read>(reader: R) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_reader(reader)
    }

    /// Construct a registry document from a YAML string slice.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Serialize this document to YAML.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    /// Validate the document and return granular issues when invariants fail.
    ///
    /// Only structure is checked here; cross-references inside field types
    /// (unknown enums, unknown kinds) are reported when the registry binds.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        let name_pattern =
            Regex::new(r"^[A-Za-z_][A-Za-z0-9_ ]*$").expect("name regex must compile");

        let mut seen_enums = HashSet::new();
        for (idx, def) in self.enums.iter().enumerate() {
            let path = format!("enums[{idx}]");
            if !name_pattern.is_match(&def.name) {
                issues.push(RegistryIssue::new(
                    format!("{path}.name"),
                    format!("enum name `{}` is not a valid identifier", def.name),
                ));
            }
            if !seen_enums.insert(&def.name) {
                issues.push(RegistryIssue::new(
                    format!("{path}.name"),
                    format!("duplicate enum name `{}`", def.name),
                ));
            }
            if def.variants.is_empty() {
                issues.push(RegistryIssue::new(
                    format!("{path}.variants"),
                    "enum must declare at least one variant".to_string(),
                ));
            }
            if def.flags && def.variants.len() > 32 {
                issues.push(RegistryIssue::new(
                    format!("{path}.variants"),
                    "flags enum cannot hold more than 32 variants".to_string(),
                ));
            }
            let mut seen_variants = HashSet::new();
            for (vidx, variant) in def.variants.iter().enumerate() {
                if !name_pattern.is_match(variant) {
                    issues.push(RegistryIssue::new(
                        format!("{path}.variants[{vidx}]"),
                        format!("variant `{variant}` is not a valid identifier"),
                    ));
                }
                if !seen_variants.insert(variant) {
                    issues.push(RegistryIssue::new(
                        format!("{path}.variants[{vidx}]"),
                        format!("duplicate variant `{variant}`"),
                    ));
                }
            }
        }

        let mut seen_kinds = HashSet::new();
        for (idx, kind) in self.kinds.iter().enumerate() {
            let path = format!("kinds[{idx}]");
            if !name_pattern.is_match(&kind.name) {
                issues.push(RegistryIssue::new(
                    format!("{path}.name"),
                    format!("kind name `{}` is not a valid identifier", kind.name),
                ));
            }
            if !seen_kinds.insert(&kind.name) {
                issues.push(RegistryIssue::new(
                    format!("{path}.name"),
                    format!("duplicate kind name `{}`", kind.name),
                ));
            }
            if kind.fields.is_empty() {
                issues.push(RegistryIssue::new(
                    format!("{path}.fields"),
                    "kind must declare at least one field".to_string(),
                ));
            }
            // Field lookup is case-insensitive with spaces stripped, so two
            // fields that collide after normalization are indistinguishable.
            let mut seen_fields = HashSet::new();
            for (fidx, field) in kind.fields.iter().enumerate() {
                if !name_pattern.is_match(&field.name) {
                    issues.push(RegistryIssue::new(
                        format!("{path}.fields[{fidx}].name"),
                        format!("field name `{}` is not a valid identifier", field.name),
                    ));
                }
                if !seen_fields.insert(normalize_member(&field.name)) {
                    issues.push(RegistryIssue::new(
                        format!("{path}.fields[{fidx}].name"),
                        format!("field `{}` duplicates another after normalization", field.name),
                    ));
                }
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(issues))
        }
    }
}

/// One enumeration declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnumDef {
    pub name: String,
    /// Flags enums assign variant *i* the value `1 << i` and may combine;
    /// plain enums assign the variant index.
    #[serde(default)]
    pub flags: bool,
    pub variants: Vec<String>,
}

/// One record kind declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KindDef {
    pub name: String,
    /// Suppresses identity caching: instances of this kind may share a name.
    #[serde(default)]
    pub non_unique_names: bool,
    /// Instances of this kind accept a positional order value.
    #[serde(default)]
    pub ordered: bool,
    pub fields: Vec<FieldDef>,
}

/// One field declaration within a kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldDef {
    pub name: String,
    /// Raw type grammar, parsed when the registry binds.
    #[serde(rename = "type")]
    pub ty: String,
    /// Fields marked `serialized: false` are skipped by nested-record
    /// encoding.
    #[serde(default = "default_serialized")]
    pub serialized: bool,
}

fn default_serialized() -> bool {
    true
}

/// A single validation or binding failure, located by a document path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryIssue {
    pub path: String,
    pub message: String,
}

impl RegistryIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for RegistryIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Aggregate of every issue found while validating or binding a registry.
#[derive(Debug, Clone)]
pub struct ValidationError {
    issues: Vec<RegistryIssue>,
}

impl ValidationError {
    pub fn new(issues: Vec<RegistryIssue>) -> Self {
        Self { issues }
    }

    pub fn issues(&self) -> &[RegistryIssue] {
        &self.issues
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "registry validation failed ({} issues)", self.issues.len())?;
        for issue in &self.issues {
            write!(f, "\n  {issue}")?;
        }
        Ok(())
    }
}

impl Error for ValidationError {}
