// src/requirements.rs

//! Declared requirements and their text form
//!
//! Requirements live in the `[requires]` table of `keel.toml`:
//!
//! ```toml
//! [requires]
//! json-tools = "^1.2"
//! text-core = ">= 2.0.0, < 3.0.0"
//! ```
//!
//! Callers compare requirement changes on the parsed sets, never on the
//! text, so reformatting the file never triggers a resolution.

use crate::error::{Error, Result};
use crate::version::VersionSet;
use std::collections::BTreeMap;

/// Package -> admissible versions
pub type RequirementSet = BTreeMap<String, VersionSet>;

/// Parse/serialize pair for requirement text (external collaborator)
pub trait RequirementSource {
    fn parse(&self, text: &str) -> Result<RequirementSet>;
    fn write(&self, requirements: &RequirementSet) -> Result<String>;
}

/// Requirement source over the `[requires]` table of a TOML document
///
/// `write` keeps every other table of the document it was created from.
#[derive(Debug, Clone, Default)]
pub struct TomlRequirements {
    base: toml::Table,
}

const REQUIRES_TABLE: &str = "requires";

impl TomlRequirements {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `text` as the surrounding document for later writes
    pub fn with_document(text: &str) -> Result<Self> {
        let base: toml::Table = toml::from_str(text)?;
        Ok(Self { base })
    }
}

impl RequirementSource for TomlRequirements {
    fn parse(&self, text: &str) -> Result<RequirementSet> {
        let doc: toml::Table = toml::from_str(text)?;
        let mut reqs = RequirementSet::new();

        let Some(requires) = doc.get(REQUIRES_TABLE) else {
            return Ok(reqs);
        };
        let table = requires
            .as_table()
            .ok_or_else(|| Error::Config("[requires] must be a table".to_string()))?;

        for (name, value) in table {
            let constraint = value.as_str().ok_or_else(|| {
                Error::Config(format!("requirement for '{}' must be a string", name))
            })?;
            reqs.insert(name.clone(), VersionSet::parse(constraint)?);
        }
        Ok(reqs)
    }

    fn write(&self, requirements: &RequirementSet) -> Result<String> {
        let mut doc = self.base.clone();
        let table: toml::Table = requirements
            .iter()
            .map(|(name, set)| (name.clone(), toml::Value::String(set.to_string())))
            .collect();
        doc.insert(REQUIRES_TABLE.to_string(), toml::Value::Table(table));
        Ok(toml::to_string(&doc)?)
    }
}

/// Whether two requirement texts differ once parsed
pub fn requirements_changed(source: &dyn RequirementSource, before: &str, after: &str) -> Result<bool> {
    Ok(source.parse(before)? != source.parse(after)?)
}
