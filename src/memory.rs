//! The local `memory.json` file.
//!
//! Holds operator conveniences that outlive a single run. Today that is the
//! `name_map`, which maps short aliases to recipient names.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memory {
    #[serde(default)]
    pub name_map: BTreeMap<String, String>,
}

impl Memory {
    /// Load the memory file, creating it with an empty `name_map` when it does
    /// not exist yet.
    pub fn load_or_init(path: &Path) -> Result<Self> {
        if !path.exists() {
            let memory = Self::default();
            memory.save(path)?;
            return Ok(memory);
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading memory file {}", path.display()))?;
        let memory = serde_json::from_str(&contents)
            .with_context(|| format!("parsing memory file {}", path.display()))?;
        Ok(memory)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string(self)?)
            .with_context(|| format!("writing memory file {}", path.display()))?;
        Ok(())
    }

    pub fn set_alias(&mut self, alias: impl Into<String>, name: impl Into<String>) -> Option<String> {
        self.name_map.insert(alias.into(), name.into())
    }

    /// The recipient name an alias stands for, or `name` itself.
    pub fn resolve<'a>(&'a self, name: &'a str) -> &'a str {
        self.name_map.get(name).map(String::as_str).unwrap_or(name)
    }
}
