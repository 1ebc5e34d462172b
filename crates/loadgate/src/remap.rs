//! Obfuscated-to-readable class name table.
//!
//! Loaded from an SRG mapping file. Only `CL:` lines are used; package,
//! field and method lines are accepted and ignored. A missing file leaves
//! the table empty so every name maps to itself.

use crate::result::{HarnessError, HarnessResult};
use std::collections::HashMap;
use std::path::Path;

/// Class name mappings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemapTable {
    forward: HashMap<String, String>,
    reverse: HashMap<String, String>,
}

impl RemapTable {
    /// Create an empty table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse SRG text.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Config`] for a malformed `CL:` line or an
    /// unknown record type.
    pub fn parse_srg(text: &str) -> HarnessResult<Self> {
        let mut table = Self::new();
        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (kind, rest) = line.split_once(':').ok_or_else(|| {
                HarnessError::config(format!("SRG line {}: missing record type", idx + 1))
            })?;
            match kind {
                "CL" => {
                    let mut parts = rest.split_whitespace();
                    match (parts.next(), parts.next(), parts.next()) {
                        (Some(obf), Some(named), None) => table.insert(obf, named),
                        _ => {
                            return Err(HarnessError::config(format!(
                                "SRG line {}: expected 'CL: <obf> <named>'",
                                idx + 1
                            )))
                        }
                    }
                }
                "PK" | "FD" | "MD" => {}
                other => {
                    return Err(HarnessError::config(format!(
                        "SRG line {}: unknown record type '{other}'",
                        idx + 1
                    )))
                }
            }
        }
        Ok(table)
    }

    /// Load a mapping file, or an empty table if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_or_empty(path: &Path) -> HarnessResult<Self> {
        if !path.exists() {
            tracing::warn!(
                path = %path.display(),
                "Remap table not found; transformers will see obfuscated names"
            );
            return Ok(Self::new());
        }
        let text = std::fs::read_to_string(path)?;
        let table = Self::parse_srg(&text)?;
        tracing::debug!(path = %path.display(), classes = table.len(), "Remap table loaded");
        Ok(table)
    }

    /// Add a class mapping
    pub fn insert(&mut self, obfuscated: &str, readable: &str) {
        let _ = self
            .forward
            .insert(obfuscated.to_string(), readable.to_string());
        let _ = self
            .reverse
            .insert(readable.to_string(), obfuscated.to_string());
    }

    /// Readable name for `name`, or `name` itself.
    ///
    /// Inner classes (`abc$1`) map through their outermost class.
    #[must_use]
    pub fn map(&self, name: &str) -> String {
        Self::lookup(&self.forward, name)
    }

    /// Obfuscated name for a readable `name`, or `name` itself
    #[must_use]
    pub fn unmap(&self, name: &str) -> String {
        Self::lookup(&self.reverse, name)
    }

    fn lookup(table: &HashMap<String, String>, name: &str) -> String {
        if let Some(mapped) = table.get(name) {
            return mapped.clone();
        }
        if let Some((outer, inner)) = name.split_once('$') {
            if let Some(mapped) = table.get(outer) {
                return format!("{mapped}${inner}");
            }
        }
        name.to_string()
    }

    /// Number of class mappings
    #[must_use]
    pub fn len(&self) -> usize {
        self.forward.len()
    }

    /// Whether the table has no mappings
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }
}
