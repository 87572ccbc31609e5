//! Generation run configuration

use crate::error::Error;
use std::path::PathBuf;

/// Configuration for one generation run.
///
/// Built by the CLI from flags and manifest defaults; the library only
/// ever reads it.
#[derive(Debug, Clone, Default)]
pub struct GeneratorConfig {
    /// Library name used in constant naming and as the runtime frame tag.
    /// Mandatory by generation time; may be supplied late by a manifest's
    /// `[library]` table.
    pub library_name: Option<String>,

    /// Path of the persisted identifier ledger. Without one, every run
    /// numbers from scratch and identifier stability only holds within
    /// the run.
    pub ledger_path: Option<PathBuf>,

    /// Emit the response identifier integrity check in the stub and the
    /// matching late response-id store in the dispatcher.
    pub hardened: bool,

    /// File name the stub and dispatch artifacts use to `#include` the
    /// generated defs header. Defaults to `<libname>_gate_defs.h`.
    pub defs_include: Option<String>,
}

impl GeneratorConfig {
    pub fn new() -> Self {
        GeneratorConfig::default()
    }

    pub fn with_library_name(mut self, name: impl Into<String>) -> Self {
        self.library_name = Some(name.into());
        self
    }

    pub fn with_ledger_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ledger_path = Some(path.into());
        self
    }

    pub fn with_hardened(mut self, hardened: bool) -> Self {
        self.hardened = hardened;
        self
    }

    pub fn with_defs_include(mut self, file_name: impl Into<String>) -> Self {
        self.defs_include = Some(file_name.into());
        self
    }

    /// The library name, or the fatal precondition failure
    pub fn require_library_name(&self) -> Result<&str, Error> {
        self.library_name
            .as_deref()
            .ok_or(Error::MissingLibraryName)
    }

    /// Header file name the generated sources include for the constants
    pub fn defs_include_name(&self, library_name: &str) -> String {
        match &self.defs_include {
            Some(name) => name.clone(),
            None => format!("{}_gate_defs.h", library_name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = GeneratorConfig::new()
            .with_library_name("bagl")
            .with_ledger_path("/tmp/calls.ledger")
            .with_hardened(true);
        assert_eq!(config.require_library_name().unwrap(), "bagl");
        assert!(config.hardened);
        assert_eq!(config.defs_include_name("bagl"), "bagl_gate_defs.h");
    }

    #[test]
    fn test_missing_library_name_is_fatal() {
        let config = GeneratorConfig::new();
        assert!(matches!(
            config.require_library_name(),
            Err(Error::MissingLibraryName)
        ));
    }

    #[test]
    fn test_defs_include_override() {
        let config = GeneratorConfig::new().with_defs_include("defs.h");
        assert_eq!(config.defs_include_name("bagl"), "defs.h");
    }
}
