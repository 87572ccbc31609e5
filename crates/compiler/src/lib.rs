//! Gate Compiler Library
//!
//! Compiles annotated function declarations into the three synchronized
//! texts of a secure call boundary between an untrusted library image
//! and its privileged executor: a header of numeric call identifiers,
//! caller-side stubs, and the executor-side dispatcher.
//!
//! The pipeline is a single-pass batch transform:
//!
//! ```text
//! declarations -> canonical prototypes -> identifier allocation -> artifacts
//!                                         (consulting the ledger)
//! ```
//!
//! Identifier stability across independent builds comes from the ledger,
//! a persisted append-only table mapping prototype digests to sequence
//! numbers. See [`alloc`] for the identifier layout and [`codegen`] for
//! the frame protocol the generated code speaks.
//!
//! # Example
//!
//! ```rust,ignore
//! use gatec::{GeneratorConfig, generate_artifacts};
//!
//! let config = GeneratorConfig::new()
//!     .with_library_name("bagl")
//!     .with_hardened(true);
//! let (artifacts, ledger) = generate_artifacts(&declarations, &Ledger::new(), &config)?;
//! ```

pub mod alloc;
pub mod canon;
pub mod codegen;
pub mod config;
pub mod decl;
pub mod error;
pub mod ledger;
pub mod manifest;

pub use alloc::{AllocatedCall, Allocation, CallIds};
pub use codegen::Artifacts;
pub use config::GeneratorConfig;
pub use decl::{Declaration, DeclarationSource, Parameter};
pub use error::Error;
pub use ledger::Ledger;
pub use manifest::DeclarationManifest;

use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Output paths of the three artifacts
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub defs: PathBuf,
    pub stubs: PathBuf,
    pub dispatch: PathBuf,
}

/// Generate the three artifact strings and the updated ledger from an
/// in-memory declaration list. Pure apart from logging: all file I/O
/// stays in [`generate_files`], which keeps this callable from tests
/// against hand-built fixtures.
pub fn generate_artifacts(
    declarations: &[Declaration],
    ledger: &Ledger,
    config: &GeneratorConfig,
) -> Result<(Artifacts, Ledger), Error> {
    let library_name = config.require_library_name()?;
    let allocation = alloc::allocate(declarations, ledger)?;
    let artifacts = codegen::generate(&allocation.calls, library_name, config)?;
    Ok((artifacts, allocation.ledger))
}

/// Run the whole batch transform: load manifests, consult the ledger,
/// emit the three artifacts, and rewrite the ledger if one was given.
///
/// A run either writes everything or, on any error, nothing.
pub fn generate_files(
    manifest_paths: &[PathBuf],
    outputs: &ArtifactPaths,
    config: &GeneratorConfig,
) -> Result<(), Error> {
    let (declarations, manifest_library) = manifest::load_manifests(manifest_paths)?;

    // the CLI flag wins over the manifest's [library] table
    let mut config = config.clone();
    if config.library_name.is_none() {
        config.library_name = manifest_library;
    }
    if config.defs_include.is_none() {
        config.defs_include = outputs
            .defs
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());
    }

    let ledger = match &config.ledger_path {
        Some(path) => Ledger::load(path)?,
        None => Ledger::new(),
    };

    let (artifacts, updated_ledger) = generate_artifacts(&declarations, &ledger, &config)?;

    write_artifact(&outputs.defs, &artifacts.defs, "defs header")?;
    write_artifact(&outputs.stubs, &artifacts.stubs, "caller stubs")?;
    write_artifact(&outputs.dispatch, &artifacts.dispatch, "dispatcher")?;

    if let Some(path) = &config.ledger_path {
        updated_ledger.write(path)?;
        info!(path = %path.display(), entries = updated_ledger.len(), "ledger rewritten");
    }

    Ok(())
}

fn write_artifact(path: &Path, content: &str, what: &str) -> Result<(), Error> {
    fs::write(path, content)?;
    info!(path = %path.display(), "{} written", what);
    Ok(())
}
