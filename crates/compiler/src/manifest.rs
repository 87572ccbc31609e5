//! Declaration manifests
//!
//! The shipped front end for the generator: a TOML file listing the
//! boundary functions of one library. The C parser that extracts the
//! same information from annotated headers lives outside this repository
//! and feeds the identical data model through [`DeclarationSource`].
//!
//! # Example
//!
//! ```toml
//! [library]
//! name = "bagl"
//!
//! [[function]]
//! name = "screen_draw_rect"
//! return = "void"
//! flags = ["permission(screen)"]
//!
//! [[function.param]]
//! type = "unsigned int"
//! name = "color"
//!
//! [[function.param]]
//! type = "unsigned char *"
//! name = "bitmap"
//! length = "bitmap_len"
//! ```

use crate::decl::{Declaration, DeclarationSource, FLAG_BOUNDARY, Parameter};
use crate::error::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// A parameter entry in a manifest
#[derive(Debug, Clone, Deserialize)]
pub struct ManifestParam {
    /// C type descriptor
    #[serde(rename = "type")]
    pub param_type: String,
    pub name: String,
    /// Optional length annotation expression
    pub length: Option<String>,
}

/// A function entry in a manifest
#[derive(Debug, Clone, Deserialize)]
pub struct ManifestFunction {
    pub name: String,
    #[serde(rename = "return", default = "default_return_type")]
    pub return_type: String,
    #[serde(rename = "param", default)]
    pub params: Vec<ManifestParam>,
    /// Extra specifier flags; the boundary marker is implied for every
    /// manifest entry and added if absent
    #[serde(default)]
    pub flags: Vec<String>,
}

fn default_return_type() -> String {
    "void".to_string()
}

/// Optional library metadata
#[derive(Debug, Clone, Deserialize)]
pub struct ManifestLibrary {
    pub name: String,
}

/// Top-level declaration manifest
#[derive(Debug, Clone, Deserialize)]
pub struct DeclarationManifest {
    pub library: Option<ManifestLibrary>,
    #[serde(rename = "function", default)]
    pub functions: Vec<ManifestFunction>,
}

impl DeclarationManifest {
    /// Parse a manifest from TOML content and validate it.
    pub fn parse(content: &str) -> Result<Self, Error> {
        let manifest: Self = toml::from_str(content)
            .map_err(|e| Error::Declaration(format!("failed to parse manifest: {}", e)))?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Read and parse a manifest file.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Declaration(format!("failed to read manifest '{}': {}", path.display(), e))
        })?;
        Self::parse(&content)
    }

    /// Validate names before they reach generated C: every function name
    /// lands verbatim in macro names and source text, so anything outside
    /// the identifier alphabet would let a manifest inject code.
    fn validate(&self) -> Result<(), Error> {
        if let Some(library) = &self.library {
            validate_identifier("library name", &library.name)?;
        }

        if self.functions.is_empty() {
            return Err(Error::Declaration(
                "manifest declares no functions".to_string(),
            ));
        }

        for (func_idx, func) in self.functions.iter().enumerate() {
            if func.name.trim().is_empty() {
                return Err(Error::Declaration(format!(
                    "function {} has an empty name",
                    func_idx + 1
                )));
            }
            validate_identifier("function name", &func.name)?;

            if func.return_type.trim().is_empty() {
                return Err(Error::Declaration(format!(
                    "function '{}' has an empty return type",
                    func.name
                )));
            }

            for (param_idx, param) in func.params.iter().enumerate() {
                if param.name.trim().is_empty() {
                    return Err(Error::Declaration(format!(
                        "parameter {} of '{}' has an empty name",
                        param_idx + 1,
                        func.name
                    )));
                }
                validate_identifier("parameter name", &param.name)?;
                validate_type_descriptor(&func.name, &param.param_type)?;
            }
            validate_type_descriptor(&func.name, &func.return_type)?;
        }
        Ok(())
    }

    /// Library name declared by the manifest, if any
    pub fn library_name(&self) -> Option<&str> {
        self.library.as_ref().map(|l| l.name.as_str())
    }
}

impl DeclarationSource for DeclarationManifest {
    fn declarations(&self) -> Result<Vec<Declaration>, Error> {
        let mut declarations = Vec::with_capacity(self.functions.len());
        for func in &self.functions {
            let mut flags = func.flags.clone();
            if !flags.iter().any(|f| f == FLAG_BOUNDARY) {
                flags.push(FLAG_BOUNDARY.to_string());
            }
            declarations.push(Declaration {
                name: func.name.clone(),
                return_type: func.return_type.clone(),
                parameters: func
                    .params
                    .iter()
                    .map(|p| Parameter {
                        type_name: p.param_type.clone(),
                        name: p.name.clone(),
                        length: p.length.clone(),
                    })
                    .collect(),
                flags,
            });
        }
        Ok(declarations)
    }
}

fn validate_identifier(what: &str, name: &str) -> Result<(), Error> {
    let mut chars = name.chars();
    let leading_ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if !leading_ok || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(Error::Declaration(format!(
            "invalid {} '{}': only identifier characters are allowed",
            what, name
        )));
    }
    Ok(())
}

fn validate_type_descriptor(func: &str, descriptor: &str) -> Result<(), Error> {
    for c in descriptor.chars() {
        if !c.is_ascii_alphanumeric() && !" _*[]".contains(c) {
            return Err(Error::Declaration(format!(
                "function '{}' has invalid character '{}' in type '{}'",
                func, c, descriptor
            )));
        }
    }
    Ok(())
}

/// Load several manifests in order, concatenating their declarations.
///
/// Returns the declarations plus the first library name any manifest
/// carried, for use as the default when the CLI gave none.
pub fn load_manifests(paths: &[impl AsRef<Path>]) -> Result<(Vec<Declaration>, Option<String>), Error> {
    let mut declarations = Vec::new();
    let mut library_name = None;
    for path in paths {
        let manifest = DeclarationManifest::load(path.as_ref())?;
        if library_name.is_none() {
            library_name = manifest.library_name().map(str::to_string);
        }
        declarations.extend(manifest.declarations()?);
    }
    Ok((declarations, library_name))
}
