//! Declaration data model
//!
//! The structured form of one annotated function declaration, as handed
//! over by a declaration source (the TOML manifest loader here, a C front
//! end elsewhere). Declarations are immutable once produced: the pipeline
//! consumes them in a single pass and never writes them back.

use crate::error::Error;

/// Specifier flag marking a declaration as a call boundary function.
pub const FLAG_BOUNDARY: &str = "boundary";

/// Specifier flag for calls that do not return into the dispatcher.
///
/// The executor hands control back to the caller image directly, so the
/// response identifier must be stored before the call rather than after.
pub const FLAG_TASK_SWITCH: &str = "task_switch";

/// One parameter of a declaration: a type descriptor, a name, and an
/// optional length annotation expression carried over from the source.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub type_name: String,
    pub name: String,
    /// Length annotation expression, e.g. `buffer_len` or `len * 2`.
    /// Validated during allocation; not rendered into the artifacts.
    pub length: Option<String>,
}

/// One annotated function declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub name: String,
    /// Return type descriptor, possibly `void`
    pub return_type: String,
    /// Ordered parameter list; empty means `void`
    pub parameters: Vec<Parameter>,
    /// Specifier flags: the boundary marker, the task-level tag, and
    /// `permission(NAME)` / `export(NAME)` tags. Unknown flags are kept
    /// but ignored.
    pub flags: Vec<String>,
}

impl Declaration {
    pub fn new(name: impl Into<String>, return_type: impl Into<String>) -> Self {
        Declaration {
            name: name.into(),
            return_type: return_type.into(),
            parameters: Vec::new(),
            flags: vec![FLAG_BOUNDARY.to_string()],
        }
    }

    /// Append a parameter (builder pattern, used heavily by tests)
    pub fn with_parameter(mut self, type_name: impl Into<String>, name: impl Into<String>) -> Self {
        self.parameters.push(Parameter {
            type_name: type_name.into(),
            name: name.into(),
            length: None,
        });
        self
    }

    /// Append a flag (builder pattern)
    pub fn with_flag(mut self, flag: impl Into<String>) -> Self {
        self.flags.push(flag.into());
        self
    }

    /// Whether this declaration participates in the call boundary
    pub fn is_boundary(&self) -> bool {
        self.flags.iter().any(|f| f == FLAG_BOUNDARY)
    }

    /// Whether this call returns to the caller image without passing back
    /// through the dispatcher
    pub fn is_task_switch(&self) -> bool {
        self.flags.iter().any(|f| f == FLAG_TASK_SWITCH)
    }

    /// Names carried by `permission(NAME)` flags
    pub fn permissions(&self) -> Vec<&str> {
        tag_values(&self.flags, "permission")
    }

    /// Names carried by `export(NAME)` flags
    pub fn exports(&self) -> Vec<&str> {
        tag_values(&self.flags, "export")
    }
}

/// Extract the NAME parts of `tag(NAME)`-shaped flags
fn tag_values<'a>(flags: &'a [String], tag: &str) -> Vec<&'a str> {
    flags
        .iter()
        .filter_map(|f| {
            f.strip_prefix(tag)
                .and_then(|rest| rest.strip_prefix('('))
                .and_then(|rest| rest.strip_suffix(')'))
        })
        .collect()
}

/// A producer of ordered declarations.
///
/// The compiler core never parses C. Front ends implement this trait and
/// hand over the structured list; tests hand-build fixtures. Order is
/// significant: during deduplication the first occurrence of a name wins.
pub trait DeclarationSource {
    fn declarations(&self) -> Result<Vec<Declaration>, Error>;
}
