//! Generator error types.

use std::fmt;

/// Error type for a generation run.
///
/// Every variant is fatal: a run either completes and writes all of its
/// outputs, or it aborts before writing anything. There is no partial
/// success and no recovery path, because a half-written identifier table
/// or a stub/dispatcher pair that disagree on layout is worse than no
/// output at all.
#[derive(Debug)]
pub enum Error {
    /// Malformed input from a declaration source (manifest or front end)
    Declaration(String),
    /// A persisted ledger entry that cannot be parsed
    LedgerCorrupt { line_no: usize, line: String },
    /// No library name was provided for constant naming and frame tagging
    MissingLibraryName,
    /// A parameter length expression the canonicalizer cannot render
    UnsupportedExpression(String),
    /// File I/O failure while reading inputs or writing outputs
    Io(std::io::Error),
    /// A formatting error while emitting artifact text
    Format(fmt::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Declaration(s) => write!(f, "{}", s),
            Error::LedgerCorrupt { line_no, line } => {
                write!(f, "corrupt ledger entry at line {}: '{}'", line_no, line)
            }
            Error::MissingLibraryName => {
                write!(f, "no library name given (use --libname or a [library] table)")
            }
            Error::UnsupportedExpression(s) => {
                write!(f, "unsupported length expression: {}", s)
            }
            Error::Io(e) => write!(f, "{}", e),
            Error::Format(e) => write!(f, "artifact emission error: {}", e),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<fmt::Error> for Error {
    fn from(e: fmt::Error) -> Self {
        Error::Format(e)
    }
}
