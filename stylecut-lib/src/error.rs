//! Error and warning types shared by every stylecut component.
//!
//! Fatal problems (missing inputs, unreadable files, broken config) are
//! [`Error`]s. Everything the parsers can recover from is a
//! [`ParseWarning`] carried alongside the result instead.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Fatal errors surfaced to the caller.
#[derive(Debug, Error)]
pub enum Error {
    #[error("input file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to serialize manifest: {0}")]
    Manifest(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// What kind of input the parser had to skip or guess about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WarningKind {
    /// Text that matched no recognised CSS construct.
    UnparsedCss,
    /// `{` and `}` counts differ.
    UnbalancedBraces,
    /// The HTML tokenizer or tree builder reported a recoverable error.
    MalformedHtml,
    /// The strict parser backend rejected the stylesheet.
    BackendFallback,
}

/// A recoverable problem found while reading input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseWarning {
    pub kind: WarningKind,
    pub message: String,
}

impl ParseWarning {
    pub fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        ParseWarning {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

/// Pre-flight check used by every file-based entry point.
pub(crate) fn ensure_exists(path: &std::path::Path) -> Result<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(Error::InputNotFound(path.to_path_buf()))
    }
}

/// Read a whole file, mapping failures to [`Error::Io`].
pub(crate) fn read_input(path: &std::path::Path) -> Result<String> {
    ensure_exists(path)?;
    std::fs::read_to_string(path).map_err(|e| Error::io(path, e))
}
