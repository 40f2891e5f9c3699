//! Error types for kiln.

use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Errors produced by materialization, cache stores, and resolution.
///
/// The type is `Clone` so that the outcome of one in-flight computation can
/// be delivered to every caller that joined it.
#[derive(Debug, Clone, Error)]
pub enum Error {
    // Materialization errors
    #[error("Asset has no content: {0}")]
    MissingContent(String),

    #[error("Asset does not have an AST: {0}")]
    NoAst(String),

    #[error("Corrupt AST for key {key}: {reason}")]
    CorruptAst { key: String, reason: String },

    #[error("Asset {asset} is marked as having a {slot} but carries no {slot} key")]
    MissingKey { asset: String, slot: &'static str },

    #[error("Code generation failed: {0}")]
    Generation(String),

    #[error("Content of asset {0} is not valid UTF-8")]
    InvalidUtf8(String),

    #[error("Invalid source map: {0}")]
    InvalidSourceMap(String),

    // Cache store errors
    #[error("Blob not found: {0}")]
    BlobNotFound(String),

    #[error("Cache store error: {0}")]
    Store(String),

    // Resolution errors
    #[error("Cannot find module '{specifier}' from '{}'", from.display())]
    ModuleNotFound { specifier: String, from: PathBuf },

    #[error("Cannot require '{0}' in this runtime")]
    UnsupportedRuntimeRequire(String),

    #[error("Invalid package.json at {}: {reason}", path.display())]
    InvalidPackage { path: PathBuf, reason: String },

    // Infrastructure errors
    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(Arc<std::io::Error>),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether this error reports an absent blob or file.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::BlobNotFound(_) => true,
            Error::Io(err) => err.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(Arc::new(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
