//! Serialized parse trees.

use crate::{Error, Result};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// A parse tree as stored in the cache.
///
/// The tree itself is owned by the compiler that produced it; this layer
/// only needs to move it between the store and the compiler intact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ast {
    /// Grammar the tree belongs to, e.g. `"js"` or `"css"`.
    pub kind: String,
    /// Version of the producing compiler's tree format.
    pub version: String,
    pub program: serde_json::Value,
}

impl Ast {
    pub fn new(kind: impl Into<String>, version: impl Into<String>, program: serde_json::Value) -> Self {
        Self {
            kind: kind.into(),
            version: version.into(),
            program,
        }
    }

    /// Deserialize a tree blob fetched under `key`.
    pub fn from_blob(key: &str, blob: &[u8]) -> Result<Self> {
        serde_json::from_slice(blob).map_err(|e| Error::CorruptAst {
            key: key.to_string(),
            reason: e.to_string(),
        })
    }

    pub fn to_blob(&self) -> Result<Bytes> {
        Ok(Bytes::from(serde_json::to_vec(self)?))
    }
}
