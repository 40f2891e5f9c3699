//! Package metadata (`package.json`).

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// The fields of a `package.json` this layer reads. Everything else is kept
/// in `extra` untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackageJson {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub engines: BTreeMap<String, String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl PackageJson {
    pub fn parse(path: &Path, source: &str) -> Result<Self> {
        serde_json::from_str(source).map_err(|e| Error::InvalidPackage {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    pub fn from_value(path: &Path, value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| Error::InvalidPackage {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Entry point for a bare import of the package: `module`, then `main`.
    pub fn entry(&self) -> Option<&str> {
        self.module.as_deref().or(self.main.as_deref())
    }
}
