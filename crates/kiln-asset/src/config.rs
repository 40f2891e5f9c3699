//! Filesystem config lookup.

use async_trait::async_trait;
use kiln_core::ports::{ConfigOptions, ConfigResolver, ConfigResult};
use kiln_core::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::trace;

/// Walks from the asset's directory towards `root`, returning the first
/// candidate file found. `.json` files must parse; other files are parsed
/// when they hold JSON and returned as a string value otherwise.
#[derive(Debug, Clone)]
pub struct FsConfigResolver {
    root: PathBuf,
}

impl FsConfigResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    async fn read_config(&self, path: &Path, options: &ConfigOptions) -> Result<serde_json::Value> {
        let source = tokio::fs::read_to_string(path).await?;
        if !options.parse {
            return Ok(serde_json::Value::String(source));
        }

        let strict = path.extension().is_some_and(|ext| ext == "json");
        let value: serde_json::Value = match serde_json::from_str(&source) {
            Ok(value) => value,
            Err(e) if strict => {
                return Err(Error::Config(format!("Failed to parse {}: {}", path.display(), e)));
            }
            Err(_) => return Ok(serde_json::Value::String(source)),
        };
        Ok(match &options.package_key {
            Some(key) => value.get(key).cloned().unwrap_or(serde_json::Value::Null),
            None => value,
        })
    }
}

#[async_trait]
impl ConfigResolver for FsConfigResolver {
    async fn get_config(
        &self,
        search_from: &Path,
        filenames: &[PathBuf],
        options: &ConfigOptions,
    ) -> Result<Option<ConfigResult>> {
        let start = search_from.parent().unwrap_or(search_from);
        for dir in start.ancestors() {
            for name in filenames {
                let candidate = dir.join(name);
                if tokio::fs::try_exists(&candidate).await? {
                    trace!(path = %candidate.display(), "Found config file");
                    let config = self.read_config(&candidate, options).await?;
                    if options.package_key.is_some() && config.is_null() {
                        continue;
                    }
                    return Ok(Some(ConfigResult {
                        config,
                        files: vec![candidate],
                    }));
                }
            }
            if dir == self.root {
                break;
            }
        }
        Ok(None)
    }
}
