//! CLI configuration management.

use kiln_cache::StoreConfig;
use kiln_trace::TracingConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// CLI configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CliConfig {
    /// Blob store directory.
    pub cache_dir: Option<PathBuf>,
    /// Root for resolution and config lookup.
    pub project_root: Option<PathBuf>,
    #[serde(default)]
    pub tracing: TracingConfig,
}

impl CliConfig {
    /// Load configuration from file.
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let path = Self::config_path()?;
        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            Ok(serde_yaml::from_str(&content)?)
        } else {
            Ok(Self::default())
        }
    }

    /// Get the configuration file path.
    pub fn config_path() -> Result<PathBuf, Box<dyn std::error::Error>> {
        let dirs = directories::ProjectDirs::from("build", "kiln", "kiln")
            .ok_or("Could not determine config directory")?;
        Ok(dirs.config_dir().join("config.yaml"))
    }

    /// Apply command-line overrides.
    pub fn merge_flags(
        mut self,
        cache_dir: Option<PathBuf>,
        project_root: Option<PathBuf>,
        json_logs: bool,
    ) -> Self {
        if cache_dir.is_some() {
            self.cache_dir = cache_dir;
        }
        if project_root.is_some() {
            self.project_root = project_root;
        }
        if json_logs {
            self.tracing = self.tracing.json();
        }
        self
    }

    pub fn store_config(&self) -> StoreConfig {
        match &self.cache_dir {
            Some(dir) => StoreConfig::new(dir),
            None => StoreConfig::default(),
        }
    }

    pub fn project_root(&self) -> std::io::Result<PathBuf> {
        match &self.project_root {
            Some(root) => Ok(root.clone()),
            None => std::env::current_dir(),
        }
    }
}
