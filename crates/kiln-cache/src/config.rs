//! Store configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for a filesystem-backed blob store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory holding the blobs.
    #[serde(default = "default_root_dir")]
    pub root_dir: PathBuf,
    /// Create `root_dir` on open if it does not exist.
    #[serde(default = "default_create_dirs")]
    pub create_dirs: bool,
    /// Chunk size used when streaming blobs.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

fn default_root_dir() -> PathBuf {
    directories::ProjectDirs::from("build", "kiln", "kiln")
        .map(|dirs| dirs.cache_dir().join("blobs"))
        .unwrap_or_else(|| PathBuf::from(".kiln-cache"))
}

fn default_create_dirs() -> bool {
    true
}

fn default_chunk_size() -> usize {
    64 * 1024
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root_dir: default_root_dir(),
            create_dirs: default_create_dirs(),
            chunk_size: default_chunk_size(),
        }
    }
}

impl StoreConfig {
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            ..Default::default()
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }
}
