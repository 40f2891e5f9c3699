//! Filesystem access for resolution.

use async_trait::async_trait;
use kiln_core::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;
use std::ops::Bound;
use std::path::{Path, PathBuf};

/// The filesystem queries a path resolver needs.
#[async_trait]
pub trait FileSystem: Send + Sync {
    async fn read_to_string(&self, path: &Path) -> Result<String>;

    /// `false` for missing paths and on any error.
    async fn is_file(&self, path: &Path) -> bool;

    /// `false` for missing paths and on any error.
    async fn is_dir(&self, path: &Path) -> bool;
}

/// The host filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

#[async_trait]
impl FileSystem for LocalFs {
    async fn read_to_string(&self, path: &Path) -> Result<String> {
        Ok(tokio::fs::read_to_string(path).await?)
    }

    async fn is_file(&self, path: &Path) -> bool {
        tokio::fs::metadata(path)
            .await
            .is_ok_and(|meta| meta.is_file())
    }

    async fn is_dir(&self, path: &Path) -> bool {
        tokio::fs::metadata(path)
            .await
            .is_ok_and(|meta| meta.is_dir())
    }
}

/// A file tree held in memory. Directories exist implicitly as ancestors of
/// files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryFs {
    files: BTreeMap<PathBuf, String>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        self.insert(path, contents);
        self
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, contents: impl Into<String>) {
        self.files.insert(path.into(), contents.into());
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[async_trait]
impl FileSystem for MemoryFs {
    async fn read_to_string(&self, path: &Path) -> Result<String> {
        self.files.get(path).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("{} not found", path.display())).into()
        })
    }

    async fn is_file(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }

    async fn is_dir(&self, path: &Path) -> bool {
        // Descendants sort directly after their directory.
        self.files
            .range::<Path, _>((Bound::Excluded(path), Bound::Unbounded))
            .next()
            .is_some_and(|(file, _)| file.starts_with(path))
    }
}

/// Filesystem a resolver runs against. The in-memory tree is carried by
/// value when parameters are serialized; the local one is a reference to
/// the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FsHandle {
    #[default]
    Local,
    Memory(MemoryFs),
}

#[async_trait]
impl FileSystem for FsHandle {
    async fn read_to_string(&self, path: &Path) -> Result<String> {
        match self {
            FsHandle::Local => LocalFs.read_to_string(path).await,
            FsHandle::Memory(fs) => fs.read_to_string(path).await,
        }
    }

    async fn is_file(&self, path: &Path) -> bool {
        match self {
            FsHandle::Local => LocalFs.is_file(path).await,
            FsHandle::Memory(fs) => fs.is_file(path).await,
        }
    }

    async fn is_dir(&self, path: &Path) -> bool {
        match self {
            FsHandle::Local => LocalFs.is_dir(path).await,
            FsHandle::Memory(fs) => fs.is_dir(path).await,
        }
    }
}
