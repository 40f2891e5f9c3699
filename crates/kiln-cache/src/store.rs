//! Cache store implementations.

use crate::config::StoreConfig;
use crate::keys::blob_file_name;
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use dashmap::DashMap;
use futures::stream;
use kiln_core::content::ByteStream;
use kiln_core::ports::CacheStore;
use kiln_core::{CacheKey, Error, Result};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::AsyncReadExt;
use tracing::{debug, trace};

/// In-memory store for tests and short-lived builds.
#[derive(Debug, Default)]
pub struct MemoryStore {
    blobs: DashMap<CacheKey, Bytes>,
    chunk_size: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve streams in chunks of `chunk_size` bytes instead of one chunk.
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            blobs: DashMap::new(),
            chunk_size: Some(chunk_size.max(1)),
        }
    }

    pub fn insert(&self, key: impl Into<CacheKey>, blob: impl Into<Bytes>) {
        self.blobs.insert(key.into(), blob.into());
    }

    pub fn remove(&self, key: &CacheKey) -> Option<Bytes> {
        self.blobs.remove(key).map(|(_, blob)| blob)
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    fn lookup(&self, key: &CacheKey) -> Result<Bytes> {
        self.blobs
            .get(key)
            .map(|blob| blob.value().clone())
            .ok_or_else(|| Error::BlobNotFound(key.to_string()))
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get_blob(&self, key: &CacheKey) -> Result<Bytes> {
        self.lookup(key)
    }

    async fn get_stream(&self, key: &CacheKey) -> Result<ByteStream> {
        let blob = self.lookup(key)?;
        let chunk_size = self.chunk_size.unwrap_or(blob.len().max(1));
        let chunks: Vec<Result<Bytes>> = (0..blob.len())
            .step_by(chunk_size)
            .map(|start| Ok(blob.slice(start..(start + chunk_size).min(blob.len()))))
            .collect();
        Ok(Box::pin(stream::iter(chunks)))
    }

    async fn set_blob(&self, key: &CacheKey, blob: Bytes) -> Result<()> {
        self.blobs.insert(key.clone(), blob);
        Ok(())
    }

    async fn has_blob(&self, key: &CacheKey) -> Result<bool> {
        Ok(self.blobs.contains_key(key))
    }
}

/// Filesystem-based store. Blobs live under `root_dir` as one file per key.
#[derive(Debug)]
pub struct FilesystemStore {
    root_dir: PathBuf,
    chunk_size: usize,
    tmp_counter: AtomicU64,
}

impl FilesystemStore {
    /// Open a store, creating its directory if configured to.
    pub async fn open(config: &StoreConfig) -> Result<Self> {
        if config.create_dirs {
            tokio::fs::create_dir_all(&config.root_dir).await.map_err(|e| {
                Error::Store(format!(
                    "Failed to create cache dir {}: {}",
                    config.root_dir.display(),
                    e
                ))
            })?;
        } else if !tokio::fs::try_exists(&config.root_dir).await? {
            return Err(Error::Config(format!(
                "Cache dir {} does not exist",
                config.root_dir.display()
            )));
        }

        debug!(root = %config.root_dir.display(), "Opened filesystem blob store");
        Ok(Self {
            root_dir: config.root_dir.clone(),
            chunk_size: config.chunk_size.max(1),
            tmp_counter: AtomicU64::new(0),
        })
    }

    pub fn root_dir(&self) -> &std::path::Path {
        &self.root_dir
    }

    fn blob_path(&self, key: &CacheKey) -> PathBuf {
        self.root_dir.join(blob_file_name(key))
    }

    fn not_found_or(key: &CacheKey, err: std::io::Error) -> Error {
        if err.kind() == std::io::ErrorKind::NotFound {
            Error::BlobNotFound(key.to_string())
        } else {
            Error::from(err)
        }
    }
}

#[async_trait]
impl CacheStore for FilesystemStore {
    async fn get_blob(&self, key: &CacheKey) -> Result<Bytes> {
        let path = self.blob_path(key);
        trace!(key = %key, path = %path.display(), "Reading blob");
        let blob = tokio::fs::read(&path)
            .await
            .map_err(|e| Self::not_found_or(key, e))?;
        Ok(Bytes::from(blob))
    }

    async fn get_stream(&self, key: &CacheKey) -> Result<ByteStream> {
        let path = self.blob_path(key);
        let file = tokio::fs::File::open(&path)
            .await
            .map_err(|e| Self::not_found_or(key, e))?;
        let chunk_size = self.chunk_size;

        let chunks = stream::unfold(Some(file), move |file| async move {
            let mut file = file?;
            let mut buf = BytesMut::with_capacity(chunk_size);
            match file.read_buf(&mut buf).await {
                Ok(0) => None,
                Ok(_) => Some((Ok(buf.freeze()), Some(file))),
                Err(e) => Some((Err(Error::from(e)), None)),
            }
        });
        Ok(Box::pin(chunks))
    }

    async fn set_blob(&self, key: &CacheKey, blob: Bytes) -> Result<()> {
        let path = self.blob_path(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Readers never observe a partial blob.
        let tmp = path.with_extension(format!(
            "tmp.{}.{}",
            std::process::id(),
            self.tmp_counter.fetch_add(1, Ordering::Relaxed)
        ));
        tokio::fs::write(&tmp, &blob).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(Error::from(e));
        }

        debug!(key = %key, size_bytes = blob.len(), "Stored blob");
        Ok(())
    }

    async fn has_blob(&self, key: &CacheKey) -> Result<bool> {
        Ok(tokio::fs::try_exists(self.blob_path(key)).await?)
    }
}
