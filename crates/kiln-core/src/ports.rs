//! Port traits (hexagonal architecture).
//!
//! These traits define the interfaces between the materialization and
//! resolution layers and the collaborators they sit on.

use crate::asset::AssetDescriptor;
use crate::ast::Ast;
use crate::content::{ByteStream, ContentView};
use crate::keys::CacheKey;
use crate::resolve::ResolveResult;
use crate::source_map::SourceMap;
use crate::Result;
use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Content-addressed blob store.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Fetch a whole blob. Fails with `BlobNotFound` when absent.
    async fn get_blob(&self, key: &CacheKey) -> Result<Bytes>;

    /// Open a blob as a chunked stream without buffering it.
    async fn get_stream(&self, key: &CacheKey) -> Result<ByteStream>;

    /// Store a blob under `key`, replacing any previous one.
    async fn set_blob(&self, key: &CacheKey, blob: Bytes) -> Result<()>;

    /// Check if a key exists.
    async fn has_blob(&self, key: &CacheKey) -> Result<bool>;
}

/// Output of regenerating an asset from its parse tree.
#[derive(Debug)]
pub struct Generated {
    pub content: ContentView,
    pub map: Option<SourceMap>,
}

/// The compiler stage that turns parse trees back into code.
#[async_trait]
pub trait Compiler: Send + Sync {
    /// Regenerate content and, where supported, a source map.
    async fn generate_from_ast(&self, asset: &AssetDescriptor, ast: &Ast) -> Result<Generated>;
}

/// Options for a config lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigOptions {
    /// Read only this top-level key of the found file.
    pub package_key: Option<String>,
    /// Parse the file; when false the raw text is returned as a string value.
    #[serde(default = "default_parse")]
    pub parse: bool,
}

fn default_parse() -> bool {
    true
}

impl Default for ConfigOptions {
    fn default() -> Self {
        Self {
            package_key: None,
            parse: default_parse(),
        }
    }
}

/// A config file found by a lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigResult {
    pub config: serde_json::Value,
    /// Files that were read to produce `config`.
    pub files: Vec<PathBuf>,
}

/// Searches for config files starting at an asset's location.
#[async_trait]
pub trait ConfigResolver: Send + Sync {
    async fn get_config(
        &self,
        search_from: &Path,
        filenames: &[PathBuf],
        options: &ConfigOptions,
    ) -> Result<Option<ConfigResult>>;
}

/// Resolves a specifier against the filesystem and package metadata.
#[async_trait]
pub trait PathResolver: Send + Sync {
    async fn resolve(&self, specifier: &str, from: &Path) -> Result<ResolveResult>;
}
