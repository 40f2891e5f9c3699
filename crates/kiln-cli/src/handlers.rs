//! Command handlers.

use crate::compiler::NoCompiler;
use crate::config::CliConfig;
use bytes::Bytes;
use console::style;
use futures::StreamExt;
use kiln_asset::{AssetContext, CommittedAsset, FsConfigResolver};
use kiln_cache::FilesystemStore;
use kiln_core::ports::CacheStore;
use kiln_core::{AssetDescriptor, ByteStream, CacheKey};
use kiln_resolver::{FsHandle, ResolutionCache, ResolverParams, builtins};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing::debug;

type HandlerResult = Result<(), Box<dyn std::error::Error>>;

async fn open_store(config: &CliConfig) -> kiln_core::Result<Arc<FilesystemStore>> {
    let store_config = config.store_config();
    debug!(root = %store_config.root_dir.display(), "Opening blob store");
    Ok(Arc::new(FilesystemStore::open(&store_config).await?))
}

async fn asset_context(config: &CliConfig) -> Result<AssetContext, Box<dyn std::error::Error>> {
    let store = open_store(config).await?;
    let root = config.project_root()?;
    Ok(AssetContext::new(
        store,
        Arc::new(NoCompiler),
        Arc::new(FsConfigResolver::new(root)),
    ))
}

async fn write_stream(mut stream: ByteStream) -> HandlerResult {
    let mut stdout = tokio::io::stdout();
    while let Some(chunk) = stream.next().await {
        stdout.write_all(&chunk?).await?;
    }
    stdout.flush().await?;
    Ok(())
}

/// Store a file under its content hash.
pub async fn blob_put(config: &CliConfig, file: &Path) -> HandlerResult {
    let contents = tokio::fs::read(file).await?;
    let key = CacheKey::for_content(&contents);
    let store = open_store(config).await?;

    if store.has_blob(&key).await? {
        eprintln!("{} {} already stored", style("i").blue(), file.display());
    } else {
        let size = contents.len();
        store.set_blob(&key, Bytes::from(contents)).await?;
        eprintln!(
            "{} Stored {} ({} bytes)",
            style("✓").green(),
            file.display(),
            size
        );
    }
    println!("{}", key);
    Ok(())
}

/// Stream a blob to stdout.
pub async fn blob_get(config: &CliConfig, key: &str) -> HandlerResult {
    let store = open_store(config).await?;
    let stream = store.get_stream(&CacheKey::new(key)).await?;
    write_stream(stream).await
}

/// Stream an asset's content to stdout.
pub async fn code(
    config: &CliConfig,
    content_key: Option<String>,
    ast_key: Option<String>,
    file_path: Option<PathBuf>,
) -> HandlerResult {
    let file_path = match file_path {
        Some(path) => path,
        None => config.project_root()?,
    };
    let id = content_key
        .clone()
        .or_else(|| ast_key.clone())
        .unwrap_or_else(|| "cli".to_string());

    let mut builder = AssetDescriptor::builder(id, file_path);
    if let Some(key) = content_key {
        builder = builder.content_key(key);
    }
    if let Some(key) = ast_key {
        builder = builder.ast_key(key);
    }

    let asset = CommittedAsset::new(builder.build(), asset_context(config).await?);
    write_stream(asset.get_stream()).await
}

/// Print an asset's decoded source map.
pub async fn map(config: &CliConfig, map_key: String, ast_key: Option<String>) -> HandlerResult {
    let mut builder = AssetDescriptor::builder(map_key.clone(), config.project_root()?).map_key(map_key);
    if let Some(key) = ast_key {
        builder = builder.ast_key(key);
    }

    let asset = CommittedAsset::new(builder.build(), asset_context(config).await?);
    match asset.get_map().await? {
        Some(map) => println!("{}", serde_json::to_string_pretty(&*map)?),
        None => println!("null"),
    }
    Ok(())
}

/// Resolve a specifier and print the result with its invalidations.
pub async fn resolve(config: &CliConfig, specifier: &str, from: &Path) -> HandlerResult {
    let from = if from.is_absolute() {
        from.to_path_buf()
    } else {
        std::env::current_dir()?.join(from)
    };
    let cache = ResolutionCache::new(ResolverParams::new(FsHandle::Local, config.project_root()?));

    let result = cache.resolve(specifier, &from, None).await?;
    println!("{}", serde_json::to_string_pretty(&*result)?);
    Ok(())
}

/// List built-in plugins.
pub fn list_builtins() -> HandlerResult {
    for module in builtins::all() {
        println!("{:<42} {}", style(module.name).bold(), style(module.kind.as_str()).dim());
    }
    Ok(())
}

/// Show configuration.
pub fn show_config(config: &CliConfig) -> HandlerResult {
    println!("Current configuration:");
    println!("  cache_dir: {}", config.store_config().root_dir.display());
    println!("  project_root: {}", config.project_root()?.display());
    println!("  log_filter: {}", config.tracing.filter);
    println!("  log_format: {:?}", config.tracing.format);

    if let Ok(path) = CliConfig::config_path() {
        println!("\nConfig file: {}", path.display());
    }
    Ok(())
}
