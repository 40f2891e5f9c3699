//! Test doubles for materializer tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;
use kiln_asset::{AssetContext, CommittedAsset};
use kiln_cache::MemoryStore;
use kiln_core::content::ByteStream;
use kiln_core::ports::{
    CacheStore, Compiler, ConfigOptions, ConfigResolver, ConfigResult, Generated,
};
use kiln_core::{AssetDescriptor, Ast, CacheKey, ContentView, Error, Result, SourceMap};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Memory store that counts accesses and can inject failures.
pub struct CountingStore {
    inner: MemoryStore,
    pub blob_reads: AtomicUsize,
    pub stream_opens: AtomicUsize,
    failures: Mutex<HashMap<CacheKey, Error>>,
}

impl CountingStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryStore::with_chunk_size(4),
            blob_reads: AtomicUsize::new(0),
            stream_opens: AtomicUsize::new(0),
            failures: Mutex::new(HashMap::new()),
        }
    }

    pub fn seed(&self, key: &str, blob: impl Into<Bytes>) {
        self.inner.insert(key, blob);
    }

    /// Fail the next read of `key` with `err`.
    pub fn fail_next(&self, key: &str, err: Error) {
        self.failures.lock().unwrap().insert(CacheKey::new(key), err);
    }

    pub fn blob_reads(&self) -> usize {
        self.blob_reads.load(Ordering::SeqCst)
    }

    pub fn stream_opens(&self) -> usize {
        self.stream_opens.load(Ordering::SeqCst)
    }

    fn injected(&self, key: &CacheKey) -> Option<Error> {
        self.failures.lock().unwrap().remove(key)
    }
}

#[async_trait]
impl CacheStore for CountingStore {
    async fn get_blob(&self, key: &CacheKey) -> Result<Bytes> {
        self.blob_reads.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        if let Some(err) = self.injected(key) {
            return Err(err);
        }
        self.inner.get_blob(key).await
    }

    async fn get_stream(&self, key: &CacheKey) -> Result<ByteStream> {
        self.stream_opens.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        if let Some(err) = self.injected(key) {
            return Err(err);
        }
        self.inner.get_stream(key).await
    }

    async fn set_blob(&self, key: &CacheKey, blob: Bytes) -> Result<()> {
        self.inner.set_blob(key, blob).await
    }

    async fn has_blob(&self, key: &CacheKey) -> Result<bool> {
        self.inner.has_blob(key).await
    }
}

/// What the fake compiler hands back as content.
#[derive(Clone)]
pub enum FakeOutput {
    Bytes(&'static str),
    Chunks(Vec<&'static str>),
}

/// Compiler that counts regenerations.
pub struct FakeCompiler {
    output: FakeOutput,
    map: Option<SourceMap>,
    pub calls: AtomicUsize,
    pub seen_kinds: Mutex<Vec<String>>,
}

impl FakeCompiler {
    pub fn new(output: FakeOutput) -> Self {
        Self {
            output,
            map: None,
            calls: AtomicUsize::new(0),
            seen_kinds: Mutex::new(Vec::new()),
        }
    }

    pub fn with_map(mut self, map: SourceMap) -> Self {
        self.map = Some(map);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Compiler for FakeCompiler {
    async fn generate_from_ast(&self, _asset: &AssetDescriptor, ast: &Ast) -> Result<Generated> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen_kinds.lock().unwrap().push(ast.kind.clone());
        tokio::task::yield_now().await;

        let content = match &self.output {
            FakeOutput::Bytes(text) => ContentView::from(*text),
            FakeOutput::Chunks(parts) => {
                let items: Vec<Result<Bytes>> = parts
                    .iter()
                    .map(|p| Ok(Bytes::from_static(p.as_bytes())))
                    .collect();
                ContentView::Stream(Box::pin(stream::iter(items)))
            }
        };
        Ok(Generated {
            content,
            map: self.map.clone(),
        })
    }
}

/// Config lookup serving fixed results by file name.
#[derive(Default)]
pub struct StaticConfig {
    files: HashMap<PathBuf, serde_json::Value>,
    pub lookups: AtomicUsize,
}

impl StaticConfig {
    pub fn with(mut self, name: &str, value: serde_json::Value) -> Self {
        self.files.insert(PathBuf::from(name), value);
        self
    }
}

#[async_trait]
impl ConfigResolver for StaticConfig {
    async fn get_config(
        &self,
        search_from: &Path,
        filenames: &[PathBuf],
        _options: &ConfigOptions,
    ) -> Result<Option<ConfigResult>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let dir = search_from.parent().unwrap_or(search_from);
        Ok(filenames.iter().find_map(|name| {
            self.files.get(name).map(|config| ConfigResult {
                config: config.clone(),
                files: vec![dir.join(name)],
            })
        }))
    }
}

pub struct Harness {
    pub store: Arc<CountingStore>,
    pub compiler: Arc<FakeCompiler>,
    pub config: Arc<StaticConfig>,
}

impl Harness {
    pub fn new(compiler: FakeCompiler) -> Self {
        Self {
            store: Arc::new(CountingStore::new()),
            compiler: Arc::new(compiler),
            config: Arc::new(StaticConfig::default()),
        }
    }

    pub fn with_config(mut self, config: StaticConfig) -> Self {
        self.config = Arc::new(config);
        self
    }

    pub fn asset(&self, value: AssetDescriptor) -> CommittedAsset {
        let ctx = AssetContext::new(self.store.clone(), self.compiler.clone(), self.config.clone());
        CommittedAsset::new(value, ctx)
    }

    pub fn seed_ast(&self, key: &str) {
        let ast = Ast::new("js", "1.0.0", serde_json::json!({"type": "Program", "body": []}));
        self.store.seed(key, ast.to_blob().unwrap());
    }
}

pub fn sample_map() -> SourceMap {
    use kiln_core::{Mapping, OriginalLocation, Position};

    let mut map = SourceMap::new();
    let source = map.add_source("src/index.ts", None);
    map.add_mapping(Mapping {
        generated: Position { line: 1, column: 0 },
        original: Some(OriginalLocation {
            source,
            position: Position { line: 1, column: 0 },
            name: None,
        }),
    });
    map
}
