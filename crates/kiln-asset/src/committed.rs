//! Lazy views over a committed asset.
//!
//! Content, source map (buffer and decoded), and parse tree each live in
//! their own [`Memo`] slot. Regeneration from the parse tree has a slot of
//! its own as well, so the content fallback and the map fallback share one
//! compiler call, and a direct `get_ast` joins the fetch a regeneration
//! started.

use crate::context::AssetContext;
use bytes::Bytes;
use kiln_core::content::{self, ByteStream, ContentView};
use kiln_core::ports::{ConfigOptions, Generated};
use kiln_core::{
    AssetDescriptor, Ast, CacheKey, Dependency, Error, FailurePolicy, IncludedFile, Memo,
    PackageJson, Result, Snapshot, SourceMap,
};
use kiln_trace::{asset_span, store_span};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{Instrument, debug};

/// Materializer for one committed asset. Clones share all memoized state.
#[derive(Clone)]
pub struct CommittedAsset {
    source: Source,
    content: Arc<Memo<Bytes>>,
    map_buffer: Arc<Memo<Option<Bytes>>>,
    map: Arc<Memo<Option<Arc<SourceMap>>>>,
    regen: Regen,
}

/// The descriptor and its collaborators.
#[derive(Clone)]
struct Source {
    value: Arc<AssetDescriptor>,
    ctx: AssetContext,
}

/// The AST slot and the generation slot built on it.
///
/// A computation stored in a slot holds only the slots below it, never its
/// own slot or the asset, so an abandoned computation is freed with the asset.
#[derive(Clone)]
struct Regen {
    source: Source,
    ast: Arc<Memo<Arc<Ast>>>,
    generation: Arc<Memo<Generation>>,
}

/// Memoized compiler output.
#[derive(Clone)]
struct Generation {
    content: GeneratedContent,
    map: Option<Arc<SourceMap>>,
}

#[derive(Clone)]
enum GeneratedContent {
    Bytes(Bytes),
    /// Single-shot: the first taker owns the stream.
    Stream(Arc<Mutex<Option<ByteStream>>>),
}

impl GeneratedContent {
    fn take_stream(cell: &Mutex<Option<ByteStream>>) -> Option<ByteStream> {
        cell.lock().unwrap_or_else(PoisonError::into_inner).take()
    }
}

impl From<Generated> for Generation {
    fn from(generated: Generated) -> Self {
        let content = match generated.content {
            ContentView::Bytes(bytes) => GeneratedContent::Bytes(bytes),
            ContentView::Stream(stream) => GeneratedContent::Stream(Arc::new(Mutex::new(Some(stream)))),
        };
        Self {
            content,
            map: generated.map.map(Arc::new),
        }
    }
}

const GENERATION_ATTEMPTS: usize = 2;

impl CommittedAsset {
    pub fn new(value: AssetDescriptor, ctx: AssetContext) -> Self {
        let source = Source {
            value: Arc::new(value),
            ctx,
        };
        Self {
            content: Arc::new(Memo::new(FailurePolicy::Retry)),
            map_buffer: Arc::new(Memo::new(FailurePolicy::Cache)),
            map: Arc::new(Memo::new(FailurePolicy::Cache)),
            regen: Regen {
                source: source.clone(),
                ast: Arc::new(Memo::new(FailurePolicy::Retry)),
                generation: Arc::new(Memo::new(FailurePolicy::Retry)),
            },
            source,
        }
    }

    pub fn value(&self) -> &AssetDescriptor {
        &self.source.value
    }

    pub fn id(&self) -> &str {
        self.source.id()
    }

    pub fn file_path(&self) -> &Path {
        self.source.value.file_path()
    }

    /// Content as memoized bytes when available, otherwise a fresh store
    /// stream or regenerated content. Store-backed content is returned as a
    /// stream without buffering it; callers that need a buffer use
    /// [`get_buffer`](Self::get_buffer).
    pub async fn get_content(&self) -> Result<ContentView> {
        match self.content.snapshot() {
            Snapshot::Ready(Ok(bytes)) => return Ok(ContentView::Bytes(bytes)),
            Snapshot::InFlight(pending) => return pending.await.map(ContentView::Bytes),
            Snapshot::Ready(Err(_)) | Snapshot::Vacant => {}
        }
        self.regen
            .fetch_content(Some(self.content.as_ref()))
            .instrument(asset_span(self.id(), self.file_path(), "get_content"))
            .await
    }

    /// Content decoded as UTF-8.
    pub async fn get_code(&self) -> Result<String> {
        let bytes = self.get_buffer().await?;
        content::decode(self.id(), &bytes)
    }

    /// Content as one buffer. The first call drains the content and every
    /// later or concurrent call reuses that buffer.
    pub async fn get_buffer(&self) -> Result<Bytes> {
        let regen = self.regen.clone();
        self.content
            .get_or_try_init(move || async move { regen.fetch_content(None).await?.into_bytes().await })
            .instrument(asset_span(self.id(), self.file_path(), "get_buffer"))
            .await
    }

    /// Content as a stream. Returns immediately; any fetch or regeneration
    /// happens when the stream is first polled.
    pub fn get_stream(&self) -> ByteStream {
        match self.content.snapshot() {
            Snapshot::Ready(Ok(bytes)) => content::once(bytes),
            Snapshot::InFlight(pending) => {
                content::from_future(async move { pending.await.map(content::once) })
            }
            Snapshot::Ready(Err(_)) | Snapshot::Vacant => {
                let this = self.clone();
                content::from_future(async move { Ok(this.get_content().await?.into_stream()) })
            }
        }
    }

    /// Serialized source map, or `None` if the asset has no map.
    ///
    /// A map blob missing from the store is regenerated from the AST when the
    /// asset has an AST key. The outcome, success or failure, is kept.
    pub async fn get_map_buffer(&self) -> Result<Option<Bytes>> {
        self.regen.get_map_buffer(&self.map_buffer).await
    }

    /// Decoded source map, or `None` when no map buffer is available.
    pub async fn get_map(&self) -> Result<Option<Arc<SourceMap>>> {
        let regen = self.regen.clone();
        let map_buffer = self.map_buffer.clone();
        self.map
            .get_or_try_init(move || async move {
                match regen.get_map_buffer(&map_buffer).await? {
                    Some(buffer) => Ok(Some(Arc::new(SourceMap::from_buffer(&buffer)?))),
                    None => Ok(None),
                }
            })
            .await
    }

    /// Parse tree. Fails with `NoAst` for assets without one. A failed fetch
    /// or a corrupt blob is not kept, so a later call fetches again.
    pub async fn get_ast(&self) -> Result<Arc<Ast>> {
        self.source.get_ast(&self.regen.ast).await
    }

    pub fn get_included_files(&self) -> Vec<IncludedFile> {
        self.source.value.included_files().to_vec()
    }

    pub fn get_dependencies(&self) -> Vec<Dependency> {
        self.source.value.dependencies().to_vec()
    }

    /// Look up the first of `filenames` found from the asset's location
    /// upwards.
    pub async fn get_config(
        &self,
        filenames: &[PathBuf],
        options: Option<ConfigOptions>,
    ) -> Result<Option<serde_json::Value>> {
        let options = options.unwrap_or_default();
        let found = self
            .source
            .ctx
            .config
            .get_config(self.file_path(), filenames, &options)
            .await?;
        Ok(found.map(|result| result.config))
    }

    /// The nearest `package.json`.
    pub async fn get_package(&self) -> Result<Option<PackageJson>> {
        let filenames = [PathBuf::from("package.json")];
        let found = self
            .source
            .ctx
            .config
            .get_config(self.file_path(), &filenames, &ConfigOptions::default())
            .await?;
        let Some(result) = found else {
            return Ok(None);
        };
        let path = result
            .files
            .first()
            .cloned()
            .unwrap_or_else(|| PathBuf::from("package.json"));
        PackageJson::from_value(&path, result.config).map(Some)
    }
}

impl Source {
    fn id(&self) -> &str {
        &self.value.id
    }

    async fn get_ast(&self, slot: &Memo<Arc<Ast>>) -> Result<Arc<Ast>> {
        if !self.value.has_ast {
            return Err(Error::NoAst(self.id().to_string()));
        }
        let source = self.clone();
        slot.get_or_try_init(move || async move {
            let key = source.require_key(source.value.ast_key.as_ref(), "AST")?;
            let blob = source.get_blob(key).await?;
            Ok(Arc::new(Ast::from_blob(key.as_str(), &blob)?))
        })
        .instrument(asset_span(self.id(), self.value.file_path(), "get_ast"))
        .await
    }

    async fn get_blob(&self, key: &CacheKey) -> Result<Bytes> {
        self.ctx
            .store
            .get_blob(key)
            .instrument(store_span("get_blob", key.as_str()))
            .await
    }

    fn require_key<'a>(&self, key: Option<&'a CacheKey>, slot: &'static str) -> Result<&'a CacheKey> {
        key.ok_or_else(|| Error::MissingKey {
            asset: self.id().to_string(),
            slot,
        })
    }
}

impl Regen {
    /// Fetch or regenerate content. Regenerated bytes are stored in
    /// `content` when given.
    async fn fetch_content(&self, content: Option<&Memo<Bytes>>) -> Result<ContentView> {
        let source = &self.source;
        let value = &source.value;
        if value.has_content {
            let key = source.require_key(value.content_key.as_ref(), "content")?;
            let stream = source
                .ctx
                .store
                .get_stream(key)
                .instrument(store_span("get_stream", key.as_str()))
                .await?;
            return Ok(ContentView::Stream(stream));
        }
        if value.has_ast {
            return self.generated_content(content).await;
        }
        Err(Error::MissingContent(value.id.clone()))
    }

    async fn generated_content(&self, content: Option<&Memo<Bytes>>) -> Result<ContentView> {
        for _ in 0..GENERATION_ATTEMPTS {
            let generation = self.generate().await?;
            match generation.content {
                GeneratedContent::Bytes(bytes) => {
                    if let Some(slot) = content {
                        slot.set(bytes.clone());
                    }
                    return Ok(ContentView::Bytes(bytes));
                }
                GeneratedContent::Stream(cell) => {
                    if let Some(stream) = GeneratedContent::take_stream(&cell) {
                        return Ok(ContentView::Stream(stream));
                    }
                    // Another caller consumed the stream; only a fresh
                    // generation can produce the content again.
                    self.generation.clear();
                }
            }
        }
        Err(Error::Generation(format!(
            "generated content stream for asset {} was already consumed",
            self.source.id()
        )))
    }

    async fn get_map_buffer(&self, slot: &Memo<Option<Bytes>>) -> Result<Option<Bytes>> {
        let value = &self.source.value;
        if !value.has_map {
            return Ok(None);
        }
        let regen = self.clone();
        slot.get_or_try_init(move || async move { regen.fetch_map_buffer().await })
            .instrument(asset_span(&value.id, value.file_path(), "get_map_buffer"))
            .await
    }

    async fn fetch_map_buffer(&self) -> Result<Option<Bytes>> {
        let source = &self.source;
        let value = &source.value;
        let key = source.require_key(value.map_key.as_ref(), "map")?;
        match source.get_blob(key).await {
            Ok(buffer) => Ok(Some(buffer)),
            Err(err) if err.is_not_found() && value.ast_key.is_some() => {
                debug!(asset.id = %value.id, key = %key, "Source map missing from store, regenerating from AST");
                let generation = self.generate().await?;
                generation.map.as_deref().map(SourceMap::to_buffer).transpose()
            }
            Err(err) => Err(err),
        }
    }

    async fn generate(&self) -> Result<Generation> {
        let source = self.source.clone();
        let ast = self.ast.clone();
        self.generation
            .get_or_try_init(move || async move {
                let tree = source.get_ast(&ast).await?;
                debug!(asset.id = %source.value.id, kind = %tree.kind, "Regenerating from AST");
                let generated = source
                    .ctx
                    .compiler
                    .generate_from_ast(&source.value, &tree)
                    .await?;
                Ok(Generation::from(generated))
            })
            .await
    }
}

impl std::fmt::Debug for CommittedAsset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommittedAsset")
            .field("value", &self.source.value)
            .field("content", &self.content)
            .field("map_buffer", &self.map_buffer)
            .field("ast", &self.regen.ast)
            .finish_non_exhaustive()
    }
}
