//! Memoized resolution.

use crate::builtins::{self, BuiltinModule};
use crate::fs::FsHandle;
use crate::node::NodeResolver;
use dashmap::DashMap;
use kiln_core::ports::PathResolver;
use kiln_core::{
    Error, FailurePolicy, Invalidations, Memo, ResolveOptions, ResolveResult, Result, Snapshot,
};
use kiln_trace::resolve_span;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{Instrument, debug};

/// What a [`ResolutionCache`] is built from. This is all that crosses a
/// worker boundary; cached results never do.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverParams {
    pub fs: FsHandle,
    pub project_root: PathBuf,
}

impl ResolverParams {
    pub fn new(fs: FsHandle, project_root: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            project_root: project_root.into(),
        }
    }
}

type EntryKey = (PathBuf, String);
type Entry = Arc<Memo<Arc<ResolveResult>>>;

/// Resolution results memoized by (origin directory, specifier).
///
/// Entries are never re-validated or evicted. Callers watch the reported
/// invalidations and build a new cache when inputs change.
pub struct ResolutionCache {
    params: ResolverParams,
    resolver: Arc<dyn PathResolver>,
    entries: DashMap<EntryKey, Entry>,
    invalidations: Arc<Mutex<Invalidations>>,
}

impl ResolutionCache {
    /// Cache over a [`NodeResolver`] on the parameters' filesystem.
    pub fn new(params: ResolverParams) -> Self {
        let resolver = NodeResolver::new(Arc::new(params.fs.clone()), params.project_root.clone());
        Self::with_resolver(params, Arc::new(resolver))
    }

    pub fn with_resolver(params: ResolverParams, resolver: Arc<dyn PathResolver>) -> Self {
        Self {
            params,
            resolver,
            entries: DashMap::new(),
            invalidations: Arc::new(Mutex::new(Invalidations::default())),
        }
    }

    pub fn params(&self) -> &ResolverParams {
        &self.params
    }

    /// Resolve `specifier` as imported from `from`.
    ///
    /// Built-ins are answered directly. Everything else is resolved once per
    /// (directory of `from`, specifier); concurrent requests for the same key
    /// share one underlying resolution. A failed resolution is not kept.
    pub async fn resolve(
        &self,
        specifier: &str,
        from: &Path,
        _options: Option<&ResolveOptions>,
    ) -> Result<Arc<ResolveResult>> {
        if builtins::is_reserved(specifier) {
            return Ok(Arc::new(builtins::builtin_result(specifier)));
        }

        let span = resolve_span(specifier, from);
        let basedir = from.parent().unwrap_or(from).to_path_buf();
        // Clone the slot out so no map guard is held across the await.
        let slot = self
            .entries
            .entry((basedir, specifier.to_string()))
            .or_insert_with(|| Arc::new(Memo::new(FailurePolicy::Retry)))
            .clone();
        span.record("cache.hit", matches!(slot.snapshot(), Snapshot::Ready(Ok(_))));

        let resolver = self.resolver.clone();
        let invalidations = self.invalidations.clone();
        let specifier = specifier.to_string();
        let from = from.to_path_buf();
        slot.get_or_try_init(move || async move {
            let result = resolver.resolve(&specifier, &from).await?;
            debug!(
                resolved = %result.resolved,
                file_create = result.invalidations.invalidate_on_file_create().len(),
                file_change = result.invalidations.invalidate_on_file_change.len(),
                "Resolved specifier"
            );
            invalidations
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .extend(&result.invalidations);
            Ok(Arc::new(result))
        })
        .instrument(span)
        .await
    }

    /// Resolve and load `specifier`. Only built-in modules can be loaded;
    /// any other target fails with `UnsupportedRuntimeRequire`.
    pub async fn require(
        &self,
        specifier: &str,
        from: &Path,
        options: Option<&ResolveOptions>,
    ) -> Result<&'static BuiltinModule> {
        let result = self.resolve(specifier, from, options).await?;
        builtins::lookup(&result.resolved)
            .ok_or_else(|| Error::UnsupportedRuntimeRequire(result.resolved.clone()))
    }

    /// Union of the invalidations of every resolution performed so far.
    pub fn get_invalidations(&self) -> Invalidations {
        self.invalidations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Entries are kept for the life of the cache; this does nothing.
    pub fn invalidate(&self) {
        debug!(entries = self.entries.len(), "Ignoring invalidate on resolution cache");
    }

    /// Number of (directory, specifier) keys seen.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for ResolutionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolutionCache")
            .field("params", &self.params)
            .field("entries", &self.entries.len())
            .finish_non_exhaustive()
    }
}

impl Serialize for ResolutionCache {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.params.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ResolutionCache {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        ResolverParams::deserialize(deserializer).map(Self::new)
    }
}
