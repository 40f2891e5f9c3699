//! Collaborators shared by every materializer of a build.

use kiln_core::ports::{CacheStore, Compiler, ConfigResolver};
use std::fmt;
use std::sync::Arc;

/// Handles to the cache store, compiler, and config lookup. Cheap to clone;
/// one context is shared by all assets of a build.
#[derive(Clone)]
pub struct AssetContext {
    pub store: Arc<dyn CacheStore>,
    pub compiler: Arc<dyn Compiler>,
    pub config: Arc<dyn ConfigResolver>,
}

impl AssetContext {
    pub fn new(
        store: Arc<dyn CacheStore>,
        compiler: Arc<dyn Compiler>,
        config: Arc<dyn ConfigResolver>,
    ) -> Self {
        Self {
            store,
            compiler,
            config,
        }
    }
}

impl fmt::Debug for AssetContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetContext").finish_non_exhaustive()
    }
}
