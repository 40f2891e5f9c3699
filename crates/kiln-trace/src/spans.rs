//! Span creation for materialization, store, and resolution operations.

use std::path::Path;
use tracing::{Level, Span, span};

/// Span for an operation on one committed asset.
pub fn asset_span(asset_id: &str, file_path: &Path, operation: &'static str) -> Span {
    span!(
        Level::DEBUG,
        "asset.materialize",
        asset.id = asset_id,
        asset.file_path = %file_path.display(),
        operation = operation,
    )
}

/// Span for a cache store access.
pub fn store_span(operation: &'static str, key: &str) -> Span {
    span!(
        Level::TRACE,
        "store.access",
        operation = operation,
        cache.key = key,
    )
}

/// Span for resolving one specifier.
pub fn resolve_span(specifier: &str, from: &Path) -> Span {
    span!(
        Level::DEBUG,
        "resolve",
        specifier = specifier,
        from = %from.display(),
        cache.hit = tracing::field::Empty,
    )
}
