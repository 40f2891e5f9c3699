//! Asset content materialization for kiln.
//!
//! A [`CommittedAsset`] turns the opaque cache keys of an
//! [`AssetDescriptor`](kiln_core::AssetDescriptor) into content, source maps,
//! and parse trees on demand, computing each representation at most once.

pub mod committed;
pub mod config;
pub mod context;

pub use committed::CommittedAsset;
pub use config::FsConfigResolver;
pub use context::AssetContext;
