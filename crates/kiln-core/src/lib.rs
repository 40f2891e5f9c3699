//! Kiln Core
//!
//! Shared vocabulary for the kiln materialization and resolution layers:
//! the error type, cache keys, memoized slots, asset descriptors, and the
//! port traits that external collaborators (cache store, compiler, config
//! lookup, path resolver) implement.

pub mod asset;
pub mod ast;
pub mod content;
pub mod error;
pub mod keys;
pub mod memo;
pub mod package;
pub mod ports;
pub mod resolve;
pub mod source_map;

pub use asset::{AssetDescriptor, AssetDescriptorBuilder, Dependency, IncludedFile, SpecifierType};
pub use ast::Ast;
pub use content::{ByteStream, ContentView};
pub use error::{Error, Result};
pub use keys::CacheKey;
pub use memo::{FailurePolicy, Memo, Snapshot};
pub use package::PackageJson;
pub use resolve::{FileCreateInvalidation, Invalidations, ResolveOptions, ResolveResult};
pub use source_map::{Mapping, OriginalLocation, Position, SourceMap};
