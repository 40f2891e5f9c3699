//! Kiln Resolver
//!
//! Turns module specifiers into concrete targets. [`ResolutionCache`]
//! memoizes resolutions per (directory, specifier), answers `@kiln/`
//! built-ins from a static registry, and collects the filesystem inputs
//! that would make its answers stale.

pub mod builtins;
pub mod cache;
pub mod fs;
pub mod node;

pub use builtins::{BuiltinModule, PluginKind};
pub use cache::{ResolutionCache, ResolverParams};
pub use fs::{FileSystem, FsHandle, LocalFs, MemoryFs};
pub use node::NodeResolver;
