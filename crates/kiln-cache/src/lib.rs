//! Blob cache stores for kiln (in-memory and filesystem).

pub mod config;
pub mod keys;
pub mod store;

pub use config::StoreConfig;
pub use keys::blob_file_name;
pub use store::{FilesystemStore, MemoryStore};
