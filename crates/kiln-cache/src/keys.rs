//! Mapping cache keys onto file names.

use kiln_core::CacheKey;

/// Relative path of a blob inside a store directory.
///
/// The file is named after the SHA-256 of the key, so distinct keys never
/// share a file and no key can name a path outside the store. Blobs are
/// fanned out over a two-character prefix directory.
pub fn blob_file_name(key: &CacheKey) -> String {
    let digest = CacheKey::for_content(key.as_str().as_bytes());
    let name = digest.as_str();
    format!("{}/{}.blob", &name[..2], name)
}
