//! Asset descriptors as committed to the build graph.

use crate::keys::CacheKey;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A file read while producing an asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IncludedFile {
    pub file_path: PathBuf,
    pub hash: Option<String>,
}

impl IncludedFile {
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
            hash: None,
        }
    }
}

/// How a specifier was written in the source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpecifierType {
    #[default]
    Esm,
    CommonJs,
    Url,
}

/// A module specifier discovered in an asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dependency {
    pub specifier: String,
    #[serde(default)]
    pub specifier_type: SpecifierType,
    #[serde(default)]
    pub is_optional: bool,
}

impl Dependency {
    pub fn new(specifier: impl Into<String>) -> Self {
        Self {
            specifier: specifier.into(),
            specifier_type: SpecifierType::default(),
            is_optional: false,
        }
    }
}

/// Immutable description of a committed asset.
///
/// Keys are opaque references into the cache store. The `has_*` flags are
/// capabilities and are independent of key presence: an asset without a
/// content key can still produce content by regenerating it from its AST.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "AssetDescriptorRepr")]
pub struct AssetDescriptor {
    pub id: String,
    pub file_path: PathBuf,
    pub content_key: Option<CacheKey>,
    pub ast_key: Option<CacheKey>,
    pub map_key: Option<CacheKey>,
    pub has_content: bool,
    pub has_ast: bool,
    pub has_map: bool,
    included_files: Vec<IncludedFile>,
    dependencies: Vec<Dependency>,
}

impl AssetDescriptor {
    pub fn builder(id: impl Into<String>, file_path: impl Into<PathBuf>) -> AssetDescriptorBuilder {
        AssetDescriptorBuilder::new(id, file_path)
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    pub fn included_files(&self) -> &[IncludedFile] {
        &self.included_files
    }

    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    fn add_included_file(&mut self, file: IncludedFile) {
        if !self
            .included_files
            .iter()
            .any(|f| f.file_path == file.file_path)
        {
            self.included_files.push(file);
        }
    }

    fn add_dependency(&mut self, dependency: Dependency) {
        if !self
            .dependencies
            .iter()
            .any(|d| d.specifier == dependency.specifier)
        {
            self.dependencies.push(dependency);
        }
    }
}

/// Wire form of [`AssetDescriptor`]; deserialized lists go through the same
/// deduplication as the builder.
#[derive(Deserialize)]
struct AssetDescriptorRepr {
    id: String,
    file_path: PathBuf,
    content_key: Option<CacheKey>,
    ast_key: Option<CacheKey>,
    map_key: Option<CacheKey>,
    has_content: bool,
    has_ast: bool,
    has_map: bool,
    #[serde(default)]
    included_files: Vec<IncludedFile>,
    #[serde(default)]
    dependencies: Vec<Dependency>,
}

impl From<AssetDescriptorRepr> for AssetDescriptor {
    fn from(repr: AssetDescriptorRepr) -> Self {
        let mut asset = AssetDescriptor {
            id: repr.id,
            file_path: repr.file_path,
            content_key: repr.content_key,
            ast_key: repr.ast_key,
            map_key: repr.map_key,
            has_content: repr.has_content,
            has_ast: repr.has_ast,
            has_map: repr.has_map,
            included_files: Vec::new(),
            dependencies: Vec::new(),
        };
        for file in repr.included_files {
            asset.add_included_file(file);
        }
        for dependency in repr.dependencies {
            asset.add_dependency(dependency);
        }
        asset
    }
}

/// Builder for [`AssetDescriptor`]. Setting a key also sets the matching
/// capability flag; flags can be overridden afterwards.
#[derive(Debug, Clone)]
pub struct AssetDescriptorBuilder {
    inner: AssetDescriptor,
}

impl AssetDescriptorBuilder {
    pub fn new(id: impl Into<String>, file_path: impl Into<PathBuf>) -> Self {
        Self {
            inner: AssetDescriptor {
                id: id.into(),
                file_path: file_path.into(),
                content_key: None,
                ast_key: None,
                map_key: None,
                has_content: false,
                has_ast: false,
                has_map: false,
                included_files: Vec::new(),
                dependencies: Vec::new(),
            },
        }
    }

    pub fn content_key(mut self, key: impl Into<CacheKey>) -> Self {
        self.inner.content_key = Some(key.into());
        self.inner.has_content = true;
        self
    }

    pub fn ast_key(mut self, key: impl Into<CacheKey>) -> Self {
        self.inner.ast_key = Some(key.into());
        self.inner.has_ast = true;
        self
    }

    pub fn map_key(mut self, key: impl Into<CacheKey>) -> Self {
        self.inner.map_key = Some(key.into());
        self.inner.has_map = true;
        self
    }

    pub fn has_content(mut self, value: bool) -> Self {
        self.inner.has_content = value;
        self
    }

    pub fn has_ast(mut self, value: bool) -> Self {
        self.inner.has_ast = value;
        self
    }

    pub fn has_map(mut self, value: bool) -> Self {
        self.inner.has_map = value;
        self
    }

    /// Add an included file; duplicates by path are ignored.
    pub fn include_file(mut self, file: IncludedFile) -> Self {
        self.inner.add_included_file(file);
        self
    }

    /// Add a dependency; duplicates by specifier are ignored.
    pub fn dependency(mut self, dependency: Dependency) -> Self {
        self.inner.add_dependency(dependency);
        self
    }

    pub fn build(self) -> AssetDescriptor {
        self.inner
    }
}
