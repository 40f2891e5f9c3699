//! Node-style specifier resolution.

use crate::fs::FileSystem;
use async_trait::async_trait;
use kiln_core::ports::PathResolver;
use kiln_core::{Error, FileCreateInvalidation, Invalidations, PackageJson, ResolveResult, Result};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::trace;

/// Extensions tried, in order, for a specifier without one.
pub const EXTENSIONS: &[&str] = &["js", "mjs", "cjs", "jsx", "ts", "tsx", "json"];

/// Resolves relative, absolute, and bare specifiers against a
/// [`FileSystem`].
///
/// Every candidate probed and found missing becomes a file-create
/// invalidation, and every `package.json` read becomes a file-change
/// invalidation.
#[derive(Clone)]
pub struct NodeResolver {
    fs: Arc<dyn FileSystem>,
    project_root: PathBuf,
}

impl NodeResolver {
    pub fn new(fs: Arc<dyn FileSystem>, project_root: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            project_root: project_root.into(),
        }
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    async fn resolve_path(&self, specifier: &str, from: &Path) -> Result<ResolveResult> {
        let basedir = from.parent().unwrap_or(Path::new("/"));
        let mut inv = Invalidations::default();

        let target = normalize(&basedir.join(specifier));
        let Some(file) = self.probe(&target, &mut inv).await else {
            return Err(not_found(specifier, from));
        };
        let pkg = self.nearest_package(&file, &mut inv).await?;
        Ok(ResolveResult {
            resolved: file.display().to_string(),
            pkg,
            invalidations: inv,
        })
    }

    async fn resolve_bare(&self, specifier: &str, from: &Path) -> Result<ResolveResult> {
        let (name, subpath) = split_package(specifier);
        let mut inv = Invalidations::default();
        inv.add_file_create(FileCreateInvalidation::FileName {
            file_name: format!("node_modules/{name}"),
            above_file_path: from.to_path_buf(),
        });

        let basedir = from.parent().unwrap_or(Path::new("/"));
        for dir in basedir.ancestors() {
            if dir.file_name().is_some_and(|n| n == "node_modules") {
                continue;
            }
            let package_dir = dir.join("node_modules").join(name);
            if !self.fs.is_dir(&package_dir).await {
                continue;
            }
            trace!(package = %package_dir.display(), "Found package directory");

            let manifest = package_dir.join("package.json");
            let pkg = self.read_package(&manifest, &mut inv).await?;
            let entry = match (subpath, pkg.as_ref().and_then(PackageJson::entry)) {
                (Some(sub), _) => package_dir.join(sub),
                (None, Some(entry)) => normalize(&package_dir.join(entry)),
                (None, None) => package_dir.join("index"),
            };
            let Some(file) = self.probe(&entry, &mut inv).await else {
                return Err(not_found(specifier, from));
            };
            return Ok(ResolveResult {
                resolved: file.display().to_string(),
                pkg,
                invalidations: inv,
            });
        }
        Err(not_found(specifier, from))
    }

    /// The file `path` names: itself, with an extension appended, or as a
    /// directory index.
    async fn probe(&self, path: &Path, inv: &mut Invalidations) -> Option<PathBuf> {
        if self.fs.is_file(path).await {
            return Some(path.to_path_buf());
        }
        inv.add_file_create(FileCreateInvalidation::FilePath {
            file_path: path.to_path_buf(),
        });
        if let Some(file) = self.probe_extensions(path, inv).await {
            return Some(file);
        }
        if self.fs.is_dir(path).await {
            return self.probe_extensions(&path.join("index"), inv).await;
        }
        None
    }

    async fn probe_extensions(&self, stem: &Path, inv: &mut Invalidations) -> Option<PathBuf> {
        for ext in EXTENSIONS {
            let mut candidate = stem.as_os_str().to_owned();
            candidate.push(".");
            candidate.push(ext);
            let candidate = PathBuf::from(candidate);
            if self.fs.is_file(&candidate).await {
                return Some(candidate);
            }
            inv.add_file_create(FileCreateInvalidation::FilePath {
                file_path: candidate,
            });
        }
        None
    }

    /// The closest `package.json` above `file`, not looking past the project
    /// root.
    async fn nearest_package(
        &self,
        file: &Path,
        inv: &mut Invalidations,
    ) -> Result<Option<PackageJson>> {
        inv.add_file_create(FileCreateInvalidation::FileName {
            file_name: "package.json".to_string(),
            above_file_path: file.to_path_buf(),
        });
        let Some(start) = file.parent() else {
            return Ok(None);
        };
        for dir in start.ancestors() {
            if let Some(pkg) = self.read_package(&dir.join("package.json"), inv).await? {
                return Ok(Some(pkg));
            }
            if dir == self.project_root {
                break;
            }
        }
        Ok(None)
    }

    async fn read_package(&self, path: &Path, inv: &mut Invalidations) -> Result<Option<PackageJson>> {
        if !self.fs.is_file(path).await {
            return Ok(None);
        }
        let source = self.fs.read_to_string(path).await?;
        inv.add_file_change(path);
        PackageJson::parse(path, &source).map(Some)
    }
}

#[async_trait]
impl PathResolver for NodeResolver {
    async fn resolve(&self, specifier: &str, from: &Path) -> Result<ResolveResult> {
        if is_path_specifier(specifier) {
            self.resolve_path(specifier, from).await
        } else {
            self.resolve_bare(specifier, from).await
        }
    }
}

impl std::fmt::Debug for NodeResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeResolver")
            .field("project_root", &self.project_root)
            .finish_non_exhaustive()
    }
}

fn is_path_specifier(specifier: &str) -> bool {
    specifier == "."
        || specifier == ".."
        || specifier.starts_with("./")
        || specifier.starts_with("../")
        || Path::new(specifier).is_absolute()
}

/// `@scope/name/sub/path` -> (`@scope/name`, `Some("sub/path")`).
fn split_package(specifier: &str) -> (&str, Option<&str>) {
    let name_end = if specifier.starts_with('@') {
        specifier
            .match_indices('/')
            .nth(1)
            .map(|(i, _)| i)
    } else {
        specifier.find('/')
    };
    match name_end {
        Some(i) => (&specifier[..i], Some(&specifier[i + 1..]).filter(|s| !s.is_empty())),
        None => (specifier, None),
    }
}

/// Lexically resolve `.` and `..` components.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

fn not_found(specifier: &str, from: &Path) -> Error {
    Error::ModuleNotFound {
        specifier: specifier.to_string(),
        from: from.to_path_buf(),
    }
}
