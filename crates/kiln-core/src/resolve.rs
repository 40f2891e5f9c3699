//! Module resolution results and invalidation sets.

use crate::package::PackageJson;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::path::PathBuf;

/// A filesystem event that should invalidate a cached resolution when a
/// matching file appears.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FileCreateInvalidation {
    /// A specific path is created.
    FilePath { file_path: PathBuf },
    /// A file with this name is created in `above_file_path`'s directory or
    /// any of its ancestors.
    FileName {
        file_name: String,
        above_file_path: PathBuf,
    },
    Glob { glob: String },
}

/// Inputs whose change makes a resolution stale.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "InvalidationsRepr")]
pub struct Invalidations {
    invalidate_on_file_create: Vec<FileCreateInvalidation>,
    #[serde(skip)]
    seen_creates: HashSet<FileCreateInvalidation>,
    pub invalidate_on_file_change: BTreeSet<PathBuf>,
}

#[derive(Deserialize)]
struct InvalidationsRepr {
    #[serde(default)]
    invalidate_on_file_create: Vec<FileCreateInvalidation>,
    #[serde(default)]
    invalidate_on_file_change: BTreeSet<PathBuf>,
}

impl From<InvalidationsRepr> for Invalidations {
    fn from(repr: InvalidationsRepr) -> Self {
        let mut invalidations = Invalidations {
            invalidate_on_file_change: repr.invalidate_on_file_change,
            ..Default::default()
        };
        for rule in repr.invalidate_on_file_create {
            invalidations.add_file_create(rule);
        }
        invalidations
    }
}

impl PartialEq for Invalidations {
    fn eq(&self, other: &Self) -> bool {
        self.invalidate_on_file_create == other.invalidate_on_file_create
            && self.invalidate_on_file_change == other.invalidate_on_file_change
    }
}

impl Eq for Invalidations {}

impl Invalidations {
    pub fn is_empty(&self) -> bool {
        self.invalidate_on_file_create.is_empty() && self.invalidate_on_file_change.is_empty()
    }

    /// Create rules in first-seen order, without duplicates.
    pub fn invalidate_on_file_create(&self) -> &[FileCreateInvalidation] {
        &self.invalidate_on_file_create
    }

    /// Add `other`'s entries. Create rules keep first-seen order.
    pub fn extend(&mut self, other: &Invalidations) {
        for rule in &other.invalidate_on_file_create {
            self.add_file_create(rule.clone());
        }
        self.invalidate_on_file_change
            .extend(other.invalidate_on_file_change.iter().cloned());
    }

    pub fn add_file_create(&mut self, rule: FileCreateInvalidation) {
        if self.seen_creates.insert(rule.clone()) {
            self.invalidate_on_file_create.push(rule);
        }
    }

    pub fn add_file_change(&mut self, path: impl Into<PathBuf>) {
        self.invalidate_on_file_change.insert(path.into());
    }
}

/// Outcome of resolving a specifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolveResult {
    /// The resolved target: a file path, or a built-in module name.
    pub resolved: String,
    pub pkg: Option<PackageJson>,
    #[serde(flatten)]
    pub invalidations: Invalidations,
}

impl ResolveResult {
    pub fn new(resolved: impl Into<String>) -> Self {
        Self {
            resolved: resolved.into(),
            pkg: None,
            invalidations: Invalidations::default(),
        }
    }
}

/// Options accepted by `resolve`/`require`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveOptions {
    /// Semver range the caller expects.
    pub range: Option<String>,
    #[serde(default)]
    pub should_auto_install: bool,
    #[serde(default)]
    pub save_dev: bool,
}
