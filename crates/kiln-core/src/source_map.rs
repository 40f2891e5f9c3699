//! Source-map codec.
//!
//! Maps are persisted as an opaque buffer and decoded into a [`SourceMap`]
//! on demand. Lines are 1-based and columns 0-based.

use crate::{Error, Result};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OriginalLocation {
    /// Index into [`SourceMap::sources`].
    pub source: u32,
    pub position: Position,
    /// Index into [`SourceMap::names`].
    pub name: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Mapping {
    pub generated: Position,
    pub original: Option<OriginalLocation>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceMap {
    sources: Vec<String>,
    sources_content: Vec<Option<String>>,
    names: Vec<String>,
    mappings: Vec<Mapping>,
}

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a buffer produced by [`SourceMap::to_buffer`].
    pub fn from_buffer(buffer: &[u8]) -> Result<Self> {
        let map: SourceMap =
            serde_json::from_slice(buffer).map_err(|e| Error::InvalidSourceMap(e.to_string()))?;
        map.validate()?;
        Ok(map)
    }

    pub fn to_buffer(&self) -> Result<Bytes> {
        Ok(Bytes::from(serde_json::to_vec(self)?))
    }

    /// Register a source file, returning its index.
    pub fn add_source(&mut self, path: impl Into<String>, content: Option<String>) -> u32 {
        let path = path.into();
        if let Some(idx) = self.sources.iter().position(|s| *s == path) {
            return idx as u32;
        }
        self.sources.push(path);
        self.sources_content.push(content);
        (self.sources.len() - 1) as u32
    }

    /// Register a symbol name, returning its index.
    pub fn add_name(&mut self, name: impl Into<String>) -> u32 {
        let name = name.into();
        if let Some(idx) = self.names.iter().position(|n| *n == name) {
            return idx as u32;
        }
        self.names.push(name);
        (self.names.len() - 1) as u32
    }

    /// Insert a mapping, keeping mappings sorted by generated position.
    pub fn add_mapping(&mut self, mapping: Mapping) {
        let idx = self
            .mappings
            .partition_point(|m| m.generated <= mapping.generated);
        self.mappings.insert(idx, mapping);
    }

    /// The mapping at or immediately before `position` on the same line.
    pub fn find_closest_mapping(&self, position: Position) -> Option<&Mapping> {
        let idx = self.mappings.partition_point(|m| m.generated <= position);
        let candidate = self.mappings[..idx].last()?;
        (candidate.generated.line == position.line).then_some(candidate)
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    pub fn source_content(&self, source: u32) -> Option<&str> {
        self.sources_content.get(source as usize)?.as_deref()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn mappings(&self) -> &[Mapping] {
        &self.mappings
    }

    fn validate(&self) -> Result<()> {
        if self.sources_content.len() != self.sources.len() {
            return Err(Error::InvalidSourceMap(format!(
                "{} sources but {} source contents",
                self.sources.len(),
                self.sources_content.len()
            )));
        }
        for mapping in &self.mappings {
            let Some(original) = mapping.original else {
                continue;
            };
            if original.source as usize >= self.sources.len() {
                return Err(Error::InvalidSourceMap(format!(
                    "mapping references unknown source {}",
                    original.source
                )));
            }
            if let Some(name) = original.name
                && name as usize >= self.names.len()
            {
                return Err(Error::InvalidSourceMap(format!(
                    "mapping references unknown name {name}"
                )));
            }
        }
        Ok(())
    }
}
