// ABOUTME: Origin/target path pairs used for shared links and upload placements.
// ABOUTME: Accepts a bare path, a one-element list, or a two-element list in config.

use serde::Deserialize;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LinkMappingError {
    #[error("link mapping must have one or two paths, got {0}")]
    WrongArity(usize),

    #[error("link mapping path cannot be empty")]
    EmptyPath,

    #[error("link mapping path must be relative: {0}")]
    Absolute(String),

    #[error("link mapping path cannot contain '..': {0}")]
    ParentTraversal(String),
}

/// Ordered pair of relative paths.
///
/// For shared links the origin lives inside the release and the target inside
/// the shared store. For uploads the origin is a local path relative to the
/// project and the target lives inside the release.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "MappingEntry")]
pub struct LinkMapping {
    origin: String,
    target: String,
}

impl LinkMapping {
    pub fn new(origin: &str, target: &str) -> Result<Self, LinkMappingError> {
        Ok(Self {
            origin: validate(origin)?,
            target: validate(target)?,
        })
    }

    /// Shorthand where origin and target are the same path.
    pub fn same(path: &str) -> Result<Self, LinkMappingError> {
        Self::new(path, path)
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn target(&self) -> &str {
        &self.target
    }
}

impl fmt::Display for LinkMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.origin, self.target)
    }
}

fn validate(path: &str) -> Result<String, LinkMappingError> {
    let trimmed = path.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(LinkMappingError::EmptyPath);
    }
    if trimmed.starts_with('/') {
        return Err(LinkMappingError::Absolute(trimmed.to_string()));
    }
    if trimmed.split('/').any(|segment| segment == "..") {
        return Err(LinkMappingError::ParentTraversal(trimmed.to_string()));
    }
    Ok(trimmed.to_string())
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MappingEntry {
    Single(String),
    List(Vec<String>),
}

impl TryFrom<MappingEntry> for LinkMapping {
    type Error = LinkMappingError;

    fn try_from(entry: MappingEntry) -> Result<Self, Self::Error> {
        match entry {
            MappingEntry::Single(path) => LinkMapping::same(&path),
            MappingEntry::List(paths) => match paths.as_slice() {
                [path] => LinkMapping::same(path),
                [origin, target] => LinkMapping::new(origin, target),
                other => Err(LinkMappingError::WrongArity(other.len())),
            },
        }
    }
}
