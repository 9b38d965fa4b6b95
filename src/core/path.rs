//! Signing paths
//!
//! A signing path locates a position inside a (possibly nested) shared
//! address definition. Every path starts with the root marker `r`; each
//! level of nesting appends `.N` segments, e.g. `r.1.0`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Root marker every signing path starts with
pub const ROOT_MARKER: &str = "r";

/// Segment separator inside a signing path
pub const SEGMENT_SEPARATOR: char = '.';

/// Errors produced while parsing a signing path
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("Signing path must start with '{ROOT_MARKER}': {0}")]
    MissingRoot(String),
    #[error("Signing path has an empty segment: {0}")]
    EmptySegment(String),
}

/// A position inside an address definition tree
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SigningPath(String);

impl SigningPath {
    /// The root path `r`
    pub fn root() -> Self {
        Self(ROOT_MARKER.to_string())
    }

    /// Parse and validate a signing path
    pub fn parse(path: &str) -> Result<Self, PathError> {
        let rest = path
            .strip_prefix(ROOT_MARKER)
            .ok_or_else(|| PathError::MissingRoot(path.to_string()))?;

        if rest.is_empty() {
            return Ok(Self::root());
        }

        let segments = rest
            .strip_prefix(SEGMENT_SEPARATOR)
            .ok_or_else(|| PathError::MissingRoot(path.to_string()))?;

        if segments.split(SEGMENT_SEPARATOR).any(str::is_empty) {
            return Err(PathError::EmptySegment(path.to_string()));
        }

        Ok(Self(path.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0 == ROOT_MARKER
    }

    /// The part of the path after the root marker (`.1.0` for `r.1.0`)
    fn tail(&self) -> &str {
        self.0.strip_prefix(ROOT_MARKER).unwrap_or_default()
    }

    /// Append a path relative to this one.
    ///
    /// `r.1` extended by `r.0.2` is `r.1.0.2`; extending by `r` is a no-op.
    pub fn extend(&self, relative: &SigningPath) -> SigningPath {
        Self(format!("{}{}", self.0, relative.tail()))
    }

    /// Whether `prefix` names this path or one of its ancestors.
    ///
    /// Matching happens on whole segments, so `r.1` is a prefix of `r.1.3`
    /// but not of `r.10`.
    pub fn starts_with(&self, prefix: &SigningPath) -> bool {
        match self.0.strip_prefix(prefix.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with(SEGMENT_SEPARATOR),
            None => false,
        }
    }

    /// Strip `prefix` and re-root the remainder.
    ///
    /// `r.1.3` relative to `r.1` is `r.3`. Returns `None` when `prefix` is
    /// not an ancestor of this path; resolution never ascends.
    pub fn relative_to(&self, prefix: &SigningPath) -> Option<SigningPath> {
        if !self.starts_with(prefix) {
            return None;
        }
        let rest = self.0.strip_prefix(prefix.as_str())?;
        Some(Self(format!("{}{}", ROOT_MARKER, rest)))
    }

    /// Number of segments below the root
    pub fn depth(&self) -> usize {
        self.tail().matches(SEGMENT_SEPARATOR).count()
    }
}

impl Default for SigningPath {
    fn default() -> Self {
        Self::root()
    }
}

impl fmt::Display for SigningPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SigningPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
