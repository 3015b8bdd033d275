//! Common types used throughout pr-relay
//!
//! This module contains shared type definitions and small utility types
//! used across multiple modules.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Resource Identifier
// ============================================================================

/// An `owner/name` repository reference
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoRef {
    /// Organization or user that owns the repository
    pub owner: String,
    /// Repository name
    pub name: String,
}

impl RepoRef {
    /// Create a new repository reference
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Parse `owner/name`, rejecting empty components
    pub fn parse(value: &str) -> Option<Self> {
        let (owner, name) = value.split_once('/')?;
        let owner = owner.trim();
        let name = name.trim();
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return None;
        }
        Some(Self::new(owner, name))
    }

    /// The checkpoint resource key, `owner/name`
    pub fn key(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

// ============================================================================
// Fetch Mode
// ============================================================================

/// How far an extraction run pages through the source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchMode {
    /// Full run, first page only
    #[default]
    FirstPage,
    /// Full run through every page
    All,
    /// Incremental run that stops at the first page with nothing new
    Poll,
    /// Incremental run that drains every remaining page
    Resume,
}

impl FetchMode {
    /// Resolve the mode from the `incremental` and `all` flags
    pub fn from_flags(incremental: bool, fetch_all: bool) -> Self {
        match (incremental, fetch_all) {
            (false, false) => Self::FirstPage,
            (false, true) => Self::All,
            (true, false) => Self::Poll,
            (true, true) => Self::Resume,
        }
    }

    /// Whether this mode resumes from a checkpoint
    pub fn is_incremental(self) -> bool {
        matches!(self, Self::Poll | Self::Resume)
    }

    /// Whether this mode was requested with the `all` flag
    pub fn is_fetch_all(self) -> bool {
        matches!(self, Self::All | Self::Resume)
    }
}

impl fmt::Display for FetchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::FirstPage => "first-page",
            Self::All => "all",
            Self::Poll => "poll",
            Self::Resume => "resume",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Utilities
// ============================================================================

/// Extension trait for Option<String> to handle empty strings
pub trait OptionStringExt {
    /// Returns None if the string is empty
    fn none_if_empty(self) -> Option<String>;
}

impl OptionStringExt for Option<String> {
    fn none_if_empty(self) -> Option<String> {
        self.filter(|s| !s.is_empty())
    }
}
