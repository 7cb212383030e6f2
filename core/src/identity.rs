//! Document identity and the cancellation tokens derived from it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One editable unit: a leaf of a file in an archive item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentIdentity {
    pub item: String,
    pub file: String,
    pub leaf: usize,
}

impl DocumentIdentity {
    pub fn new(item: impl Into<String>, file: impl Into<String>, leaf: usize) -> Self {
        Self {
            item: item.into(),
            file: file.into(),
            leaf,
        }
    }

    /// Same item and file, different leaf.
    pub fn with_leaf(&self, leaf: usize) -> Self {
        Self {
            leaf,
            ..self.clone()
        }
    }

    /// Key under which the autosave record for this document lives.
    pub fn storage_key(&self) -> String {
        format!("{}${}${}", self.item, self.file, self.leaf)
    }
}

impl fmt::Display for DocumentIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}#{}", self.item, self.file, self.leaf)
    }
}

/// Ties deferred work (recovery timers, leaf fetches) to one open of one document.
///
/// The generation is bumped on every open and every leaf switch, so a token
/// taken before the switch never matches afterwards, even if the user comes
/// back to the same leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocToken {
    pub identity: DocumentIdentity,
    pub generation: u64,
}
