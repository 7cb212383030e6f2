//! Per-editor cache of decoded leaf content.
//!
//! Each leaf is fetched at most once per session. Failures are not cached,
//! so a later explicit request for the same leaf fetches again.

use crate::error::FetchError;
use crate::markup;
use ahash::AHashMap;
use tracing::{debug, warn};

/// Source of host markup for a leaf.
pub trait ContentFetch {
    fn fetch_leaf(&self, leaf: usize) -> Result<String, FetchError>;
}

impl<F: Fn(usize) -> Result<String, FetchError>> ContentFetch for F {
    fn fetch_leaf(&self, leaf: usize) -> Result<String, FetchError> {
        self(leaf)
    }
}

#[derive(Debug, Clone, Default)]
pub struct LeafCache {
    entries: AHashMap<usize, String>,
    fetches: usize,
}

impl LeafCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decoded content for `leaf`, fetching and decoding it on first use.
    pub fn get_or_fetch(
        &mut self,
        leaf: usize,
        fetch: &dyn ContentFetch,
    ) -> Result<String, FetchError> {
        if let Some(text) = self.entries.get(&leaf) {
            debug!(leaf, "leaf cache hit");
            return Ok(text.clone());
        }
        self.fetches += 1;
        let markup = fetch.fetch_leaf(leaf).map_err(|e| {
            warn!(leaf, error = %e, "leaf fetch failed");
            e
        })?;
        let text = markup::decode(&markup);
        debug!(leaf, chars = text.chars().count(), "leaf cached");
        self.entries.insert(leaf, text.clone());
        Ok(text)
    }

    /// Store already-decoded content (e.g. from a fetch run by the host).
    pub fn insert_decoded(&mut self, leaf: usize, text: String) {
        self.entries.insert(leaf, text);
    }

    pub fn get(&self, leaf: usize) -> Option<&str> {
        self.entries.get(&leaf).map(String::as_str)
    }

    pub fn contains(&self, leaf: usize) -> bool {
        self.entries.contains_key(&leaf)
    }

    /// Number of fetches issued so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn fetches_once_and_decodes() {
        let calls = Cell::new(0);
        let fetch = |leaf: usize| -> Result<String, FetchError> {
            calls.set(calls.get() + 1);
            Ok(format!("leaf {leaf}<br>\nsecond line  "))
        };
        let mut cache = LeafCache::new();
        assert_eq!(cache.get_or_fetch(2, &fetch).unwrap(), "leaf 2\nsecond line");
        assert_eq!(cache.get_or_fetch(2, &fetch).unwrap(), "leaf 2\nsecond line");
        assert_eq!(calls.get(), 1);
        assert_eq!(cache.fetch_count(), 1);
        assert!(cache.contains(2));
    }

    #[test]
    fn failure_is_not_cached() {
        let fail =
            |leaf: usize| -> Result<String, FetchError> { Err(FetchError::UnknownLeaf(leaf)) };
        let mut cache = LeafCache::new();
        assert!(cache.get_or_fetch(0, &fail).is_err());
        assert!(!cache.contains(0));
        let ok = |_: usize| -> Result<String, FetchError> { Ok("now".to_string()) };
        assert_eq!(cache.get_or_fetch(0, &ok).unwrap(), "now");
    }
}
