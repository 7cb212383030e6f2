//! Leaf navigation.
//!
//! The navigator tracks the current leaf and serializes leaf switches: a
//! switch is started with `begin`, which hands out a `LeafTicket`, and
//! completed with `finish`. While one switch is in flight a second `begin`
//! is refused, and a ticket whose switch was cancelled is rejected, so a
//! slow fetch can never install content under the wrong identity.
//!
//! Also here: the per-leaf image metadata and the hardware key decoding
//! used for arrow-key navigation.

use crate::error::NavError;
use serde::{Deserialize, Serialize};

/// Proof that a leaf switch was started; needed to finish it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafTicket {
    pub leaf: usize,
    pub generation: u64,
}

#[derive(Debug, Clone)]
pub struct Navigator {
    leaf: usize,
    leaf_count: usize,
    generation: u64,
    in_flight: Option<LeafTicket>,
}

impl Navigator {
    /// `leaf_count` of zero is treated as a single-leaf document.
    pub fn new(leaf: usize, leaf_count: usize) -> Self {
        let leaf_count = leaf_count.max(1);
        Self {
            leaf: leaf.min(leaf_count - 1),
            leaf_count,
            generation: 0,
            in_flight: None,
        }
    }

    pub fn leaf(&self) -> usize {
        self.leaf
    }

    pub fn last_leaf(&self) -> usize {
        self.leaf_count - 1
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn can_go_prev(&self) -> bool {
        self.leaf > 0
    }

    pub fn can_go_next(&self) -> bool {
        self.leaf < self.last_leaf()
    }

    pub fn in_flight(&self) -> Option<&LeafTicket> {
        self.in_flight.as_ref()
    }

    /// Start a new open of the current leaf; invalidates older tokens.
    pub fn bump_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// Start switching to `leaf`.
    pub fn begin(&mut self, leaf: usize) -> Result<LeafTicket, NavError> {
        if leaf >= self.leaf_count {
            return Err(NavError::OutOfRange {
                index: leaf,
                last: self.last_leaf(),
            });
        }
        if let Some(pending) = &self.in_flight {
            return Err(NavError::Busy {
                pending: pending.leaf,
            });
        }
        let ticket = LeafTicket {
            leaf,
            generation: self.bump_generation(),
        };
        self.in_flight = Some(ticket.clone());
        Ok(ticket)
    }

    /// Complete the switch started with `ticket`.
    pub fn finish(&mut self, ticket: &LeafTicket) -> Result<(), NavError> {
        if self.in_flight.as_ref() != Some(ticket) {
            return Err(NavError::Stale);
        }
        self.in_flight = None;
        self.leaf = ticket.leaf;
        Ok(())
    }

    /// Give up on the switch started with `ticket` (e.g. its fetch failed).
    pub fn abort(&mut self, ticket: &LeafTicket) {
        if self.in_flight.as_ref() == Some(ticket) {
            self.in_flight = None;
        }
    }

    /// Drop whatever switch is in flight.
    pub fn cancel(&mut self) {
        self.in_flight = None;
    }
}

/// Image dimensions known for the document's leaves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageDimensions {
    /// Every leaf has the same size.
    All([u32; 2]),
    PerPage(Vec<[u32; 2]>),
}

/// Where leaf images come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaSource {
    /// Commons file name for thumbnail URLs.
    pub commons_file: Option<String>,
    pub thumb_url: String,
    pub thumb_width: u32,
    pub iiif_base_url: Option<String>,
    pub dimensions: Option<ImageDimensions>,
}

impl Default for MediaSource {
    fn default() -> Self {
        Self {
            commons_file: None,
            thumb_url: "https://commons.wikimedia.org/w/thumb.php".to_string(),
            thumb_width: 1024,
            iiif_base_url: None,
            dimensions: None,
        }
    }
}

/// Image reference and layout metadata for one leaf.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LeafMedia {
    pub image_url: Option<String>,
    pub iiif_url: Option<String>,
    pub dimensions: Option<[u32; 2]>,
}

impl MediaSource {
    pub fn media_for(&self, item: &str, file: &str, leaf: usize) -> LeafMedia {
        let image_url = self.commons_file.as_ref().map(|f| {
            format!(
                "{}?f={}&p={}&w={}",
                self.thumb_url,
                urlencoding::encode(f),
                leaf + 1,
                self.thumb_width
            )
        });
        let iiif_url = self
            .iiif_base_url
            .as_ref()
            .map(|base| format!("{base}/{item}:{file}%24{leaf}"));
        let dimensions = match &self.dimensions {
            Some(ImageDimensions::All(d)) => Some(*d),
            Some(ImageDimensions::PerPage(pages)) => pages.get(leaf).copied(),
            None => None,
        };
        LeafMedia {
            image_url,
            iiif_url,
            dimensions,
        }
    }
}

/// A hardware key press as reported by the host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyDown {
    pub key: String,
    pub alt: bool,
    pub ctrl: bool,
    pub meta: bool,
    pub shift: bool,
}

impl KeyDown {
    pub fn plain(key: &str) -> Self {
        Self {
            key: key.to_string(),
            ..Self::default()
        }
    }

    fn has_modifier(&self) -> bool {
        self.alt || self.ctrl || self.meta || self.shift
    }
}

/// What a hardware key press means to the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCommand {
    Close,
    PrevLeaf,
    NextLeaf,
    /// Edit mode: give the native text surface focus.
    FocusText,
    Ignore,
}

/// Decode a key press. Arrow navigation only applies in view mode, without
/// modifiers, and never wraps past either end.
pub fn decode_key(key: &KeyDown, edit_mode: bool, nav: &Navigator) -> KeyCommand {
    if key.key == "Escape" && !key.has_modifier() {
        return KeyCommand::Close;
    }
    if edit_mode {
        return KeyCommand::FocusText;
    }
    if key.has_modifier() {
        return KeyCommand::Ignore;
    }
    match key.key.as_str() {
        "ArrowLeft" if nav.can_go_prev() => KeyCommand::PrevLeaf,
        "ArrowRight" if nav.can_go_next() => KeyCommand::NextLeaf,
        _ => KeyCommand::Ignore,
    }
}
