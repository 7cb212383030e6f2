//! leafscribe-core
//!
//! Headless core of a transcription editor for palm-leaf manuscripts: the
//! text and caret model, virtual keyboard composition with dead keys,
//! autosave with interrupted-work recovery, leaf navigation with a content
//! cache, and the transliteration panel.
//!
//! Nothing in here talks to the network or draws anything. Hosts supply
//! content fetching and transliteration through the `ContentFetch` and
//! `Transliterator` traits and drive time forward with `Transcriber::tick`.
//!
//! Public API:
//! - `Transcriber` - One open editor, built with `TranscriberBuilder`
//! - `TextBuffer` - Text plus a char-indexed caret
//! - `Layout` / `Composer` - Virtual keyboard and dead-key composition
//! - `PersistenceGuard` - Autosave and recovery
//! - `LocalStore` - Key/value persistence (in-memory or redb)
//! - `Config` - Configuration
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub mod error;
pub use error::{FetchError, LayoutError, NavError, SetLeafError, StoreError};

pub mod text_buffer;
pub use text_buffer::{BufferChange, TextBuffer};

pub mod caret;
pub use caret::{Fragment, SurfaceHit};

pub mod layout;
pub use layout::{KeyRule, Layout, LayoutDef};

pub mod composition;
pub use composition::{Composer, Composition, Emission};

pub mod markup;

pub mod store;
pub use store::{LocalStore, MemoryStore, RedbStore};

pub mod identity;
pub use identity::{DocToken, DocumentIdentity};

pub mod autosave;
pub use autosave::{
    AutosaveRecord, GuardState, PersistenceGuard, RecoveryOutcome, RecoveryPrompt, TextSlot,
};

pub mod leaf_cache;
pub use leaf_cache::{ContentFetch, LeafCache};

pub mod navigation;
pub use navigation::{
    ImageDimensions, KeyCommand, KeyDown, LeafMedia, LeafTicket, MediaSource, Navigator,
};

pub mod transliteration;
pub use transliteration::{TransliterationPanel, Transliterator};

pub mod script;
pub use script::{FontChoice, Platform, Preferences, ScriptProfile};

pub mod session;
pub use session::{Mode, Transcriber, TranscriberBuilder};

/// Editor configuration shared by every host.
///
/// Host-specific settings (service endpoints, storage location) live in the
/// host crate's own config, which embeds this one.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Delay between opening a document and asking about interrupted work.
    /// Default: 1000 ms.
    pub recovery_delay_ms: u64,

    /// Whether the virtual keyboard starts open when no preference is stored.
    pub keyboard_open_by_default: bool,

    /// Leaf image sources.
    pub media: MediaSource,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            recovery_delay_ms: 1000,
            keyboard_open_by_default: true,
            media: MediaSource::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load_toml<P: AsRef<std::path::Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file.
    pub fn save_toml<P: AsRef<std::path::Path>>(&self, path: P) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration from TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Serialize configuration to TOML string.
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    pub fn recovery_delay(&self) -> Duration {
        Duration::from_millis(self.recovery_delay_ms)
    }
}

pub mod utils {
    /// Canonical composition (NFC) without trimming; keyboard output can be
    /// whitespace.
    pub fn nfc(s: &str) -> String {
        use unicode_normalization::UnicodeNormalization;
        s.nfc().collect::<String>()
    }

    /// NFC-normalize and trim.
    pub fn normalize(s: &str) -> String {
        nfc(s).trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_fill_missing_fields() {
        let cfg = Config::from_toml_str("recovery_delay_ms = 250\n").unwrap();
        assert_eq!(cfg.recovery_delay(), Duration::from_millis(250));
        assert!(cfg.keyboard_open_by_default);
        assert_eq!(cfg.media, MediaSource::default());
    }

    #[test]
    fn config_toml_round_trip() {
        let mut cfg = Config::default();
        cfg.keyboard_open_by_default = false;
        cfg.media.commons_file = Some("Lontar.pdf".into());
        cfg.media.dimensions = Some(ImageDimensions::All([800, 200]));
        let text = cfg.to_toml_string().unwrap();
        assert_eq!(Config::from_toml_str(&text).unwrap(), cfg);
    }

    #[test]
    fn nfc_composes_without_trimming() {
        assert_eq!(utils::nfc("e\u{301} "), "\u{e9} ");
        assert_eq!(utils::normalize(" e\u{301} "), "\u{e9}");
    }
}
