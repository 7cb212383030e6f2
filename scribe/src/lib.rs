//! leafscribe
//!
//! Host side of the transcription editor: built-in script data (the Balinese
//! keyboard and font list), a MediaWiki client that supplies leaf content and
//! transliteration, and the host configuration.
//!
//! The editor itself lives in `leafscribe-core`.

pub mod config;
pub use config::ScribeConfig;

pub mod mediawiki;
pub use mediawiki::MediaWikiApi;

pub mod scripts;
pub use scripts::{layout_for, profile_for};

use leafscribe_core::{DocumentIdentity, LocalStore, Mode, Platform, TranscriberBuilder};

/// Open the configured store, falling back to memory if none is set.
pub fn open_store(config: &ScribeConfig) -> anyhow::Result<LocalStore> {
    match &config.store_path {
        Some(path) => Ok(LocalStore::new_redb(path)?),
        None => Ok(LocalStore::new_in_memory()),
    }
}

/// Builder for an editor on `identity` with this host's script data.
pub fn editor_builder(
    config: &ScribeConfig,
    identity: DocumentIdentity,
    mode: Mode,
    script: &str,
    store: LocalStore,
) -> TranscriberBuilder {
    let builder = TranscriberBuilder::new(identity, mode, profile_for(script))
        .platform(Platform::desktop())
        .store(store)
        .config(config.editor_config());
    match layout_for(script) {
        Some(layout) => builder.layout(layout),
        None => builder,
    }
}
