//! Transcription session.
//!
//! `Transcriber` owns every component for one editor instance: the text
//! buffer, the virtual keyboard composer, the autosave guard, the leaf cache,
//! the navigator and the transliteration panel. Hosts feed it discrete
//! events (native edits, virtual key presses, pointer taps, timer ticks,
//! leaf switches) and read its state back to render.
//!
//! All events are handled on one logical thread. Work that completes later
//! (the recovery check, leaf fetches) is tied to a `DocToken` and dropped if
//! the document changed in the meantime.

use crate::autosave::{GuardState, PersistenceGuard, RecoveryOutcome, RecoveryPrompt, TextSlot};
use crate::caret::{self, Fragment, SurfaceHit};
use crate::composition::{Composer, Composition, Emission};
use crate::error::{FetchError, SetLeafError};
use crate::identity::{DocToken, DocumentIdentity};
use crate::layout::Layout;
use crate::leaf_cache::{ContentFetch, LeafCache};
use crate::markup;
use crate::navigation::{decode_key, KeyCommand, KeyDown, LeafMedia, LeafTicket, Navigator};
use crate::script::{Platform, Preferences, ScriptProfile};
use crate::store::LocalStore;
use crate::text_buffer::{BufferChange, TextBuffer};
use crate::transliteration::{TransliterationPanel, Transliterator};
use crate::Config;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Whether the editor transcribes (edit) or only displays leaves (view).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Edit,
    View,
}

/// Collects what a `Transcriber` needs before it can be built.
#[derive(Debug, Clone)]
pub struct TranscriberBuilder {
    identity: DocumentIdentity,
    mode: Mode,
    leaf_count: usize,
    profile: ScriptProfile,
    layout: Option<Arc<Layout>>,
    platform: Platform,
    store: LocalStore,
    config: Config,
}

impl TranscriberBuilder {
    pub fn new(identity: DocumentIdentity, mode: Mode, profile: ScriptProfile) -> Self {
        Self {
            identity,
            mode,
            leaf_count: 1,
            profile,
            layout: None,
            platform: Platform::default(),
            store: LocalStore::new_in_memory(),
            config: Config::default(),
        }
    }

    pub fn leaf_count(mut self, count: usize) -> Self {
        self.leaf_count = count;
        self
    }

    pub fn layout(mut self, layout: Arc<Layout>) -> Self {
        self.layout = Some(layout);
        self
    }

    pub fn platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn store(mut self, store: LocalStore) -> Self {
        self.store = store;
        self
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Transcriber {
        let prefs = Preferences::new(self.store.clone(), &self.profile.script);
        let font = prefs.font(&self.profile);
        // The virtual keyboard only exists in edit mode and only with a layout.
        let composer = match (self.mode, self.layout) {
            (Mode::Edit, Some(layout)) => Some(Composer::new(layout)),
            _ => None,
        };
        let keyboard_open =
            composer.is_some() && prefs.keyboard_open(self.config.keyboard_open_by_default);
        let nav = Navigator::new(self.identity.leaf, self.leaf_count);
        let identity = self.identity.with_leaf(nav.leaf());
        let media = self
            .config
            .media
            .media_for(&identity.item, &identity.file, identity.leaf);
        let guard = PersistenceGuard::new(self.store, self.config.recovery_delay());
        let variant = self.profile.default_variant.clone();
        let token = DocToken {
            identity: identity.clone(),
            generation: nav.generation(),
        };

        Transcriber {
            mode: self.mode,
            identity,
            token,
            platform: self.platform,
            profile: self.profile,
            config: self.config,
            buffer: TextBuffer::new(),
            composer,
            guard,
            cache: LeafCache::new(),
            nav,
            panel: TransliterationPanel::new(),
            prefs,
            media,
            open: false,
            loaded: false,
            keyboard_open,
            font,
            variant,
        }
    }
}

/// One open editor.
#[derive(Debug)]
pub struct Transcriber {
    mode: Mode,
    identity: DocumentIdentity,
    token: DocToken,
    platform: Platform,
    profile: ScriptProfile,
    config: Config,
    buffer: TextBuffer,
    composer: Option<Composer>,
    guard: PersistenceGuard,
    cache: LeafCache,
    nav: Navigator,
    panel: TransliterationPanel,
    prefs: Preferences,
    media: LeafMedia,
    open: bool,
    loaded: bool,
    keyboard_open: bool,
    font: String,
    variant: String,
}

impl Transcriber {
    // ========== Accessors ==========

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn identity(&self) -> &DocumentIdentity {
        &self.identity
    }

    pub fn text(&self) -> &str {
        self.buffer.text()
    }

    pub fn caret(&self) -> usize {
        self.buffer.caret()
    }

    pub fn buffer(&self) -> &TextBuffer {
        &self.buffer
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn profile(&self) -> &ScriptProfile {
        &self.profile
    }

    pub fn font(&self) -> &str {
        &self.font
    }

    pub fn variant(&self) -> &str {
        &self.variant
    }

    pub fn media(&self) -> &LeafMedia {
        &self.media
    }

    pub fn transliteration(&self) -> &TransliterationPanel {
        &self.panel
    }

    pub fn guard_state(&self) -> GuardState {
        self.guard.state()
    }

    pub fn recovery_due_at(&self) -> Option<Instant> {
        self.guard.recovery_due_at()
    }

    pub fn navigator(&self) -> &Navigator {
        &self.nav
    }

    pub fn can_go_prev(&self) -> bool {
        self.nav.can_go_prev()
    }

    pub fn can_go_next(&self) -> bool {
        self.nav.can_go_next()
    }

    pub fn keyboard_available(&self) -> bool {
        self.composer.is_some()
    }

    pub fn keyboard_open(&self) -> bool {
        self.keyboard_open
    }

    /// Whether the text surface is emulated (caret marker, pointer taps).
    pub fn emulate_text_edit(&self) -> bool {
        self.platform.emulates_text_edit(self.keyboard_open)
    }

    /// Dead keys currently pending on the virtual keyboard.
    pub fn composition(&self) -> Composition {
        self.composer
            .as_ref()
            .map(|c| c.state().clone())
            .unwrap_or_default()
    }

    /// Fragments for the emulated text surface.
    pub fn rendered(&self) -> Vec<Fragment> {
        caret::split_render(&self.buffer)
    }

    // ========== Open / close ==========

    /// Open in edit mode with the host field's current text.
    pub fn open_from_host(&mut self, slot: &dyn TextSlot, now: Instant) {
        let text = markup::decode(&slot.read());
        self.finalize_open(&text, now);
    }

    /// Open in view mode, fetching the current leaf the first time.
    pub fn open_from_fetch(
        &mut self,
        fetch: &dyn ContentFetch,
        now: Instant,
    ) -> Result<(), FetchError> {
        let text = if self.loaded {
            self.buffer.text().to_string()
        } else {
            self.cache.get_or_fetch(self.identity.leaf, fetch)?
        };
        self.finalize_open(&text, now);
        Ok(())
    }

    fn finalize_open(&mut self, text: &str, now: Instant) {
        self.buffer.replace(text);
        self.loaded = true;
        self.open = true;
        self.token = DocToken {
            identity: self.identity.clone(),
            generation: self.nav.bump_generation(),
        };
        self.guard
            .begin_document(self.token.clone(), self.buffer.text(), now);
        info!(document = %self.identity, chars = self.buffer.len(), "document opened");
    }

    /// Close the editor. In edit mode the buffer is written to `slot` and
    /// the autosave record cleared.
    pub fn close(&mut self, slot: Option<&mut dyn TextSlot>) {
        self.open = false;
        self.nav.cancel();
        self.guard.cancel_recovery();
        if let Some(c) = self.composer.as_mut() {
            c.reset();
        }
        if self.mode == Mode::Edit {
            if let Some(slot) = slot {
                self.guard
                    .flush_on_close(&self.identity, self.buffer.text(), slot);
            }
        }
        info!(document = %self.identity, "document closed");
    }

    // ========== Input sources ==========

    /// Text and caret reported by the native edit surface.
    pub fn native_edit(&mut self, text: &str, caret: usize) -> BufferChange {
        let change = self.buffer.set_text_and_caret(text, caret);
        self.after_change(change);
        change
    }

    /// Native selection moved without a text change.
    pub fn native_select(&mut self, caret: usize) -> BufferChange {
        self.buffer.set_caret_only(caret)
    }

    /// A virtual keyboard key was pressed.
    pub fn press_key(&mut self, key: &str) -> BufferChange {
        if !self.keyboard_open {
            return BufferChange::None;
        }
        let Some(composer) = self.composer.as_mut() else {
            return BufferChange::None;
        };
        let change = match composer.press(key) {
            Emission::Insert(text) => self.buffer.insert_at_caret(&text),
            Emission::Backspace => self.buffer.delete_before_caret(),
            Emission::Nothing => BufferChange::None,
        };
        self.after_change(change);
        change
    }

    /// A pointer tap on the emulated surface; ignored unless emulating.
    pub fn pointer_tap(&mut self, fragments: &[Fragment], hit: SurfaceHit) -> BufferChange {
        if !self.emulate_text_edit() {
            return BufferChange::None;
        }
        match caret::caret_from_hit(fragments, hit) {
            Some(caret) => self.buffer.set_caret_only(caret),
            None => BufferChange::None,
        }
    }

    /// Decode a hardware key press for the host to act on.
    pub fn key_command(&self, key: &KeyDown) -> KeyCommand {
        decode_key(key, self.mode == Mode::Edit, &self.nav)
    }

    fn after_change(&mut self, change: BufferChange) {
        if change.text_changed() {
            self.guard
                .record_text(&self.identity, self.buffer.text(), self.buffer.caret());
        }
    }

    // ========== Timers ==========

    /// Run timer work that is due: the recovery check.
    pub fn tick(&mut self, now: Instant, prompt: &mut dyn RecoveryPrompt) -> RecoveryOutcome {
        let outcome = self.guard.poll_recovery(now, &self.token, prompt);
        if let RecoveryOutcome::Restored(text) = &outcome {
            let caret = text.chars().count();
            self.buffer.set_text_and_caret(text.as_str(), caret);
        }
        outcome
    }

    // ========== Navigation ==========

    /// Switch to `leaf`, fetching its content through the cache.
    ///
    /// In edit mode the buffer is replaced without writing back to the host
    /// field. Unsaved edits of the leaf being left stay in its autosave
    /// record and are offered again the next time that leaf is opened.
    pub fn set_leaf(
        &mut self,
        leaf: usize,
        fetch: &dyn ContentFetch,
        now: Instant,
    ) -> Result<(), SetLeafError> {
        let ticket = self.begin_set_leaf(leaf)?;
        match self.cache.get_or_fetch(leaf, fetch) {
            Ok(text) => self.apply_leaf(ticket, &text, now),
            Err(e) => {
                self.nav.abort(&ticket);
                Err(e.into())
            }
        }
    }

    /// First half of a leaf switch whose fetch runs elsewhere.
    ///
    /// If the content is already cached the host can finish right away
    /// with `finish_cached_leaf`.
    pub fn begin_set_leaf(&mut self, leaf: usize) -> Result<LeafTicket, SetLeafError> {
        let ticket = self.nav.begin(leaf)?;
        debug!(from = self.identity.leaf, to = leaf, "leaf switch started");
        Ok(ticket)
    }

    pub fn is_leaf_cached(&self, leaf: usize) -> bool {
        self.cache.contains(leaf)
    }

    /// Second half of a leaf switch: `fetched` is the raw host markup.
    pub fn finish_set_leaf(
        &mut self,
        ticket: LeafTicket,
        fetched: Result<String, FetchError>,
        now: Instant,
    ) -> Result<(), SetLeafError> {
        if self.nav.in_flight() != Some(&ticket) {
            return Err(crate::error::NavError::Stale.into());
        }
        match fetched {
            Ok(raw) => {
                let text = markup::decode(&raw);
                self.cache.insert_decoded(ticket.leaf, text.clone());
                self.apply_leaf(ticket, &text, now)
            }
            Err(e) => {
                self.nav.abort(&ticket);
                Err(e.into())
            }
        }
    }

    /// Second half of a leaf switch for a leaf already in the cache.
    pub fn finish_cached_leaf(
        &mut self,
        ticket: LeafTicket,
        now: Instant,
    ) -> Result<(), SetLeafError> {
        let Some(text) = self.cache.get(ticket.leaf).map(str::to_string) else {
            self.nav.abort(&ticket);
            return Err(FetchError::UnknownLeaf(ticket.leaf).into());
        };
        self.apply_leaf(ticket, &text, now)
    }

    fn apply_leaf(
        &mut self,
        ticket: LeafTicket,
        text: &str,
        now: Instant,
    ) -> Result<(), SetLeafError> {
        self.nav.finish(&ticket)?;
        self.identity = self.identity.with_leaf(ticket.leaf);
        self.media = self
            .config
            .media
            .media_for(&self.identity.item, &self.identity.file, ticket.leaf);
        self.buffer.replace(text);
        self.loaded = true;
        self.panel.close();
        if let Some(c) = self.composer.as_mut() {
            c.reset();
        }
        self.token = DocToken {
            identity: self.identity.clone(),
            generation: ticket.generation,
        };
        self.guard
            .begin_document(self.token.clone(), self.buffer.text(), now);
        info!(document = %self.identity, "leaf switched");
        Ok(())
    }

    // ========== Keyboard, font, transliteration ==========

    /// Show or hide the virtual keyboard.
    ///
    /// `native_caret` is the native surface's caret, adopted when the
    /// keyboard opens on a non-emulated surface.
    pub fn toggle_keyboard(&mut self, native_caret: Option<usize>) {
        let Some(composer) = self.composer.as_mut() else {
            return;
        };
        self.keyboard_open = !self.keyboard_open;
        if !self.keyboard_open {
            composer.reset();
        }
        if self.keyboard_open && !self.emulate_text_edit() {
            if let Some(caret) = native_caret {
                self.buffer.set_caret_only(caret);
            }
        }
        self.prefs.set_keyboard_open(self.keyboard_open);
    }

    /// Returns false if the font is not offered for this script or already set.
    pub fn set_font(&mut self, font: &str) -> bool {
        if self.font == font || !self.profile.has_font(font) {
            return false;
        }
        self.font = font.to_string();
        self.prefs.set_font(font);
        true
    }

    pub fn set_transliteration_open(&mut self, open: bool, service: &dyn Transliterator) -> bool {
        self.panel.set_open(
            open,
            self.buffer.text(),
            &self.profile.script,
            &self.variant,
            service,
        )
    }

    /// Change the transliteration variant; an open panel is refreshed.
    pub fn set_variant(&mut self, variant: &str, service: &dyn Transliterator) -> bool {
        if !self.profile.has_variant(variant) || self.variant == variant {
            return false;
        }
        self.variant = variant.to_string();
        if self.panel.is_open() {
            self.set_transliteration_open(true, service);
        }
        true
    }
}
