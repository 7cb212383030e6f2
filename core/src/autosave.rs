//! Autosave and crash recovery.
//!
//! Every text change of the open document is written to the local store
//! under the document's identity. The record is removed only when the editor
//! closes cleanly (after the text has been handed to the host field) or when
//! a recovery offer has been answered. If the editor is torn down any other
//! way the record survives, and the next open of the same document offers
//! to restore it.
//!
//! The recovery check runs once per open, after a short delay, and is bound
//! to a `DocToken` so that a check scheduled for a document the user already
//! left is dropped instead of applied.

use crate::identity::{DocToken, DocumentIdentity};
use crate::markup;
use crate::store::LocalStore;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// The stored shape of unsaved work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutosaveRecord {
    pub text: String,
    #[serde(default)]
    pub caret: usize,
}

impl AutosaveRecord {
    /// Parse a stored value.
    ///
    /// Bare text (older records) is accepted as the text; JSON of any other
    /// shape is treated as no record at all.
    pub fn parse(raw: &str) -> Option<Self> {
        if let Ok(record) = serde_json::from_str::<AutosaveRecord>(raw) {
            return Some(record);
        }
        if serde_json::from_str::<serde_json::Value>(raw).is_ok() {
            tracing::warn!("ignoring autosave record with unexpected shape");
            return None;
        }
        let caret = raw.chars().count();
        Some(Self {
            text: raw.to_string(),
            caret,
        })
    }

    fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Asks the user whether interrupted work should be restored.
pub trait RecoveryPrompt {
    fn confirm_restore(&mut self, saved: &str, loaded: &str) -> bool;
}

impl<F: FnMut(&str, &str) -> bool> RecoveryPrompt for F {
    fn confirm_restore(&mut self, saved: &str, loaded: &str) -> bool {
        self(saved, loaded)
    }
}

/// The host's text field: read once at open, written once at close.
pub trait TextSlot {
    fn read(&self) -> String;
    fn write(&mut self, value: &str);
}

impl TextSlot for String {
    fn read(&self) -> String {
        self.clone()
    }

    fn write(&mut self, value: &str) {
        self.clear();
        self.push_str(value);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    Clean,
    /// Unsaved edits exist for the current document.
    Dirty,
    /// A document was just opened and its recovery check has not run yet.
    RecoveryPending,
}

/// Result of polling the recovery timer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryOutcome {
    /// No check scheduled, or its deadline has not passed.
    NotDue,
    /// The check belonged to a document that is no longer open; dropped.
    Stale,
    NothingStored,
    /// A record existed but matched the loaded text.
    Unchanged,
    Declined,
    /// The user accepted; the caller must put this text in the buffer.
    Restored(String),
}

#[derive(Debug, Clone)]
struct PendingCheck {
    token: DocToken,
    due: Instant,
    saved: Option<AutosaveRecord>,
    loaded: String,
}

/// Debounced autosave plus the once-per-open recovery check.
#[derive(Debug, Clone)]
pub struct PersistenceGuard {
    store: LocalStore,
    delay: Duration,
    dirty: bool,
    last_written: Option<AutosaveRecord>,
    check: Option<PendingCheck>,
}

impl PersistenceGuard {
    pub fn new(store: LocalStore, delay: Duration) -> Self {
        Self {
            store,
            delay,
            dirty: false,
            last_written: None,
            check: None,
        }
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    pub fn state(&self) -> GuardState {
        if self.dirty {
            GuardState::Dirty
        } else if self.check.is_some() {
            GuardState::RecoveryPending
        } else {
            GuardState::Clean
        }
    }

    /// When the pending recovery check becomes due, if one is scheduled.
    pub fn recovery_due_at(&self) -> Option<Instant> {
        self.check.as_ref().map(|c| c.due)
    }

    /// Persist the buffer after a text change. Caret-only motion must not call this.
    pub fn record_text(&mut self, identity: &DocumentIdentity, text: &str, caret: usize) {
        let record = AutosaveRecord {
            text: text.to_string(),
            caret,
        };
        self.store
            .set_logged(&identity.storage_key(), &record.to_json());
        self.last_written = Some(record);
        self.dirty = true;
    }

    /// Start tracking a freshly opened document and schedule its recovery check.
    ///
    /// The stored record is read now, before any edit of this open can
    /// overwrite it; the user is asked only once the delay has passed.
    pub fn begin_document(&mut self, token: DocToken, loaded: &str, now: Instant) {
        let saved = self
            .store
            .get_or_none(&token.identity.storage_key())
            .and_then(|raw| AutosaveRecord::parse(&raw));
        debug!(
            document = %token.identity,
            generation = token.generation,
            has_record = saved.is_some(),
            "recovery check scheduled"
        );
        self.dirty = false;
        self.last_written = None;
        self.check = Some(PendingCheck {
            token,
            due: now + self.delay,
            saved,
            loaded: loaded.to_string(),
        });
    }

    /// Drop a scheduled check without running it.
    pub fn cancel_recovery(&mut self) {
        self.check = None;
    }

    /// Run the recovery check if it is due.
    pub fn poll_recovery(
        &mut self,
        now: Instant,
        current: &DocToken,
        prompt: &mut dyn RecoveryPrompt,
    ) -> RecoveryOutcome {
        match &self.check {
            Some(check) if check.due <= now => {}
            _ => return RecoveryOutcome::NotDue,
        }
        let Some(check) = self.check.take() else {
            return RecoveryOutcome::NotDue;
        };
        if &check.token != current {
            debug!(document = %check.token.identity, "dropping stale recovery check");
            return RecoveryOutcome::Stale;
        }
        let Some(saved) = check.saved else {
            return RecoveryOutcome::NothingStored;
        };

        let key = current.identity.storage_key();
        let saved_text = saved.text.trim();
        let loaded = check.loaded.trim();
        // An emptied record counts as absent.
        let outcome = if saved_text.is_empty() {
            RecoveryOutcome::NothingStored
        } else if saved_text == loaded {
            RecoveryOutcome::Unchanged
        } else if prompt.confirm_restore(saved_text, loaded) {
            info!(document = %current.identity, "restoring interrupted work");
            RecoveryOutcome::Restored(saved_text.to_string())
        } else {
            info!(document = %current.identity, "interrupted work discarded");
            RecoveryOutcome::Declined
        };

        self.store.remove_logged(&key);
        // Edits made while the check was pending belong to this open; keep them safe.
        if !matches!(outcome, RecoveryOutcome::Restored(_)) {
            if let Some(last) = &self.last_written {
                self.store.set_logged(&key, &last.to_json());
            }
        }
        outcome
    }

    /// Hand the buffer to the host field and clear the autosave record.
    ///
    /// The host field is only written when the encoded text differs from
    /// what it already holds.
    pub fn flush_on_close(
        &mut self,
        identity: &DocumentIdentity,
        text: &str,
        slot: &mut dyn TextSlot,
    ) {
        let encoded = markup::encode(text);
        if encoded != slot.read() {
            slot.write(&encoded);
        }
        self.store.remove_logged(&identity.storage_key());
        self.dirty = false;
        self.last_written = None;
        self.check = None;
        debug!(document = %identity, "buffer flushed to host field");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(leaf: usize, generation: u64) -> DocToken {
        DocToken {
            identity: DocumentIdentity::new("item", "file", leaf),
            generation,
        }
    }

    fn guard() -> PersistenceGuard {
        PersistenceGuard::new(LocalStore::new_in_memory(), Duration::from_secs(1))
    }

    #[test]
    fn record_parse_accepts_json_and_bare_text() {
        assert_eq!(
            AutosaveRecord::parse(r#"{"text":"ab","caret":1}"#),
            Some(AutosaveRecord {
                text: "ab".into(),
                caret: 1
            })
        );
        assert_eq!(
            AutosaveRecord::parse("plain words").map(|r| r.text),
            Some("plain words".into())
        );
        assert_eq!(AutosaveRecord::parse(r#"{"unexpected": true}"#), None);
        assert_eq!(AutosaveRecord::parse("[1,2]"), None);
    }

    #[test]
    fn text_change_writes_record_and_marks_dirty() {
        let mut g = guard();
        let t = token(0, 1);
        g.record_text(&t.identity, "abc", 2);
        assert_eq!(g.state(), GuardState::Dirty);
        let raw = g.store().get("item$file$0").unwrap().unwrap();
        assert_eq!(AutosaveRecord::parse(&raw).unwrap().caret, 2);
    }

    #[test]
    fn check_waits_for_delay() {
        let mut g = guard();
        let t = token(0, 1);
        let now = Instant::now();
        g.begin_document(t.clone(), "x", now);
        assert_eq!(g.state(), GuardState::RecoveryPending);
        let mut never = |_: &str, _: &str| -> bool { panic!("not due yet") };
        assert_eq!(
            g.poll_recovery(now, &t, &mut never),
            RecoveryOutcome::NotDue
        );
    }

    #[test]
    fn differing_record_prompts_and_clears() {
        let mut g = guard();
        g.store().set("item$file$0", "saved work").unwrap();
        let t = token(0, 1);
        let now = Instant::now();
        g.begin_document(t.clone(), "loaded", now);
        let mut asked = 0;
        let mut accept = |saved: &str, loaded: &str| {
            asked += 1;
            assert_eq!(saved, "saved work");
            assert_eq!(loaded, "loaded");
            true
        };
        let out = g.poll_recovery(now + Duration::from_secs(2), &t, &mut accept);
        assert_eq!(out, RecoveryOutcome::Restored("saved work".into()));
        assert_eq!(asked, 1);
        assert_eq!(g.store().get("item$file$0").unwrap(), None);
        assert_eq!(g.state(), GuardState::Clean);
    }

    #[test]
    fn declined_record_is_cleared() {
        let mut g = guard();
        g.store().set("item$file$0", "saved work").unwrap();
        let t = token(0, 1);
        let now = Instant::now();
        g.begin_document(t.clone(), "loaded", now);
        let mut decline = |_: &str, _: &str| false;
        let out = g.poll_recovery(now + Duration::from_secs(1), &t, &mut decline);
        assert_eq!(out, RecoveryOutcome::Declined);
        assert_eq!(g.store().get("item$file$0").unwrap(), None);
    }

    #[test]
    fn whitespace_only_difference_does_not_prompt() {
        let mut g = guard();
        g.store().set("item$file$0", "  same\n").unwrap();
        let t = token(0, 1);
        let now = Instant::now();
        g.begin_document(t.clone(), "same", now);
        let mut never = |_: &str, _: &str| -> bool { panic!("should not prompt") };
        let out = g.poll_recovery(now + Duration::from_secs(1), &t, &mut never);
        assert_eq!(out, RecoveryOutcome::Unchanged);
        assert_eq!(g.store().get("item$file$0").unwrap(), None);
    }

    #[test]
    fn emptied_record_does_not_prompt() {
        let mut g = guard();
        g.store()
            .set("item$file$0", r#"{"text":"  ","caret":0}"#)
            .unwrap();
        let t = token(0, 1);
        let now = Instant::now();
        g.begin_document(t.clone(), "loaded", now);
        let mut never = |_: &str, _: &str| -> bool { panic!("should not prompt") };
        let out = g.poll_recovery(now + Duration::from_secs(1), &t, &mut never);
        assert_eq!(out, RecoveryOutcome::NothingStored);
        assert_eq!(g.store().get("item$file$0").unwrap(), None);
    }

    #[test]
    fn stale_token_is_dropped() {
        let mut g = guard();
        g.store().set("item$file$0", "saved").unwrap();
        let now = Instant::now();
        g.begin_document(token(0, 1), "loaded", now);
        let mut never = |_: &str, _: &str| -> bool { panic!("stale check must not prompt") };
        let out = g.poll_recovery(now + Duration::from_secs(5), &token(0, 2), &mut never);
        assert_eq!(out, RecoveryOutcome::Stale);
        assert_eq!(g.store().get("item$file$0").unwrap().as_deref(), Some("saved"));
    }

    #[test]
    fn edits_during_pending_check_survive_resolution() {
        let mut g = guard();
        g.store().set("item$file$0", "old crash text").unwrap();
        let t = token(0, 1);
        let now = Instant::now();
        g.begin_document(t.clone(), "loaded", now);
        g.record_text(&t.identity, "loaded plus edit", 16);
        let mut decline = |_: &str, _: &str| false;
        g.poll_recovery(now + Duration::from_secs(1), &t, &mut decline);
        let raw = g.store().get("item$file$0").unwrap().unwrap();
        assert_eq!(AutosaveRecord::parse(&raw).unwrap().text, "loaded plus edit");
    }

    #[test]
    fn close_encodes_into_slot_and_clears_record() {
        let mut g = guard();
        let id = DocumentIdentity::new("item", "file", 0);
        g.record_text(&id, "Line1\nLine2", 11);
        let mut host = String::from("Line1<br>\n");
        g.flush_on_close(&id, "Line1\nLine2", &mut host);
        assert_eq!(host, "Line1<br>\nLine2\n");
        assert_eq!(g.store().get("item$file$0").unwrap(), None);
        assert_eq!(g.state(), GuardState::Clean);
    }
}
