//! Virtual keyboard key composition.
//!
//! Composition turns a stream of virtual key presses into emitted text. Dead
//! keys (modifiers) stay pending until a following key resolves them, either
//! into a combined character or by flushing their standalone output.
//! `compose` is a pure function of (layout, pending state, key); it never
//! looks at the transcription buffer. `Composer` wraps it with the state of
//! one open keyboard.

use crate::layout::{KeyRule, Layout, MAX_PENDING};
use std::sync::Arc;

/// Pending dead keys, in the order they were pressed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Composition {
    pending: Vec<String>,
}

impl Composition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn pending(&self) -> &[String] {
        &self.pending
    }

    fn with(&self, key: &str) -> Self {
        let mut pending = self.pending.clone();
        pending.push(key.to_string());
        Self { pending }
    }

    fn sorted(&self) -> Vec<String> {
        let mut s = self.pending.clone();
        s.sort();
        s
    }
}

/// What a key press asks the buffer to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Emission {
    Nothing,
    Insert(String),
    Backspace,
}

/// Resolve `key` against `layout` given the `pending` dead keys.
pub fn compose(layout: &Layout, pending: &Composition, key: &str) -> (Emission, Composition) {
    let Some(rule) = layout.rule(key) else {
        return (Emission::Nothing, pending.clone());
    };

    if !pending.is_empty() {
        if let Some(out) = layout.combination(&pending.sorted(), key) {
            return (insert(out.to_string()), Composition::new());
        }
        match rule {
            KeyRule::Dead(_) if pending.pending.len() < MAX_PENDING => {
                let next = pending.with(key);
                if layout.starts_combination(&next.sorted()) {
                    return (Emission::Nothing, next);
                }
            }
            // Backspace drops an unresolved composition instead of the buffer text.
            KeyRule::Backspace => return (Emission::Nothing, Composition::new()),
            _ => {}
        }
    }

    let mut text = flush(layout, pending);
    let next = match rule {
        KeyRule::Emit(out) => {
            text.push_str(out);
            Composition::new()
        }
        KeyRule::Dead(out) => {
            let single = Composition::new().with(key);
            if layout.starts_combination(single.pending()) {
                single
            } else {
                text.push_str(out);
                Composition::new()
            }
        }
        KeyRule::Backspace => return (Emission::Backspace, Composition::new()),
    };
    (insert(text), next)
}

fn flush(layout: &Layout, pending: &Composition) -> String {
    pending
        .pending
        .iter()
        .filter_map(|k| match layout.rule(k) {
            Some(KeyRule::Dead(out)) => Some(out.as_str()),
            _ => None,
        })
        .collect()
}

fn insert(text: String) -> Emission {
    if text.is_empty() {
        Emission::Nothing
    } else {
        Emission::Insert(text)
    }
}

/// Composition state of one open virtual keyboard.
#[derive(Debug, Clone)]
pub struct Composer {
    layout: Arc<Layout>,
    state: Composition,
}

impl Composer {
    pub fn new(layout: Arc<Layout>) -> Self {
        Self {
            layout,
            state: Composition::new(),
        }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn state(&self) -> &Composition {
        &self.state
    }

    /// Feed one key press.
    pub fn press(&mut self, key: &str) -> Emission {
        let (emission, next) = compose(&self.layout, &self.state, key);
        tracing::trace!(key, ?emission, pending = ?next.pending(), "key composed");
        self.state = next;
        emission
    }

    /// Drop any pending dead keys.
    pub fn reset(&mut self) {
        self.state = Composition::new();
    }
}
