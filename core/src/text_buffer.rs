//! Transcription text with caret tracking.
//!
//! The buffer is the single authority for the text of the open leaf. Every
//! input source (native edit surface, virtual keyboard, pointer taps) goes
//! through one of the mutation methods here, and each one reports whether it
//! moved the caret, changed the text, or did nothing, so observers such as
//! the autosave guard can tell text motion apart from caret motion.
//!
//! Offsets are counted in Unicode scalar values, not bytes.

/// What a mutation actually changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferChange {
    /// Neither text nor caret changed.
    None,
    /// Only the caret moved.
    Caret,
    /// The text changed (the caret may have moved too).
    Text,
}

impl BufferChange {
    pub fn text_changed(self) -> bool {
        self == BufferChange::Text
    }
}

/// Text buffer with a single caret.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TextBuffer {
    text: String,
    caret: usize, // char offset, always <= char count
}

impl TextBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a buffer holding `text` with the caret at the end.
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        let caret = text.chars().count();
        Self { text, caret }
    }

    /// Get the text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Get the caret offset (in chars).
    pub fn caret(&self) -> usize {
        self.caret
    }

    /// Length in chars.
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Text before the caret.
    pub fn before_caret(&self) -> &str {
        &self.text[..self.byte_offset(self.caret)]
    }

    /// Text from the caret to the end.
    pub fn after_caret(&self) -> &str {
        &self.text[self.byte_offset(self.caret)..]
    }

    /// Replace text and caret in one step (native edit surface).
    ///
    /// The caret is clamped to the new text.
    pub fn set_text_and_caret(&mut self, text: impl Into<String>, caret: usize) -> BufferChange {
        let text = text.into();
        let caret = caret.min(text.chars().count());
        if text != self.text {
            self.text = text;
            self.caret = caret;
            BufferChange::Text
        } else if caret != self.caret {
            self.caret = caret;
            BufferChange::Caret
        } else {
            BufferChange::None
        }
    }

    /// Move the caret without touching the text.
    pub fn set_caret_only(&mut self, caret: usize) -> BufferChange {
        let caret = caret.min(self.len());
        if caret == self.caret {
            BufferChange::None
        } else {
            self.caret = caret;
            BufferChange::Caret
        }
    }

    /// Splice `fragment` in at the caret.
    ///
    /// Everything after the caret is cut off, the fragment appended, and the
    /// cut suffix reattached; the caret lands right after the fragment.
    pub fn insert_at_caret(&mut self, fragment: &str) -> BufferChange {
        if fragment.is_empty() {
            return BufferChange::None;
        }
        let at = self.byte_offset(self.caret);
        let suffix = self.text.split_off(at);
        self.text.push_str(fragment);
        self.text.push_str(&suffix);
        self.caret += fragment.chars().count();
        BufferChange::Text
    }

    /// Delete the char before the caret (backspace).
    pub fn delete_before_caret(&mut self) -> BufferChange {
        if self.caret == 0 {
            return BufferChange::None;
        }
        let at = self.byte_offset(self.caret - 1);
        self.text.remove(at);
        self.caret -= 1;
        BufferChange::Text
    }

    /// Replace the whole buffer with trimmed `text`, caret at the end.
    ///
    /// Used whenever a document is opened or switched.
    pub fn replace(&mut self, text: &str) -> BufferChange {
        let trimmed = text.trim();
        let caret = trimmed.chars().count();
        self.set_text_and_caret(trimmed, caret)
    }

    /// Clear text and caret.
    pub fn clear(&mut self) {
        self.text.clear();
        self.caret = 0;
    }

    fn byte_offset(&self, chars: usize) -> usize {
        self.text
            .char_indices()
            .nth(chars)
            .map(|(b, _)| b)
            .unwrap_or(self.text.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_text_puts_caret_at_end() {
        let b = TextBuffer::from_text("ᬳᬦ");
        assert_eq!(b.caret(), 2);
        assert_eq!(b.len(), 2);
    }

    #[test]
    fn set_text_and_caret_clamps() {
        let mut b = TextBuffer::new();
        assert_eq!(b.set_text_and_caret("abc", 10), BufferChange::Text);
        assert_eq!(b.caret(), 3);
    }

    #[test]
    fn set_text_and_caret_distinguishes_caret_motion() {
        let mut b = TextBuffer::from_text("abc");
        assert_eq!(b.set_text_and_caret("abc", 1), BufferChange::Caret);
        assert_eq!(b.set_text_and_caret("abc", 1), BufferChange::None);
        assert_eq!(b.set_text_and_caret("abd", 1), BufferChange::Text);
    }

    #[test]
    fn caret_only_never_changes_text() {
        let mut b = TextBuffer::from_text("hello");
        assert_eq!(b.set_caret_only(2), BufferChange::Caret);
        assert_eq!(b.text(), "hello");
        assert_eq!(b.set_caret_only(99), BufferChange::Caret);
        assert_eq!(b.caret(), 5);
        assert_eq!(b.set_caret_only(5), BufferChange::None);
    }

    #[test]
    fn insert_mid_string_keeps_suffix_after_fragment() {
        let mut b = TextBuffer::from_text("Foo\nBar");
        b.set_caret_only(3);
        assert_eq!(b.insert_at_caret("X"), BufferChange::Text);
        assert_eq!(b.text(), "FooX\nBar");
        assert_eq!(b.caret(), 4);
    }

    #[test]
    fn insert_length_and_caret_arithmetic() {
        let base = "ᬓᬸᬮ abc";
        for c in 0..=base.chars().count() {
            let mut b = TextBuffer::from_text(base);
            b.set_caret_only(c);
            b.insert_at_caret("ᬦᬶ");
            assert_eq!(b.len(), base.chars().count() + 2);
            assert_eq!(b.caret(), c + 2);
            let expected: String = base
                .chars()
                .take(c)
                .chain("ᬦᬶ".chars())
                .chain(base.chars().skip(c))
                .collect();
            assert_eq!(b.text(), expected);
        }
    }

    #[test]
    fn empty_insert_is_noop() {
        let mut b = TextBuffer::from_text("a");
        assert_eq!(b.insert_at_caret(""), BufferChange::None);
    }

    #[test]
    fn backspace_at_start_is_noop() {
        let mut b = TextBuffer::from_text("ab");
        b.set_caret_only(0);
        assert_eq!(b.delete_before_caret(), BufferChange::None);
        b.set_caret_only(2);
        assert_eq!(b.delete_before_caret(), BufferChange::Text);
        assert_eq!(b.text(), "a");
        assert_eq!(b.caret(), 1);
    }

    #[test]
    fn replace_trims_and_moves_caret_to_end() {
        let mut b = TextBuffer::from_text("old");
        b.replace("  new text \n");
        assert_eq!(b.text(), "new text");
        assert_eq!(b.caret(), 8);
    }

    #[test]
    fn before_and_after_caret_split() {
        let mut b = TextBuffer::from_text("ᬅᬓᬲ");
        b.set_caret_only(1);
        assert_eq!(b.before_caret(), "ᬅ");
        assert_eq!(b.after_caret(), "ᬓᬲ");
    }
}
