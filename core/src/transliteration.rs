//! Transliteration panel.
//!
//! The transliteration is a read-only overlay derived from the buffer; it is
//! never written back. Opening the panel issues one request; opening it again
//! is a no-op unless the target variant changed since the last request.

use crate::error::FetchError;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

/// Remote transliteration service. Returns rendered markup.
pub trait Transliterator {
    fn transliterate(&self, text: &str, script: &str, variant: &str) -> Result<String, FetchError>;
}

static FIRST_PARAGRAPH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<p(?:\s[^>]*)?>(.*?)</p>").expect("valid paragraph pattern"));

/// Inner markup of the first `<p>` element, trimmed.
pub fn first_paragraph(markup: &str) -> Option<String> {
    FIRST_PARAGRAPH
        .captures(markup)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
}

/// State of the transliteration panel of one editor.
#[derive(Debug, Clone, Default)]
pub struct TransliterationPanel {
    open: bool,
    text: String,
    last_request: Option<(String, String)>,
}

impl TransliterationPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// (script, variant) of the last request that was issued.
    pub fn last_request(&self) -> Option<(&str, &str)> {
        self.last_request
            .as_ref()
            .map(|(s, v)| (s.as_str(), v.as_str()))
    }

    /// Close without a request.
    pub fn close(&mut self) {
        self.open = false;
    }

    /// Open or close the panel.
    ///
    /// Returns true if the panel state changed. Opening an already-open panel
    /// re-requests only when `variant` differs from the last request. Empty
    /// text and failed requests leave the panel as it was.
    pub fn set_open(
        &mut self,
        open: bool,
        text: &str,
        script: &str,
        variant: &str,
        service: &dyn Transliterator,
    ) -> bool {
        if !open {
            let changed = self.open;
            self.open = false;
            return changed;
        }
        let variant_changed = self
            .last_request
            .as_ref()
            .map_or(true, |(_, v)| v != variant);
        if self.open && !variant_changed {
            return false;
        }
        self.request(text, script, variant, service)
    }

    /// Issue a request and open the panel with the result.
    pub fn request(
        &mut self,
        text: &str,
        script: &str,
        variant: &str,
        service: &dyn Transliterator,
    ) -> bool {
        if text.trim().is_empty() {
            debug!("nothing to transliterate");
            return false;
        }
        let rendered = match service.transliterate(text, script, variant) {
            Ok(r) => r,
            Err(e) => {
                warn!(script, variant, error = %e, "transliteration failed");
                return false;
            }
        };
        let Some(fragment) = first_paragraph(&rendered) else {
            warn!(script, variant, "transliteration response has no paragraph");
            return false;
        };
        // Recorded only on success.
        self.last_request = Some((script.to_string(), variant.to_string()));
        self.text = fragment;
        self.open = true;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recorder {
        calls: RefCell<Vec<(String, String, String)>>,
    }

    impl Transliterator for Recorder {
        fn transliterate(&self, text: &str, script: &str, variant: &str) -> Result<String, FetchError> {
            self.calls
                .borrow_mut()
                .push((text.into(), script.into(), variant.into()));
            Ok(format!(
                "<div class=\"mw-parser-output\"><p>  {variant}:{text}\n</p><p>second</p></div>"
            ))
        }
    }

    struct Failing;

    impl Transliterator for Failing {
        fn transliterate(&self, _: &str, _: &str, _: &str) -> Result<String, FetchError> {
            Err(FetchError::Transport("offline".into()))
        }
    }

    #[test]
    fn first_paragraph_extraction() {
        assert_eq!(
            first_paragraph("<div><p class=\"x\"> a <b>b</b> </p><p>c</p></div>").as_deref(),
            Some("a <b>b</b>")
        );
        assert_eq!(first_paragraph("<div>none</div>"), None);
        assert_eq!(first_paragraph("<pre>no</pre>"), None);
    }

    #[test]
    fn empty_text_issues_no_request() {
        let svc = Recorder::default();
        let mut panel = TransliterationPanel::new();
        assert!(!panel.set_open(true, "  \n", "bali", "latn", &svc));
        assert!(!panel.is_open());
        assert!(svc.calls.borrow().is_empty());
        assert!(panel.last_request().is_none());
    }

    #[test]
    fn open_twice_same_variant_requests_once() {
        let svc = Recorder::default();
        let mut panel = TransliterationPanel::new();
        assert!(panel.set_open(true, "ᬳᬦ", "bali", "latn", &svc));
        assert_eq!(panel.text(), "latn:ᬳᬦ");
        assert!(!panel.set_open(true, "ᬳᬦ", "bali", "latn", &svc));
        assert_eq!(svc.calls.borrow().len(), 1);
    }

    #[test]
    fn variant_change_forces_refresh() {
        let svc = Recorder::default();
        let mut panel = TransliterationPanel::new();
        panel.set_open(true, "ᬳᬦ", "bali", "latn", &svc);
        assert!(panel.set_open(true, "ᬳᬦ", "bali", "ipa", &svc));
        assert_eq!(panel.text(), "ipa:ᬳᬦ");
        assert_eq!(panel.last_request(), Some(("bali", "ipa")));
        assert_eq!(svc.calls.borrow().len(), 2);
    }

    #[test]
    fn failure_leaves_panel_closed() {
        let mut panel = TransliterationPanel::new();
        assert!(!panel.set_open(true, "text", "bali", "latn", &Failing));
        assert!(!panel.is_open());
        assert_eq!(panel.text(), "");
    }

    /// Fails until `up` is set.
    struct Flaky {
        up: std::cell::Cell<bool>,
    }

    impl Transliterator for Flaky {
        fn transliterate(&self, text: &str, _: &str, variant: &str) -> Result<String, FetchError> {
            if self.up.get() {
                Ok(format!("<p>{variant}:{text}</p>"))
            } else {
                Err(FetchError::Transport("offline".into()))
            }
        }
    }

    #[test]
    fn failed_variant_refresh_can_be_retried() {
        let svc = Flaky {
            up: std::cell::Cell::new(true),
        };
        let mut panel = TransliterationPanel::new();
        assert!(panel.set_open(true, "ᬳ", "bali", "latn", &svc));

        svc.up.set(false);
        assert!(!panel.set_open(true, "ᬳ", "bali", "ipa", &svc));
        assert!(panel.is_open());
        assert_eq!(panel.text(), "latn:ᬳ");
        assert_eq!(panel.last_request(), Some(("bali", "latn")));

        svc.up.set(true);
        assert!(panel.set_open(true, "ᬳ", "bali", "ipa", &svc));
        assert_eq!(panel.text(), "ipa:ᬳ");
        assert_eq!(panel.last_request(), Some(("bali", "ipa")));
    }

    #[test]
    fn close_keeps_text() {
        let svc = Recorder::default();
        let mut panel = TransliterationPanel::new();
        panel.set_open(true, "a", "bali", "latn", &svc);
        assert!(panel.set_open(false, "a", "bali", "latn", &svc));
        assert!(!panel.is_open());
        assert_eq!(panel.text(), "latn:a");
        assert!(!panel.set_open(false, "a", "bali", "latn", &svc));
    }
}
