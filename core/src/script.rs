//! Script profiles, platform traits and per-script preferences.
//!
//! A `ScriptProfile` carries everything that depends on the script being
//! transcribed: the fonts offered, the default font, and the transliteration
//! variants. Unknown scripts get a profile with only defaults.
//!
//! `Platform` is computed once by the host and handed to the editor.

use crate::store::LocalStore;
use serde::{Deserialize, Serialize};

/// Font name used when a script has no profile.
pub const DEFAULT_FONT: &str = "defaultFont";

/// Variant requested when a script lists none.
pub const DEFAULT_VARIANT: &str = "latn";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FontChoice {
    /// Identifier stored in preferences.
    pub name: String,
    /// Name shown to the user.
    pub display: String,
}

impl FontChoice {
    /// Display names replace underscores with spaces.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            display: name.replace('_', " "),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptProfile {
    pub script: String,
    pub fonts: Vec<FontChoice>,
    pub default_font: String,
    pub variants: Vec<String>,
    pub default_variant: String,
}

impl ScriptProfile {
    /// Profile for a script nothing is known about.
    pub fn default_only(script: &str) -> Self {
        Self {
            script: script.to_string(),
            fonts: Vec::new(),
            default_font: DEFAULT_FONT.to_string(),
            variants: vec![DEFAULT_VARIANT.to_string()],
            default_variant: DEFAULT_VARIANT.to_string(),
        }
    }

    pub fn has_font(&self, name: &str) -> bool {
        self.fonts.iter().any(|f| f.name == name)
    }

    pub fn has_variant(&self, variant: &str) -> bool {
        self.variants.iter().any(|v| v == variant)
    }
}

/// Host platform traits that change how input is handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Platform {
    pub ios: bool,
    pub ios_safari: bool,
    pub mobile: bool,
}

impl Platform {
    pub fn desktop() -> Self {
        Self::default()
    }

    /// Derive platform traits from a browser user agent string.
    pub fn from_user_agent(ua: &str) -> Self {
        let ios = ["iPhone", "iPod", "iPad"].iter().any(|d| ua.contains(d));
        let ios_safari = ios && ua.contains("WebKit") && !ua.contains("CriOS");
        let mobile = ios || ua.contains("Android");
        Self {
            ios,
            ios_safari,
            mobile,
        }
    }

    /// Whether the text surface must be emulated (no native caret) for the
    /// given keyboard visibility.
    pub fn emulates_text_edit(&self, keyboard_open: bool) -> bool {
        self.mobile && keyboard_open
    }
}

/// Per-script preferences kept in the local store.
#[derive(Debug, Clone)]
pub struct Preferences {
    store: LocalStore,
    script: String,
}

impl Preferences {
    pub fn new(store: LocalStore, script: &str) -> Self {
        Self {
            store,
            script: script.to_string(),
        }
    }

    fn font_key(&self) -> String {
        format!("font-{}", self.script)
    }

    fn keyboard_key(&self) -> String {
        format!("keyboardOpen-{}", self.script)
    }

    /// The stored font if the profile offers it, else the profile default.
    pub fn font(&self, profile: &ScriptProfile) -> String {
        match self.store.get_or_none(&self.font_key()) {
            Some(saved) if profile.has_font(&saved) => saved,
            _ => profile.default_font.clone(),
        }
    }

    pub fn set_font(&self, font: &str) {
        self.store.set_logged(&self.font_key(), font);
    }

    /// Keyboard visibility; open unless explicitly stored as `"false"`.
    pub fn keyboard_open(&self, default_open: bool) -> bool {
        match self.store.get_or_none(&self.keyboard_key()).as_deref() {
            Some("false") => false,
            Some(_) => true,
            None => default_open,
        }
    }

    pub fn set_keyboard_open(&self, open: bool) {
        self.store
            .set_logged(&self.keyboard_key(), if open { "true" } else { "false" });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bali() -> ScriptProfile {
        ScriptProfile {
            script: "bali".into(),
            fonts: vec![FontChoice::new("Pustaka_Bali"), FontChoice::new("Vimala")],
            default_font: "Vimala".into(),
            variants: vec!["latn".into()],
            default_variant: "latn".into(),
        }
    }

    #[test]
    fn font_display_names() {
        assert_eq!(FontChoice::new("Pustaka_Bali").display, "Pustaka Bali");
    }

    #[test]
    fn default_only_profile() {
        let p = ScriptProfile::default_only("xyz");
        assert!(p.fonts.is_empty());
        assert_eq!(p.default_font, DEFAULT_FONT);
        assert_eq!(p.default_variant, DEFAULT_VARIANT);
    }

    #[test]
    fn user_agents() {
        let iphone = Platform::from_user_agent(
            "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15 Mobile/15E148",
        );
        assert!(iphone.ios && iphone.ios_safari && iphone.mobile);
        let chrome_ios = Platform::from_user_agent("Mozilla/5.0 (iPad) AppleWebKit CriOS/119");
        assert!(chrome_ios.ios && !chrome_ios.ios_safari);
        let android = Platform::from_user_agent("Mozilla/5.0 (Linux; Android 14)");
        assert!(android.mobile && !android.ios);
        assert_eq!(
            Platform::from_user_agent("Mozilla/5.0 (X11; Linux x86_64)"),
            Platform::desktop()
        );
        assert!(android.emulates_text_edit(true));
        assert!(!android.emulates_text_edit(false));
    }

    #[test]
    fn stored_font_must_be_offered() {
        let store = LocalStore::new_in_memory();
        let prefs = Preferences::new(store.clone(), "bali");
        assert_eq!(prefs.font(&bali()), "Vimala");
        prefs.set_font("Pustaka_Bali");
        assert_eq!(prefs.font(&bali()), "Pustaka_Bali");
        store.set("font-bali", "Comic_Sans").unwrap();
        assert_eq!(prefs.font(&bali()), "Vimala");
    }

    #[test]
    fn keyboard_preference() {
        let prefs = Preferences::new(LocalStore::new_in_memory(), "bali");
        assert!(prefs.keyboard_open(true));
        prefs.set_keyboard_open(false);
        assert!(!prefs.keyboard_open(true));
        prefs.set_keyboard_open(true);
        assert!(prefs.keyboard_open(false));
    }
}
