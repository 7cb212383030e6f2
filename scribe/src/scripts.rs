//! Built-in script data: font lists, transliteration variants and keyboard
//! layouts for the scripts this tool knows.

use leafscribe_core::script::DEFAULT_VARIANT;
use leafscribe_core::{FontChoice, Layout, ScriptProfile};
use once_cell::sync::Lazy;
use std::sync::Arc;

const BALI_LAYOUT: &str = include_str!("../layouts/bali.toml");

static BALI_KEYBOARD: Lazy<Arc<Layout>> = Lazy::new(|| {
    Arc::new(Layout::from_toml_str(BALI_LAYOUT).expect("built-in Balinese layout is valid"))
});

fn bali() -> ScriptProfile {
    ScriptProfile {
        script: "bali".to_string(),
        fonts: ["Kadiri", "Pustaka_Bali", "Vimala"]
            .iter()
            .map(|f| FontChoice::new(f))
            .collect(),
        default_font: "Vimala".to_string(),
        variants: vec![DEFAULT_VARIANT.to_string()],
        default_variant: DEFAULT_VARIANT.to_string(),
    }
}

/// Profile for an ISO 15924 script code (lowercase, e.g. `bali`).
pub fn profile_for(script: &str) -> ScriptProfile {
    match script {
        "bali" => bali(),
        other => ScriptProfile::default_only(other),
    }
}

/// On-screen keyboard for `script`, if there is one.
pub fn layout_for(script: &str) -> Option<Arc<Layout>> {
    match script {
        "bali" => Some(Arc::clone(&BALI_KEYBOARD)),
        _ => None,
    }
}
