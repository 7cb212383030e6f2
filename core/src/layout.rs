//! Virtual keyboard layout definitions.
//!
//! A layout maps key ids to rules. A key either emits text, acts as a
//! backspace, or is a dead/modifier key that waits for the next key.
//! Combinations map a set of one or two pending dead keys plus a base key to
//! a single output. Layouts are plain data and load from TOML:
//!
//! ```toml
//! name = "bali"
//!
//! [[keys]]
//! id = "ka"
//! output = "ᬓ"
//!
//! [[keys]]
//! id = "shift"
//! dead = true
//!
//! [[combos]]
//! dead = ["shift"]
//! key = "ka"
//! output = "ᬔ"
//! ```

use crate::error::LayoutError;
use crate::utils;
use ahash::AHashMap;
use serde::{Deserialize, Serialize};

/// Most dead keys that may be pending at once.
pub const MAX_PENDING: usize = 2;

/// Serialized form of a single key.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct KeyDef {
    pub id: String,
    /// Text emitted by the key (for dead keys: emitted when flushed unused).
    #[serde(default)]
    pub output: String,
    #[serde(default)]
    pub dead: bool,
    #[serde(default)]
    pub backspace: bool,
}

/// Serialized form of a combination.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ComboDef {
    pub dead: Vec<String>,
    pub key: String,
    pub output: String,
}

/// Serialized layout, as found in TOML files.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LayoutDef {
    pub name: String,
    #[serde(default)]
    pub keys: Vec<KeyDef>,
    #[serde(default)]
    pub combos: Vec<ComboDef>,
}

/// How a single key behaves on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyRule {
    Emit(String),
    /// Dead key; the string is what it emits when flushed without a match.
    Dead(String),
    Backspace,
}

#[derive(Debug, Clone)]
struct Combo {
    dead: Vec<String>, // sorted
    output: String,
}

/// A validated, ready-to-use layout.
#[derive(Debug, Clone)]
pub struct Layout {
    name: String,
    keys: AHashMap<String, KeyRule>,
    // base key -> combinations ending in that key
    combos: AHashMap<String, Vec<Combo>>,
}

impl Layout {
    /// Build a layout from its serialized definition.
    ///
    /// Outputs are NFC-normalized so composed and precomposed forms compare equal.
    pub fn from_def(def: LayoutDef) -> Result<Self, LayoutError> {
        let mut keys = AHashMap::new();
        for k in def.keys {
            let rule = if k.backspace {
                KeyRule::Backspace
            } else if k.dead {
                KeyRule::Dead(utils::nfc(&k.output))
            } else {
                KeyRule::Emit(utils::nfc(&k.output))
            };
            keys.insert(k.id, rule);
        }

        let mut combos: AHashMap<String, Vec<Combo>> = AHashMap::new();
        for c in def.combos {
            if c.dead.is_empty() || c.dead.len() > MAX_PENDING {
                return Err(LayoutError::BadDeadKeyCount {
                    key: c.key,
                    count: c.dead.len(),
                });
            }
            if !keys.contains_key(&c.key) {
                return Err(LayoutError::UnknownKey(c.key));
            }
            for d in &c.dead {
                match keys.get(d) {
                    None => return Err(LayoutError::UnknownKey(d.clone())),
                    Some(KeyRule::Dead(_)) => {}
                    Some(_) => return Err(LayoutError::NotDead(d.clone())),
                }
            }
            let mut dead = c.dead;
            dead.sort();
            combos.entry(c.key).or_default().push(Combo {
                dead,
                output: utils::nfc(&c.output),
            });
        }

        Ok(Self {
            name: def.name,
            keys,
            combos,
        })
    }

    /// Parse and validate a TOML layout definition.
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let def: LayoutDef = toml::from_str(content)?;
        Ok(Self::from_def(def)?)
    }

    /// Load a layout from a TOML file.
    pub fn load_toml<P: AsRef<std::path::Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rule(&self, key: &str) -> Option<&KeyRule> {
        self.keys.get(key)
    }

    pub fn key_count(&self) -> usize {
        self.keys.len()
    }

    /// Output of the combination (`dead` + `key`), if one exists.
    /// `dead` must be sorted.
    pub fn combination(&self, dead: &[String], key: &str) -> Option<&str> {
        self.combos
            .get(key)?
            .iter()
            .find(|c| c.dead == dead)
            .map(|c| c.output.as_str())
    }

    /// Whether some combination uses every key of `dead` (sorted) and maybe
    /// more. A key pending twice needs a combination listing it twice.
    pub fn starts_combination(&self, dead: &[String]) -> bool {
        self.combos
            .values()
            .flatten()
            .any(|c| is_sub_multiset(dead, &c.dead))
    }
}

/// Every element of `small` occurs in `big` at least as often. Both sorted.
fn is_sub_multiset(small: &[String], big: &[String]) -> bool {
    let mut rest = big.iter();
    small.iter().all(|d| rest.any(|b| b == d))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
name = "sample"

[[keys]]
id = "a"
output = "a"

[[keys]]
id = "acute"
output = "´"
dead = true

[[keys]]
id = "bksp"
backspace = true

[[combos]]
dead = ["acute"]
key = "a"
output = "á"
"#;

    #[test]
    fn parses_keys_and_combos() {
        let layout = Layout::from_toml_str(SAMPLE).unwrap();
        assert_eq!(layout.name(), "sample");
        assert_eq!(layout.key_count(), 3);
        assert_eq!(layout.rule("bksp"), Some(&KeyRule::Backspace));
        assert_eq!(
            layout.combination(&["acute".to_string()], "a"),
            Some("á")
        );
        assert!(layout.starts_combination(&["acute".to_string()]));
    }

    #[test]
    fn repeated_dead_key_needs_matching_combo() {
        let layout = Layout::from_toml_str(SAMPLE).unwrap();
        let twice = ["acute".to_string(), "acute".to_string()];
        assert!(!layout.starts_combination(&twice));
    }

    #[test]
    fn rejects_combo_on_live_key() {
        let def = LayoutDef {
            name: "bad".into(),
            keys: vec![KeyDef {
                id: "a".into(),
                output: "a".into(),
                dead: false,
                backspace: false,
            }],
            combos: vec![ComboDef {
                dead: vec!["a".into()],
                key: "a".into(),
                output: "x".into(),
            }],
        };
        assert_eq!(
            Layout::from_def(def).unwrap_err(),
            LayoutError::NotDead("a".into())
        );
    }

    #[test]
    fn rejects_three_dead_keys() {
        let def = LayoutDef {
            name: "bad".into(),
            keys: vec![],
            combos: vec![ComboDef {
                dead: vec!["x".into(), "y".into(), "z".into()],
                key: "a".into(),
                output: "x".into(),
            }],
        };
        assert!(matches!(
            Layout::from_def(def),
            Err(LayoutError::BadDeadKeyCount { count: 3, .. })
        ));
    }

    #[test]
    fn outputs_are_nfc() {
        let toml = "name = \"n\"\n[[keys]]\nid = \"e\"\noutput = \"e\u{301}\"\n";
        let layout = Layout::from_toml_str(toml).unwrap();
        assert_eq!(layout.rule("e"), Some(&KeyRule::Emit("\u{e9}".into())));
    }
}
