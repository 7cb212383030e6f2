//! Host configuration.
//!
//! Wraps the core editor `Config` and adds what only this host needs: the
//! wiki endpoint, image sources and where local data is kept.

use leafscribe_core::Config;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ScribeConfig {
    /// Editor settings shared with other hosts.
    #[serde(flatten)]
    pub base: Config,

    /// MediaWiki action API endpoint.
    pub api_url: String,

    /// Base URL of the IIIF image service, if leaves are served through one.
    pub iiif_base_url: Option<String>,

    /// Commons file holding the scanned leaves.
    pub commons_file: Option<String>,

    /// Per-request timeout. Default: 5000 ms.
    pub request_timeout_ms: u64,

    /// redb file for autosave records and preferences. In-memory when unset.
    pub store_path: Option<PathBuf>,
}

impl Default for ScribeConfig {
    fn default() -> Self {
        Self {
            base: Config::default(),
            api_url: "/w/api.php".to_string(),
            iiif_base_url: None,
            commons_file: None,
            request_timeout_ms: 5000,
            store_path: None,
        }
    }
}

impl ScribeConfig {
    /// Load configuration from a TOML file.
    pub fn load_toml<P: AsRef<std::path::Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Save configuration to a TOML file.
    pub fn save_toml<P: AsRef<std::path::Path>>(&self, path: P) -> anyhow::Result<()> {
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Core config with the host's image sources filled in.
    pub fn editor_config(&self) -> Config {
        let mut config = self.base.clone();
        if self.commons_file.is_some() {
            config.media.commons_file = self.commons_file.clone();
        }
        if self.iiif_base_url.is_some() {
            config.media.iiif_base_url = self.iiif_base_url.clone();
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flattened_fields_share_one_table() {
        let cfg = ScribeConfig::from_toml_str(
            r#"
api_url = "https://wiki.example/w/api.php"
commons_file = "Lontar Bali.pdf"
recovery_delay_ms = 500
keyboard_open_by_default = false
"#,
        )
        .unwrap();
        assert_eq!(cfg.api_url, "https://wiki.example/w/api.php");
        assert_eq!(cfg.base.recovery_delay_ms, 500);
        assert!(!cfg.base.keyboard_open_by_default);
        assert_eq!(cfg.request_timeout(), Duration::from_secs(5));

        let editor = cfg.editor_config();
        assert_eq!(editor.media.commons_file.as_deref(), Some("Lontar Bali.pdf"));
        assert_eq!(editor.recovery_delay_ms, 500);
    }

    #[test]
    fn empty_file_is_all_defaults() {
        assert_eq!(ScribeConfig::from_toml_str("").unwrap(), ScribeConfig::default());
    }
}
