//! Configuration management for lumo.
//!
//! Loads configuration from ${LUMO_HOME}/config.toml with sensible defaults.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::chat::pagination::ScrollThresholds;

/// Default config template, embedded at compile time.
fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

/// Merges user config values into the default template.
///
/// Keeps the template's comments and sections while preserving the user's
/// customized values.
fn merge_with_template(user_config: &str) -> Result<String> {
    use toml_edit::DocumentMut;

    let mut doc: DocumentMut = default_config_template()
        .parse()
        .context("Failed to parse default config template")?;
    let user_doc: DocumentMut = user_config.parse().context("Failed to parse user config")?;

    merge_items(doc.as_table_mut(), user_doc.as_table());

    Ok(doc.to_string())
}

fn merge_items(target: &mut toml_edit::Table, source: &toml_edit::Table) {
    use toml_edit::Item;

    for (key, value) in source.iter() {
        match value {
            Item::Value(v) => {
                target[key] = Item::Value(v.clone());
            }
            Item::Table(src_table) => {
                if let Some(Item::Table(target_table)) = target.get_mut(key) {
                    merge_items(target_table, src_table);
                } else {
                    target[key] = Item::Table(src_table.clone());
                }
            }
            Item::ArrayOfTables(src_arr) => {
                target[key] = Item::ArrayOfTables(src_arr.clone());
            }
            Item::None => {}
        }
    }
}

pub mod paths {
    //! Path resolution for lumo configuration and data files.
    //!
    //! LUMO_HOME resolution order:
    //! 1. LUMO_HOME environment variable (if set)
    //! 2. ~/.config/lumo (default)

    use std::path::PathBuf;

    /// Returns the lumo home directory.
    pub fn lumo_home() -> PathBuf {
        if let Ok(home) = std::env::var("LUMO_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir().map_or_else(
            || PathBuf::from(".lumo"),
            |h| h.join(".config").join("lumo"),
        )
    }

    pub fn config_path() -> PathBuf {
        lumo_home().join("config.toml")
    }

    /// Returns the path of the stored login token.
    pub fn auth_path() -> PathBuf {
        lumo_home().join("auth.json")
    }

    pub fn logs_dir() -> PathBuf {
        lumo_home().join("logs")
    }
}

/// Scroll thresholds, in display units (rows for the terminal UI).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrollConfig {
    pub pin_threshold: usize,
    pub jump_threshold: usize,
    pub load_more_threshold: usize,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        let thresholds = ScrollThresholds::default();
        Self {
            pin_threshold: thresholds.pin,
            jump_threshold: thresholds.jump,
            load_more_threshold: thresholds.load_more,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub base_url: String,
    pub page_size: u32,
    pub reasoning_mode: bool,
    pub frame_ms: u64,
    pub request_timeout_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_filter: Option<String>,
    pub scroll: ScrollConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            page_size: Self::DEFAULT_PAGE_SIZE,
            reasoning_mode: false,
            frame_ms: Self::DEFAULT_FRAME_MS,
            request_timeout_secs: Self::DEFAULT_REQUEST_TIMEOUT_SECS,
            log_filter: None,
            scroll: ScrollConfig::default(),
        }
    }
}

impl Config {
    const DEFAULT_BASE_URL: &str = "http://localhost:8080";
    const DEFAULT_PAGE_SIZE: u32 = 10;
    const MAX_PAGE_SIZE: u32 = 100;
    const DEFAULT_FRAME_MS: u64 = 16;
    const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

    /// Loads configuration from the default config path.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if the file doesn't exist.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Saves only the `reasoning_mode` field to the config file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed, or written.
    pub fn save_reasoning_mode(enabled: bool) -> Result<()> {
        Self::save_reasoning_mode_to(&paths::config_path(), enabled)
    }

    /// Saves only the `reasoning_mode` field to a specific config file path.
    ///
    /// Creates the file from the default template if it doesn't exist.
    /// If it exists, user values are merged into the latest template.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed, or written.
    pub fn save_reasoning_mode_to(path: &Path, enabled: bool) -> Result<()> {
        use toml_edit::{DocumentMut, value};

        let contents = if path.exists() {
            let user_config = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            merge_with_template(&user_config)?
        } else {
            default_config_template().to_string()
        };

        let mut doc: DocumentMut = contents
            .parse()
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;
        doc["reasoning_mode"] = value(enabled);

        Self::write_config(path, &doc.to_string())
    }

    /// Creates a default config file at the given path.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be written.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }

        Self::write_config(path, default_config_template())
    }

    /// Resolves the backend URL with precedence: env > config.
    ///
    /// # Errors
    /// Returns an error if the resolved value is not a valid URL.
    pub fn effective_base_url(&self) -> Result<String> {
        let from_env = std::env::var("LUMO_BASE_URL")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        let raw = from_env.unwrap_or_else(|| self.base_url.trim().to_string());

        url::Url::parse(&raw).with_context(|| format!("Invalid base URL: {raw}"))?;
        Ok(raw.trim_end_matches('/').to_string())
    }

    /// Page size clamped to what the backend accepts.
    pub fn effective_page_size(&self) -> u32 {
        self.page_size.clamp(1, Self::MAX_PAGE_SIZE)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn frame_duration(&self) -> Duration {
        Duration::from_millis(self.frame_ms.max(1))
    }

    pub fn scroll_thresholds(&self) -> ScrollThresholds {
        ScrollThresholds {
            pin: self.scroll.pin_threshold,
            jump: self.scroll.jump_threshold,
            load_more: self.scroll.load_more_threshold,
        }
    }

    /// Writes config content atomically (temp file + rename), creating
    /// parent directories as needed.
    fn write_config(path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let tmp_path = path.with_extension("toml.tmp");
        fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write config to {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                tmp_path.display(),
                path.display()
            )
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("nonexistent.toml")).unwrap();

        assert_eq!(config.base_url, "http://localhost:8080");
        assert_eq!(config.page_size, 10);
        assert!(!config.reasoning_mode);
        assert_eq!(config.scroll.pin_threshold, 1);
        assert_eq!(config.scroll.jump_threshold, 2);
        assert_eq!(config.scroll.load_more_threshold, 2);
    }

    #[test]
    fn test_load_partial_config_merges_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        fs::write(&config_path, "page_size = 25\n[scroll]\npin_threshold = 2\n").unwrap();

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config.page_size, 25);
        assert_eq!(config.scroll.pin_threshold, 2);
        assert_eq!(config.scroll.jump_threshold, 2);
        assert_eq!(config.frame_ms, 16);
    }

    #[test]
    fn test_default_template_matches_defaults() {
        let parsed: Config = toml::from_str(default_config_template()).unwrap();
        let defaults = Config::default();

        assert_eq!(parsed.base_url, defaults.base_url);
        assert_eq!(parsed.page_size, defaults.page_size);
        assert_eq!(parsed.frame_ms, defaults.frame_ms);
        assert_eq!(parsed.request_timeout_secs, defaults.request_timeout_secs);
        assert_eq!(parsed.scroll.load_more_threshold, defaults.scroll.load_more_threshold);
    }

    #[test]
    fn test_init_creates_config_with_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("subdir").join("config.toml");

        Config::init(&config_path).unwrap();

        let contents = fs::read_to_string(&config_path).unwrap();
        assert!(contents.contains("base_url ="));
        assert!(contents.contains("# log_filter ="));
    }

    #[test]
    fn test_init_fails_if_exists() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        fs::write(&config_path, "").unwrap();

        assert!(Config::init(&config_path).is_err());
    }

    #[test]
    fn test_save_reasoning_mode_preserves_other_fields() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        fs::write(
            &config_path,
            "base_url = \"http://chat.internal:9000\"\npage_size = 30\n",
        )
        .unwrap();

        Config::save_reasoning_mode_to(&config_path, true).unwrap();

        let config = Config::load_from(&config_path).unwrap();
        assert!(config.reasoning_mode);
        assert_eq!(config.base_url, "http://chat.internal:9000");
        assert_eq!(config.page_size, 30);

        let contents = fs::read_to_string(&config_path).unwrap();
        assert!(contents.contains("# Lumo Configuration"));
    }

    #[test]
    fn test_save_reasoning_mode_creates_file_with_template() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");

        Config::save_reasoning_mode_to(&config_path, true).unwrap();
        Config::save_reasoning_mode_to(&config_path, false).unwrap();

        let config = Config::load_from(&config_path).unwrap();
        assert!(!config.reasoning_mode);
        assert!(
            fs::read_to_string(&config_path)
                .unwrap()
                .contains("reasoning_mode = false")
        );
    }

    #[test]
    fn test_page_size_is_clamped() {
        let mut config = Config::default();
        config.page_size = 0;
        assert_eq!(config.effective_page_size(), 1);
        config.page_size = 500;
        assert_eq!(config.effective_page_size(), 100);
    }

    #[test]
    fn test_scroll_thresholds_follow_config() {
        let mut config = Config::default();
        config.scroll.pin_threshold = 3;
        let thresholds = config.scroll_thresholds();
        assert_eq!(thresholds.pin, 3);
        assert_eq!(thresholds.jump, 2);
    }
}
