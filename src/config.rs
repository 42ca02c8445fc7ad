use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::keymap::{self, KeyMap, Signal};
use crate::registry::ViewMode;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_tick_rate_ms")]
    pub tick_rate_ms: u64,
    #[serde(default = "default_theme")]
    pub theme: String,
    #[serde(default = "default_initial_view")]
    pub initial_view: ViewMode,
    #[serde(default = "default_log_file")]
    pub log_file: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// JSON fixture served by the in-memory backend; the bundled demo data
    /// when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixture: Option<String>,
    /// Key spec to signal overrides, merged over the default bindings.
    #[serde(default)]
    pub keys: BTreeMap<String, Signal>,
}

fn default_tick_rate_ms() -> u64 {
    250
}
fn default_theme() -> String {
    "harbor".to_string()
}
fn default_initial_view() -> ViewMode {
    ViewMode::Containers
}
fn default_log_file() -> String {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("dockhand")
        .join("dockhand.log")
        .to_string_lossy()
        .to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tick_rate_ms: default_tick_rate_ms(),
            theme: default_theme(),
            initial_view: default_initial_view(),
            log_file: default_log_file(),
            log_level: default_log_level(),
            fixture: None,
            keys: BTreeMap::new(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Reads `path`, falling back to defaults when it does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("parsing {}", path.display()))?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("dockhand")
            .join("config.toml")
    }

    /// Default bindings with the `[keys]` table applied on top.
    pub fn keymap(&self) -> Result<KeyMap> {
        let mut table = keymap::default_bindings();
        table.extend(self.keys.iter().map(|(k, v)| (k.clone(), *v)));
        KeyMap::from_table(&table).context("invalid [keys] entry")
    }
}

#[cfg(test)]
mod tests {
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

    use super::*;
    use crate::keymap::InputEvent;

    #[test]
    fn empty_file_gives_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.tick_rate_ms, 250);
        assert_eq!(config.theme, "harbor");
        assert_eq!(config.initial_view, ViewMode::Containers);
        assert_eq!(config.log_level, "info");
        assert!(config.log_file.ends_with("dockhand.log"));
        assert!(config.fixture.is_none());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config: Config = toml::from_str(
            r#"
initial_view = "services"
theme = "terminal-default"
"#,
        )
        .unwrap();
        assert_eq!(config.initial_view, ViewMode::Services);
        assert_eq!(config.theme, "terminal-default");
        assert_eq!(config.tick_rate_ms, 250);
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.theme, "harbor");
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.initial_view = ViewMode::Images;
        config.keys.insert("ctrl-x".to_string(), Signal::Quit);
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.initial_view, ViewMode::Images);
        assert_eq!(loaded.keys.get("ctrl-x"), Some(&Signal::Quit));
    }

    #[test]
    fn malformed_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "tick_rate_ms = \"fast\"").unwrap();
        let err = Config::load_from(&path).unwrap_err();
        assert!(format!("{err:#}").contains("parsing"));
    }

    #[test]
    fn key_overrides_merge_over_defaults() {
        let mut config = Config::default();
        config.keys.insert("ctrl-x".to_string(), Signal::Quit);
        let keymap = config.keymap().unwrap();
        assert_eq!(
            keymap.translate(&KeyEvent::new(KeyCode::Char('x'), KeyModifiers::CONTROL)),
            Some(InputEvent::Signal(Signal::Quit))
        );
        assert_eq!(
            keymap.translate(&KeyEvent::new(KeyCode::F(1), KeyModifiers::NONE)),
            Some(InputEvent::Signal(Signal::Sort))
        );
    }

    #[test]
    fn bad_key_spec_is_rejected() {
        let mut config = Config::default();
        config.keys.insert("hyper-x".to_string(), Signal::Quit);
        assert!(config.keymap().is_err());
    }
}
