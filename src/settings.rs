use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_API_BASE, DEFAULT_CATALOG_BASE, DEFAULT_DB_BASE};

const SETTINGS_FILENAME: &str = "settings.json";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api_base: String,
    /// Prefix the character id is appended to, e.g. `https://host/voice-db-`.
    pub db_base: String,
    /// Directory or URL holding `character.json`, `category.json`, `type.json`.
    pub catalog_base: String,
    pub request_timeout_secs: u64,
    #[serde(deserialize_with = "deserialize_optional_lang")]
    pub preferred_language: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            db_base: DEFAULT_DB_BASE.to_string(),
            catalog_base: DEFAULT_CATALOG_BASE.to_string(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            preferred_language: None,
        }
    }
}

fn deserialize_optional_lang<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::de::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| normalize_optional(&value)))
}

pub fn load_settings() -> Settings {
    let settings = match load_settings_from_path(None) {
        Ok(settings) => settings,
        Err(err) => {
            log::warn!("Falling back to default settings: {err:#}");
            Settings::default()
        }
    };
    apply_env_overrides(settings)
}

pub fn load_settings_from_path(custom_path: Option<&Path>) -> Result<Settings> {
    let settings_path = custom_path
        .map(Path::to_owned)
        .unwrap_or_else(default_settings_path);

    match fs::read_to_string(&settings_path) {
        Ok(raw) => {
            let parsed: Settings = serde_json::from_str(&raw)
                .with_context(|| format!("Invalid JSON in {}", settings_path.display()))?;
            Ok(fill_defaults(parsed))
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Settings::default()),
        Err(err) => Err(err).with_context(|| format!("Failed reading {}", settings_path.display())),
    }
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    let path = default_settings_path();
    save_settings_to_path(settings, &path)
}

pub fn save_settings_to_path(settings: &Settings, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed creating {}", parent.display()))?;
    }
    let payload =
        serde_json::to_string_pretty(settings).context("Failed serializing settings to JSON")?;
    fs::write(path, payload).with_context(|| format!("Failed writing {}", path.display()))
}

pub fn default_settings_path() -> PathBuf {
    config_dir().join(SETTINGS_FILENAME)
}

pub fn config_dir() -> PathBuf {
    if let Ok(custom) = env::var("VOICE_BROWSER_HOME") {
        let path = PathBuf::from(custom);
        if path.is_absolute() {
            return path;
        }
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".voice-browser")
}

/// Endpoint overrides from the environment win over the settings file but are
/// never written back to it.
fn apply_env_overrides(mut settings: Settings) -> Settings {
    if let Some(value) = env_value("VOICE_BROWSER_API_BASE") {
        settings.api_base = value;
    }
    if let Some(value) = env_value("VOICE_BROWSER_DB_BASE") {
        settings.db_base = value;
    }
    if let Some(value) = env_value("VOICE_BROWSER_CATALOG") {
        settings.catalog_base = value;
    }
    fill_defaults(settings)
}

fn env_value(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn normalize_optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("default") {
        None
    } else {
        Some(trimmed.to_ascii_lowercase())
    }
}

fn fill_defaults(mut settings: Settings) -> Settings {
    let api_base = settings.api_base.trim().trim_end_matches('/');
    settings.api_base = if api_base.is_empty() {
        DEFAULT_API_BASE.to_string()
    } else {
        api_base.to_string()
    };
    if settings.db_base.trim().is_empty() {
        settings.db_base = DEFAULT_DB_BASE.to_string();
    } else {
        settings.db_base = settings.db_base.trim().to_string();
    }
    let catalog = settings.catalog_base.trim().trim_end_matches('/');
    settings.catalog_base = if catalog.is_empty() {
        DEFAULT_CATALOG_BASE.to_string()
    } else {
        catalog.to_string()
    };
    if settings.request_timeout_secs == 0 {
        settings.request_timeout_secs = DEFAULT_TIMEOUT_SECS;
    }
    settings
}
