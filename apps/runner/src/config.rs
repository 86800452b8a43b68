use std::{collections::HashMap, fs, path::PathBuf};

use serde::Deserialize;
use storage::DEFAULT_DATABASE_URL;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    pub database_url: String,
    /// Base URL of the persistence service; `None` skips the POST.
    pub save_endpoint: Option<String>,
    /// Where session artifacts are written; `None` skips the download.
    pub artifact_dir: Option<PathBuf>,
    /// Wall-clock delay between playback ticks. Zero plays instantly.
    pub tick_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.into(),
            save_endpoint: Some("http://127.0.0.1:5173".into()),
            artifact_dir: Some(PathBuf::from("exports")),
            tick_ms: 100,
        }
    }
}

pub fn load_settings() -> Settings {
    let file = fs::read_to_string("runner.toml").ok();
    resolve_settings(file.as_deref(), |key| std::env::var(key).ok())
}

/// Defaults, then `runner.toml`, then environment. An empty value for an
/// optional setting switches it off.
pub(crate) fn resolve_settings(
    file: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
) -> Settings {
    let mut settings = Settings::default();

    if let Some(raw) = file {
        if let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(raw) {
            if let Some(v) = file_cfg.get("database_url") {
                settings.database_url = v.clone();
            }
            if let Some(v) = file_cfg.get("save_endpoint") {
                settings.save_endpoint = optional(v);
            }
            if let Some(v) = file_cfg.get("artifact_dir") {
                settings.artifact_dir = optional(v).map(PathBuf::from);
            }
            if let Some(v) = file_cfg.get("tick_ms") {
                if let Ok(parsed) = v.parse() {
                    settings.tick_ms = parsed;
                }
            }
        }
    }

    if let Some(v) = env("DATABASE_URL") {
        settings.database_url = v;
    }
    if let Some(v) = env("APP__DATABASE_URL") {
        settings.database_url = v;
    }

    if let Some(v) = env("APP__SAVE_ENDPOINT") {
        settings.save_endpoint = optional(&v);
    }
    if let Some(v) = env("APP__ARTIFACT_DIR") {
        settings.artifact_dir = optional(&v).map(PathBuf::from);
    }
    if let Some(v) = env("APP__TICK_MS") {
        if let Ok(parsed) = v.parse() {
            settings.tick_ms = parsed;
        }
    }

    settings
}

fn optional(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
