use std::{fs, path::Path, time::Duration};

use anyhow::Context;
use client_core::{Latency, StoreSettings};
use serde::Deserialize;
use tracing::warn;

pub const CONFIG_FILE: &str = "portal.toml";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub database_url: String,
    /// Replaces every simulated delay when set; otherwise each call keeps
    /// its own default latency.
    pub latency_ms: Option<u64>,
    pub opening_balance: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: "sqlite://./data/portal.db".into(),
            latency_ms: None,
            opening_balance: StoreSettings::default().base_opening_balance,
        }
    }
}

impl Settings {
    pub fn store_settings(&self, no_delay: bool) -> StoreSettings {
        let latency = if no_delay {
            Latency::none()
        } else {
            self.latency_ms
                .map(|ms| Latency::uniform(Duration::from_millis(ms)))
                .unwrap_or_default()
        };
        StoreSettings {
            latency,
            base_opening_balance: self.opening_balance,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    database_url: Option<String>,
    latency_ms: Option<u64>,
    opening_balance: Option<f64>,
}

/// Defaults, then `portal.toml` in the working directory, then `APP__*`
/// environment variables.
pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    let path = Path::new(CONFIG_FILE);
    if path.exists() {
        match read_file_settings(path) {
            Ok(file_cfg) => apply_file(&mut settings, file_cfg),
            Err(error) => warn!(%error, "ignoring unreadable config file"),
        }
    }

    apply_env(&mut settings, |key| std::env::var(key).ok());
    settings
}

fn read_file_settings(path: &Path) -> anyhow::Result<FileSettings> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read '{}'", path.display()))?;
    parse_file_settings(&raw).with_context(|| format!("failed to parse '{}'", path.display()))
}

fn parse_file_settings(raw: &str) -> anyhow::Result<FileSettings> {
    Ok(toml::from_str(raw)?)
}

fn apply_file(settings: &mut Settings, file_cfg: FileSettings) {
    if let Some(v) = file_cfg.database_url {
        settings.database_url = v;
    }
    if let Some(v) = file_cfg.latency_ms {
        settings.latency_ms = Some(v);
    }
    if let Some(v) = file_cfg.opening_balance {
        settings.opening_balance = v;
    }
}

fn apply_env(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("APP__DATABASE_URL") {
        settings.database_url = v;
    }

    if let Some(v) = var("APP__LATENCY_MS") {
        match v.parse::<u64>() {
            Ok(parsed) => settings.latency_ms = Some(parsed),
            Err(_) => warn!(value = %v, "ignoring invalid APP__LATENCY_MS"),
        }
    }

    if let Some(v) = var("APP__OPENING_BALANCE") {
        match v.parse::<f64>() {
            Ok(parsed) if parsed.is_finite() => settings.opening_balance = parsed,
            _ => warn!(value = %v, "ignoring invalid APP__OPENING_BALANCE"),
        }
    }
}

pub fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite:") || raw_database_url.contains("://") {
        return raw_database_url.to_string();
    }

    format!("sqlite://{}", raw_database_url.replace('\\', "/"))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
