use std::{fs, path::PathBuf, time::Duration};

use newsletter::{ConvertKitConfig, DEFAULT_API_URL};
use serde::Deserialize;
use tracing::warn;

pub const SETTINGS_FILE: &str = "site.toml";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub server_bind: String,
    pub database_url: String,
    pub content_dir: PathBuf,
    pub newsletter_api_url: String,
    pub newsletter_api_key: String,
    pub newsletter_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:3000".into(),
            database_url: "sqlite://./data/site.db".into(),
            content_dir: PathBuf::from("./content"),
            newsletter_api_url: DEFAULT_API_URL.into(),
            newsletter_api_key: String::new(),
            newsletter_timeout_secs: 10,
        }
    }
}

impl Settings {
    pub fn newsletter_config(&self) -> ConvertKitConfig {
        ConvertKitConfig {
            api_url: self.newsletter_api_url.clone(),
            api_key: self.newsletter_api_key.clone(),
            timeout: Duration::from_secs(self.newsletter_timeout_secs),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    bind_addr: Option<String>,
    database_url: Option<String>,
    content_dir: Option<PathBuf>,
    newsletter_api_url: Option<String>,
    newsletter_api_key: Option<String>,
    newsletter_timeout_secs: Option<u64>,
}

pub fn load_settings() -> Settings {
    let raw = fs::read_to_string(SETTINGS_FILE).ok();
    load_settings_from(raw.as_deref(), |key| std::env::var(key).ok())
}

/// Defaults, then the settings file, then environment variables.
pub fn load_settings_from(
    raw_file: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
) -> Settings {
    let mut settings = Settings::default();

    if let Some(raw) = raw_file {
        match toml::from_str::<FileSettings>(raw) {
            Ok(file_cfg) => {
                if let Some(v) = file_cfg.bind_addr {
                    settings.server_bind = v;
                }
                if let Some(v) = file_cfg.database_url {
                    settings.database_url = v;
                }
                if let Some(v) = file_cfg.content_dir {
                    settings.content_dir = v;
                }
                if let Some(v) = file_cfg.newsletter_api_url {
                    settings.newsletter_api_url = v;
                }
                if let Some(v) = file_cfg.newsletter_api_key {
                    settings.newsletter_api_key = v;
                }
                if let Some(v) = file_cfg.newsletter_timeout_secs {
                    settings.newsletter_timeout_secs = v;
                }
            }
            Err(error) => warn!(%error, file = SETTINGS_FILE, "ignoring unreadable settings file"),
        }
    }

    if let Some(v) = env("SITE_BIND").or_else(|| env("APP__BIND_ADDR")) {
        settings.server_bind = v;
    }
    if let Some(v) = env("DATABASE_URL").or_else(|| env("APP__DATABASE_URL")) {
        settings.database_url = v;
    }
    if let Some(v) = env("CONTENT_DIR").or_else(|| env("APP__CONTENT_DIR")) {
        settings.content_dir = PathBuf::from(v);
    }
    if let Some(v) = env("CONVERTKIT_API_URL").or_else(|| env("APP__NEWSLETTER_API_URL")) {
        settings.newsletter_api_url = v;
    }
    if let Some(v) = env("CONVERTKIT_API_KEY").or_else(|| env("APP__NEWSLETTER_API_KEY")) {
        settings.newsletter_api_key = v;
    }
    if let Some(v) = env("APP__NEWSLETTER_TIMEOUT_SECS") {
        match v.parse::<u64>() {
            Ok(parsed) => settings.newsletter_timeout_secs = parsed,
            Err(_) => warn!(value = %v, "ignoring invalid APP__NEWSLETTER_TIMEOUT_SECS"),
        }
    }

    settings
}

pub fn prepare_database_url(raw_database_url: &str) -> anyhow::Result<String> {
    let database_url = normalize_database_url(raw_database_url);
    storage::ensure_sqlite_parent_dir_exists(&database_url)?;
    Ok(database_url)
}

fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite::memory:")
        || raw_database_url.starts_with("sqlite://")
        || raw_database_url.contains("://")
    {
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite:") {
        let path = path.replace('\\', "/");
        return format!("sqlite://{path}");
    }

    format!("sqlite://{}", raw_database_url.replace('\\', "/"))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
