use std::{collections::HashMap, fs, path::Path};

use anyhow::{bail, Context};
use serde::Deserialize;
use url::Url;

pub const SETTINGS_FILE: &str = "client.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientSettings {
    pub server_url: String,
    pub auth_token: Option<String>,
    pub user_id: Option<String>,
    pub request_timeout_secs: u64,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:5000/api".into(),
            auth_token: None,
            user_id: None,
            request_timeout_secs: 30,
        }
    }
}

pub fn load_settings() -> ClientSettings {
    load_settings_from(Path::new(SETTINGS_FILE), |key| std::env::var(key).ok())
}

/// Defaults, then the flat TOML file at `path`, then environment overrides.
pub fn load_settings_from(
    path: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> ClientSettings {
    let mut settings = ClientSettings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        if let Ok(file_cfg) = toml::from_str::<HashMap<String, toml::Value>>(&raw) {
            let text = |key: &str| match file_cfg.get(key) {
                Some(toml::Value::String(v)) => Some(v.clone()),
                Some(toml::Value::Integer(v)) => Some(v.to_string()),
                _ => None,
            };
            if let Some(v) = text("server_url") {
                settings.server_url = v;
            }
            if let Some(v) = text("auth_token") {
                settings.auth_token = Some(v);
            }
            if let Some(v) = text("user_id") {
                settings.user_id = Some(v);
            }
            if let Some(parsed) = text("request_timeout_secs").and_then(|v| v.parse().ok()) {
                settings.request_timeout_secs = parsed;
            }
        }
    }

    if let Some(v) = env("RAVEL_SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = env("APP__SERVER_URL") {
        settings.server_url = v;
    }

    if let Some(v) = env("RAVEL_AUTH_TOKEN") {
        settings.auth_token = Some(v);
    }
    if let Some(v) = env("APP__AUTH_TOKEN") {
        settings.auth_token = Some(v);
    }

    if let Some(v) = env("RAVEL_USER_ID") {
        settings.user_id = Some(v);
    }
    if let Some(v) = env("APP__USER_ID") {
        settings.user_id = Some(v);
    }

    if let Some(v) = env("APP__REQUEST_TIMEOUT_SECS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.request_timeout_secs = parsed;
        }
    }

    settings
}

pub fn prepare_server_url(raw_server_url: &str) -> anyhow::Result<String> {
    let server_url = normalize_server_url(raw_server_url);
    let parsed =
        Url::parse(&server_url).with_context(|| format!("invalid server url '{server_url}'"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        bail!("unsupported scheme '{}' in server url", parsed.scheme());
    }
    Ok(server_url)
}

fn normalize_server_url(raw_server_url: &str) -> String {
    let trimmed = raw_server_url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return ClientSettings::default().server_url;
    }
    if trimmed.contains("://") {
        return trimmed.to_string();
    }
    format!("http://{trimmed}")
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
