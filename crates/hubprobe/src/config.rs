//! Configuration management for hubprobe
//!
//! Settings are layered: built-in defaults, then `~/.config/hubprobe/config.toml`,
//! then environment variables (optionally loaded from a dotenv file), then
//! whatever the caller overrides explicitly.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ProbeError, Result};

const CONFIG_DIR: &str = "hubprobe";
const CONFIG_FILE: &str = "config.toml";

pub const DEFAULT_AUTH_TOKEN: &str = "mock_auth_token_for_testing";

const URL_VARS: [&str; 2] = ["SUPABASE_URL", "VITE_SUPABASE_URL"];
const KEY_VARS: [&str; 2] = ["SUPABASE_PUBLISHABLE_KEY", "VITE_SUPABASE_PUBLISHABLE_KEY"];
const TOKEN_VAR: &str = "HUBPROBE_AUTH_TOKEN";
const TIMEOUT_VAR: &str = "HUBPROBE_TIMEOUT_SECS";

/// Child profiles the suites act as
///
/// `host`, `guest` and `invitee` must exist remotely. `idle_host` and
/// `idle_friend` should not currently sit in a room (the `core` suite pairs
/// them), and `watched` is the child the function variants are polled for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Fixtures {
    pub host: String,
    pub guest: String,
    pub invitee: String,
    pub idle_host: String,
    pub idle_friend: String,
    pub watched: String,
}

impl Default for Fixtures {
    fn default() -> Self {
        Self {
            host: "a6770634-3be5-4469-94b2-5f9b72f79a47".to_string(),
            guest: "cb8bf3d1-57a4-4d12-9427-869a4eb3770d".to_string(),
            invitee: "3fedd400-7d90-4c33-86e5-350b5827ff71".to_string(),
            idle_host: "2ee6aa7e-7429-43e9-8ea7-000dc8b2f94b".to_string(),
            idle_friend: "15c85505-5c3e-4aac-a831-7bd4c1c28332".to_string(),
            watched: "d771b6d0-1c90-431b-af96-dd6bf7a429f5".to_string(),
        }
    }
}

/// Probe configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Project base URL, e.g. `https://xyz.supabase.co`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_url: Option<String>,
    /// Publishable (anon) key, used for direct REST and RPC calls
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publishable_key: Option<String>,
    /// Bearer token sent to edge functions
    #[serde(default = "default_auth_token")]
    pub auth_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub fixtures: Fixtures,
}

fn default_auth_token() -> String {
    DEFAULT_AUTH_TOKEN.to_string()
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            project_url: None,
            publishable_key: None,
            auth_token: default_auth_token(),
            timeout_secs: None,
            fixtures: Fixtures::default(),
        }
    }
}

impl ProbeConfig {
    /// Get the config directory path
    pub fn config_dir() -> Result<PathBuf> {
        let dir = dirs::config_dir()
            .ok_or_else(|| ProbeError::config("Could not determine config directory"))?
            .join(CONFIG_DIR);
        Ok(dir)
    }

    /// Get the config file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE))
    }

    /// Load config from the default location, or defaults when absent
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load config from `path`, or defaults when the file does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| ProbeError::config_io(path, e))?;
        let config: ProbeConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| ProbeError::config_io(dir, e))?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).map_err(|e| ProbeError::config_io(path, e))?;
        Ok(())
    }

    /// Overlay values from the process environment
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_with(|name| std::env::var(name).ok())
    }

    /// Overlay values from an arbitrary variable lookup
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let first = |names: &[&str]| {
            names
                .iter()
                .filter_map(|name| lookup(name))
                .find(|value| !value.trim().is_empty())
        };

        if let Some(url) = first(&URL_VARS[..]) {
            self.project_url = Some(url);
        }
        if let Some(key) = first(&KEY_VARS[..]) {
            self.publishable_key = Some(key);
        }
        if let Some(token) = first(&[TOKEN_VAR][..]) {
            self.auth_token = token;
        }
        if let Some(raw) = first(&[TIMEOUT_VAR][..]) {
            let secs = raw.trim().parse::<u64>().map_err(|_| {
                ProbeError::config(format!("{} must be a whole number of seconds, got '{}'", TIMEOUT_VAR, raw))
            })?;
            self.timeout_secs = Some(secs);
        }
        Ok(())
    }

    /// Overlay command-line flags, the last layer after file and environment
    pub fn apply_overrides(&mut self, url: Option<&str>, token: Option<&str>) {
        if let Some(url) = url {
            self.project_url = Some(url.to_string());
        }
        if let Some(token) = token {
            self.auth_token = token.to_string();
        }
    }

    /// Project URL without a trailing slash, or an error when unset
    pub fn base_url(&self) -> Result<String> {
        let url = self
            .project_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| {
                ProbeError::config(
                    "Project URL not configured. Set SUPABASE_URL, pass --url, or run 'hubprobe init'.",
                )
            })?;

        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ProbeError::config(format!(
                "Project URL must start with http:// or https://, got '{}'",
                url
            )));
        }

        Ok(url.trim_end_matches('/').to_string())
    }

    /// Publishable key with everything but the first characters hidden
    pub fn masked_key(&self) -> Option<String> {
        self.publishable_key.as_deref().map(mask)
    }

    pub fn masked_auth_token(&self) -> String {
        mask(&self.auth_token)
    }
}

fn mask(secret: &str) -> String {
    let visible: String = secret.chars().take(6).collect();
    if secret.chars().count() > 6 {
        format!("{}…", visible)
    } else {
        "…".to_string()
    }
}

/// Load a dotenv file into the process environment
///
/// With an explicit path the file must exist. Without one, `.env` is looked
/// up from the working directory and silently skipped when missing.
pub fn load_env_file(path: Option<&Path>) -> Result<Option<PathBuf>> {
    match path {
        Some(path) => {
            dotenvy::from_path(path).map_err(|e| {
                ProbeError::config(format!("Failed to load env file {:?}: {}", path, e))
            })?;
            Ok(Some(path.to_path_buf()))
        }
        None => Ok(dotenvy::dotenv().ok()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ProbeConfig::default();
        assert_eq!(config.auth_token, DEFAULT_AUTH_TOKEN);
        assert!(config.project_url.is_none());
        assert_eq!(config.fixtures.host, "a6770634-3be5-4469-94b2-5f9b72f79a47");
    }

    #[test]
    fn test_env_overrides_and_fallbacks() {
        let mut config = ProbeConfig::default();
        config
            .apply_env_with(lookup(&[
                ("VITE_SUPABASE_URL", "https://vite.example.co"),
                ("VITE_SUPABASE_PUBLISHABLE_KEY", "anon-key"),
                ("HUBPROBE_TIMEOUT_SECS", "15"),
            ]))
            .unwrap();

        assert_eq!(config.project_url.as_deref(), Some("https://vite.example.co"));
        assert_eq!(config.publishable_key.as_deref(), Some("anon-key"));
        assert_eq!(config.timeout_secs, Some(15));
        assert_eq!(config.auth_token, DEFAULT_AUTH_TOKEN);
    }

    #[test]
    fn test_primary_var_wins_over_vite_fallback() {
        let mut config = ProbeConfig::default();
        config
            .apply_env_with(lookup(&[
                ("SUPABASE_URL", "https://primary.example.co"),
                ("VITE_SUPABASE_URL", "https://vite.example.co"),
                ("HUBPROBE_AUTH_TOKEN", "real-token"),
            ]))
            .unwrap();

        assert_eq!(config.project_url.as_deref(), Some("https://primary.example.co"));
        assert_eq!(config.auth_token, "real-token");
    }

    #[test]
    fn test_blank_env_value_is_ignored() {
        let mut config = ProbeConfig {
            project_url: Some("https://file.example.co".to_string()),
            ..Default::default()
        };
        config.apply_env_with(lookup(&[("SUPABASE_URL", "  ")])).unwrap();
        assert_eq!(config.project_url.as_deref(), Some("https://file.example.co"));
    }

    #[test]
    fn test_invalid_timeout_is_rejected() {
        let mut config = ProbeConfig::default();
        let err = config
            .apply_env_with(lookup(&[("HUBPROBE_TIMEOUT_SECS", "soon")]))
            .unwrap_err();
        assert!(matches!(err, ProbeError::Config(_)));
    }

    #[test]
    fn test_base_url() {
        let mut config = ProbeConfig::default();
        assert!(config.base_url().is_err());

        config.project_url = Some("https://abc.supabase.co/".to_string());
        assert_eq!(config.base_url().unwrap(), "https://abc.supabase.co");

        config.project_url = Some("abc.supabase.co".to_string());
        assert!(config.base_url().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: ProbeConfig = toml::from_str(
            r#"
            project_url = "https://abc.supabase.co"

            [fixtures]
            host = "host-id"
            "#,
        )
        .unwrap();

        assert_eq!(config.auth_token, DEFAULT_AUTH_TOKEN);
        assert_eq!(config.fixtures.host, "host-id");
        assert_eq!(config.fixtures.guest, Fixtures::default().guest);
    }

    #[test]
    fn test_save_and_load_file() {
        let path = std::env::temp_dir()
            .join(format!("hubprobe-test-{}", uuid::Uuid::new_v4()))
            .join(CONFIG_FILE);

        let config = ProbeConfig {
            project_url: Some("https://abc.supabase.co".to_string()),
            publishable_key: Some("anon".to_string()),
            timeout_secs: Some(5),
            ..Default::default()
        };
        config.save_to(&path).unwrap();

        let loaded = ProbeConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_layering_file_then_env_then_flags() {
        let path = std::env::temp_dir()
            .join(format!("hubprobe-layers-{}", uuid::Uuid::new_v4()))
            .join(CONFIG_FILE);
        ProbeConfig {
            project_url: Some("https://file.example.co".to_string()),
            publishable_key: Some("file-key".to_string()),
            auth_token: "file-token".to_string(),
            timeout_secs: Some(30),
            ..Default::default()
        }
        .save_to(&path)
        .unwrap();

        let mut config = ProbeConfig::load_from(&path).unwrap();
        config
            .apply_env_with(lookup(&[
                ("SUPABASE_URL", "https://env.example.co"),
                ("HUBPROBE_AUTH_TOKEN", "env-token"),
            ]))
            .unwrap();
        assert_eq!(config.project_url.as_deref(), Some("https://env.example.co"));
        assert_eq!(config.auth_token, "env-token");

        config.apply_overrides(Some("https://flag.example.co"), None);
        assert_eq!(config.project_url.as_deref(), Some("https://flag.example.co"));
        assert_eq!(config.auth_token, "env-token");

        config.apply_overrides(None, Some("flag-token"));
        assert_eq!(config.project_url.as_deref(), Some("https://flag.example.co"));
        assert_eq!(config.auth_token, "flag-token");

        // layers without a value leave the file's settings alone
        assert_eq!(config.publishable_key.as_deref(), Some("file-key"));
        assert_eq!(config.timeout_secs, Some(30));

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_missing_file_loads_defaults() {
        let path = std::env::temp_dir().join(format!("hubprobe-missing-{}.toml", uuid::Uuid::new_v4()));
        assert_eq!(ProbeConfig::load_from(&path).unwrap(), ProbeConfig::default());
    }

    #[test]
    fn test_masked_key() {
        let mut config = ProbeConfig::default();
        assert!(config.masked_key().is_none());
        config.publishable_key = Some("eyJhbGciOiJIUzI1NiJ9".to_string());
        assert_eq!(config.masked_key().unwrap(), "eyJhbG…");
        config.publishable_key = Some("abc".to_string());
        assert_eq!(config.masked_key().unwrap(), "…");
        assert_eq!(config.masked_auth_token(), "mock_a…");
    }
}
