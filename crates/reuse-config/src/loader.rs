//! Configuration loader with file and environment variable support

use crate::{AppConfig, ConfigError};
use std::env;
use std::path::PathBuf;
use tracing::{info, warn};

/// Standard config file search paths
const CONFIG_PATHS: &[&str] = &[
    "config.toml",
    "reuse.toml",
    "./config/config.toml",
    "./config/reuse.toml",
    "/etc/reuse/config.toml",
];

/// Configuration loader
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Create a loader with a specific config file path
    pub fn with_path<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            config_path: Some(path.into()),
        }
    }

    /// Load configuration from file (if found) with environment variable overrides
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        self.load_with(|key| env::var(key).ok())
    }

    /// Same as [`load`](Self::load) with an explicit variable source.
    pub fn load_with<F>(&self, lookup: F) -> Result<AppConfig, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = AppConfig::default();

        if let Some(path) = self.find_config_file(&lookup) {
            info!(?path, "Loading configuration from file");
            config = AppConfig::from_file(&path)?;
        }

        apply_overrides(&mut config, &lookup);
        config.validate()?;

        Ok(config)
    }

    fn find_config_file<F>(&self, lookup: &F) -> Option<PathBuf>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = &self.config_path {
            if path.exists() {
                return Some(path.clone());
            }
            warn!(?path, "Configured file does not exist, searching defaults");
        }

        if let Some(path) = lookup("REUSE_CONFIG").map(PathBuf::from) {
            if path.exists() {
                return Some(path);
            }
        }

        CONFIG_PATHS
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn apply_overrides<F>(config: &mut AppConfig, lookup: &F)
where
    F: Fn(&str) -> Option<String>,
{
    // HTTP
    if let Some(port) = lookup("REUSE_HTTP_PORT").and_then(|v| v.parse().ok()) {
        config.http.port = port;
    }
    if let Some(val) = lookup("REUSE_HTTP_HOST") {
        config.http.host = val;
    }
    if let Some(val) = lookup("REUSE_CORS_ORIGINS") {
        config.http.cors_origins = val
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
    }

    // Database
    if let Some(val) = lookup("REUSE_DATABASE_URL") {
        config.database.url = val;
    }
    if let Some(n) = lookup("REUSE_DATABASE_MAX_CONNECTIONS").and_then(|v| v.parse().ok()) {
        config.database.max_connections = n;
    }

    // Auth
    if let Some(val) = lookup("REUSE_JWT_SECRET") {
        config.auth.jwt_secret = val;
    }
    if let Some(minutes) = lookup("REUSE_ACCESS_TOKEN_MINUTES").and_then(|v| v.parse().ok()) {
        config.auth.access_token_minutes = minutes;
    }
    if let Some(minutes) = lookup("REUSE_REFRESH_TOKEN_MINUTES").and_then(|v| v.parse().ok()) {
        config.auth.refresh_token_minutes = minutes;
    }
    if let Some(val) = lookup("REUSE_ADMIN_EMAIL") {
        config.auth.admin_email = val;
    }
    if let Some(val) = lookup("REUSE_ADMIN_PASSWORD") {
        config.auth.admin_password = val;
    }

    // General
    if let Some(val) = lookup("REUSE_DEV_MODE") {
        config.dev_mode = matches!(val.as_str(), "true" | "1");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_env_overrides_apply_over_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[http]\nport = 9000\n\n[auth]\njwt_secret = \"from-file\"").unwrap();

        let env = vars(&[
            ("REUSE_HTTP_PORT", "9500"),
            ("REUSE_CORS_ORIGINS", "http://a.test, http://b.test,"),
            ("REUSE_ACCESS_TOKEN_MINUTES", "15"),
        ]);

        let config = ConfigLoader::with_path(file.path())
            .load_with(|k| env.get(k).cloned())
            .unwrap();

        assert_eq!(config.http.port, 9500);
        assert_eq!(config.http.cors_origins, vec!["http://a.test", "http://b.test"]);
        assert_eq!(config.auth.access_token_minutes, 15);
        assert_eq!(config.jwt_secret(), "from-file");
    }

    #[test]
    fn test_unparseable_override_is_ignored() {
        let env = vars(&[("REUSE_HTTP_PORT", "not-a-port"), ("REUSE_DEV_MODE", "1")]);
        let config = ConfigLoader::with_path("/nonexistent/reuse.toml")
            .load_with(|k| env.get(k).cloned())
            .unwrap();
        assert_eq!(config.http.port, 8000);
        assert!(config.dev_mode);
    }

    #[test]
    fn test_validation_runs_after_overrides() {
        let env = vars(&[("REUSE_JWT_SECRET", "")]);
        let result = ConfigLoader::with_path("/nonexistent/reuse.toml")
            .load_with(|k| env.get(k).cloned());
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_admin_credentials_from_env() {
        let env = vars(&[
            ("REUSE_JWT_SECRET", "x"),
            ("REUSE_ADMIN_EMAIL", "root@campus.edu"),
            ("REUSE_ADMIN_PASSWORD", "correct horse"),
        ]);
        let config = ConfigLoader::with_path("/nonexistent/reuse.toml")
            .load_with(|k| env.get(k).cloned())
            .unwrap();
        assert_eq!(config.auth.admin_credentials(), Some(("root@campus.edu", "correct horse")));
    }
}
