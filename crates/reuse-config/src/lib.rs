//! ReUse Exchange Configuration
//!
//! TOML-based configuration with environment variable overrides. The root
//! [`AppConfig`] is built once at process start and handed to constructors.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

mod loader;

pub use loader::ConfigLoader;

/// Signing secret used when `dev_mode` is on and no secret is configured.
pub const DEV_JWT_SECRET: &str = "reuse-dev-secret-do-not-use-in-production";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Root application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,

    /// Enables the development signing secret fallback
    pub dev_mode: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            database: DatabaseConfig::default(),
            auth: AuthConfig::default(),
            dev_mode: false,
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub port: u16,
    pub host: String,
    /// Empty list allows any origin
    pub cors_origins: Vec<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            host: "0.0.0.0".to_string(),
            cors_origins: Vec::new(),
        }
    }
}

/// SQLite connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://reuse.db".to_string(),
            max_connections: 5,
        }
    }
}

/// Token signing and bootstrap admin configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HS256 signing secret
    pub jwt_secret: String,
    pub access_token_minutes: i64,
    pub refresh_token_minutes: i64,
    pub min_password_length: usize,

    /// Superuser created at startup when both fields are set
    pub admin_email: String,
    pub admin_password: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            access_token_minutes: 60,
            refresh_token_minutes: 60 * 24 * 7,
            min_password_length: 8,
            admin_email: String::new(),
            admin_password: String::new(),
        }
    }
}

impl AuthConfig {
    pub fn admin_credentials(&self) -> Option<(&str, &str)> {
        if self.admin_email.is_empty() || self.admin_password.is_empty() {
            None
        } else {
            Some((self.admin_email.as_str(), self.admin_password.as_str()))
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration with environment variable override
    pub fn load() -> Result<Self, ConfigError> {
        ConfigLoader::new().load()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret().is_empty() {
            return Err(ConfigError::ValidationError(
                "auth.jwt_secret must be set outside dev mode".to_string(),
            ));
        }
        if self.auth.access_token_minutes <= 0 || self.auth.refresh_token_minutes <= 0 {
            return Err(ConfigError::ValidationError(
                "token lifetimes must be positive".to_string(),
            ));
        }
        if self.database.url.is_empty() {
            return Err(ConfigError::ValidationError("database.url must be set".to_string()));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::ValidationError(
                "database.max_connections must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// The configured secret, or the development fallback in dev mode.
    pub fn jwt_secret(&self) -> &str {
        if self.auth.jwt_secret.is_empty() && self.dev_mode {
            DEV_JWT_SECRET
        } else {
            &self.auth.jwt_secret
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.http.host, self.http.port)
    }

    /// Generate an example TOML configuration
    pub fn example_toml() -> String {
        r#"# ReUse Exchange Configuration
# Environment variables (REUSE_*) override these settings

[http]
port = 8000
host = "0.0.0.0"
cors_origins = ["http://localhost:5173"]

[database]
url = "sqlite://reuse.db"
max_connections = 5

[auth]
jwt_secret = "change-me"
access_token_minutes = 60
refresh_token_minutes = 10080
min_password_length = 8
admin_email = "admin@example.com"
admin_password = "change-me-please"

dev_mode = false
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.http.port, 8000);
        assert_eq!(config.auth.access_token_minutes, 60);
        assert_eq!(config.auth.refresh_token_minutes, 10080);
        assert!(config.auth.admin_credentials().is_none());
    }

    #[test]
    fn test_empty_secret_rejected_outside_dev_mode() {
        let config = AppConfig::default();
        assert!(matches!(config.validate(), Err(ConfigError::ValidationError(_))));

        let config = AppConfig { dev_mode: true, ..AppConfig::default() };
        assert!(config.validate().is_ok());
        assert_eq!(config.jwt_secret(), DEV_JWT_SECRET);
    }

    #[test]
    fn test_non_positive_ttl_rejected() {
        let mut config = AppConfig { dev_mode: true, ..AppConfig::default() };
        config.auth.access_token_minutes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_example_toml_parses() {
        let config: AppConfig = toml::from_str(&AppConfig::example_toml()).unwrap();
        assert_eq!(config.http.cors_origins, vec!["http://localhost:5173"]);
        assert_eq!(config.auth.admin_credentials(), Some(("admin@example.com", "change-me-please")));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_file_partial() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[auth]\njwt_secret = \"s3cret\"\n\n[http]\nport = 9100").unwrap();

        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.http.port, 9100);
        assert_eq!(config.http.host, "0.0.0.0");
        assert_eq!(config.jwt_secret(), "s3cret");
        assert_eq!(config.database.max_connections, 5);
    }

    #[test]
    fn test_from_file_invalid_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[http\nport = ").unwrap();
        assert!(matches!(AppConfig::from_file(file.path()), Err(ConfigError::ParseError(_))));
    }
}
