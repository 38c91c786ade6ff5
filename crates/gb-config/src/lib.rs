//! # gb-config
//!
//! Typed application settings. Values come from the process environment,
//! optionally seeded from a `.env` file, with defaults for everything that
//! is not a credential.

use gb_core::auth::EmailPolicy;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Source(#[from] config::ConfigError),

    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    pub google_client_id: String,
    pub google_client_secret: SecretString,
    /// Public URL the app is served from, e.g. `https://gripes.corp.example`
    pub base_url: String,
    pub data_file: PathBuf,
    pub bind_address: String,
    pub port: u16,
    pub static_dir: PathBuf,
    pub admin_email: Option<String>,
    /// Exact domain match, takes precedence over the pattern
    pub allowed_email_domain: Option<String>,
    /// Case-insensitive substring match
    pub allowed_email_pattern: Option<String>,
    /// Explicit opt-in to admit any Google account when no domain or pattern is set
    pub allowed_email_any: bool,
    pub rate_limit_max: usize,
    pub rate_limit_window_secs: u64,
    pub rate_limit_sweep_secs: u64,
}

impl AppConfig {
    /// Reads `.env` (if present) and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            log::debug!("loaded environment from {}", path.display());
        }
        Self::from_env_source(config::Environment::default().try_parsing(true))
    }

    /// Builds the config from any environment-shaped source (upper-case keys).
    pub fn from_env_source(source: config::Environment) -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .set_default("google_client_id", "")?
            .set_default("google_client_secret", "")?
            .set_default("base_url", "")?
            .set_default("data_file", "data/complaints.json")?
            .set_default("bind_address", "0.0.0.0")?
            .set_default("port", 8045)?
            .set_default("static_dir", "static")?
            .set_default("allowed_email_any", false)?
            .set_default("rate_limit_max", 5)?
            .set_default("rate_limit_window_secs", 60)?
            .set_default("rate_limit_sweep_secs", 300)?
            .add_source(source)
            .build()?;

        let config: AppConfig = settings.try_deserialize()?;
        config.validate()
    }

    fn validate(mut self) -> Result<Self, ConfigError> {
        if self.google_client_id.trim().is_empty() {
            return Err(ConfigError::Missing("GOOGLE_CLIENT_ID"));
        }
        if self.google_client_secret.expose_secret().trim().is_empty() {
            return Err(ConfigError::Missing("GOOGLE_CLIENT_SECRET"));
        }
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::Missing("BASE_URL"));
        }
        let scheme = self.base_url.to_ascii_lowercase();
        if !scheme.starts_with("http://") && !scheme.starts_with("https://") {
            return Err(ConfigError::Invalid(
                "BASE_URL",
                "must start with http:// or https://".to_string(),
            ));
        }
        if self.rate_limit_window_secs == 0 {
            return Err(ConfigError::Invalid(
                "RATE_LIMIT_WINDOW_SECS",
                "must be positive".to_string(),
            ));
        }

        self.base_url = self.base_url.trim_end_matches('/').to_string();
        self.admin_email = non_blank(self.admin_email);
        self.allowed_email_domain = non_blank(
            self.allowed_email_domain
                .map(|d| d.trim().trim_start_matches('@').to_string()),
        );
        self.allowed_email_pattern = non_blank(self.allowed_email_pattern);
        if self.allowed_email_domain.is_none()
            && self.allowed_email_pattern.is_none()
            && !self.allowed_email_any
        {
            return Err(ConfigError::Missing(
                "ALLOWED_EMAIL_DOMAIN or ALLOWED_EMAIL_PATTERN",
            ));
        }
        Ok(self)
    }

    pub fn email_policy(&self) -> EmailPolicy {
        if let Some(domain) = &self.allowed_email_domain {
            EmailPolicy::Domain(domain.clone())
        } else if let Some(pattern) = &self.allowed_email_pattern {
            EmailPolicy::Contains(pattern.clone())
        } else {
            EmailPolicy::Any
        }
    }

    /// Cookies are only marked `Secure` when the public URL is https.
    pub fn secure_cookies(&self) -> bool {
        self.base_url.to_ascii_lowercase().starts_with("https://")
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }

    pub fn rate_limit_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.rate_limit_sweep_secs)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(vars: &[(&str, &str)]) -> config::Environment {
        let map: config::Map<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        config::Environment::default()
            .try_parsing(true)
            .source(Some(map))
    }

    const REQUIRED: [(&str, &str); 3] = [
        ("GOOGLE_CLIENT_ID", "client-123"),
        ("GOOGLE_CLIENT_SECRET", "shh"),
        ("BASE_URL", "https://gripes.corp.example/"),
    ];

    fn with_domain() -> Vec<(&'static str, &'static str)> {
        let mut vars = REQUIRED.to_vec();
        vars.push(("ALLOWED_EMAIL_DOMAIN", "corp.example"));
        vars
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_env_source(env(&with_domain())).unwrap();
        assert_eq!(config.data_file, PathBuf::from("data/complaints.json"));
        assert_eq!(config.port, 8045);
        assert_eq!(config.bind_address, "0.0.0.0");
        assert_eq!(config.rate_limit_max, 5);
        assert_eq!(config.rate_limit_window(), Duration::from_secs(60));
        assert_eq!(config.rate_limit_sweep_interval(), Duration::from_secs(300));
        assert_eq!(config.base_url, "https://gripes.corp.example");
        assert!(config.secure_cookies());
        assert_eq!(config.admin_email, None);
        assert!(!config.allowed_email_any);
        assert_eq!(config.email_policy(), EmailPolicy::Domain("corp.example".into()));
    }

    #[test]
    fn test_email_restriction_required() {
        let err = AppConfig::from_env_source(env(&REQUIRED)).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Missing("ALLOWED_EMAIL_DOMAIN or ALLOWED_EMAIL_PATTERN")
        ));

        let mut vars = REQUIRED.to_vec();
        vars.extend([("ALLOWED_EMAIL_DOMAIN", "  "), ("ALLOWED_EMAIL_PATTERN", "")]);
        assert!(AppConfig::from_env_source(env(&vars)).is_err());

        let mut vars = REQUIRED.to_vec();
        vars.push(("ALLOWED_EMAIL_ANY", "true"));
        let config = AppConfig::from_env_source(env(&vars)).unwrap();
        assert_eq!(config.email_policy(), EmailPolicy::Any);
        assert!(config.email_policy().permits("eve@gmail.com"));
    }

    #[test]
    fn test_domain_leading_at_is_stripped() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("ALLOWED_EMAIL_DOMAIN", " @Corp.Example "));
        let config = AppConfig::from_env_source(env(&vars)).unwrap();
        assert_eq!(config.email_policy(), EmailPolicy::Domain("Corp.Example".into()));
        assert!(config.email_policy().permits("alice@corp.example"));

        let mut vars = REQUIRED.to_vec();
        vars.push(("ALLOWED_EMAIL_DOMAIN", "@"));
        assert!(AppConfig::from_env_source(env(&vars)).is_err());
    }

    #[test]
    fn test_overrides() {
        let mut vars = REQUIRED.to_vec();
        vars.extend([
            ("BASE_URL", "http://localhost:8045"),
            ("DATA_FILE", "/var/lib/gripes/complaints.json"),
            ("PORT", "9000"),
            ("ADMIN_EMAIL", "boss@corp.example"),
            ("ALLOWED_EMAIL_PATTERN", "pynest"),
            ("RATE_LIMIT_MAX", "20"),
        ]);
        let config = AppConfig::from_env_source(env(&vars)).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.rate_limit_max, 20);
        assert_eq!(config.admin_email.as_deref(), Some("boss@corp.example"));
        assert_eq!(config.email_policy(), EmailPolicy::Contains("pynest".into()));
        assert!(!config.secure_cookies());
    }

    #[test]
    fn test_domain_wins_over_pattern() {
        let mut vars = REQUIRED.to_vec();
        vars.extend([
            ("ALLOWED_EMAIL_DOMAIN", "corp.example"),
            ("ALLOWED_EMAIL_PATTERN", "pynest"),
        ]);
        let config = AppConfig::from_env_source(env(&vars)).unwrap();
        assert_eq!(config.email_policy(), EmailPolicy::Domain("corp.example".into()));
    }

    #[test]
    fn test_missing_credentials() {
        let err = AppConfig::from_env_source(env(&REQUIRED[1..])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("GOOGLE_CLIENT_ID")));

        let err = AppConfig::from_env_source(env(&REQUIRED[..2])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("BASE_URL")));
    }

    #[test]
    fn test_bad_base_url_and_window() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("BASE_URL", "gripes.corp.example"));
        let err = AppConfig::from_env_source(env(&vars)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid("BASE_URL", _)));

        let mut vars = REQUIRED.to_vec();
        vars.push(("RATE_LIMIT_WINDOW_SECS", "0"));
        let err = AppConfig::from_env_source(env(&vars)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid("RATE_LIMIT_WINDOW_SECS", _)));
    }

    #[test]
    fn test_blank_admin_is_none() {
        let mut vars = with_domain();
        vars.push(("ADMIN_EMAIL", "  "));
        let config = AppConfig::from_env_source(env(&vars)).unwrap();
        assert_eq!(config.admin_email, None);
    }
}
