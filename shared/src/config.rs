use tracing::{info, warn};

use crate::capabilities::ApiBaseUrl;
use crate::{ConfigError, API_BASE_URL_ENV, DEFAULT_API_BASE_URL};

/// Runtime configuration for the session core.
///
/// Resolution order: explicit override from the shell, then the
/// `HOUSING_API_BASE_URL` environment variable, then the local development
/// default. An invalid override is reported and the previous value kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub api_base_url: ApiBaseUrl,
}

impl AppConfig {
    pub fn with_base_url(raw: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            api_base_url: ApiBaseUrl::parse(raw)?,
        })
    }

    /// Reads the base URL from the environment, falling back to the default
    /// when the variable is unset or invalid.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        match lookup(API_BASE_URL_ENV) {
            Some(raw) if !raw.trim().is_empty() => match Self::with_base_url(&raw) {
                Ok(config) => {
                    info!(api_base_url = %config.api_base_url, "API base URL from environment");
                    config
                }
                Err(error) => {
                    warn!(%error, env = API_BASE_URL_ENV, "ignoring invalid API base URL");
                    Self::default()
                }
            },
            _ => Self::default(),
        }
    }

    /// Applies a shell-provided override on top of the current config.
    pub fn apply_override(&mut self, raw: Option<&str>) -> Result<(), ConfigError> {
        if let Some(raw) = raw {
            *self = Self::with_base_url(raw)?;
        }
        Ok(())
    }
}

impl Default for AppConfig {
    #[allow(clippy::expect_used)]
    fn default() -> Self {
        Self {
            api_base_url: ApiBaseUrl::parse(DEFAULT_API_BASE_URL)
                .expect("default API base URL is valid"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_points_at_local_server() {
        let config = AppConfig::default();
        assert_eq!(config.api_base_url.as_str(), "http://localhost:8001/");
    }

    #[test]
    fn test_env_override() {
        let config = AppConfig::from_lookup(|key| {
            (key == API_BASE_URL_ENV).then(|| "https://housing.example.com".to_string())
        });
        assert_eq!(config.api_base_url.host(), "housing.example.com");
    }

    #[test]
    fn test_invalid_env_falls_back_to_default() {
        let config = AppConfig::from_lookup(|_| Some("not a url".to_string()));
        assert_eq!(config, AppConfig::default());

        let config = AppConfig::from_lookup(|_| Some("   ".to_string()));
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_apply_override() {
        let mut config = AppConfig::default();
        config.apply_override(None).unwrap();
        assert_eq!(config, AppConfig::default());

        config
            .apply_override(Some("https://api.example.com"))
            .unwrap();
        assert_eq!(config.api_base_url.host(), "api.example.com");

        assert!(config.apply_override(Some("ftp://nope")).is_err());
        assert_eq!(config.api_base_url.host(), "api.example.com");
    }
}
