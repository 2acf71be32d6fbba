use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Carelink";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Backend used when `CARELINK_API_URL` is not set.
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Request timeout used when `CARELINK_TIMEOUT_SECS` is not set.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

const API_URL_ENV: &str = "CARELINK_API_URL";
const TIMEOUT_ENV: &str = "CARELINK_TIMEOUT_SECS";

/// Log filter applied when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "carelink=info,carelink_lib=info,warn"
}

/// Get the application data directory
/// ~/Carelink/ on all platforms
pub fn app_data_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(APP_NAME))
}

/// File holding the persisted login session.
pub fn session_file() -> Option<PathBuf> {
    app_data_dir().map(|dir| dir.join("session.json"))
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value}")]
    InvalidValue { var: &'static str, value: String },
}

/// Where the backend lives and how long to wait for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl ApiConfig {
    pub fn new(base_url: &str, timeout_secs: u64) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout_secs,
        }
    }

    /// Read overrides from the environment, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let base_url = lookup(API_URL_ENV)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue {
                var: API_URL_ENV,
                value: base_url,
            });
        }

        let timeout_secs = match lookup(TIMEOUT_ENV) {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        var: TIMEOUT_ENV,
                        value: raw,
                    })
                }
            },
            None => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self::new(&base_url, timeout_secs))
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL, DEFAULT_TIMEOUT_SECS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn session_file_under_app_data() {
        if let (Some(app), Some(file)) = (app_data_dir(), session_file()) {
            assert!(file.starts_with(app));
            assert!(file.ends_with("session.json"));
        }
    }

    #[test]
    fn app_name_is_carelink() {
        assert_eq!(APP_NAME, "Carelink");
    }

    #[test]
    fn defaults_when_env_empty() {
        let config = ApiConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, ApiConfig::default());
        assert_eq!(config.base_url, "http://localhost:8000");
        assert_eq!(config.timeout_secs, 30);
    }

    #[test]
    fn env_overrides_are_applied() {
        let config = ApiConfig::from_lookup(lookup_from(&[
            ("CARELINK_API_URL", "https://api.example.org/"),
            ("CARELINK_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();
        assert_eq!(config.base_url, "https://api.example.org");
        assert_eq!(config.timeout_secs, 5);
    }

    #[test]
    fn rejects_non_http_url() {
        let err = ApiConfig::from_lookup(lookup_from(&[("CARELINK_API_URL", "ftp://x")]))
            .unwrap_err();
        assert!(err.to_string().contains("CARELINK_API_URL"));
    }

    #[test]
    fn rejects_zero_or_garbage_timeout() {
        assert!(ApiConfig::from_lookup(lookup_from(&[("CARELINK_TIMEOUT_SECS", "0")])).is_err());
        assert!(ApiConfig::from_lookup(lookup_from(&[("CARELINK_TIMEOUT_SECS", "soon")])).is_err());
    }

    #[test]
    fn new_trims_trailing_slashes() {
        assert_eq!(ApiConfig::new("http://h:1//", 1).base_url, "http://h:1");
    }
}
