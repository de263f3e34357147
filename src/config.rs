use crate::error::ConfigError;
use chrono::Duration;
use std::net::SocketAddr;

/// Defaults used when the environment leaves a setting unset.
const DEFAULT_API_URL: &str = "http://localhost:8080";
const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_SESSION_HOURS: i64 = 2;
const DEFAULT_MAX_UPLOAD_MB: usize = 512;

/// Runtime configuration of the web console.
#[derive(Debug, Clone)]
pub struct WebConfig {
    /// Origin of the NAS backend, without the `/api/v1` suffix.
    pub api_url: String,
    pub listen_addr: SocketAddr,
    /// Cookie lifetime, and the assumed lifetime of tokens that carry no `exp`.
    pub session_lifetime: Duration,
    pub secure_cookie: bool,
    /// Largest multipart upload accepted before forwarding to the backend.
    pub max_upload_bytes: usize,
}

impl WebConfig {
    /// Read configuration from `EASYNAS_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_url = lookup("EASYNAS_API_URL")
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        if !api_url.starts_with("http://") && !api_url.starts_with("https://") {
            return Err(ConfigError::Invalid {
                name: "EASYNAS_API_URL",
                value: api_url,
            });
        }

        let listen_raw =
            lookup("EASYNAS_LISTEN_ADDR").unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string());
        let listen_addr = listen_raw.parse().map_err(|_| ConfigError::Invalid {
            name: "EASYNAS_LISTEN_ADDR",
            value: listen_raw.clone(),
        })?;

        let session_hours = match lookup("EASYNAS_SESSION_HOURS") {
            Some(raw) => match raw.parse::<i64>() {
                Ok(hours) if hours > 0 => hours,
                _ => {
                    return Err(ConfigError::Invalid {
                        name: "EASYNAS_SESSION_HOURS",
                        value: raw,
                    });
                }
            },
            None => DEFAULT_SESSION_HOURS,
        };

        let secure_cookie = match lookup("EASYNAS_SECURE_COOKIE").as_deref() {
            None | Some("") | Some("0") | Some("false") => false,
            Some("1") | Some("true") => true,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "EASYNAS_SECURE_COOKIE",
                    value: other.to_string(),
                });
            }
        };

        let max_upload_bytes = match lookup("EASYNAS_MAX_UPLOAD_MB") {
            Some(raw) => raw
                .parse::<usize>()
                .ok()
                .and_then(|mb| mb.checked_mul(1024 * 1024))
                .ok_or_else(|| ConfigError::Invalid {
                    name: "EASYNAS_MAX_UPLOAD_MB",
                    value: raw.clone(),
                })?,
            None => DEFAULT_MAX_UPLOAD_MB * 1024 * 1024,
        };

        Ok(Self {
            api_url,
            listen_addr,
            session_lifetime: Duration::hours(session_hours),
            secure_cookie,
            max_upload_bytes,
        })
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
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = WebConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.api_url, "http://localhost:8080");
        assert_eq!(config.listen_addr.port(), 3000);
        assert_eq!(config.session_lifetime, Duration::hours(2));
        assert!(!config.secure_cookie);
        assert_eq!(config.max_upload_bytes, 512 * 1024 * 1024);
    }

    #[test]
    fn test_trailing_slash_stripped() {
        let config =
            WebConfig::from_lookup(lookup_from(&[("EASYNAS_API_URL", "https://nas.lan/")]))
                .unwrap();
        assert_eq!(config.api_url, "https://nas.lan");
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(WebConfig::from_lookup(lookup_from(&[("EASYNAS_API_URL", "nas.lan")])).is_err());
        assert!(
            WebConfig::from_lookup(lookup_from(&[("EASYNAS_LISTEN_ADDR", "nowhere")])).is_err()
        );
        assert!(WebConfig::from_lookup(lookup_from(&[("EASYNAS_SESSION_HOURS", "0")])).is_err());
        assert!(
            WebConfig::from_lookup(lookup_from(&[("EASYNAS_SECURE_COOKIE", "maybe")])).is_err()
        );
        assert!(
            WebConfig::from_lookup(lookup_from(&[("EASYNAS_MAX_UPLOAD_MB", "-1")])).is_err()
        );
        assert!(
            WebConfig::from_lookup(lookup_from(&[(
                "EASYNAS_MAX_UPLOAD_MB",
                &usize::MAX.to_string()
            )]))
            .is_err()
        );
    }
}
