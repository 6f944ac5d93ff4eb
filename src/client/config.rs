use std::path::PathBuf;

use figment::providers::{Env, Serialized};
use figment::Figment;
use serde::{Deserialize, Serialize};

use super::dev_proxy::DevProxyConfig;

/// Client settings, read from `VITE_API_BASE_URL` / `VITE_BACKEND_URL` and
/// `DONATION_TRACKER_STORAGE`.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct ClientConfig {
    pub api_base_url: Option<String>,
    /// Second name for the same setting; `api_base_url` wins when both are set.
    pub backend_url: Option<String>,
    /// JSON key/value file holding the session token.
    pub storage_path: PathBuf,
    pub session_cookie: String,
    pub request_timeout_ms: u64,
    pub dev_proxy: DevProxyConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let profile = std::env::var_os("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(std::env::temp_dir);
        Self {
            api_base_url: None,
            backend_url: None,
            storage_path: profile.join(".donation-tracker").join("storage.json"),
            session_cookie: "token".to_string(),
            request_timeout_ms: 10_000,
            dev_proxy: DevProxyConfig::default(),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, String> {
        Figment::from(Serialized::defaults(ClientConfig::default()))
            .merge(Env::prefixed("VITE_").only(&["api_base_url", "backend_url"]))
            .merge(
                Env::raw()
                    .only(&["donation_tracker_storage"])
                    .map(|_| "storage_path".into()),
            )
            .extract()
            .map_err(|e| format!("Error loading client configuration: {}", e))
    }

    /// The configured backend origin without a trailing slash, if any.
    pub fn base_url(&self) -> Option<String> {
        [&self.api_base_url, &self.backend_url]
            .into_iter()
            .flatten()
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .find(|url| !url.is_empty())
    }

    /// Absolute URL for an `/api/...` path: the base URL when set, otherwise
    /// whatever the dev proxy forwards it to.
    pub fn endpoint(&self, path: &str) -> Result<String, String> {
        match self.base_url() {
            Some(base) => Ok(format!("{}{}", base, path)),
            None => self.dev_proxy.rewrite(path).ok_or_else(|| {
                format!(
                    "No backend URL configured for {} (set VITE_API_BASE_URL)",
                    path
                )
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(api: Option<&str>, backend: Option<&str>, proxy: bool) -> ClientConfig {
        ClientConfig {
            api_base_url: api.map(str::to_string),
            backend_url: backend.map(str::to_string),
            dev_proxy: DevProxyConfig {
                enabled: proxy,
                ..DevProxyConfig::default()
            },
            ..ClientConfig::default()
        }
    }

    #[test]
    fn api_base_url_takes_precedence() {
        let cfg = config(Some("https://api.example.org/"), Some("https://other"), false);
        assert_eq!(
            cfg.endpoint("/api/auth/me").unwrap(),
            "https://api.example.org/api/auth/me"
        );
    }

    #[test]
    fn backend_url_is_used_when_api_base_is_blank() {
        let cfg = config(Some("  "), Some("https://backend.example.org"), false);
        assert_eq!(
            cfg.base_url().as_deref(),
            Some("https://backend.example.org")
        );
    }

    #[test]
    fn falls_back_to_dev_proxy_then_errors() {
        let cfg = config(None, None, true);
        assert_eq!(
            cfg.endpoint("/api/auth/me").unwrap(),
            "http://127.0.0.1:5000/api/auth/me"
        );

        let cfg = config(None, None, false);
        assert!(cfg.endpoint("/api/auth/me").is_err());
    }
}
