use serde::{Deserialize, Serialize};

/// Development-only forwarding rule: relative `/api` paths go to the local backend.
///
/// Enabled by default in debug builds only, so release builds never forward.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct DevProxyConfig {
    pub enabled: bool,
    pub prefix: String,
    pub target: String,
}

impl Default for DevProxyConfig {
    fn default() -> Self {
        Self {
            enabled: cfg!(debug_assertions),
            prefix: "/api".to_string(),
            target: "http://127.0.0.1:5000".to_string(),
        }
    }
}

impl DevProxyConfig {
    /// Returns the forwarded URL for `path`, or `None` when the rule does not apply.
    pub fn rewrite(&self, path: &str) -> Option<String> {
        if !self.enabled {
            return None;
        }
        let rest = path.strip_prefix(self.prefix.as_str())?;
        if !(rest.is_empty() || rest.starts_with('/') || rest.starts_with('?')) {
            return None;
        }
        Some(format!("{}{}", self.target.trim_end_matches('/'), path))
    }
}
