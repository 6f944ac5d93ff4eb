use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The `logging` section.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
#[serde(default)]
pub struct LoggingConfig {
    /// One of trace, debug, info, warn, error. `RUST_LOG` directives apply on top.
    pub level: String,
    /// `json` for one object per line; anything else prints human-readable output.
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "console".to_string(),
        }
    }
}
