use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::store::mongodb_store::MongoDBConfig;

/// Which store backend `connect_db` should build.
///
/// When no MongoDB URI is configured the server keeps everything in memory,
/// which is what the tests and a bare `cargo run` use.
#[derive(Debug, Clone)]
pub enum StoreBackend {
    Memory,
    MongoDB(MongoDBConfig),
}

/// Database settings as they appear in the YAML file.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct DatabaseConfig {
    pub name: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            name: "donation_tracker".to_string(),
        }
    }
}
