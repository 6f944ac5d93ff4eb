use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};

use super::logging::LoggingConfig;
use super::store::{DatabaseConfig, StoreBackend};
use crate::cleanup::CleanupConfig;
use crate::rate_limit::RateLimitConfig;
use crate::store::mongodb_store::MongoDBConfig;

/// Environment variables read straight into the top-level config keys.
const ENV_KEYS: [&str; 5] = ["host", "port", "client_url", "email_service", "mongodb_uri"];

/// Main server configuration.
///
/// Values are layered: built-in defaults, then the YAML file, then the
/// environment (`PORT`, `HOST`, `CLIENT_URL`, `EMAIL_SERVICE`, `MONGODB_URI`).
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origin; credentials are allowed for it.
    pub client_url: String,
    pub email_service: Option<String>,
    pub mongodb_uri: Option<String>,
    pub database: DatabaseConfig,
    /// Maximum accepted request body, in bytes.
    pub body_limit_bytes: usize,
    pub session: SessionConfig,
    /// Usernames granted the `admin` role when they register.
    pub admin_usernames: Vec<String>,
    pub rate_limit: RateLimitConfig,
    pub cleanup: CleanupConfig,
    pub logging: LoggingConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            client_url: "http://localhost:3000".to_string(),
            email_service: None,
            mongodb_uri: None,
            database: DatabaseConfig::default(),
            body_limit_bytes: 10 * 1024 * 1024,
            session: SessionConfig::default(),
            admin_usernames: Vec::new(),
            rate_limit: RateLimitConfig::default(),
            cleanup: CleanupConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Picks the store backend: MongoDB when a URI is configured, memory otherwise.
    pub fn store_backend(&self) -> StoreBackend {
        match &self.mongodb_uri {
            Some(uri) if !uri.trim().is_empty() => StoreBackend::MongoDB(MongoDBConfig {
                uri: uri.clone(),
                database: self.database.name.clone(),
            }),
            _ => StoreBackend::Memory,
        }
    }
}

/// Session cookie settings.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
#[serde(default)]
pub struct SessionConfig {
    pub cookie_name: String,
    /// Lifetime of an issued session, in seconds.
    pub ttl_secs: i64,
    /// Adds the `Secure` attribute to the session cookie.
    pub secure_cookie: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "token".to_string(),
            ttl_secs: 7 * 24 * 3600,
            secure_cookie: false,
        }
    }
}

/// Builds the layered figment for the given YAML path.
pub fn figment(path: &str) -> Figment {
    Figment::from(Serialized::defaults(ServerConfig::default()))
        .merge(Yaml::file(path))
        .merge(Env::raw().only(&ENV_KEYS))
}

/// Extracts a `ServerConfig` from any figment.
pub fn extract(figment: &Figment) -> Result<ServerConfig, String> {
    figment
        .extract::<ServerConfig>()
        .map_err(|e| format!("Error loading configuration: {}", e))
}

/// Load config from the YAML file named by `CONFIG_PATH` (default "./config.yaml")
/// plus the environment. Exits the process when the configuration is invalid.
pub fn load_config() -> ServerConfig {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "./config.yaml".to_string());
    match extract(&figment(&path)) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    }
}

/// Print the JSON schema for the configuration to stdout.
pub fn print_schema() -> Result<(), serde_json::Error> {
    let schema = schema_for!(ServerConfig);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_yaml(yaml: &str) -> ServerConfig {
        let figment = Figment::from(Serialized::defaults(ServerConfig::default()))
            .merge(Yaml::string(yaml));
        extract(&figment).expect("config should parse")
    }

    #[test]
    fn defaults_listen_on_localhost_5000() {
        let config = from_yaml("logging:\n  level: info");
        assert_eq!(config.bind_address(), "127.0.0.1:5000");
        assert_eq!(config.client_url, "http://localhost:3000");
        assert_eq!(config.body_limit_bytes, 10 * 1024 * 1024);
        assert_eq!(config.rate_limit.max_requests, 100);
        assert_eq!(config.rate_limit.window_secs, 15 * 60);
        assert!(matches!(config.store_backend(), StoreBackend::Memory));
    }

    #[test]
    fn yaml_overrides_nested_sections() {
        let config = from_yaml(
            r#"
port: 8080
mongodb_uri: "mongodb://localhost:27017"
database:
  name: donations_test
rate_limit:
  max_requests: 5
logging:
  level: debug
  format: json
"#,
        );
        assert_eq!(config.port, 8080);
        assert_eq!(config.rate_limit.max_requests, 5);
        assert_eq!(config.rate_limit.window_secs, 15 * 60);
        assert_eq!(config.logging.format, "json");
        match config.store_backend() {
            StoreBackend::MongoDB(mongo) => {
                assert_eq!(mongo.uri, "mongodb://localhost:27017");
                assert_eq!(mongo.database, "donations_test");
            }
            StoreBackend::Memory => panic!("expected MongoDB backend"),
        }
    }

    #[test]
    fn blank_mongodb_uri_falls_back_to_memory() {
        let config = from_yaml("mongodb_uri: \"  \"");
        assert!(matches!(config.store_backend(), StoreBackend::Memory));
    }
}
