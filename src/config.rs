use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{error, info};

/// Process-wide configuration, set once at startup
static CONFIG: OnceLock<Config> = OnceLock::new();

/// Application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Environment (dev, staging, prod)
    #[serde(default = "default_environment")]
    pub environment: String,

    /// CORS allowed origins
    pub cors_origins: Option<String>,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// JWT secret key used to validate bearer and access tokens
    pub auth_jwt_secret: Option<String>,

    /// Which side of the bus this process runs: `hub` or `console`
    #[serde(default = "default_role")]
    pub role: String,

    /// Origin the console derives the tracker endpoint from
    #[serde(default = "default_tracker_origin")]
    pub tracker_origin: String,

    /// Persistent ("local") credential file
    #[serde(default = "default_token_file")]
    pub token_file: String,

    /// Token seeded into the session credential store
    pub access_token: Option<String>,

    #[serde(default = "default_reconnect_initial_ms")]
    pub reconnect_initial_ms: u64,

    #[serde(default = "default_reconnect_max_ms")]
    pub reconnect_max_ms: u64,

    /// Connection attempts before the ready signal fails
    #[serde(default = "default_reconnect_attempts")]
    pub reconnect_attempts: u32,

    /// Number of audit events the hub keeps in memory
    #[serde(default = "default_audit_capacity")]
    pub audit_capacity: usize,

    #[serde(default = "default_management_timeout_secs")]
    pub management_timeout_secs: u64,
}

impl Config {
    /// Load configuration from environment variables or app.env file
    pub fn load() -> Result<Self, ConfigError> {
        // Try to load from app.env file first
        if std::path::Path::new("app.env").exists() {
            dotenvy::from_filename("app.env").ok();
        } else {
            // Fallback to .env file
            dotenvy::dotenv().ok();
        }

        match envy::from_env::<Config>() {
            Ok(config) => {
                info!("Configuration loaded successfully");
                Ok(config)
            }
            Err(e) => {
                error!("Failed to load configuration: {}", e);
                Err(ConfigError::EnvError(e))
            }
        }
    }

    /// Get the full server address
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if running in development mode
    pub fn is_development(&self) -> bool {
        self.environment.to_lowercase() == "dev" || self.environment.to_lowercase() == "development"
    }

    pub fn is_console(&self) -> bool {
        self.role.eq_ignore_ascii_case("console")
    }

    pub fn reconnect_initial(&self) -> Duration {
        Duration::from_millis(self.reconnect_initial_ms)
    }

    pub fn reconnect_max(&self) -> Duration {
        Duration::from_millis(self.reconnect_max_ms)
    }

    /// Copy of the configuration that is safe to expose over the management API
    pub fn redacted(&self) -> Config {
        let mut copy = self.clone();
        if copy.auth_jwt_secret.is_some() {
            copy.auth_jwt_secret = Some("******".to_string());
        }
        if copy.access_token.is_some() {
            copy.access_token = Some("******".to_string());
        }
        copy
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            environment: default_environment(),
            cors_origins: None,
            log_level: default_log_level(),
            service_name: default_service_name(),
            auth_jwt_secret: None,
            role: default_role(),
            tracker_origin: default_tracker_origin(),
            token_file: default_token_file(),
            access_token: None,
            reconnect_initial_ms: default_reconnect_initial_ms(),
            reconnect_max_ms: default_reconnect_max_ms(),
            reconnect_attempts: default_reconnect_attempts(),
            audit_capacity: default_audit_capacity(),
            management_timeout_secs: default_management_timeout_secs(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Environment variable error: {0}")]
    EnvError(#[from] envy::Error),
}

/// Install the process-wide configuration. Later calls are ignored.
pub fn init_config(config: Config) -> &'static Config {
    CONFIG.get_or_init(|| config)
}

/// Get the process-wide configuration, falling back to defaults when
/// `init_config` has not run (unit tests).
pub fn get_config() -> &'static Config {
    CONFIG.get_or_init(Config::default)
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_service_name() -> String {
    "activity-tracker".to_string()
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_role() -> String {
    "hub".to_string()
}

fn default_tracker_origin() -> String {
    "http://localhost:8080/".to_string()
}

fn default_token_file() -> String {
    ".tracker/credentials.json".to_string()
}

fn default_reconnect_initial_ms() -> u64 {
    1_000
}

fn default_reconnect_max_ms() -> u64 {
    10_000
}

fn default_reconnect_attempts() -> u32 {
    5
}

fn default_audit_capacity() -> usize {
    1_000
}

fn default_management_timeout_secs() -> u64 {
    10
}
