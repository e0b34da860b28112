use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

pub use common::config::MqAppConfig;

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    #[serde(default)]
    pub allow_origins: Vec<String>,
    #[serde(default = "default_cors_max_age")]
    pub max_age: u64,
}

fn default_cors_max_age() -> u64 {
    3600
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origins: Vec::new(),
            max_age: default_cors_max_age(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    /// Default: 20.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Default: 2.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    /// Applies to both connecting and acquiring from the pool. Default: 8.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_max_connections() -> u32 {
    20
}
fn default_min_connections() -> u32 {
    2
}
fn default_connect_timeout_secs() -> u64 {
    8
}

impl DatabaseConfig {
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct JudgeConfig {
    /// Whether this process consumes judge results. Only designated
    /// instances should; the rest only publish. Default: false.
    #[serde(default)]
    pub enable_result_consumer: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SubmissionConfig {
    /// How long test-run results stay readable. Default: 600.
    #[serde(default = "default_test_result_ttl_secs")]
    pub test_result_ttl_secs: u64,
}

fn default_test_result_ttl_secs() -> u64 {
    600
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            test_result_ttl_secs: default_test_result_ttl_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub mq: MqAppConfig,
    #[serde(default)]
    pub judge: JudgeConfig,
    #[serde(default)]
    pub submission: SubmissionConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("CODEJUDGE_CONFIG").unwrap_or_else(|_| "config/config".into());

        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("judge.enable_result_consumer", false)?
            .add_source(File::with_name(&path).required(false))
            // e.g. CODEJUDGE__JUDGE__ENABLE_RESULT_CONSUMER=true
            .add_source(Environment::with_prefix("CODEJUDGE").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
