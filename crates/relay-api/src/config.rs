use config::{Config as ConfigLoader, ConfigError, Environment, File};
use relay_stream::{PollConfig, RetryPolicy};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub cors: CorsConfig,
    pub database: DatabaseConfig,
    pub llm: LlmConfig,
    pub streams: StreamsConfig,
    pub logging: LoggingConfig,

    // Secrets (from ENV only). Each one is optional; a missing one disables its collaborator.
    #[serde(default)]
    pub database_url: Option<String>,
    #[serde(default)]
    pub redis_url: Option<String>,
    #[serde(default)]
    pub openai_api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    pub enabled: bool,
    pub origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub max_connections: u32,
    pub acquire_timeout_ms: u64,
    #[serde(default)]
    pub run_migrations: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub model: String,
    pub system_prompt: String,
    /// OpenAI-compatible endpoint; the public API when unset
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_preview_length")]
    pub prompt_preview_length: usize,
    #[serde(default = "default_paragraph_threshold")]
    pub paragraph_flush_threshold: usize,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

fn default_preview_length() -> usize {
    50
}

fn default_paragraph_threshold() -> usize {
    200
}

impl From<LlmConfig> for relay_types::LLMConfig {
    fn from(config: LlmConfig) -> Self {
        Self {
            model: config.model,
            system_prompt: config.system_prompt,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

/// Intervals are in seconds
#[derive(Debug, Clone, Deserialize)]
pub struct StreamsConfig {
    pub generic_interval_secs: f64,
    pub database_poll_interval_secs: f64,
    pub orders_limit: u32,
    pub orders_poll_interval_secs: f64,
    pub heartbeat_interval_secs: f64,
    pub pubsub_poll_interval_secs: f64,
    pub pubsub_receive_timeout_secs: f64,
    pub retry_max_attempts: u32,
    pub retry_base_delay_secs: f64,
}

impl StreamsConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry_max_attempts, secs(self.retry_base_delay_secs))
    }

    /// Poll loop settings for `interval_secs`, sharing the configured retry policy
    pub fn poll(&self, interval_secs: f64) -> PollConfig {
        PollConfig::every(secs(interval_secs)).with_retry(self.retry_policy())
    }

    pub fn heartbeat_interval(&self) -> Duration {
        secs(self.heartbeat_interval_secs)
    }

    pub fn pubsub_receive_timeout(&self) -> Duration {
        secs(self.pubsub_receive_timeout_secs)
    }
}

fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

fn secret(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.trim().is_empty())
}

impl Config {
    /// Load configuration from TOML files and environment variables
    ///
    /// Hierarchy (weakest to strongest):
    /// 1. config/default.toml
    /// 2. config/{ENV}.toml (if ENV is set)
    /// 3. Environment variables prefixed `RELAY_`, sections split by `__`
    ///    (e.g. `RELAY_STREAMS__ORDERS_LIMIT=100`)
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("ENV").unwrap_or_else(|_| "dev".to_string());

        let builder = ConfigLoader::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(
                Environment::with_prefix("RELAY")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        let mut cfg: Config = builder.build()?.try_deserialize()?;

        cfg.database_url = secret("DATABASE_URL");
        cfg.redis_url = secret("REDIS_URL");
        cfg.openai_api_key = secret("OPENAI_API_KEY");

        Ok(cfg)
    }

    /// Load config from a specific path (useful for testing)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let builder = ConfigLoader::builder().add_source(File::from(path.as_ref()));

        let config = builder.build()?;
        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_structure() {
        let toml = r#"
            [server]
            host = "127.0.0.1"
            port = 3000

            [cors]
            enabled = true
            origins = ["http://localhost:3000"]

            [database]
            max_connections = 2
            acquire_timeout_ms = 3000

            [llm]
            model = "gpt-4o"
            system_prompt = "Be brief."

            [streams]
            generic_interval_secs = 0.5
            database_poll_interval_secs = 2.0
            orders_limit = 20
            orders_poll_interval_secs = 1.5
            heartbeat_interval_secs = 15.0
            pubsub_poll_interval_secs = 0.1
            pubsub_receive_timeout_secs = 0.1
            retry_max_attempts = 3
            retry_base_delay_secs = 1.0

            [logging]
            level = "debug"
            format = "json"
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.llm.prompt_preview_length, 50);
        assert_eq!(config.llm.paragraph_flush_threshold, 200);
        assert!(config.llm.temperature.is_none());
        assert!(config.database_url.is_none());
        assert!(!config.database.run_migrations);

        let poll = config.streams.poll(config.streams.orders_poll_interval_secs);
        assert_eq!(poll.interval, Duration::from_millis(1500));
        assert_eq!(poll.retry, RetryPolicy::new(3, Duration::from_secs(1)));
    }

    #[test]
    fn test_llm_sampling_settings() {
        let llm: LlmConfig = toml::from_str(
            r#"
            model = "gpt-4o"
            system_prompt = "Be brief."
            temperature = 0.3
            max_tokens = 512
        "#,
        )
        .unwrap();

        let config: relay_types::LLMConfig = llm.into();
        assert_eq!(config.temperature, Some(0.3));
        assert_eq!(config.max_tokens, Some(512));
    }

    #[test]
    fn test_default_file_loads() {
        let config = Config::from_file("config/default.toml").unwrap();
        assert_eq!(config.streams.orders_limit, 50);
        assert_eq!(config.streams.heartbeat_interval(), Duration::from_secs(15));
        assert_eq!(config.llm.model, "gpt-4o-mini");
    }

    #[test]
    fn test_negative_interval_is_zero() {
        assert_eq!(secs(-1.0), Duration::ZERO);
        assert_eq!(secs(0.25), Duration::from_millis(250));
    }
}
