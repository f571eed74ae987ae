//! Configuration management for the Sangkwon service
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config.toml, config.yaml)
//! - Default values
//!
//! The configuration is loaded once at process start and treated as
//! immutable for the process lifetime.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,

    /// Vector retrieval (Weaviate) configuration
    pub retrieval: RetrievalConfig,

    /// Embedding service configuration
    pub embedding: EmbeddingConfig,

    /// Chat model configuration
    pub llm: LlmConfig,

    /// External data API configuration
    pub data: DataApiConfig,

    /// Chat session configuration
    pub chat: ChatConfig,

    /// Observability configuration
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Shutdown timeout in seconds
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetrievalConfig {
    /// Weaviate base URL
    #[serde(default = "default_weaviate_url")]
    pub url: String,

    /// Weaviate API key
    pub api_key: Option<String>,

    /// Class (index) to query
    #[serde(default = "default_class_name")]
    pub class_name: String,

    /// Property holding the passage text
    #[serde(default = "default_text_key")]
    pub text_key: String,

    /// Number of passages requested per query
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Request timeout in seconds
    #[serde(default = "default_gateway_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbeddingConfig {
    /// API key for the embedding service
    pub api_key: Option<String>,

    /// API base URL (for custom endpoints)
    pub api_base: Option<String>,

    /// Model to use
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Request timeout in seconds
    #[serde(default = "default_gateway_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    /// API key for the chat-completion service
    pub api_key: Option<String>,

    /// API base URL (for custom endpoints)
    pub api_base: Option<String>,

    /// Model to use
    #[serde(default = "default_chat_model")]
    pub model: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Request timeout in seconds
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DataApiConfig {
    /// National real-estate deal API endpoint
    #[serde(default = "default_real_estate_url")]
    pub real_estate_url: String,

    /// Service key for the real-estate API
    pub real_estate_key: Option<String>,

    /// Seoul open-data API base URL
    #[serde(default = "default_population_url")]
    pub population_url: String,

    /// API key for the pedestrian-traffic dataset
    pub population_key: Option<String>,

    /// Kakao local API base URL
    #[serde(default = "default_kakao_url")]
    pub kakao_url: String,

    /// Kakao REST API key
    pub kakao_rest_api_key: Option<String>,

    /// Path to the gu -> legal-district-code map
    #[serde(default = "default_gu_code_path")]
    pub gu_code_path: String,

    /// Path to the address master file (dong id resolution)
    #[serde(default = "default_address_master_path")]
    pub address_master_path: String,

    /// Months of deal history to fetch
    #[serde(default = "default_deal_months")]
    pub deal_months: u32,

    /// Maximum deals kept after filtering
    #[serde(default = "default_max_deals")]
    pub max_deals: usize,

    /// Request timeout in seconds
    #[serde(default = "default_gateway_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatConfig {
    /// Maximum messages retained per session (system message pinned)
    #[serde(default = "default_max_messages")]
    pub max_messages: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Metrics port (0 to disable)
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    /// Service name for tracing
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_request_timeout() -> u64 { 60 }
fn default_shutdown_timeout() -> u64 { 30 }
fn default_weaviate_url() -> String { "http://localhost:8090".to_string() }
fn default_class_name() -> String { "BusinessAPI".to_string() }
fn default_text_key() -> String { "content".to_string() }
fn default_top_k() -> usize { 5 }
fn default_gateway_timeout() -> u64 { 10 }
fn default_embedding_model() -> String { "text-embedding-ada-002".to_string() }
fn default_chat_model() -> String { "gpt-4".to_string() }
fn default_temperature() -> f32 { 0.7 }
fn default_llm_timeout() -> u64 { 60 }
fn default_real_estate_url() -> String {
    "http://apis.data.go.kr/1613000/RTMSDataSvcNrgTrade/getRTMSDataSvcNrgTrade".to_string()
}
fn default_population_url() -> String { "http://openapi.seoul.go.kr:8088".to_string() }
fn default_kakao_url() -> String { "https://dapi.kakao.com".to_string() }
fn default_gu_code_path() -> String { "data/real_estate.json".to_string() }
fn default_address_master_path() -> String { "data/address_master.json".to_string() }
fn default_deal_months() -> u32 { 6 }
fn default_max_deals() -> usize { 30 }
fn default_max_messages() -> usize { 40 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_metrics_port() -> u16 { 9090 }
fn default_service_name() -> String { "sangkwon".to_string() }

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Start with defaults
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            // Load base config file
            .add_source(File::with_name("config/default").required(false))
            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            // Load local overrides
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables with APP__ prefix
            // e.g., APP__SERVER__PORT=8081
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.server.shutdown_timeout_secs)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: default_host(),
                port: default_port(),
                request_timeout_secs: default_request_timeout(),
                shutdown_timeout_secs: default_shutdown_timeout(),
            },
            retrieval: RetrievalConfig {
                url: default_weaviate_url(),
                api_key: None,
                class_name: default_class_name(),
                text_key: default_text_key(),
                top_k: default_top_k(),
                timeout_secs: default_gateway_timeout(),
            },
            embedding: EmbeddingConfig {
                api_key: None,
                api_base: None,
                model: default_embedding_model(),
                timeout_secs: default_gateway_timeout(),
            },
            llm: LlmConfig {
                api_key: None,
                api_base: None,
                model: default_chat_model(),
                temperature: default_temperature(),
                timeout_secs: default_llm_timeout(),
            },
            data: DataApiConfig {
                real_estate_url: default_real_estate_url(),
                real_estate_key: None,
                population_url: default_population_url(),
                population_key: None,
                kakao_url: default_kakao_url(),
                kakao_rest_api_key: None,
                gu_code_path: default_gu_code_path(),
                address_master_path: default_address_master_path(),
                deal_months: default_deal_months(),
                max_deals: default_max_deals(),
                timeout_secs: default_gateway_timeout(),
            },
            chat: ChatConfig {
                max_messages: default_max_messages(),
            },
            observability: ObservabilityConfig {
                log_level: default_log_level(),
                json_logging: default_json_logging(),
                metrics_port: default_metrics_port(),
                service_name: default_service_name(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.llm.model, "gpt-4");
        assert_eq!(config.data.deal_months, 6);
    }

    #[test]
    fn test_timeouts() {
        let config = AppConfig::default();
        assert_eq!(config.request_timeout(), Duration::from_secs(60));
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(30));
    }
}
