use std::path::Path;

use serde::Deserialize;
use serde::Serialize;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Base URL of the Chroma server, e.g. "http://localhost:8000"
    pub endpoint: String,
    /// Collection name. Must match the name used by the ingestion job.
    pub collection: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingsConfig {
    /// "openai" (OpenAI-compatible API) or "ollama"
    pub provider: String,
    pub model: String,
    pub endpoint: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub llm_endpoint: String,
    /// Empty key disables LLM selection; the service stays functional
    /// with deterministic fallbacks.
    #[serde(default)]
    pub llm_key: String,
    #[serde(default = "default_llm_model")]
    pub llm_model: String,
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_llm_model() -> String {
    "qwen2.5:14b".to_string()
}

fn default_llm_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_score_threshold")]
    pub score_threshold: f32,
}

fn default_top_k() -> usize {
    6
}

fn default_score_threshold() -> f32 {
    0.8
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            score_threshold: default_score_threshold(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub backtrace: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_enable_cors")]
    pub enable_cors: bool,
}

fn default_enable_cors() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub embeddings: EmbeddingsConfig,
    pub llm: LlmConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    pub logging: LoggingConfig,
    pub server: ServerConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from default config file path
    pub fn load() -> crate::Result<Self> {
        // Try to load from config.toml first, then fall back to config.example.toml
        if Path::new("config.toml").exists() {
            Self::from_file("config.toml")
        } else if Path::new("config.example.toml").exists() {
            eprintln!(
                "Warning: Using config.example.toml. Please create config.toml for production use."
            );
            Self::from_file("config.example.toml")
        } else {
            Err(crate::AichefError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "No config file found. Please create config.toml or config.example.toml",
            )))
        }
    }

    /// Get LLM endpoint
    pub fn llm_endpoint(&self) -> &str {
        &self.llm.llm_endpoint
    }

    /// Get LLM model
    pub fn llm_model(&self) -> &str {
        &self.llm.llm_model
    }

    /// Whether an LLM credential is configured
    pub fn llm_enabled(&self) -> bool {
        !self.llm.llm_key.trim().is_empty()
    }

    /// Get retrieval fan-out
    pub fn top_k(&self) -> usize {
        self.retrieval.top_k
    }

    /// Get maximum-distance cutoff for retrieval
    pub fn score_threshold(&self) -> f32 {
        self.retrieval.score_threshold
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig {
                endpoint: "http://localhost:8000".to_string(),
                collection: "recipe_collection_v3".to_string(),
            },
            embeddings: EmbeddingsConfig {
                provider: "ollama".to_string(),
                model: "bge-m3".to_string(),
                endpoint: "http://localhost:11434".to_string(),
                api_key: None,
            },
            llm: LlmConfig {
                llm_endpoint: "http://localhost:11434/v1".to_string(),
                llm_key: String::new(),
                llm_model: default_llm_model(),
                timeout_secs: default_llm_timeout_secs(),
            },
            retrieval: RetrievalConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
                backtrace: true,
            },
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                enable_cors: true,
            },
        }
    }
}
