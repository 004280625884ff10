//! Runtime configuration, read from the environment (and `.env`) once at startup.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use serde::Serialize;
use tracing::warn;
use url::Url;
use validator::Validate;

use crate::error::AppError;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";

/// Which hosted model serves which part of the pipeline.
#[derive(Debug, Clone, Serialize, Validate)]
pub struct ModelConfig {
    /// Short answers, session analysis and history summaries.
    #[validate(length(min = 1))]
    pub answer_model: String,
    /// Detailed explanations, validation and curriculum classification.
    #[validate(length(min = 1))]
    pub explain_model: String,
    /// Mind-map JSON generation.
    #[validate(length(min = 1))]
    pub mindmap_model: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            answer_model: "gpt-3.5-turbo".to_string(),
            explain_model: "gpt-4".to_string(),
            mindmap_model: "gpt-4o".to_string(),
        }
    }
}

/// Switches for the optional second LLM calls of the pipeline.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PipelineConfig {
    /// Ask for a confidence score on short answers and classify low-confidence ones.
    pub confidence_gating: bool,
    /// Run the validator over detailed explanations.
    pub validate_deep: bool,
    /// Chat requests allowed per thread per minute, 0 disables the limit.
    pub rate_limit_per_minute: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            confidence_gating: true,
            validate_deep: true,
            rate_limit_per_minute: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    pub fn parse(value: &str) -> Result<Self, AppError> {
        match value.trim().to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(AppError::Config(format!(
                "TUTOR_LOG_FORMAT must be 'pretty' or 'json', got '{}'",
                other
            ))),
        }
    }

    /// The format named by `TUTOR_LOG_FORMAT`, pretty when unset or invalid.
    /// Read before the rest of the configuration so logging is up first.
    pub fn from_env() -> Self {
        env::var("TUTOR_LOG_FORMAT")
            .ok()
            .and_then(|v| Self::parse(&v).ok())
            .unwrap_or(LogFormat::Pretty)
    }
}

#[derive(Debug, Clone, Validate)]
pub struct AppConfig {
    pub api_key: Option<String>,
    pub base_url: Url,
    #[validate(nested)]
    pub models: ModelConfig,
    pub pipeline: PipelineConfig,
    pub data_dir: PathBuf,
    pub bind_addr: SocketAddr,
    /// SQLite file for sessions; in-memory sessions when `None`.
    pub session_db: Option<PathBuf>,
    pub log_format: LogFormat,
}

impl AppConfig {
    /// Loads `.env` (if any) and reads the configuration from the environment.
    pub fn from_env() -> Result<Self, AppError> {
        dotenv::dotenv().ok();
        Self::from_vars()
    }

    /// Reads the configuration from the current environment without touching `.env`.
    pub fn from_vars() -> Result<Self, AppError> {
        let api_key = env::var("OPENAI_API_KEY").ok().filter(|k| !k.trim().is_empty());
        if api_key.is_none() {
            warn!("OPENAI_API_KEY is not set; every call to the hosted model will fail");
        }

        let base_url = Url::parse(&var_or("OPENAI_BASE_URL", DEFAULT_BASE_URL))?;

        let defaults = ModelConfig::default();
        let models = ModelConfig {
            answer_model: var_or("TUTOR_ANSWER_MODEL", &defaults.answer_model),
            explain_model: var_or("TUTOR_EXPLAIN_MODEL", &defaults.explain_model),
            mindmap_model: var_or("TUTOR_MINDMAP_MODEL", &defaults.mindmap_model),
        };

        let pipeline_defaults = PipelineConfig::default();
        let pipeline = PipelineConfig {
            confidence_gating: parse_var("TUTOR_CONFIDENCE_GATING", pipeline_defaults.confidence_gating)?,
            validate_deep: parse_var("TUTOR_VALIDATE_DEEP", pipeline_defaults.validate_deep)?,
            rate_limit_per_minute: parse_var("TUTOR_RATE_LIMIT", pipeline_defaults.rate_limit_per_minute)?,
        };

        let default_addr: SocketAddr = DEFAULT_BIND_ADDR
            .parse()
            .map_err(|e| AppError::Internal(format!("Invalid default bind address: {}", e)))?;
        let bind_addr: SocketAddr = parse_var("TUTOR_BIND_ADDR", default_addr)?;

        let log_format = LogFormat::parse(&var_or("TUTOR_LOG_FORMAT", "pretty"))?;

        let config = Self {
            api_key,
            base_url,
            models,
            pipeline,
            data_dir: PathBuf::from(var_or("TUTOR_DATA_DIR", "./data")),
            bind_addr,
            session_db: env::var("TUTOR_SESSION_DB").ok().filter(|p| !p.is_empty()).map(PathBuf::from),
            log_format,
        };
        config.validate()?;
        Ok(config)
    }
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_var<T>(name: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map_err(|e| AppError::Config(format!("{} has an invalid value '{}': {}", name, raw, e))),
        _ => Ok(default),
    }
}
