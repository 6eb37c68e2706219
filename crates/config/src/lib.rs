//! Layered configuration for the talkstream server
//!
//! Settings load from `config/default.yaml`, an optional environment-specific
//! file, and `TALKSTREAM__`-prefixed environment variables, highest last.

mod settings;

pub use settings::{
    load_settings, ElevenLabsConfig, GeminiConfig, GoogleConfig, LlmConfig, ObservabilityConfig,
    OpenAiConfig, SegmenterConfig, ServerConfig, Settings, SynthConfig,
};

use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config load error: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}
