//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Main application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Generation source configuration
    #[serde(default)]
    pub llm: LlmConfig,

    /// Synthesis configuration
    #[serde(default)]
    pub synth: SynthConfig,

    /// Segmenter bounds
    #[serde(default)]
    pub segmenter: SegmenterConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Emit ping/timing marks on every stream
    #[serde(default)]
    pub debug_time: bool,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.synth.concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                field: "synth.concurrency".to_string(),
                message: "must be at least 1".to_string(),
            });
        }

        if self.segmenter.max_chars <= self.segmenter.min_chars {
            return Err(ConfigError::InvalidValue {
                field: "segmenter.max_chars".to_string(),
                message: format!(
                    "must be greater than min_chars ({})",
                    self.segmenter.min_chars
                ),
            });
        }

        if self.synth.sample_rate == 0 {
            return Err(ConfigError::InvalidValue {
                field: "synth.sample_rate".to_string(),
                message: "must be non-zero".to_string(),
            });
        }

        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Enable CORS
    #[serde(default = "default_true")]
    pub cors_enabled: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_enabled: default_true(),
        }
    }
}

/// Generation source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Chat model used when the request does not name one
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// API key (set via TALKSTREAM__LLM__API_KEY)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// System prompt prepended to every conversation
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

fn default_llm_model() -> String {
    "gpt-4.1-mini".to_string()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_system_prompt() -> String {
    "あなたは子供向けの友好的な音声アシスタントです。簡潔に答えて、自然に会話を続けてください。".to_string()
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_llm_model(),
            api_key: None,
            temperature: default_temperature(),
            system_prompt: default_system_prompt(),
        }
    }
}

/// Synthesis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthConfig {
    /// Provider used when the request's provider key matches nothing
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Maximum concurrent in-flight synthesis jobs per request
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Upper bound on waiting for outstanding jobs before `done`
    #[serde(default = "default_barrier_timeout")]
    pub barrier_timeout_ms: u64,

    /// PCM sample rate expected from raw-PCM providers
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    #[serde(default)]
    pub openai: OpenAiConfig,

    #[serde(default)]
    pub google: GoogleConfig,

    #[serde(default)]
    pub gemini: GeminiConfig,

    #[serde(default)]
    pub elevenlabs: ElevenLabsConfig,
}

fn default_provider() -> String {
    "openai".to_string()
}
fn default_concurrency() -> usize {
    2
}
fn default_barrier_timeout() -> u64 {
    20_000
}
fn default_sample_rate() -> u32 {
    24_000
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            default_provider: default_provider(),
            concurrency: default_concurrency(),
            barrier_timeout_ms: default_barrier_timeout(),
            sample_rate: default_sample_rate(),
            openai: OpenAiConfig::default(),
            google: GoogleConfig::default(),
            gemini: GeminiConfig::default(),
            elevenlabs: ElevenLabsConfig::default(),
        }
    }
}

/// OpenAI speech endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// API key (set via TALKSTREAM__SYNTH__OPENAI__API_KEY)
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_openai_model")]
    pub model: String,

    #[serde(default = "default_openai_voice")]
    pub voice: String,
}

fn default_openai_model() -> String {
    "gpt-4o-mini-tts".to_string()
}
fn default_openai_voice() -> String {
    "nova".to_string()
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_openai_model(),
            voice: default_openai_voice(),
        }
    }
}

/// Google Cloud Text-to-Speech configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleConfig {
    /// API key, shared with the Gemini speech endpoint
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_google_voice")]
    pub voice: String,

    #[serde(default = "default_speaking_rate")]
    pub speaking_rate: f32,

    #[serde(default = "default_pitch")]
    pub pitch: f32,
}

fn default_google_voice() -> String {
    "ja-JP-Neural2-B".to_string()
}
fn default_speaking_rate() -> f32 {
    1.2
}
fn default_pitch() -> f32 {
    3.0
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            voice: default_google_voice(),
            speaking_rate: default_speaking_rate(),
            pitch: default_pitch(),
        }
    }
}

/// Gemini speech generation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    #[serde(default = "default_gemini_model")]
    pub model: String,

    #[serde(default = "default_gemini_voice")]
    pub voice: String,
}

fn default_gemini_model() -> String {
    "gemini-2.5-flash-preview-tts".to_string()
}
fn default_gemini_voice() -> String {
    "Kore".to_string()
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            model: default_gemini_model(),
            voice: default_gemini_voice(),
        }
    }
}

/// ElevenLabs configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElevenLabsConfig {
    /// API key (set via TALKSTREAM__SYNTH__ELEVENLABS__API_KEY)
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_elevenlabs_model")]
    pub model: String,

    #[serde(default = "default_elevenlabs_voice")]
    pub voice: String,
}

fn default_elevenlabs_model() -> String {
    "eleven_turbo_v2_5".to_string()
}
fn default_elevenlabs_voice() -> String {
    "hMK7c1GPJmptCzI4bQIu".to_string()
}

impl Default for ElevenLabsConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_elevenlabs_model(),
            voice: default_elevenlabs_voice(),
        }
    }
}

/// Segmenter bounds, counted in characters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmenterConfig {
    /// Minimum trimmed length for a punctuation-triggered flush. Guards
    /// degenerate fragments (a bare terminal mark), not short sentences.
    #[serde(default = "default_min_chars")]
    pub min_chars: usize,

    /// Flush unconditionally at this length
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
}

fn default_min_chars() -> usize {
    2
}
fn default_max_chars() -> usize {
    48
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            min_chars: default_min_chars(),
            max_chars: default_max_chars(),
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub log_json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
        }
    }
}

/// Load settings from files and environment
///
/// Priority (highest to lowest):
/// 1. Environment variables (TALKSTREAM__ prefix)
/// 2. config/{env}.yaml (if env specified)
/// 3. config/default.yaml
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    builder = builder.add_source(File::with_name("config/default").required(false));

    if let Some(env_name) = env {
        builder = builder.add_source(File::with_name(&format!("config/{}", env_name)).required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix("TALKSTREAM")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    settings.validate()?;

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.synth.concurrency, 2);
        assert_eq!(settings.synth.barrier_timeout_ms, 20_000);
        assert_eq!(settings.synth.sample_rate, 24_000);
        assert_eq!(settings.segmenter.min_chars, 2);
        assert_eq!(settings.segmenter.max_chars, 48);
    }

    #[test]
    fn test_settings_validation() {
        let mut settings = Settings::default();
        settings.synth.concurrency = 0;
        assert!(settings.validate().is_err());

        settings.synth.concurrency = 2;
        settings.segmenter.max_chars = 3; // below min
        assert!(settings.validate().is_err());

        settings.segmenter.max_chars = 48;
        assert!(settings.validate().is_ok());
    }
}
