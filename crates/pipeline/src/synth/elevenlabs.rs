//! ElevenLabs streaming synthesis

use async_trait::async_trait;
use serde_json::json;

use talkstream_config::ElevenLabsConfig;

use super::{ProviderKind, SourceEncoding, SynthAudio, Synthesizer};
use crate::PipelineError;

const DEFAULT_BASE: &str = "https://api.elevenlabs.io/v1/text-to-speech";
const PCM_SAMPLE_RATE: u32 = 24_000;

/// ElevenLabs `text-to-speech/{voice}/stream` client, `pcm_24000` output.
pub struct ElevenLabsTts {
    client: reqwest::Client,
    config: ElevenLabsConfig,
    base_url: String,
}

impl ElevenLabsTts {
    pub fn new(client: reqwest::Client, config: ElevenLabsConfig) -> Self {
        Self {
            client,
            config,
            base_url: DEFAULT_BASE.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

fn provider_error(message: String) -> PipelineError {
    PipelineError::Provider {
        provider: ProviderKind::ElevenLabs.to_string(),
        message,
    }
}

#[async_trait]
impl Synthesizer for ElevenLabsTts {
    async fn synthesize(&self, text: &str, voice: &str) -> Result<SynthAudio, PipelineError> {
        let api_key = self.config.api_key.as_deref().ok_or_else(|| {
            PipelineError::MissingCredentials("synth.elevenlabs.api_key".to_string())
        })?;

        let url = format!(
            "{}/{}/stream?output_format=pcm_24000&optimize_streaming_latency=0",
            self.base_url, voice
        );

        let response = self
            .client
            .post(&url)
            .header("xi-api-key", api_key)
            .json(&json!({
                "text": text,
                "model_id": self.config.model,
                "voice_settings": {
                    "stability": 0.5,
                    "similarity_boost": 0.75,
                },
            }))
            .send()
            .await
            .map_err(|e| provider_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(provider_error(format!("{}: {}", status, message)));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| provider_error(e.to_string()))?;

        Ok(SynthAudio {
            encoding: SourceEncoding::Pcm16 {
                sample_rate: PCM_SAMPLE_RATE,
            },
            bytes,
            needs_conditioning: false,
        })
    }

    fn default_voice(&self) -> &str {
        &self.config.voice
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::ElevenLabs
    }
}
