//! OpenAI speech endpoint

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::json;

use talkstream_config::OpenAiConfig;

use super::{ProviderKind, SourceEncoding, SynthAudio, Synthesizer};
use crate::PipelineError;

const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/audio/speech";
const PCM_SAMPLE_RATE: u32 = 24_000;

/// OpenAI `/v1/audio/speech` client. Requests raw PCM; falls back to a WAV
/// request against the non-mini model when the endpoint returns MP3 anyway.
pub struct OpenAiTts {
    client: reqwest::Client,
    config: OpenAiConfig,
    endpoint: String,
}

impl OpenAiTts {
    pub fn new(client: reqwest::Client, config: OpenAiConfig) -> Self {
        Self {
            client,
            config,
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    async fn request(
        &self,
        api_key: &str,
        model: &str,
        text: &str,
        voice: &str,
        response_format: &str,
    ) -> Result<Bytes, PipelineError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&json!({
                "model": model,
                "input": text,
                "voice": voice,
                "response_format": response_format,
            }))
            .send()
            .await
            .map_err(|e| provider_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(provider_error(format!("{}: {}", status, message)));
        }

        response
            .bytes()
            .await
            .map_err(|e| provider_error(e.to_string()))
    }
}

fn provider_error(message: String) -> PipelineError {
    PipelineError::Provider {
        provider: ProviderKind::OpenAi.to_string(),
        message,
    }
}

/// MP3 frame sync or an ID3 tag where PCM was requested.
fn looks_like_mp3(bytes: &[u8]) -> bool {
    if bytes.len() < 2 {
        return false;
    }
    (bytes[0] == 0xFF && (bytes[1] == 0xF3 || bytes[1] == 0xFB)) || bytes[0] == b'I'
}

#[async_trait]
impl Synthesizer for OpenAiTts {
    async fn synthesize(&self, text: &str, voice: &str) -> Result<SynthAudio, PipelineError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| PipelineError::MissingCredentials("synth.openai.api_key".to_string()))?;

        let bytes = self
            .request(api_key, &self.config.model, text, voice, "pcm")
            .await?;

        if looks_like_mp3(&bytes) {
            tracing::warn!("PCM not returned, retrying as WAV");
            let model = self.config.model.replace("mini", "tts");
            let bytes = self.request(api_key, &model, text, voice, "wav").await?;
            return Ok(SynthAudio {
                encoding: SourceEncoding::Wav,
                bytes,
                needs_conditioning: false,
            });
        }

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
        ProviderKind::OpenAi
    }
}
