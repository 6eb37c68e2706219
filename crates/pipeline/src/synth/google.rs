//! Google Cloud Text-to-Speech

use async_trait::async_trait;
use base64::Engine;
use bytes::Bytes;
use serde_json::{json, Value};

use talkstream_config::GoogleConfig;

use super::{ProviderKind, SourceEncoding, SynthAudio, Synthesizer};
use crate::PipelineError;

const DEFAULT_ENDPOINT: &str = "https://texttospeech.googleapis.com/v1/text:synthesize";

/// Google Cloud `text:synthesize` client, LINEAR16 output. This provider's
/// PCM carries a leading click artifact; the conditioning chain always runs
/// on its output.
pub struct GoogleTts {
    client: reqwest::Client,
    config: GoogleConfig,
    sample_rate: u32,
    endpoint: String,
}

impl GoogleTts {
    pub fn new(client: reqwest::Client, config: GoogleConfig, sample_rate: u32) -> Self {
        Self {
            client,
            config,
            sample_rate,
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

/// "ja-JP-Neural2-B" → "ja-JP"; anything unparsable falls back to ja-JP.
fn language_code(voice: &str) -> String {
    let parts: Vec<&str> = voice.split('-').collect();
    if parts.len() >= 2 {
        format!("{}-{}", parts[0], parts[1])
    } else {
        "ja-JP".to_string()
    }
}

/// Only accept Google-shaped voice names ("xx-XX-..."); anything else uses
/// the configured default so an OpenAI voice like "alloy" can't leak through.
pub(crate) fn is_google_voice(voice: &str) -> bool {
    let bytes = voice.as_bytes();
    bytes.len() > 6
        && bytes[0].is_ascii_lowercase()
        && bytes[1].is_ascii_lowercase()
        && bytes[2] == b'-'
        && bytes[3].is_ascii_uppercase()
        && bytes[4].is_ascii_uppercase()
        && bytes[5] == b'-'
}

fn provider_error(message: String) -> PipelineError {
    PipelineError::Provider {
        provider: ProviderKind::Google.to_string(),
        message,
    }
}

#[async_trait]
impl Synthesizer for GoogleTts {
    async fn synthesize(&self, text: &str, voice: &str) -> Result<SynthAudio, PipelineError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| PipelineError::MissingCredentials("synth.google.api_key".to_string()))?;

        let voice = if is_google_voice(voice) {
            voice
        } else {
            &self.config.voice
        };

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", api_key)])
            .json(&json!({
                "input": { "text": text },
                "voice": {
                    "languageCode": language_code(voice),
                    "name": voice,
                },
                "audioConfig": {
                    "audioEncoding": "LINEAR16",
                    "speakingRate": self.config.speaking_rate,
                    "pitch": self.config.pitch,
                    "sampleRateHertz": self.sample_rate,
                },
            }))
            .send()
            .await
            .map_err(|e| provider_error(e.to_string()))?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| provider_error(e.to_string()))?;

        if !status.is_success() {
            let message = body["error"]["message"]
                .as_str()
                .unwrap_or("synthesis failed")
                .to_string();
            return Err(provider_error(message));
        }

        let audio_content = body["audioContent"]
            .as_str()
            .ok_or_else(|| provider_error("missing audioContent".to_string()))?;
        let pcm = base64::engine::general_purpose::STANDARD
            .decode(audio_content)
            .map_err(|e| provider_error(format!("bad audioContent: {}", e)))?;

        Ok(SynthAudio {
            encoding: SourceEncoding::Pcm16 {
                sample_rate: self.sample_rate,
            },
            bytes: Bytes::from(pcm),
            needs_conditioning: true,
        })
    }

    fn default_voice(&self) -> &str {
        &self.config.voice
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Google
    }
}
