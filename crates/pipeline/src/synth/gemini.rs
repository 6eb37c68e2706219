//! Gemini speech generation

use async_trait::async_trait;
use base64::Engine;
use bytes::Bytes;
use serde_json::{json, Value};

use talkstream_config::GeminiConfig;

use super::google::is_google_voice;
use super::{ProviderKind, SourceEncoding, SynthAudio, Synthesizer};
use crate::PipelineError;

const DEFAULT_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const PCM_SAMPLE_RATE: u32 = 24_000;

/// Gemini `generateContent` speech client. Shares the Google API key and
/// returns PCM16 at 24 kHz inside `inlineData`.
pub struct GeminiTts {
    client: reqwest::Client,
    config: GeminiConfig,
    api_key: Option<String>,
    sample_rate: u32,
    base_url: String,
}

impl GeminiTts {
    pub fn new(
        client: reqwest::Client,
        config: GeminiConfig,
        api_key: Option<String>,
        sample_rate: u32,
    ) -> Self {
        Self {
            client,
            config,
            api_key,
            sample_rate: if sample_rate == 0 {
                PCM_SAMPLE_RATE
            } else {
                sample_rate
            },
            base_url: DEFAULT_BASE.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Prebuilt Gemini voices are single ascii words ("Kore", "Puck");
    /// Google-shaped names belong to the other provider and fall back.
    fn resolve_voice<'a>(&'a self, voice: &'a str) -> &'a str {
        let plausible = !voice.is_empty()
            && voice.len() <= 40
            && voice.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
            && !is_google_voice(voice);
        if plausible {
            voice
        } else {
            &self.config.voice
        }
    }
}

fn provider_error(message: String) -> PipelineError {
    PipelineError::Provider {
        provider: ProviderKind::Gemini.to_string(),
        message,
    }
}

#[async_trait]
impl Synthesizer for GeminiTts {
    async fn synthesize(&self, text: &str, voice: &str) -> Result<SynthAudio, PipelineError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| PipelineError::MissingCredentials("synth.google.api_key".to_string()))?;

        let url = format!("{}/{}:generateContent", self.base_url, self.config.model);
        let voice = self.resolve_voice(voice);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&json!({
                "contents": [{ "parts": [{ "text": text }] }],
                "generationConfig": {
                    "responseModalities": ["AUDIO"],
                    "speechConfig": {
                        "voiceConfig": { "prebuiltVoiceConfig": { "voiceName": voice } }
                    },
                },
                "model": self.config.model,
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

        let b64 = body["candidates"][0]["content"]["parts"][0]["inlineData"]["data"]
            .as_str()
            .unwrap_or_default();
        if b64.is_empty() {
            return Err(provider_error("empty audio".to_string()));
        }

        let pcm = base64::engine::general_purpose::STANDARD
            .decode(b64)
            .map_err(|e| provider_error(format!("bad inline data: {}", e)))?;

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
        ProviderKind::Gemini
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tts() -> GeminiTts {
        GeminiTts::new(
            reqwest::Client::new(),
            GeminiConfig::default(),
            Some("key".to_string()),
            24_000,
        )
    }

    #[test]
    fn test_voice_resolution() {
        let tts = tts();
        assert_eq!(tts.resolve_voice("Puck"), "Puck");
        assert_eq!(tts.resolve_voice("Kore"), "Kore");
        // Google-shaped and empty names fall back to the default
        assert_eq!(tts.resolve_voice("ja-JP-Neural2-B"), "Kore");
        assert_eq!(tts.resolve_voice(""), "Kore");
        assert_eq!(tts.resolve_voice("voice with spaces"), "Kore");
    }

    #[tokio::test]
    async fn test_missing_credentials() {
        let tts = GeminiTts::new(reqwest::Client::new(), GeminiConfig::default(), None, 24_000);
        let err = tts.synthesize("テスト", "Kore").await;
        assert!(matches!(err, Err(PipelineError::MissingCredentials(_))));
    }
}
