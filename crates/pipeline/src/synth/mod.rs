//! Synthesis providers
//!
//! Each provider implements [`Synthesizer`]: text + voice in, raw audio out.
//! Providers differ in returned encoding; [`normalize`] turns every result
//! into a WAV-tagged [`AudioChunk`] so downstream code never carries
//! provider-specific decoding logic.

mod elevenlabs;
mod gemini;
mod google;
mod openai;

pub use elevenlabs::ElevenLabsTts;
pub use gemini::GeminiTts;
pub use google::GoogleTts;
pub use openai::OpenAiTts;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use talkstream_config::SynthConfig;
use talkstream_core::{AudioChunk, AudioFormat, SegmentId};

use crate::{audio, PipelineError};

/// Known synthesis providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    OpenAi,
    Google,
    Gemini,
    ElevenLabs,
}

impl ProviderKind {
    /// Case-insensitive substring match against known provider names.
    /// `None` means the caller should fall back to the default provider.
    pub fn resolve(key: &str) -> Option<Self> {
        let key = key.to_lowercase();
        if key.contains("openai") {
            Some(ProviderKind::OpenAi)
        } else if key.contains("gemini") {
            Some(ProviderKind::Gemini)
        } else if key.contains("google") {
            Some(ProviderKind::Google)
        } else if key.contains("eleven") {
            Some(ProviderKind::ElevenLabs)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Google => "google",
            ProviderKind::Gemini => "gemini",
            ProviderKind::ElevenLabs => "elevenlabs",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Encoding of the bytes a provider hands back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceEncoding {
    /// Raw 16-bit little-endian PCM at the given rate, mono
    Pcm16 { sample_rate: u32 },
    /// Already a playable container; passed through untouched
    Wav,
}

/// One provider response, before normalization.
#[derive(Debug, Clone)]
pub struct SynthAudio {
    pub encoding: SourceEncoding,
    pub bytes: Bytes,
    /// Run the DC-offset/fade/pad cleanup chain before wrapping. Set for
    /// providers with a known leading click artifact; not per-call
    /// configurable.
    pub needs_conditioning: bool,
}

/// A text-to-speech backend.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Synthesize one segment. `voice` is already resolved (never empty).
    async fn synthesize(&self, text: &str, voice: &str) -> Result<SynthAudio, PipelineError>;

    /// Voice used when the request does not name one.
    fn default_voice(&self) -> &str;

    fn kind(&self) -> ProviderKind;
}

/// Normalize a provider response into an emit-ready audio chunk.
pub fn normalize(raw: SynthAudio, id: SegmentId) -> Result<AudioChunk, PipelineError> {
    match raw.encoding {
        SourceEncoding::Wav => Ok(AudioChunk {
            id,
            format: AudioFormat::Wav,
            bytes: raw.bytes,
        }),
        SourceEncoding::Pcm16 { sample_rate } => {
            let mut samples = audio::pcm_to_samples(&raw.bytes);
            if raw.needs_conditioning {
                samples = audio::condition(samples, sample_rate);
            }
            let bytes = audio::wrap_wav(&samples, sample_rate)?;
            Ok(AudioChunk {
                id,
                format: AudioFormat::Wav,
                bytes,
            })
        }
    }
}

/// All configured providers plus the fallback choice.
pub struct ProviderRegistry {
    default: ProviderKind,
    providers: HashMap<ProviderKind, Arc<dyn Synthesizer>>,
}

impl ProviderRegistry {
    pub fn new(default: ProviderKind) -> Self {
        Self {
            default,
            providers: HashMap::new(),
        }
    }

    /// Build the full registry from settings, sharing one HTTP client.
    pub fn from_settings(client: reqwest::Client, config: &SynthConfig) -> Self {
        let default = ProviderKind::resolve(&config.default_provider).unwrap_or(ProviderKind::OpenAi);

        let mut registry = Self::new(default);
        registry.register(Arc::new(OpenAiTts::new(client.clone(), config.openai.clone())));
        registry.register(Arc::new(GoogleTts::new(
            client.clone(),
            config.google.clone(),
            config.sample_rate,
        )));
        registry.register(Arc::new(GeminiTts::new(
            client.clone(),
            config.gemini.clone(),
            config.google.api_key.clone(),
            config.sample_rate,
        )));
        registry.register(Arc::new(ElevenLabsTts::new(client, config.elevenlabs.clone())));
        registry
    }

    pub fn register(&mut self, provider: Arc<dyn Synthesizer>) {
        self.providers.insert(provider.kind(), provider);
    }

    /// Select by request key; an unmatched key silently falls back to the
    /// default provider.
    pub fn select(&self, key: &str) -> Arc<dyn Synthesizer> {
        let kind = ProviderKind::resolve(key).unwrap_or(self.default);
        self.providers
            .get(&kind)
            .or_else(|| self.providers.get(&self.default))
            .cloned()
            .expect("registry has no providers")
    }
}
