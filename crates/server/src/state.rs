//! Application state
//!
//! Shared, read-only state across all handlers. Per-request mutable state
//! lives inside each reply session.

use std::sync::Arc;

use talkstream_config::Settings;
use talkstream_llm::{OpenAiChat, OpenAiChatConfig, ReplySource};
use talkstream_pipeline::ProviderRegistry;

/// Application state
#[derive(Clone)]
pub struct AppState {
    /// Configuration
    pub config: Arc<Settings>,
    /// Synthesis providers
    pub registry: Arc<ProviderRegistry>,
    /// Generation source
    pub llm: Arc<dyn ReplySource>,
}

impl AppState {
    /// Create application state with the real generation source.
    pub fn new(config: Settings) -> Self {
        let client = reqwest::Client::new();

        let llm = OpenAiChat::new(
            client.clone(),
            OpenAiChatConfig {
                api_key: config.llm.api_key.clone(),
                model: config.llm.model.clone(),
                temperature: config.llm.temperature,
                system_prompt: config.llm.system_prompt.clone(),
                ..Default::default()
            },
        );

        Self::with_source(config, Arc::new(llm))
    }

    /// Create application state with an injected generation source.
    pub fn with_source(config: Settings, llm: Arc<dyn ReplySource>) -> Self {
        let client = reqwest::Client::new();
        let registry = ProviderRegistry::from_settings(client, &config.synth);

        Self {
            config: Arc::new(config),
            registry: Arc::new(registry),
            llm,
        }
    }
}
