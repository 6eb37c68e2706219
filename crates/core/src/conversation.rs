//! Conversation and request types

use serde::{Deserialize, Serialize};

/// Speaker role within a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

/// One conversation turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            text: text.into(),
        }
    }
}

/// Voice selection: which synthesis provider and which voice within it.
///
/// `provider_key` is matched case-insensitively against known provider name
/// substrings; an unmatched key falls back to the configured default
/// provider. An empty `voice_key` means the provider's default voice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceSelector {
    #[serde(default)]
    pub provider_key: String,
    #[serde(default)]
    pub voice_key: String,
}

/// One streamed reply request. Owns its segmenter/sequencer/worker-pool for
/// the lifetime of the stream; nothing is shared across requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyRequest {
    pub conversation_turns: Vec<Turn>,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub voice_selector: VoiceSelector,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_parses_camel_case() {
        let body = serde_json::json!({
            "conversationTurns": [{"role": "user", "text": "こんにちは！"}],
            "model": "gpt-4.1-mini",
            "voiceSelector": {"providerKey": "OpenAI", "voiceKey": "nova"},
        });
        let req: ReplyRequest = serde_json::from_value(body).unwrap();
        assert_eq!(req.conversation_turns.len(), 1);
        assert_eq!(req.conversation_turns[0].role, TurnRole::User);
        assert_eq!(req.voice_selector.provider_key, "OpenAI");
    }

    #[test]
    fn test_request_selector_optional() {
        let body = serde_json::json!({
            "conversationTurns": [{"role": "user", "text": "hi"}],
        });
        let req: ReplyRequest = serde_json::from_value(body).unwrap();
        assert!(req.voice_selector.provider_key.is_empty());
        assert!(req.model.is_empty());
    }
}
