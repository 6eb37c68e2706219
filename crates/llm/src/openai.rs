//! OpenAI chat-completions streaming source

use async_stream::stream;
use async_trait::async_trait;
use futures::StreamExt;
use serde::Serialize;
use serde_json::Value;

use talkstream_core::{DeltaStream, Error, Turn, TurnRole};

use crate::{LlmError, ReplySource};

const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

/// OpenAI chat source configuration
#[derive(Debug, Clone)]
pub struct OpenAiChatConfig {
    /// Bearer token
    pub api_key: Option<String>,
    /// Model used when the request does not name one
    pub model: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Prepended as the system message; empty disables it
    pub system_prompt: String,
    /// Endpoint override, for tests
    pub endpoint: String,
}

impl Default for OpenAiChatConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gpt-4.1-mini".to_string(),
            temperature: 0.7,
            system_prompt: String::new(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    stream: bool,
    messages: Vec<ChatMessage<'a>>,
}

/// Streaming chat-completions client
pub struct OpenAiChat {
    client: reqwest::Client,
    config: OpenAiChatConfig,
}

impl OpenAiChat {
    pub fn new(client: reqwest::Client, config: OpenAiChatConfig) -> Self {
        Self { client, config }
    }

    fn messages<'a>(&'a self, turns: &'a [Turn]) -> Vec<ChatMessage<'a>> {
        let mut messages = Vec::with_capacity(turns.len() + 1);
        if !self.config.system_prompt.is_empty() {
            messages.push(ChatMessage {
                role: "system",
                content: &self.config.system_prompt,
            });
        }
        for turn in turns {
            messages.push(ChatMessage {
                role: match turn.role {
                    TurnRole::User => "user",
                    TurnRole::Assistant => "assistant",
                },
                content: &turn.text,
            });
        }
        messages
    }
}

#[async_trait]
impl ReplySource for OpenAiChat {
    async fn stream_reply(&self, turns: &[Turn], model: &str) -> Result<DeltaStream, LlmError> {
        let api_key = self
            .config
            .api_key
            .clone()
            .ok_or_else(|| LlmError::MissingCredentials("llm.api_key".to_string()))?;

        let model = if model.is_empty() {
            self.config.model.as_str()
        } else {
            model
        };

        let request = ChatRequest {
            model,
            temperature: self.config.temperature,
            stream: true,
            messages: self.messages(turns),
        };

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let mut body = response.bytes_stream();

        let deltas = stream! {
            let mut buf: Vec<u8> = Vec::new();
            while let Some(chunk) = body.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        yield Err(Error::Generation(e.to_string()));
                        return;
                    }
                };
                buf.extend_from_slice(&chunk);

                // SSE records are blank-line separated
                while let Some(pos) = find_record_end(&buf) {
                    let record: Vec<u8> = buf.drain(..pos + 2).collect();
                    let record = String::from_utf8_lossy(&record);
                    for line in record.lines() {
                        let Some(payload) = line.strip_prefix("data:") else {
                            continue;
                        };
                        let payload = payload.trim();
                        if payload == "[DONE]" {
                            return;
                        }
                        match serde_json::from_str::<Value>(payload) {
                            Ok(value) => {
                                if let Some(delta) = value["choices"][0]["delta"]["content"].as_str() {
                                    if !delta.is_empty() {
                                        yield Ok(delta.to_string());
                                    }
                                }
                            }
                            Err(e) => {
                                yield Err(Error::Generation(format!("malformed delta: {}", e)));
                                return;
                            }
                        }
                    }
                }
            }
        };

        Ok(Box::pin(deltas))
    }
}

fn find_record_end(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_include_system_prompt() {
        let chat = OpenAiChat::new(
            reqwest::Client::new(),
            OpenAiChatConfig {
                system_prompt: "やさしく答えてね".to_string(),
                ..Default::default()
            },
        );

        let turns = vec![Turn::user("こんにちは"), Turn::assistant("はい")];
        let messages = chat.messages(&turns);
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[1].role, "user");
        assert_eq!(messages[2].role, "assistant");
    }

    #[test]
    fn test_missing_credentials() {
        let chat = OpenAiChat::new(reqwest::Client::new(), OpenAiChatConfig::default());
        let turns = vec![Turn::user("hi")];
        let err = futures::executor::block_on(chat.stream_reply(&turns, ""));
        assert!(matches!(err, Err(LlmError::MissingCredentials(_))));
    }
}
