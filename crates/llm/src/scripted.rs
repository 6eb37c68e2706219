//! Scripted source for tests and offline runs

use async_trait::async_trait;

use talkstream_core::{DeltaStream, Error, Turn};

use crate::{LlmError, ReplySource};

/// Replays a fixed list of deltas, optionally failing partway through.
/// No model or network involved; useful in tests and demos.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    deltas: Vec<String>,
    fail_after: Option<usize>,
}

impl ScriptedSource {
    pub fn new<I, S>(deltas: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            deltas: deltas.into_iter().map(Into::into).collect(),
            fail_after: None,
        }
    }

    /// Yield the first `n` deltas, then an error item.
    pub fn failing_after<I, S>(deltas: I, n: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            deltas: deltas.into_iter().map(Into::into).collect(),
            fail_after: Some(n),
        }
    }
}

#[async_trait]
impl ReplySource for ScriptedSource {
    async fn stream_reply(&self, _turns: &[Turn], _model: &str) -> Result<DeltaStream, LlmError> {
        let items: Vec<Result<String, Error>> = match self.fail_after {
            Some(n) => self
                .deltas
                .iter()
                .take(n)
                .cloned()
                .map(Ok)
                .chain(std::iter::once(Err(Error::Generation(
                    "scripted generation failure".to_string(),
                ))))
                .collect(),
            None => self.deltas.iter().cloned().map(Ok).collect(),
        };

        Ok(Box::pin(tokio_stream::iter(items)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_stream::StreamExt;

    #[tokio::test]
    async fn test_scripted_replay() {
        let source = ScriptedSource::new(["こん", "にちは！"]);
        let mut stream = source.stream_reply(&[], "").await.unwrap();

        let mut out = String::new();
        while let Some(item) = stream.next().await {
            out.push_str(&item.unwrap());
        }
        assert_eq!(out, "こんにちは！");
    }

    #[tokio::test]
    async fn test_scripted_failure() {
        let source = ScriptedSource::failing_after(["a", "b", "c"], 2);
        let mut stream = source.stream_reply(&[], "").await.unwrap();

        assert_eq!(stream.next().await.unwrap().unwrap(), "a");
        assert_eq!(stream.next().await.unwrap().unwrap(), "b");
        assert!(stream.next().await.unwrap().is_err());
    }
}
