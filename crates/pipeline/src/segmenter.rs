//! Delta segmentation
//!
//! Accumulates incoming text fragments and cuts them into speakable
//! segments at sentence boundaries, with a hard length cap as the safety
//! net. Lengths are counted in characters, not bytes.

pub use talkstream_config::SegmenterConfig;

/// Accumulates deltas and emits finalized segment texts.
///
/// A flush happens when the buffer ends with sentence-terminal punctuation
/// (or a newline) and the trimmed buffer has reached `min_chars`, or when the
/// buffer reaches `max_chars` regardless of punctuation. The end-of-stream
/// remainder is flushed whole via [`Segmenter::finish`], exempt from the
/// minimum.
pub struct Segmenter {
    config: SegmenterConfig,
    buf: String,
    /// Character count of `buf`
    len: usize,
}

impl Segmenter {
    pub fn new(config: SegmenterConfig) -> Self {
        Self {
            config,
            buf: String::new(),
            len: 0,
        }
    }

    /// Append a delta; returns any segments it completed, in order.
    ///
    /// The delta is scanned character by character so one delta carrying
    /// several sentences still produces one segment per sentence.
    pub fn push(&mut self, delta: &str) -> Vec<String> {
        let mut flushed = Vec::new();

        for ch in delta.chars() {
            self.buf.push(ch);
            self.len += 1;

            let flush = if self.len >= self.config.max_chars {
                true
            } else if is_sentence_terminal(ch) {
                self.buf.trim().chars().count() >= self.config.min_chars
            } else {
                false
            };

            if flush {
                if let Some(text) = self.take() {
                    flushed.push(text);
                }
            }
        }

        flushed
    }

    /// End of stream: flush whatever is left, regardless of length.
    pub fn finish(&mut self) -> Option<String> {
        self.take()
    }

    fn take(&mut self) -> Option<String> {
        let text = std::mem::take(&mut self.buf);
        self.len = 0;
        let trimmed = text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}

fn is_sentence_terminal(ch: char) -> bool {
    matches!(ch, '。' | '！' | '？' | '!' | '?' | '\n')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segmenter() -> Segmenter {
        Segmenter::new(SegmenterConfig::default())
    }

    #[test]
    fn test_two_sentences_two_segments() {
        let mut seg = segmenter();
        // Both sentences in a single delta still split at each boundary
        let out = seg.push("第一文。第二文。");
        assert_eq!(out, vec!["第一文。", "第二文。"]);
        assert!(seg.finish().is_none());
    }

    #[test]
    fn test_incremental_deltas() {
        let mut seg = segmenter();
        assert!(seg.push("こんにちは").is_empty());
        let out = seg.push("、元気です！そし");
        assert_eq!(out, vec!["こんにちは、元気です！"]);
        assert_eq!(seg.finish().unwrap(), "そし");
    }

    #[test]
    fn test_floor_blocks_bare_terminal_mark() {
        let mut seg = segmenter();
        // a lone terminal mark is not a sentence
        assert!(seg.push("。").is_empty());
        let out = seg.push("はい。");
        assert_eq!(out, vec!["。はい。"]);
    }

    #[test]
    fn test_configured_floor_defers_flush() {
        let mut seg = Segmenter::new(SegmenterConfig {
            min_chars: 5,
            max_chars: 48,
        });
        // "や。" is terminal but under the configured floor
        assert!(seg.push("や。").is_empty());
        let out = seg.push("っほー！");
        assert_eq!(out, vec!["や。っほー！"]);
    }

    #[test]
    fn test_final_flush_exempt_from_floor() {
        let mut seg = segmenter();
        assert!(seg.push("う").is_empty());
        assert_eq!(seg.finish().unwrap(), "う");
        assert!(seg.finish().is_none());
    }

    #[test]
    fn test_max_length_cap() {
        let mut seg = segmenter();
        let long: String = "あ".repeat(100);
        let out = seg.push(&long);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].chars().count(), 48);
        assert_eq!(out[1].chars().count(), 48);
        assert_eq!(seg.finish().unwrap().chars().count(), 4);
    }

    #[test]
    fn test_whitespace_deltas_ignored() {
        let mut seg = segmenter();
        assert!(seg.push("   ").is_empty());
        assert!(seg.push("\n\n").is_empty());
        assert!(seg.finish().is_none());
    }

    #[test]
    fn test_newline_is_a_boundary() {
        let mut seg = segmenter();
        let out = seg.push("一行目のテキスト\n");
        assert_eq!(out, vec!["一行目のテキスト"]);
    }

    #[test]
    fn test_flushed_text_is_trimmed() {
        let mut seg = segmenter();
        let out = seg.push("  おはようございます。 ");
        assert_eq!(out, vec!["おはようございます。"]);
    }
}
