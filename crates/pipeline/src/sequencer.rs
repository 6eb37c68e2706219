//! Segment sequencing and adjacent duplicate suppression

use talkstream_core::Segment;

/// Assigns ids in arrival order and drops a segment whose trimmed text
/// matches the immediately preceding one.
///
/// The single-slot last-hash guards against an upstream re-emission race; a
/// duplicate separated by a distinct segment is intentionally not caught.
pub struct Sequencer {
    next_id: u64,
    last_hash: Option<String>,
}

impl Sequencer {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            last_hash: None,
        }
    }

    /// Admit a flushed text. Returns `None` for empty text or an adjacent
    /// duplicate; dropped segments consume no id.
    pub fn admit(&mut self, text: &str, is_final: bool) -> Option<Segment> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return None;
        }

        let hash = sha1_smol::Sha1::from(trimmed).digest().to_string();
        if self.last_hash.as_deref() == Some(hash.as_str()) {
            return None;
        }

        let id = self.next_id;
        self.next_id += 1;
        self.last_hash = Some(hash.clone());

        Some(Segment {
            id,
            text: trimmed.to_string(),
            is_final,
            hash,
        })
    }
}

impl Default for Sequencer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_start_at_one_and_increment() {
        let mut seq = Sequencer::new();
        assert_eq!(seq.admit("一つ目。", false).unwrap().id, 1);
        assert_eq!(seq.admit("二つ目。", false).unwrap().id, 2);
        assert_eq!(seq.admit("三つ目。", true).unwrap().id, 3);
    }

    #[test]
    fn test_adjacent_duplicate_dropped_without_id() {
        let mut seq = Sequencer::new();
        assert_eq!(seq.admit("同じ文。", false).unwrap().id, 1);
        assert!(seq.admit("同じ文。", false).is_none());
        // no id was consumed by the duplicate
        assert_eq!(seq.admit("別の文。", false).unwrap().id, 2);
    }

    #[test]
    fn test_non_adjacent_duplicate_passes() {
        let mut seq = Sequencer::new();
        assert!(seq.admit("あいう。", false).is_some());
        assert!(seq.admit("かきく。", false).is_some());
        // adjacent-only: same text after an intervening segment is kept
        assert_eq!(seq.admit("あいう。", false).unwrap().id, 3);
    }

    #[test]
    fn test_whitespace_differences_still_duplicate() {
        let mut seq = Sequencer::new();
        assert!(seq.admit("こんにちは。", false).is_some());
        assert!(seq.admit("  こんにちは。 ", false).is_none());
    }

    #[test]
    fn test_empty_text_ignored() {
        let mut seq = Sequencer::new();
        assert!(seq.admit("   ", false).is_none());
        assert_eq!(seq.admit("本文。", false).unwrap().id, 1);
    }
}
