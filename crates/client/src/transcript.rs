//! Emission-order transcript
//!
//! Segment text renders the moment its event is observed; it never waits on
//! audio.

use talkstream_core::Segment;

/// Visible transcript for one reply.
#[derive(Debug, Default)]
pub struct TranscriptView {
    lines: Vec<Segment>,
}

impl TranscriptView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a segment in emission order.
    pub fn push(&mut self, segment: Segment) {
        self.lines.push(segment);
    }

    pub fn lines(&self) -> &[Segment] {
        &self.lines
    }

    /// Full reply text, segment texts joined.
    pub fn full_text(&self) -> String {
        self.lines
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(id: u64, text: &str) -> Segment {
        Segment {
            id,
            text: text.to_string(),
            is_final: false,
            hash: String::new(),
        }
    }

    #[test]
    fn test_emission_order_preserved() {
        let mut view = TranscriptView::new();
        view.push(segment(1, "第一文。"));
        view.push(segment(2, "第二文。"));

        assert_eq!(view.lines().len(), 2);
        assert_eq!(view.full_text(), "第一文。第二文。");
    }
}
