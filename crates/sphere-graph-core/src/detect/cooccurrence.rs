//! Sliding-window co-occurrence detection.

use super::RelationCandidate;
use crate::error::{CoreError, CoreResult};
use crate::types::ContentHash;

/// Detects co-occurring compositions within a sliding window.
///
/// Every window of `window` adjacent tokens becomes one candidate relation
/// sequence observed once. A stream shorter than the window yields no
/// candidates, so a singleton token never relates to itself.
#[derive(Debug, Clone, Copy)]
pub struct CooccurrenceDetector {
    window: usize,
    initial_rating: f64,
}

impl CooccurrenceDetector {
    /// Create a detector.
    ///
    /// # Errors
    ///
    /// `CoreError::Config` when `window < 2`; a window of one would relate
    /// every token to itself.
    pub fn new(window: usize, initial_rating: f64) -> CoreResult<Self> {
        if window < 2 {
            return Err(CoreError::Config(format!(
                "detector.window must be at least 2, got {window}"
            )));
        }
        Ok(Self {
            window,
            initial_rating,
        })
    }

    /// Window width.
    pub fn window(&self) -> usize {
        self.window
    }

    /// Propose one candidate per window position.
    pub fn detect(&self, tokens: &[ContentHash]) -> Vec<RelationCandidate> {
        if tokens.len() < self.window {
            return Vec::new();
        }
        tokens
            .windows(self.window)
            .map(|members| RelationCandidate {
                members: members.to_vec(),
                initial_rating: self.initial_rating,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(label: &[u8]) -> ContentHash {
        ContentHash::of_bytes(label)
    }

    #[test]
    fn test_window_must_be_at_least_two() {
        assert!(CooccurrenceDetector::new(1, 1000.0).is_err());
        assert!(CooccurrenceDetector::new(2, 1000.0).is_ok());
    }

    #[test]
    fn test_adjacent_pairs() {
        let detector = CooccurrenceDetector::new(2, 1000.0).unwrap();
        let tokens = [token(b"a"), token(b"b"), token(b"c")];
        let candidates = detector.detect(&tokens);
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].members, vec![tokens[0], tokens[1]]);
        assert_eq!(candidates[1].members, vec![tokens[1], tokens[2]]);
        assert_eq!(candidates[0].initial_rating, 1000.0);
    }

    #[test]
    fn test_short_stream_yields_nothing() {
        let detector = CooccurrenceDetector::new(2, 1000.0).unwrap();
        assert!(detector.detect(&[token(b"only")]).is_empty());
        assert!(detector.detect(&[]).is_empty());
    }

    #[test]
    fn test_repeated_token_is_one_window() {
        // "hello hello": one window, members [h, h]; RLE downstream makes
        // it a single entry with occurrence count 2.
        let detector = CooccurrenceDetector::new(2, 1000.0).unwrap();
        let h = token(b"hello");
        let candidates = detector.detect(&[h, h]);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].members, vec![h, h]);
    }

    #[test]
    fn test_wider_window() {
        let detector = CooccurrenceDetector::new(3, 1000.0).unwrap();
        let tokens = [token(b"a"), token(b"b"), token(b"c"), token(b"d")];
        let candidates = detector.detect(&tokens);
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].members.len(), 3);
    }
}
