//! Ranked classifier output.
//!
//! Scores are independent per-label similarities, not a probability
//! distribution: they are clamped to `[0, 1]` but never normalised.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// LabelScore
// ---------------------------------------------------------------------------

/// A single `(label, score)` pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelScore {
    pub label: String,
    pub score: f32,
}

impl LabelScore {
    pub fn new(label: impl Into<String>, score: f32) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }
}

// ---------------------------------------------------------------------------
// ClassificationResult
// ---------------------------------------------------------------------------

/// Label scores sorted by descending score.
///
/// May hold fewer entries than the vocabulary: backends are free to return
/// only their top hits.
///
/// ```rust
/// use urban_sounds::classify::{ClassificationResult, LabelScore};
///
/// let result = ClassificationResult::new(vec![
///     LabelScore::new("Silence", 0.05),
///     LabelScore::new("Alarm", 0.81),
/// ]);
/// assert_eq!(result.best().unwrap().label, "Alarm");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassificationResult {
    scores: Vec<LabelScore>,
}

impl ClassificationResult {
    /// Build a result from unordered pairs.
    ///
    /// Non-finite scores are discarded, the rest are clamped to `[0, 1]` and
    /// sorted descending. The sort is stable, so ties keep backend order.
    pub fn new(scores: Vec<LabelScore>) -> Self {
        let mut scores: Vec<LabelScore> = scores
            .into_iter()
            .filter(|s| s.score.is_finite())
            .map(|mut s| {
                s.score = s.score.clamp(0.0, 1.0);
                s
            })
            .collect();
        scores.sort_by(|a, b| b.score.total_cmp(&a.score));
        Self { scores }
    }

    pub fn scores(&self) -> &[LabelScore] {
        &self.scores
    }

    /// The first `n` entries, or all of them when fewer exist.
    pub fn top(&self, n: usize) -> &[LabelScore] {
        &self.scores[..n.min(self.scores.len())]
    }

    pub fn best(&self) -> Option<&LabelScore> {
        self.scores.first()
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ClassificationResult {
        ClassificationResult::new(vec![
            LabelScore::new("Talking", 0.40),
            LabelScore::new("Silence", 0.05),
            LabelScore::new("Alarm", 0.81),
        ])
    }

    #[test]
    fn sorted_descending() {
        let binding = sample();
        let labels: Vec<&str> = binding.scores().iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, ["Alarm", "Talking", "Silence"]);
    }

    #[test]
    fn top_is_capped_by_length() {
        let result = sample();
        assert_eq!(result.top(2).len(), 2);
        assert_eq!(result.top(10).len(), 3);
        assert!(result.top(0).is_empty());
    }

    #[test]
    fn scores_are_clamped_and_nan_dropped() {
        let result = ClassificationResult::new(vec![
            LabelScore::new("A", 1.7),
            LabelScore::new("B", f32::NAN),
            LabelScore::new("C", -0.2),
        ]);
        assert_eq!(result.len(), 2);
        assert_eq!(result.scores()[0].score, 1.0);
        assert_eq!(result.scores()[1].score, 0.0);
    }

    #[test]
    fn scores_need_not_sum_to_one() {
        let total: f32 = sample().scores().iter().map(|s| s.score).sum();
        assert!((total - 1.26).abs() < 1e-5);
    }

    #[test]
    fn empty_result_has_no_best() {
        assert!(ClassificationResult::default().best().is_none());
    }
}
