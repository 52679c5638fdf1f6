//! Facial-emotion sample types and turn-level aggregation.
//!
//! During a recording turn the classifier produces one [`EmotionSample`]
//! per processed frame. Two views of those samples exist:
//!
//! 1. A bounded sliding window (default 10 frames) smoothed in real time
//!    via [`EmotionAggregator::smoothed`].
//! 2. An unbounded per-turn list aggregated once on key release via
//!    [`EmotionAggregator::aggregate_turn`].
//!
//! The mode computation deliberately fails on a multi-way tie, mirroring
//! the tie behaviour callers depend on: the fallback is the most recent
//! raw label, not an arbitrary tie winner.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

/// The fixed 7-class emotion set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Angry,
    Disgust,
    Fear,
    Happy,
    Sad,
    Surprise,
    #[default]
    Neutral,
}

/// All emotion labels in canonical order.
pub const EMOTION_LABELS: [Emotion; 7] = [
    Emotion::Angry,
    Emotion::Disgust,
    Emotion::Fear,
    Emotion::Happy,
    Emotion::Sad,
    Emotion::Surprise,
    Emotion::Neutral,
];

impl Emotion {
    /// The lowercase label string.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Angry => "angry",
            Self::Disgust => "disgust",
            Self::Fear => "fear",
            Self::Happy => "happy",
            Self::Sad => "sad",
            Self::Surprise => "surprise",
            Self::Neutral => "neutral",
        }
    }

    /// Parse an exact label (case-insensitive, trimmed). Unknown → `None`.
    #[must_use]
    pub fn from_exact(s: &str) -> Option<Self> {
        let s = s.trim().to_ascii_lowercase();
        EMOTION_LABELS.into_iter().find(|e| e.as_str() == s)
    }

    /// Parse leniently: any label in the fixed set maps; anything else is
    /// remapped to [`Emotion::Neutral`] per the data-model invariant.
    #[must_use]
    pub fn from_lenient(s: &str) -> Self {
        Self::from_exact(s).unwrap_or(Self::Neutral)
    }

    /// Find the first emotion label contained anywhere in `text`
    /// (case-insensitive substring match).
    #[must_use]
    pub fn find_in(text: &str) -> Option<Self> {
        let lower = text.to_lowercase();
        EMOTION_LABELS.into_iter().find(|e| lower.contains(e.as_str()))
    }

    /// ASCII-art emoticon for console display.
    #[must_use]
    pub fn emoticon(self) -> &'static str {
        match self {
            Self::Angry => "(>n<)",
            Self::Disgust => "(-_-)",
            Self::Fear => "(>_<)",
            Self::Happy => "(^_^)",
            Self::Sad => "(T_T)",
            Self::Surprise => "(o_o)",
            Self::Neutral => "(._.)",
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Emotion {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_exact(s).ok_or(())
    }
}

/// One per-frame emotion classification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmotionSample {
    pub emotion: Emotion,
    /// Classifier confidence in `0.0..=1.0`.
    pub confidence: f32,
}

impl EmotionSample {
    /// The default sample used when no face is detected or nothing was
    /// observed during a turn.
    #[must_use]
    pub fn neutral() -> Self {
        Self {
            emotion: Emotion::Neutral,
            confidence: 0.5,
        }
    }
}

/// Smooths per-frame classifications into one label + confidence per turn.
#[derive(Debug)]
pub struct EmotionAggregator {
    window: VecDeque<EmotionSample>,
    turn_samples: Vec<EmotionSample>,
    window_size: usize,
    low_confidence_threshold: f32,
}

impl EmotionAggregator {
    #[must_use]
    pub fn new(window_size: usize, low_confidence_threshold: f32) -> Self {
        Self {
            window: VecDeque::with_capacity(window_size),
            turn_samples: Vec::new(),
            window_size: window_size.max(1),
            low_confidence_threshold,
        }
    }

    /// Number of samples observed during the current turn.
    #[must_use]
    pub fn turn_len(&self) -> usize {
        self.turn_samples.len()
    }

    /// Clear both the smoothing window and the per-turn list.
    ///
    /// Called when a new recording turn starts.
    pub fn begin_turn(&mut self) {
        self.window.clear();
        self.turn_samples.clear();
    }

    /// Record one frame classification.
    pub fn observe(&mut self, sample: EmotionSample) {
        if self.window.len() == self.window_size {
            self.window.pop_front();
        }
        self.window.push_back(sample);
        self.turn_samples.push(sample);
    }

    /// Real-time smoothed result over the sliding window.
    ///
    /// Returns the window mode paired with the latest raw confidence; a
    /// multi-way mode tie falls back to the latest raw label. A latest
    /// confidence below the low-confidence threshold forces the result to
    /// (neutral, 0.5) so noisy single-frame misclassifications never reach
    /// downstream logic.
    #[must_use]
    pub fn smoothed(&self) -> EmotionSample {
        let Some(latest) = self.window.back() else {
            return EmotionSample::neutral();
        };

        if latest.confidence < self.low_confidence_threshold {
            return EmotionSample::neutral();
        }

        let emotion =
            strict_mode(self.window.iter().map(|s| s.emotion)).unwrap_or(latest.emotion);
        EmotionSample {
            emotion,
            confidence: latest.confidence,
        }
    }

    /// Final aggregation over every sample collected during the turn.
    ///
    /// The label is the whole-turn mode (tie → last sample's label); the
    /// confidence is the mean confidence restricted to samples matching
    /// that label. An empty turn yields (neutral, 0.5).
    #[must_use]
    pub fn aggregate_turn(&self) -> EmotionSample {
        let Some(last) = self.turn_samples.last() else {
            return EmotionSample::neutral();
        };

        let emotion =
            strict_mode(self.turn_samples.iter().map(|s| s.emotion)).unwrap_or(last.emotion);

        let matching: Vec<f32> = self
            .turn_samples
            .iter()
            .filter(|s| s.emotion == emotion)
            .map(|s| s.confidence)
            .collect();
        let confidence = if matching.is_empty() {
            0.5
        } else {
            matching.iter().sum::<f32>() / matching.len() as f32
        };

        EmotionSample {
            emotion,
            confidence,
        }
    }
}

/// Statistical mode that fails on a multi-way tie.
///
/// Returns `None` when more than one label shares the top count, leaving
/// the tie-break (latest raw label) to the caller.
fn strict_mode(labels: impl Iterator<Item = Emotion>) -> Option<Emotion> {
    let mut counts: Vec<(Emotion, usize)> = Vec::with_capacity(EMOTION_LABELS.len());
    for label in labels {
        match counts.iter_mut().find(|(e, _)| *e == label) {
            Some((_, n)) => *n += 1,
            None => counts.push((label, 1)),
        }
    }

    let (best, best_count) = counts.iter().max_by_key(|(_, n)| *n).copied()?;
    let contenders = counts.iter().filter(|(_, n)| *n == best_count).count();
    if contenders > 1 {
        return None;
    }
    Some(best)
}
