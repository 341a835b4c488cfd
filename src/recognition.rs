// src/recognition.rs
use crate::error::{Error, Result};
use crate::geometry::distance;
use crate::landmarks::{Hand, LandmarkSample};
use crate::pattern::{GestureLibrary, GesturePattern};
use tracing::{debug, info};

pub const DEFAULT_THRESHOLD: f32 = 0.7;

/// Best match for a live sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Recognition {
    pub name: String,
    /// Aggregate similarity scaled to 0..=100.
    pub confidence: f32,
}

/// Aggregate similarity of one pattern against a live sample.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternScore {
    pub name: String,
    pub similarity: f32,
}

/// Similarity between two samples in `[0, 1]`.
///
/// Only hands present in both samples are compared. The mean per-landmark
/// distance `d` maps to `1 / (1 + d)`; with no hand in common the result is 0.
pub fn sample_similarity(current: &LandmarkSample, stored: &LandmarkSample) -> f32 {
    let mut total_distance = 0.0f32;
    let mut point_count = 0usize;

    for hand in Hand::ALL {
        if let (Some(a), Some(b)) = (current.hand(hand), stored.hand(hand)) {
            for (p1, p2) in a.iter().zip(b) {
                total_distance += distance(*p1, *p2);
                point_count += 1;
            }
        }
    }

    if point_count == 0 {
        return 0.0;
    }

    let mean_distance = total_distance / point_count as f32;
    1.0 / (1.0 + mean_distance)
}

/// Mean similarity over all of a pattern's samples, `None` if it has none.
pub fn pattern_similarity(current: &LandmarkSample, pattern: &GesturePattern) -> Option<f32> {
    if !pattern.is_matchable() {
        return None;
    }
    let sum: f32 = pattern
        .samples()
        .iter()
        .map(|sample| sample_similarity(current, sample))
        .sum();
    Some(sum / pattern.sample_count() as f32)
}

/// Nearest-neighbour matcher over a gesture library.
#[derive(Debug, Clone, Copy)]
pub struct Recognizer {
    threshold: f32,
}

impl Default for Recognizer {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl Recognizer {
    pub fn new(threshold: f32) -> Result<Self> {
        if !(0.0..1.0).contains(&threshold) {
            return Err(Error::InvalidConfig(format!(
                "recognition threshold {} outside [0, 1)",
                threshold
            )));
        }
        Ok(Self { threshold })
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Scores every matchable pattern, in library order.
    pub fn scores(&self, current: &LandmarkSample, library: &GestureLibrary) -> Result<Vec<PatternScore>> {
        current.validate()?;

        let scores = library
            .iter()
            .filter_map(|pattern| {
                pattern_similarity(current, pattern).map(|similarity| {
                    debug!(
                        gesture = pattern.name(),
                        similarity_pct = (similarity * 100.0) as i32,
                        "compared gesture"
                    );
                    PatternScore {
                        name: pattern.name().to_string(),
                        similarity,
                    }
                })
            })
            .collect();
        Ok(scores)
    }

    /// Returns the best pattern whose similarity strictly exceeds the
    /// threshold. Ties keep the first pattern in library (name) order.
    pub fn recognize(
        &self,
        current: &LandmarkSample,
        library: &GestureLibrary,
    ) -> Result<Option<Recognition>> {
        if library.is_empty() {
            debug!("no gestures stored to compare against");
            return Ok(None);
        }

        let mut best: Option<PatternScore> = None;
        for score in self.scores(current, library)? {
            let best_similarity = best.as_ref().map_or(0.0, |b| b.similarity);
            if score.similarity > best_similarity && score.similarity > self.threshold {
                best = Some(score);
            }
        }

        Ok(best.map(|b| {
            let confidence = b.similarity * 100.0;
            info!(gesture = %b.name, confidence, "best match");
            Recognition {
                name: b.name,
                confidence,
            }
        }))
    }
}
