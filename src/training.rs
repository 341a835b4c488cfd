// src/training.rs
use crate::error::{Error, Result};
use crate::landmarks::LandmarkSample;
use crate::pattern::GesturePattern;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Samples recorded per gesture.
    pub samples_needed: usize,
    /// Minimum gap between two captures, in milliseconds.
    pub capture_interval_ms: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            samples_needed: 5,
            capture_interval_ms: 1000,
        }
    }
}

impl TrainingConfig {
    pub fn capture_interval(&self) -> Duration {
        Duration::from_millis(self.capture_interval_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.samples_needed == 0 {
            return Err(Error::InvalidConfig(
                "training.samples_needed must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOutcome {
    Captured { collected: usize, needed: usize },
    /// The final sample was captured; the session can be turned into a pattern.
    Complete,
    SkippedNoHands,
    SkippedTooSoon,
    AlreadyComplete,
}

/// Accumulates spaced, hand-bearing samples for one new gesture.
#[derive(Debug)]
pub struct TrainingSession {
    name: String,
    config: TrainingConfig,
    samples: Vec<LandmarkSample>,
    last_capture: Instant,
}

impl TrainingSession {
    /// Starts a session. The first capture waits one interval from `started_at`.
    pub fn new(name: impl Into<String>, config: TrainingConfig, started_at: Instant) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Error::EmptyName);
        }
        config.validate()?;

        info!(gesture = %name, needed = config.samples_needed, "training started");
        Ok(Self {
            name,
            samples: Vec::with_capacity(config.samples_needed),
            config,
            last_capture: started_at,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn progress(&self) -> (usize, usize) {
        (self.samples.len(), self.config.samples_needed)
    }

    pub fn is_complete(&self) -> bool {
        self.samples.len() >= self.config.samples_needed
    }

    /// Offers a freshly produced sample taken at `now`.
    pub fn offer(&mut self, sample: LandmarkSample, now: Instant) -> Result<CaptureOutcome> {
        if self.is_complete() {
            return Ok(CaptureOutcome::AlreadyComplete);
        }
        if !sample.has_hands() {
            return Ok(CaptureOutcome::SkippedNoHands);
        }
        if now.saturating_duration_since(self.last_capture) < self.config.capture_interval() {
            return Ok(CaptureOutcome::SkippedTooSoon);
        }
        sample.validate()?;

        self.samples.push(sample);
        self.last_capture = now;

        let (collected, needed) = self.progress();
        debug!(gesture = %self.name, collected, needed, "captured training sample");
        if self.is_complete() {
            Ok(CaptureOutcome::Complete)
        } else {
            Ok(CaptureOutcome::Captured { collected, needed })
        }
    }

    /// Builds the pattern from whatever has been captured so far.
    pub fn into_pattern(self) -> Result<GesturePattern> {
        GesturePattern::new(self.name, self.samples)
    }
}
