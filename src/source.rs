// src/source.rs - Landmark producers feeding the store and recognizer
use crate::error::Result;
use crate::geometry::Point;
use crate::landmarks::{Hand, LandmarkSample, FINGER_CHAINS, HAND_LANDMARK_COUNT, WRIST};
use nalgebra::Vector3;
use tracing::debug;

/// Anything that yields decoded landmark samples, e.g. a hand-landmark
/// detector running over camera frames.
pub trait LandmarkSource {
    /// Next sample, or `None` once the stream has ended.
    fn next_sample(&mut self) -> Result<Option<LandmarkSample>>;
}

/// One hand as reported by a detector, before left/right assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct HandDetection {
    /// Detector handedness label such as "Left" or "Right".
    pub handedness: Option<String>,
    pub landmarks: Vec<Point>,
}

impl LandmarkSample {
    /// Assigns detected hands to sides by their handedness label.
    ///
    /// Unlabeled detections fall back to position in the list: the first
    /// becomes the right hand, any later one the left hand.
    pub fn from_detections(detections: &[HandDetection]) -> Result<Self> {
        let mut sample = LandmarkSample::empty();

        for (index, detection) in detections.iter().enumerate() {
            let label = detection
                .handedness
                .as_deref()
                .unwrap_or_default()
                .to_lowercase();

            let hand = if label.contains("left") {
                Hand::Left
            } else if label.contains("right") {
                Hand::Right
            } else if index == 0 {
                Hand::Right
            } else {
                Hand::Left
            };

            debug!(index, label = %label, assigned = %hand, "hand detection");
            sample.set_hand(hand, detection.landmarks.clone())?;
        }

        Ok(sample)
    }
}

/// Replays a fixed list of samples.
#[derive(Debug, Clone, Default)]
pub struct ReplaySource {
    samples: std::collections::VecDeque<LandmarkSample>,
}

impl ReplaySource {
    pub fn new(samples: impl IntoIterator<Item = LandmarkSample>) -> Self {
        Self {
            samples: samples.into_iter().collect(),
        }
    }
}

impl LandmarkSource for ReplaySource {
    fn next_sample(&mut self) -> Result<Option<LandmarkSample>> {
        Ok(self.samples.pop_front())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SimulatedPose {
    OpenPalm,
    Fist,
    /// Index finger extended, others curled.
    Point,
}

impl SimulatedPose {
    fn curl(&self, finger: usize) -> f64 {
        match self {
            SimulatedPose::OpenPalm => 0.0,
            SimulatedPose::Fist => 1.0,
            SimulatedPose::Point => {
                if finger == 1 {
                    0.0
                } else {
                    1.0
                }
            }
        }
    }
}

/// Deterministic synthetic hand stream for demos and tests.
///
/// Produces a hand in a fixed pose that drifts slightly from frame to frame.
#[derive(Debug, Clone)]
pub struct SimulatedSource {
    pose: SimulatedPose,
    hand: Hand,
    frame: u32,
    max_frames: Option<u32>,
    jitter: f64,
}

impl SimulatedSource {
    pub fn new(pose: SimulatedPose, hand: Hand) -> Self {
        Self {
            pose,
            hand,
            frame: 0,
            max_frames: None,
            jitter: 0.005,
        }
    }

    pub fn with_max_frames(mut self, max_frames: u32) -> Self {
        self.max_frames = Some(max_frames);
        self
    }

    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn set_pose(&mut self, pose: SimulatedPose) {
        self.pose = pose;
    }

    fn hand_landmarks(&self) -> Vec<Point> {
        let t = self.frame as f64 * 0.033;
        let sway = Vector3::new(self.jitter * (t * 2.0).sin(), self.jitter * (t * 3.0).cos(), 0.0);
        let mirror = if self.hand == Hand::Left { -1.0 } else { 1.0 };

        let wrist = Vector3::new(0.5, 0.8, 0.0) + sway;
        let mut landmarks = vec![Point::ORIGIN; HAND_LANDMARK_COUNT];
        landmarks[WRIST] = to_point(wrist);

        for (finger, (first, last)) in FINGER_CHAINS.iter().enumerate() {
            // Fan the fingers out from the wrist, thumb widest.
            let spread = (finger as f64 - 2.0) * 0.35 * mirror;
            let direction = Vector3::new(spread.sin(), -spread.cos(), 0.0);
            let curl = self.pose.curl(finger);
            let base = wrist + direction * 0.12;

            for (joint, index) in (*first..=*last).enumerate() {
                // Curled fingers fold back toward the palm and away from the camera.
                let reach = 0.04 * (joint as f64 + 1.0) * (1.0 - 0.7 * curl);
                let depth = -0.02 * curl * joint as f64;
                let position = base + direction * reach + Vector3::new(0.0, 0.0, depth);
                landmarks[index] = to_point(position);
            }
        }

        landmarks
    }
}

fn to_point(v: Vector3<f64>) -> Point {
    Point::new(v.x as f32, v.y as f32, v.z as f32)
}

impl LandmarkSource for SimulatedSource {
    fn next_sample(&mut self) -> Result<Option<LandmarkSample>> {
        if self.max_frames.is_some_and(|max| self.frame >= max) {
            return Ok(None);
        }

        let mut sample = LandmarkSample::empty();
        sample.set_hand(self.hand, self.hand_landmarks())?;
        self.frame += 1;
        Ok(Some(sample))
    }
}
