// src/lib.rs
//! Teachable hand-sign recognition.
//!
//! Record a few labeled [`LandmarkSample`]s per sign with a
//! [`TrainingSession`], keep them in a write-through [`GestureStore`], and
//! match live samples against the stored library with a [`Recognizer`].

pub mod config;
pub mod error;
pub mod geometry;
pub mod landmarks;
pub mod pattern;
pub mod recognition;
pub mod source;
pub mod storage;
pub mod training;

pub use config::Settings;
pub use error::{Error, Result};
pub use geometry::{distance, Point};
pub use landmarks::{Hand, LandmarkSample, HAND_LANDMARK_COUNT};
pub use pattern::{GestureLibrary, GesturePattern};
pub use recognition::{PatternScore, Recognition, Recognizer};
pub use source::{HandDetection, LandmarkSource};
pub use storage::{FileSlot, GestureStore, MemorySlot, StorageSlot};
pub use training::{CaptureOutcome, TrainingConfig, TrainingSession};
