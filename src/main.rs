// src/main.rs
use anyhow::{Context, Result};
use sign_tracker::source::{SimulatedPose, SimulatedSource};
use sign_tracker::{
    CaptureOutcome, FileSlot, GestureStore, Hand, LandmarkSource, Settings, TrainingSession,
};
use std::time::{Duration, Instant};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const FRAME_INTERVAL: Duration = Duration::from_millis(33);
const RECOGNITION_FRAMES: u32 = 90;

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = match std::env::var_os("SIGN_TRACKER_CONFIG") {
        Some(path) => Settings::from_file(&path)
            .with_context(|| format!("Failed to load settings from {}", path.to_string_lossy()))?,
        None => Settings::default(),
    };
    info!(path = %settings.storage_path.display(), "opening gesture storage");

    let store = GestureStore::open(FileSlot::new(&settings.storage_path))
        .context("Failed to open gesture storage")?;
    let recognizer = settings.recognizer()?;

    for (name, pose) in [("open_palm", SimulatedPose::OpenPalm), ("fist", SimulatedPose::Fist)] {
        if store.contains(name) {
            continue;
        }
        let mut source = SimulatedSource::new(pose, Hand::Right);
        train(&store, &settings, name, &mut source)?;
    }

    for pattern in store.list() {
        info!(
            gesture = pattern.name(),
            samples = pattern.sample_count(),
            created_at = %pattern.created_at(),
            "stored gesture"
        );
    }

    // Recognition loop over a stream that switches pose halfway through.
    let mut source = SimulatedSource::new(SimulatedPose::OpenPalm, Hand::Right)
        .with_max_frames(RECOGNITION_FRAMES);
    let poll_every = (settings.recognition_interval().as_millis() / FRAME_INTERVAL.as_millis()).max(1) as u32;
    let mut frame = 0u32;

    while let Some(sample) = source.next_sample()? {
        frame += 1;
        if frame == RECOGNITION_FRAMES / 2 {
            source.set_pose(SimulatedPose::Fist);
        }
        if frame % poll_every != 0 || !sample.has_hands() {
            continue;
        }

        match store.recognize(&recognizer, &sample)? {
            Some(result) => info!(frame, gesture = %result.name, confidence = result.confidence, "recognized"),
            None => info!(frame, "no match"),
        }
    }

    Ok(())
}

/// Records one gesture from `source`, clocked at the simulated frame rate.
fn train(
    store: &GestureStore<FileSlot>,
    settings: &Settings,
    name: &str,
    source: &mut dyn LandmarkSource,
) -> Result<()> {
    let start = Instant::now();
    let mut session = TrainingSession::new(name, settings.training.clone(), start)?;
    let mut now = start;

    while let Some(sample) = source.next_sample()? {
        now += FRAME_INTERVAL;
        if let CaptureOutcome::Complete = session.offer(sample, now)? {
            break;
        }
    }

    let (collected, needed) = session.progress();
    if collected < needed {
        warn!(gesture = name, collected, needed, "source ended before training finished");
    }

    if let Err(e) = store.upsert(session.into_pattern()?) {
        // The gesture is still usable for this session.
        warn!(gesture = name, error = %e, "gesture trained but not persisted");
    }
    Ok(())
}
