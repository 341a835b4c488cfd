// src/storage.rs
use crate::error::{Error, Result};
use crate::landmarks::LandmarkSample;
use crate::pattern::{GestureLibrary, GesturePattern};
use crate::recognition::{Recognition, Recognizer};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const SCHEMA_VERSION: u32 = 1;

/// A single durable slot holding the whole serialized library.
pub trait StorageSlot: Send + Sync {
    /// `Ok(None)` when nothing has been stored yet.
    fn read(&self) -> Result<Option<String>>;

    /// Replaces the slot's contents as one unit.
    fn write(&self, document: &str) -> Result<()>;
}

/// Slot backed by a JSON file on disk.
#[derive(Debug, Clone)]
pub struct FileSlot {
    path: PathBuf,
}

impl FileSlot {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "gestures".to_string());
        self.path
            .with_file_name(format!(".{}.{}.tmp", file_name, Uuid::new_v4()))
    }
}

impl StorageSlot for FileSlot {
    fn read(&self) -> Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Persistence(e)),
        }
    }

    fn write(&self, document: &str) -> Result<()> {
        // Create directory if it doesn't exist
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let temp_path = self.temp_path();
        let written = (|| -> std::io::Result<()> {
            let mut file = fs::File::create(&temp_path)?;
            file.write_all(document.as_bytes())?;
            file.sync_all()?;
            fs::rename(&temp_path, &self.path)
        })();

        if let Err(e) = written {
            let _ = fs::remove_file(&temp_path);
            return Err(Error::Persistence(e));
        }
        Ok(())
    }
}

/// In-process slot; clones share the same contents.
#[derive(Debug, Clone, Default)]
pub struct MemorySlot {
    contents: Arc<Mutex<Option<String>>>,
}

impl MemorySlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contents(document: impl Into<String>) -> Self {
        Self {
            contents: Arc::new(Mutex::new(Some(document.into()))),
        }
    }

    pub fn contents(&self) -> Option<String> {
        self.contents.lock().clone()
    }
}

impl StorageSlot for MemorySlot {
    fn read(&self) -> Result<Option<String>> {
        Ok(self.contents.lock().clone())
    }

    fn write(&self, document: &str) -> Result<()> {
        *self.contents.lock() = Some(document.to_string());
        Ok(())
    }
}

#[derive(Serialize)]
struct DocumentRef<'a> {
    version: u32,
    gestures: &'a GestureLibrary,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct VersionedDocument {
    version: u32,
    gestures: GestureLibrary,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredDocument {
    Versioned(VersionedDocument),
    Bare(GestureLibrary),
}

/// Serializes the full library as a versioned document.
pub fn encode_library(library: &GestureLibrary) -> Result<String> {
    serde_json::to_string(&DocumentRef {
        version: SCHEMA_VERSION,
        gestures: library,
    })
    .map_err(|e| Error::Persistence(e.into()))
}

/// Parses a stored document. Accepts the versioned envelope or a bare
/// name-to-pattern mapping.
pub fn decode_library(document: &str) -> Result<GestureLibrary> {
    let parsed: StoredDocument =
        serde_json::from_str(document).map_err(|e| Error::CorruptStorage(e.to_string()))?;

    let library = match parsed {
        StoredDocument::Versioned(doc) => {
            if doc.version != SCHEMA_VERSION {
                return Err(Error::UnsupportedVersion {
                    found: doc.version,
                    expected: SCHEMA_VERSION,
                });
            }
            doc.gestures
        }
        StoredDocument::Bare(library) => library,
    };

    library.validate().map_err(|e| match e {
        Error::CorruptStorage(_) => e,
        other => Error::CorruptStorage(other.to_string()),
    })?;
    Ok(library)
}

/// Reads the library from a slot. A missing slot yields an empty library;
/// a malformed one fails with `CorruptStorage`.
pub fn load(slot: &dyn StorageSlot) -> Result<GestureLibrary> {
    match slot.read()? {
        Some(document) => decode_library(&document),
        None => Ok(GestureLibrary::new()),
    }
}

/// Overwrites the slot with the full library.
pub fn save(slot: &dyn StorageSlot, library: &GestureLibrary) -> Result<()> {
    slot.write(&encode_library(library)?)
}

/// Write-through gesture store.
///
/// Every mutation updates the in-memory library first, then re-serializes the
/// whole library to the slot. A failed write is reported but the in-memory
/// change stays, so persisting can be retried with [`GestureStore::save`].
pub struct GestureStore<S: StorageSlot> {
    slot: S,
    library: RwLock<GestureLibrary>,
    write_gate: Mutex<()>,
}

impl<S: StorageSlot> GestureStore<S> {
    /// Opens the store, starting empty if the stored document is corrupt.
    /// I/O failures while reading are returned.
    pub fn open(slot: S) -> Result<Self> {
        let library = match load(&slot) {
            Ok(library) => {
                info!(count = library.len(), "loaded gestures from storage");
                library
            }
            Err(e) if e.is_corrupt_storage() => {
                warn!(error = %e, "discarding unreadable gesture storage, starting empty");
                GestureLibrary::new()
            }
            Err(e) => return Err(e),
        };
        Ok(Self::with_library(slot, library))
    }

    /// Wraps an already loaded library without touching the slot.
    pub fn with_library(slot: S, library: GestureLibrary) -> Self {
        Self {
            slot,
            library: RwLock::new(library),
            write_gate: Mutex::new(()),
        }
    }

    pub fn slot(&self) -> &S {
        &self.slot
    }

    /// Persists the current library.
    pub fn save(&self) -> Result<()> {
        let _gate = self.write_gate.lock();
        self.persist()
    }

    /// Inserts or replaces the pattern with the same name, then persists.
    /// Invalid patterns are rejected before anything is stored.
    pub fn upsert(&self, pattern: GesturePattern) -> Result<()> {
        pattern.validate()?;
        let _gate = self.write_gate.lock();
        let name = pattern.name().to_string();
        let samples = pattern.sample_count();
        let replaced = self.library.write().upsert(pattern).is_some();
        debug!(gesture = %name, samples, replaced, "stored gesture");
        self.persist()?;
        info!(gesture = %name, samples, "gesture saved");
        Ok(())
    }

    /// Removes the named pattern if present, then persists. Returns whether
    /// a pattern was removed.
    pub fn delete(&self, name: &str) -> Result<bool> {
        let _gate = self.write_gate.lock();
        let removed = self.library.write().remove(name).is_some();
        self.persist()?;
        if removed {
            info!(gesture = name, "gesture deleted");
        } else {
            debug!(gesture = name, "delete of unknown gesture");
        }
        Ok(removed)
    }

    /// Snapshot copy of every stored pattern.
    pub fn list(&self) -> Vec<GesturePattern> {
        self.library.read().iter().cloned().collect()
    }

    pub fn get(&self, name: &str) -> Option<GesturePattern> {
        self.library.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.library.read().contains(name)
    }

    pub fn len(&self) -> usize {
        self.library.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.library.read().is_empty()
    }

    pub fn snapshot(&self) -> GestureLibrary {
        self.library.read().clone()
    }

    /// Matches a live sample against the in-memory library.
    pub fn recognize(
        &self,
        recognizer: &Recognizer,
        sample: &LandmarkSample,
    ) -> Result<Option<Recognition>> {
        recognizer.recognize(sample, &self.library.read())
    }

    // Caller holds the write gate.
    fn persist(&self) -> Result<()> {
        let document = encode_library(&self.library.read())?;
        match self.slot.write(&document) {
            Ok(()) => {
                debug!(bytes = document.len(), "gesture library persisted");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "failed to persist gesture library");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;
    use crate::landmarks::HAND_LANDMARK_COUNT;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;

    fn sample_at(x: f32) -> LandmarkSample {
        LandmarkSample::left(vec![Point::new(x, 0.5, -0.25); HAND_LANDMARK_COUNT]).unwrap()
    }

    fn pattern(name: &str, samples: usize) -> GesturePattern {
        GesturePattern::new(name, (0..samples).map(|i| sample_at(i as f32 * 0.1)).collect()).unwrap()
    }

    /// Slot whose writes can be made to fail.
    #[derive(Default)]
    struct FlakySlot {
        inner: MemorySlot,
        failing: AtomicBool,
    }

    impl StorageSlot for FlakySlot {
        fn read(&self) -> Result<Option<String>> {
            self.inner.read()
        }

        fn write(&self, document: &str) -> Result<()> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(Error::Persistence(std::io::Error::new(
                    ErrorKind::Other,
                    "disk full",
                )));
            }
            self.inner.write(document)
        }
    }

    #[test]
    fn test_missing_slot_loads_empty() {
        let library = load(&MemorySlot::new()).unwrap();
        assert!(library.is_empty());
    }

    #[test]
    fn test_round_trip() {
        let slot = MemorySlot::new();
        let library: GestureLibrary = vec![pattern("Hello", 3), pattern("Thanks", 1)].into_iter().collect();
        save(&slot, &library).unwrap();
        assert_eq!(load(&slot).unwrap(), library);
    }

    #[test]
    fn test_document_is_versioned() {
        let slot = MemorySlot::new();
        save(&slot, &vec![pattern("Hello", 1)].into_iter().collect()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&slot.contents().unwrap()).unwrap();
        assert_eq!(json["version"], 1);
        assert_eq!(json["gestures"]["Hello"]["name"], "Hello");
        assert!(json["gestures"]["Hello"]["samples"][0]["right_hand"].is_null());
    }

    #[test]
    fn test_bare_mapping_is_accepted() {
        let points = serde_json::to_string(&vec![Point::ORIGIN; HAND_LANDMARK_COUNT]).unwrap();
        let doc = format!(
            r#"{{"Hello":{{"name":"Hello","samples":[{{"left_hand":{},"right_hand":null}}],"created_at":1700000000000}}}}"#,
            points
        );
        let library = decode_library(&doc).unwrap();
        assert_eq!(library.get("Hello").map(|p| p.sample_count()), Some(1));
    }

    #[test]
    fn test_malformed_document_is_corrupt() {
        let err = load(&MemorySlot::with_contents("{not json")).unwrap_err();
        assert!(matches!(err, Error::CorruptStorage(_)));
    }

    #[test]
    fn test_wrong_hand_length_is_corrupt() {
        let doc = r#"{"version":1,"gestures":{"Hello":{"name":"Hello","samples":[{"left_hand":[{"x":0,"y":0,"z":0}],"right_hand":null}],"created_at":0}}}"#;
        let err = decode_library(doc).unwrap_err();
        assert!(matches!(err, Error::CorruptStorage(_)));
    }

    #[test]
    fn test_unknown_version_is_rejected() {
        let err = decode_library(r#"{"version":7,"gestures":{}}"#).unwrap_err();
        assert!(matches!(err, Error::UnsupportedVersion { found: 7, expected: 1 }));
        assert!(err.is_corrupt_storage());
    }

    #[test]
    fn test_open_recovers_from_corrupt_storage() {
        let store = GestureStore::open(MemorySlot::with_contents("[1, 2, 3")).unwrap();
        assert!(store.is_empty());

        store.upsert(pattern("Hello", 1)).unwrap();
        assert_eq!(store.len(), 1);
        assert!(load(store.slot()).unwrap().contains("Hello"));
    }

    #[test]
    fn test_upsert_replaces_and_persists() {
        let slot = MemorySlot::new();
        let store = GestureStore::open(slot.clone()).unwrap();
        store.upsert(pattern("Hello", 3)).unwrap();
        let replacement = pattern("Hello", 1);
        store.upsert(replacement.clone()).unwrap();

        let listed = store.list();
        assert_eq!(listed, vec![replacement.clone()]);

        let reopened = GestureStore::open(slot).unwrap();
        assert_eq!(reopened.get("Hello"), Some(replacement));
    }

    #[test]
    fn test_upsert_rejects_invalid_pattern_and_keeps_library() {
        let slot = MemorySlot::new();
        let store = GestureStore::open(slot.clone()).unwrap();
        store.upsert(pattern("Hello", 1)).unwrap();
        let before = slot.contents();

        let one_point: GesturePattern = serde_json::from_str(
            r#"{"name":"Bad","samples":[{"left_hand":[{"x":0,"y":0,"z":0}],"right_hand":null}],"created_at":0}"#,
        )
        .unwrap();
        assert!(matches!(store.upsert(one_point), Err(Error::InvalidSample { len: 1, .. })));

        let no_samples: GesturePattern =
            serde_json::from_str(r#"{"name":"Empty","samples":[],"created_at":0}"#).unwrap();
        assert!(matches!(store.upsert(no_samples), Err(Error::EmptyPattern)));

        assert_eq!(slot.contents(), before);
        let reopened = GestureStore::open(slot).unwrap();
        assert_eq!(reopened.len(), 1);
        assert!(reopened.contains("Hello"));
    }

    #[test]
    fn test_non_finite_sample_never_reaches_storage() {
        let slot = MemorySlot::new();
        let store = GestureStore::open(slot.clone()).unwrap();
        store.upsert(pattern("Hello", 1)).unwrap();

        let mut points = vec![Point::ORIGIN; HAND_LANDMARK_COUNT];
        points[3] = Point::new(f32::NAN, 0.0, 0.0);
        assert!(LandmarkSample::left(points.clone()).is_err());

        // Built around the constructors, as a deserialized frame would be.
        let smuggled = GesturePattern {
            name: "Bad".to_string(),
            samples: vec![LandmarkSample {
                left_hand: Some(points),
                right_hand: None,
            }],
            created_at: chrono::Utc::now(),
        };
        assert!(matches!(
            store.upsert(smuggled),
            Err(Error::NonFiniteLandmark { index: 3, .. })
        ));

        let reopened = GestureStore::open(slot).unwrap();
        assert_eq!(reopened.len(), 1);
        assert!(reopened.contains("Hello"));
    }

    #[test]
    fn test_delete_missing_is_noop() {
        let slot = MemorySlot::new();
        let store = GestureStore::open(slot.clone()).unwrap();
        store.upsert(pattern("Hello", 1)).unwrap();
        let before = store.snapshot();

        assert!(!store.delete("Nope").unwrap());
        assert_eq!(store.snapshot(), before);
        assert_eq!(load(&slot).unwrap(), before);

        assert!(store.delete("Hello").unwrap());
        assert!(store.is_empty());
        assert!(load(&slot).unwrap().is_empty());
    }

    #[test]
    fn test_failed_save_keeps_memory_state() {
        let store = GestureStore::open(FlakySlot::default()).unwrap();
        store.slot().failing.store(true, Ordering::SeqCst);

        let err = store.upsert(pattern("Hello", 2)).unwrap_err();
        assert!(matches!(err, Error::Persistence(_)));
        assert!(store.contains("Hello"));
        assert!(store.slot().inner.contents().is_none());

        store.slot().failing.store(false, Ordering::SeqCst);
        store.save().unwrap();
        assert!(load(store.slot()).unwrap().contains("Hello"));
    }

    #[test]
    fn test_list_is_a_snapshot() {
        let store = GestureStore::open(MemorySlot::new()).unwrap();
        store.upsert(pattern("Hello", 1)).unwrap();
        let listed = store.list();
        store.delete("Hello").unwrap();
        assert_eq!(listed.len(), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn test_recognize_through_store() {
        let store = GestureStore::open(MemorySlot::new()).unwrap();
        store.upsert(pattern("Hello", 1)).unwrap();
        let result = store
            .recognize(&Recognizer::default(), &sample_at(0.0))
            .unwrap()
            .unwrap();
        assert_eq!(result.name, "Hello");
        assert_eq!(result.confidence, 100.0);
    }

    #[test]
    fn test_concurrent_upserts_lose_nothing() {
        let slot = MemorySlot::new();
        let store = Arc::new(GestureStore::open(slot.clone()).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for i in 0..10 {
                        store.upsert(pattern(&format!("g{}_{}", t, i), 1)).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.len(), 80);
        assert_eq!(load(&slot).unwrap().len(), 80);
    }
}
