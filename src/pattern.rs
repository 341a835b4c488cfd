// src/pattern.rs
use crate::error::{Error, Result};
use crate::landmarks::LandmarkSample;
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A named, trained gesture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GesturePattern {
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) samples: Vec<LandmarkSample>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub(crate) created_at: DateTime<Utc>,
}

impl GesturePattern {
    pub fn new(name: impl Into<String>, samples: Vec<LandmarkSample>) -> Result<Self> {
        Self::with_created_at(name, samples, Utc::now())
    }

    pub fn with_created_at(
        name: impl Into<String>,
        samples: Vec<LandmarkSample>,
        created_at: DateTime<Utc>,
    ) -> Result<Self> {
        let pattern = Self {
            name: name.into(),
            samples,
            // Persisted as epoch-millis
            created_at: created_at.trunc_subsecs(3),
        };
        pattern.validate()?;
        Ok(pattern)
    }

    /// Checks the name, that there is at least one sample, and every sample.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::EmptyName);
        }
        if self.samples.is_empty() {
            return Err(Error::EmptyPattern);
        }
        for sample in &self.samples {
            sample.validate()?;
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn samples(&self) -> &[LandmarkSample] {
        &self.samples
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Patterns without samples are kept but never matched.
    pub fn is_matchable(&self) -> bool {
        !self.samples.is_empty()
    }
}

/// All stored gestures keyed by name.
///
/// Iteration is in ascending name order, which is also the order the
/// recognizer evaluates patterns in.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GestureLibrary {
    patterns: BTreeMap<String, GesturePattern>,
}

impl GestureLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or fully replaces the pattern with the same name.
    /// Returns the replaced pattern, if any.
    pub fn upsert(&mut self, pattern: GesturePattern) -> Option<GesturePattern> {
        self.patterns.insert(pattern.name.clone(), pattern)
    }

    pub fn remove(&mut self, name: &str) -> Option<GesturePattern> {
        self.patterns.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&GesturePattern> {
        self.patterns.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.patterns.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GesturePattern> {
        self.patterns.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.patterns.keys().map(String::as_str)
    }

    /// Checks every stored sample and that each entry is keyed by its own name.
    pub fn validate(&self) -> Result<()> {
        for (key, pattern) in &self.patterns {
            if key != &pattern.name {
                return Err(Error::CorruptStorage(format!(
                    "entry '{}' holds pattern named '{}'",
                    key, pattern.name
                )));
            }
            for sample in &pattern.samples {
                sample.validate()?;
            }
        }
        Ok(())
    }
}

impl FromIterator<GesturePattern> for GestureLibrary {
    fn from_iter<I: IntoIterator<Item = GesturePattern>>(iter: I) -> Self {
        let mut library = GestureLibrary::new();
        for pattern in iter {
            library.upsert(pattern);
        }
        library
    }
}
