//! Directory-backed model registry (load side)
//!
//! The registry is a plain value built once by [`ModelRegistry::load_all`]
//! and handed to consumers by reference. It is never mutated after load.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::serializer::{artifact_key, load_model, ModelMetadata};
use crate::error::Result;
use crate::training::ForecastModel;

/// A loaded artifact
#[derive(Debug, Clone)]
pub struct RegistryEntry {
    /// Registry key (sanitized target name)
    pub key: String,
    /// File the model was read from
    pub path: PathBuf,
    pub metadata: ModelMetadata,
    pub model: ForecastModel,
}

/// Two artifacts that derived the same key; the later one was kept
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryCollision {
    pub key: String,
    pub replaced: PathBuf,
    pub kept: PathBuf,
}

/// An artifact that matched by extension but could not be loaded
#[derive(Debug, Clone)]
pub struct LoadFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// Mapping from target identifier to loaded model
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    root: PathBuf,
    entries: BTreeMap<String, RegistryEntry>,
    collisions: Vec<RegistryCollision>,
    failures: Vec<LoadFailure>,
}

impl ModelRegistry {
    /// Load every artifact directly inside `dir`.
    ///
    /// Files are visited in file-name order. A missing or empty directory
    /// gives an empty registry. When two artifacts derive the same key the
    /// one visited last wins and the overwrite is recorded in
    /// [`collisions`](Self::collisions). Unreadable artifacts are recorded in
    /// [`failures`](Self::failures) and skipped.
    pub fn load_all(dir: impl AsRef<Path>) -> Result<Self> {
        let root = dir.as_ref().to_path_buf();
        let mut registry = Self {
            root: root.clone(),
            ..Default::default()
        };

        let read_dir = match fs::read_dir(&root) {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(dir = %root.display(), "Model directory does not exist");
                return Ok(registry);
            }
            Err(e) => return Err(e.into()),
        };

        let mut artifacts: Vec<(String, PathBuf)> = Vec::new();
        for entry in read_dir {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            if let Some(key) = artifact_key(&path) {
                artifacts.push((key, path));
            }
        }
        artifacts.sort_by(|a, b| a.1.file_name().cmp(&b.1.file_name()));

        for (key, path) in artifacts {
            registry.insert_from_path(key, path);
        }

        info!(
            dir = %root.display(),
            models = registry.len(),
            collisions = registry.collisions.len(),
            failures = registry.failures.len(),
            "Loaded models"
        );
        Ok(registry)
    }

    fn insert_from_path(&mut self, key: String, path: PathBuf) {
        let (model, metadata) = match load_model::<ForecastModel>(&path) {
            Ok(loaded) => loaded,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping unreadable model artifact");
                self.failures.push(LoadFailure { path, reason: e.to_string() });
                return;
            }
        };

        debug!(key = %key, path = %path.display(), "Loaded model artifact");
        let entry = RegistryEntry {
            key: key.clone(),
            path: path.clone(),
            metadata,
            model,
        };

        if let Some(previous) = self.entries.insert(key.clone(), entry) {
            warn!(
                key = %key,
                replaced = %previous.path.display(),
                kept = %path.display(),
                "Two artifacts map to the same model key; keeping the later one"
            );
            self.collisions.push(RegistryCollision {
                key,
                replaced: previous.path,
                kept: path,
            });
        }
    }

    /// Directory the registry was loaded from
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn get(&self, key: &str) -> Option<&RegistryEntry> {
        self.entries.get(key)
    }

    /// Entries in key order
    pub fn iter(&self) -> impl Iterator<Item = &RegistryEntry> {
        self.entries.values()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Key overwrites that happened during load
    pub fn collisions(&self) -> &[RegistryCollision] {
        &self.collisions
    }

    /// Artifacts that could not be read
    pub fn failures(&self) -> &[LoadFailure] {
        &self.failures
    }
}
