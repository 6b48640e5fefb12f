//! Model artifact serialization
//!
//! One artifact per target. Binary artifacts wrap a bincode payload in an
//! envelope with magic bytes, a format version and an FNV-1a checksum. JSON
//! artifacts are a pretty-printed `{ metadata, model }` document.

use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::error::{ForecastError, Result};

/// File name prefix shared by all booster artifacts
pub const ARTIFACT_PREFIX: &str = "xgb_";

/// Serialization format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SerializationFormat {
    /// Binary envelope using bincode (compact, checksummed)
    #[default]
    Binary,
    /// JSON format (portable, human-readable)
    Json,
}

impl SerializationFormat {
    pub const ALL: [SerializationFormat; 2] = [SerializationFormat::Binary, SerializationFormat::Json];

    /// File extension used for this format
    pub fn extension(self) -> &'static str {
        match self {
            SerializationFormat::Binary => "kfm",
            SerializationFormat::Json => "json",
        }
    }

    /// Recognise an artifact extension (case-insensitive)
    pub fn from_extension(ext: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|format| format.extension().eq_ignore_ascii_case(ext))
    }

    /// Recognise the format of an artifact path
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension().and_then(|e| e.to_str()).and_then(Self::from_extension)
    }
}

/// Replace every run of non-word characters with a single underscore.
///
/// Word characters are underscore plus any Unicode letter or number, so
/// superscripts such as `³` survive while `°` and `/` do not.
/// `"wind_speed_100m (km/h)_t+1"` becomes `"wind_speed_100m_km_h__t_1"`.
pub fn sanitize_name(name: &str) -> String {
    static NON_WORD: OnceLock<Regex> = OnceLock::new();
    let re = NON_WORD.get_or_init(|| Regex::new(r"[^\p{L}\p{N}_]+").expect("static pattern is valid"));
    re.replace_all(name, "_").into_owned()
}

/// Artifact file name for a target, e.g. `xgb_pressure_msl_hPa__t_1.kfm`
pub fn artifact_file_name(target: &str, format: SerializationFormat) -> String {
    format!("{}{}.{}", ARTIFACT_PREFIX, sanitize_name(target), format.extension())
}

/// Registry key for an artifact path: the file stem without the prefix.
///
/// Returns `None` for files that are not recognised artifacts.
pub fn artifact_key(path: &Path) -> Option<String> {
    SerializationFormat::from_path(path)?;
    let stem = path.file_stem()?.to_str()?;
    let key = stem.strip_prefix(ARTIFACT_PREFIX).unwrap_or(stem);
    if key.is_empty() {
        None
    } else {
        Some(key.to_string())
    }
}

/// Model metadata stored alongside every artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Artifact identifier (sanitized target name)
    pub name: String,
    /// Model version
    pub version: String,
    /// Training timestamp (RFC 3339)
    pub trained_at: String,
    /// Feature names in training order
    pub feature_names: Vec<String>,
    /// Unsanitized target column name
    pub target_name: String,
    /// Model type
    pub model_type: String,
    /// Hyperparameters
    pub hyperparameters: BTreeMap<String, String>,
    /// Evaluation metrics
    pub metrics: BTreeMap<String, f64>,
}

impl Default for ModelMetadata {
    fn default() -> Self {
        Self {
            name: "model".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            trained_at: String::new(),
            feature_names: Vec::new(),
            target_name: "target".to_string(),
            model_type: "unknown".to_string(),
            hyperparameters: BTreeMap::new(),
            metrics: BTreeMap::new(),
        }
    }
}

impl ModelMetadata {
    /// Create metadata for a target; the name is derived by sanitizing it
    pub fn for_target(target: impl Into<String>) -> Self {
        let target_name = target.into();
        Self {
            name: sanitize_name(&target_name),
            target_name,
            ..Default::default()
        }
    }

    /// Set model type
    pub fn with_model_type(mut self, model_type: impl Into<String>) -> Self {
        self.model_type = model_type.into();
        self
    }

    /// Set feature names
    pub fn with_features(mut self, features: Vec<String>) -> Self {
        self.feature_names = features;
        self
    }

    /// Set training timestamp
    pub fn with_trained_at(mut self, trained_at: impl Into<String>) -> Self {
        self.trained_at = trained_at.into();
        self
    }

    /// Add hyperparameter
    pub fn add_hyperparameter(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.hyperparameters.insert(key.into(), value.to_string());
        self
    }

    /// Add metric
    pub fn add_metric(mut self, key: impl Into<String>, value: f64) -> Self {
        self.metrics.insert(key.into(), value);
        self
    }
}

/// Binary artifact envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SerializedModel {
    magic: [u8; 4],
    format_version: u32,
    metadata: ModelMetadata,
    model_data: Vec<u8>,
    checksum: u64,
}

impl SerializedModel {
    const MAGIC: [u8; 4] = [b'K', b'F', b'C', b'M'];
    const VERSION: u32 = 1;

    fn new(metadata: ModelMetadata, model_data: Vec<u8>) -> Self {
        let checksum = Self::compute_checksum(&model_data);
        Self {
            magic: Self::MAGIC,
            format_version: Self::VERSION,
            metadata,
            model_data,
            checksum,
        }
    }

    /// FNV-1a over the payload
    fn compute_checksum(data: &[u8]) -> u64 {
        const FNV_OFFSET: u64 = 14695981039346656037;
        const FNV_PRIME: u64 = 1099511628211;

        let mut hash = FNV_OFFSET;
        for byte in data {
            hash ^= *byte as u64;
            hash = hash.wrapping_mul(FNV_PRIME);
        }
        hash
    }

    fn verify(&self) -> Result<()> {
        if self.magic != Self::MAGIC {
            return Err(ForecastError::SerializationError(
                "not a forecast model artifact (bad magic bytes)".to_string(),
            ));
        }
        if self.format_version > Self::VERSION {
            return Err(ForecastError::SerializationError(format!(
                "artifact format version {} is newer than supported version {}",
                self.format_version,
                Self::VERSION
            )));
        }
        if Self::compute_checksum(&self.model_data) != self.checksum {
            return Err(ForecastError::SerializationError(
                "Checksum verification failed - file may be corrupted".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct JsonModelRef<'a, M: Serialize> {
    metadata: &'a ModelMetadata,
    model: &'a M,
}

#[derive(Deserialize)]
struct JsonModel<M> {
    metadata: ModelMetadata,
    model: M,
}

/// Write a model to `path` in the given format
pub fn save_model<M: Serialize>(
    model: &M,
    metadata: &ModelMetadata,
    path: impl AsRef<Path>,
    format: SerializationFormat,
) -> Result<()> {
    let file = File::create(path.as_ref()).map_err(|e| {
        ForecastError::DataError(format!("Failed to create {}: {}", path.as_ref().display(), e))
    })?;
    let mut writer = BufWriter::new(file);

    match format {
        SerializationFormat::Binary => {
            let model_data = bincode::serialize(model)?;
            let envelope = SerializedModel::new(metadata.clone(), model_data);
            let bytes = bincode::serialize(&envelope)?;
            writer.write_all(&bytes)?;
        }
        SerializationFormat::Json => {
            serde_json::to_writer_pretty(&mut writer, &JsonModelRef { metadata, model })?;
        }
    }

    writer.flush()?;
    Ok(())
}

/// Read a model from `path`, detecting the format from its extension
pub fn load_model<M: DeserializeOwned>(path: impl AsRef<Path>) -> Result<(M, ModelMetadata)> {
    let path = path.as_ref();
    let format = SerializationFormat::from_path(path).ok_or_else(|| {
        ForecastError::SerializationError(format!("unrecognised artifact extension: {}", path.display()))
    })?;

    let file = File::open(path)
        .map_err(|e| ForecastError::DataError(format!("Failed to open {}: {}", path.display(), e)))?;
    let mut reader = BufReader::new(file);

    match format {
        SerializationFormat::Binary => {
            let mut bytes = Vec::new();
            reader.read_to_end(&mut bytes)?;
            let envelope: SerializedModel = bincode::deserialize(&bytes)?;
            envelope.verify()?;
            let model: M = bincode::deserialize(&envelope.model_data)?;
            Ok((model, envelope.metadata))
        }
        SerializationFormat::Json => {
            let json: JsonModel<M> = serde_json::from_reader(reader)?;
            Ok((json.model, json.metadata))
        }
    }
}

/// Persist a per-target model into `dir`, returning the artifact path
pub fn save_artifact<M: Serialize>(
    model: &M,
    metadata: &ModelMetadata,
    dir: impl AsRef<Path>,
    format: SerializationFormat,
) -> Result<PathBuf> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;
    let path = dir.join(artifact_file_name(&metadata.target_name, format));
    save_model(model, metadata, &path, format)?;
    Ok(path)
}
