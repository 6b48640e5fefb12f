//! Model persistence
//!
//! - Artifact naming (`xgb_{sanitized target}.{kfm|json}`)
//! - Binary and JSON envelopes with checksum verification
//! - Directory-backed registry for the inference side

mod registry;
mod serializer;

pub use registry::{LoadFailure, ModelRegistry, RegistryCollision, RegistryEntry};
pub use serializer::{
    artifact_file_name, artifact_key, load_model, sanitize_name, save_artifact, save_model,
    ModelMetadata, SerializationFormat, ARTIFACT_PREFIX,
};
