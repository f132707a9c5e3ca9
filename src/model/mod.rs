pub mod model_metadata;
pub mod model_storage;
pub mod config;

pub use model_metadata::{ArtifactSummary, ModelMetadata, ARTIFACT_FORMAT_VERSION};
pub use model_storage::{is_bundle_path, pack_bundle, ArtifactSet};
pub use config::{AppConfig, ModelSettings};
