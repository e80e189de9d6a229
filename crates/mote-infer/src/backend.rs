use crate::{Engine, InferError, ModelArtifact, ModelConfig};

/// Builds engines from model artifacts.
pub trait Backend {
    fn name(&self) -> &str;
    fn load(
        &self,
        artifact: &ModelArtifact,
        config: &ModelConfig,
    ) -> Result<Box<dyn Engine>, InferError>;
}
