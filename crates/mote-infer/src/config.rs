use crate::{InferError, TensorSpec};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Transformation applied to the final layer's values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputActivation {
    #[default]
    None,
    Softmax,
}

impl OutputActivation {
    pub fn apply(self, values: &mut [f32]) {
        if self == OutputActivation::Softmax && !values.is_empty() {
            let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
            let mut sum = 0.0;
            for v in values.iter_mut() {
                *v = (*v - max).exp();
                sum += *v;
            }
            for v in values.iter_mut() {
                *v /= sum;
            }
        }
    }
}

fn default_backend() -> String {
    "candle".to_string()
}

fn default_threads() -> usize {
    1
}

/// Model artifact location and tensor signatures, validated once at startup.
#[derive(Clone, Debug, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_backend")]
    pub backend: String,
    pub model: PathBuf,
    pub input: TensorSpec,
    pub output: TensorSpec,
    #[serde(default)]
    pub activation: OutputActivation,
    /// Class names, one per output element.
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default = "default_threads")]
    pub threads: usize,
}

impl ModelConfig {
    pub fn new(model: impl Into<PathBuf>, input: TensorSpec, output: TensorSpec) -> Self {
        Self {
            backend: default_backend(),
            model: model.into(),
            input,
            output,
            activation: OutputActivation::default(),
            labels: Vec::new(),
            threads: default_threads(),
        }
    }

    pub fn with_backend(mut self, backend: impl Into<String>) -> Self {
        self.backend = backend.into();
        self
    }

    pub fn with_activation(mut self, activation: OutputActivation) -> Self {
        self.activation = activation;
        self
    }

    pub fn with_labels(mut self, labels: Vec<String>) -> Self {
        self.labels = labels;
        self
    }

    /// Parse and validate a JSON model configuration.
    pub fn from_json(json: &str) -> Result<Self, InferError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON model configuration from `path`.
    ///
    /// A relative `model` path is resolved against the directory holding
    /// the configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, InferError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let mut config: Self = serde_json::from_str(&json)?;
        config.resolve_paths(path.parent().unwrap_or(Path::new(".")));
        config.validate()?;
        Ok(config)
    }

    /// Make a relative model path relative to `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        if self.model.is_relative() {
            self.model = base.join(&self.model);
        }
    }

    pub fn validate(&self) -> Result<(), InferError> {
        if self.backend.is_empty() {
            return Err(InferError::Config("backend name is empty".to_string()));
        }
        self.input.validate("input")?;
        self.output.validate("output")?;

        let dims = self.input.image_dims().ok_or_else(|| {
            InferError::Config(format!(
                "input shape {:?} is not [H, W], [H, W, C] or [1, H, W, C]",
                self.input.shape
            ))
        })?;
        if dims.channels != 1 && dims.channels != 3 {
            return Err(InferError::Config(format!(
                "input has {} channels, expected 1 or 3",
                dims.channels
            )));
        }

        let outputs = self.output.element_count()?;
        if !self.labels.is_empty() && self.labels.len() != outputs {
            return Err(InferError::Config(format!(
                "{} labels for {} output values",
                self.labels.len(),
                outputs
            )));
        }
        if self.threads == 0 {
            return Err(InferError::Config("threads must be at least 1".to_string()));
        }
        Ok(())
    }
}
