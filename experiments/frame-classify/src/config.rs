use anyhow::{Context, Result};
use mote_base::LogConfig;
use mote_camera::{CameraConfig, SourceConfig};
use mote_infer::ModelConfig;
use serde::Deserialize;
use std::path::Path;

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Stop after this many cycles; 0 runs until the source is exhausted.
    pub max_cycles: u64,
    pub interval_ms: u64,
    pub top_k: usize,
    /// Print every result to stdout instead of logging the top classes.
    pub print: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_cycles: 0,
            interval_ms: 0,
            top_k: 3,
            print: false,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub log: LogConfig,
    pub source: SourceConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    pub model: ModelConfig,
    #[serde(default)]
    pub runner: RunnerConfig,
}

impl AppConfig {
    /// Read and validate the configuration at `path`. Relative model and
    /// image paths are taken relative to the file's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let mut config: Self = serde_json::from_str(&json)
            .with_context(|| format!("failed to parse {}", path.display()))?;

        let base = path.parent().unwrap_or(Path::new("."));
        config.model.resolve_paths(base);
        if let SourceConfig::Images { paths, .. } = &mut config.source {
            for image in paths.iter_mut() {
                if image.is_relative() {
                    *image = base.join(&*image);
                }
            }
        }
        config.model.validate().context("invalid model configuration")?;
        Ok(config)
    }
}
