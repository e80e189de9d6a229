//! Inference invocation pipeline.
//!
//! A frame from a [`FrameSource`](mote_camera::FrameSource) is written into the
//! engine's [`TensorBuffer`], the engine runs one forward pass, and the
//! [`OutputTensor`] view is handed to a [`ResultReporter`]. The
//! [`InferenceRunner`] drives that cycle against an [`ExecutionContext`]
//! created once at startup.

pub mod backend;
pub mod backendregistry;
pub mod backends;
pub mod buffer;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod modelsource;
pub mod output;
pub mod reporter;
pub mod runner;
pub mod signature;

pub use backend::Backend;
pub use backendregistry::{BackendRegistry, create_registry};
pub use buffer::{PopulateError, TensorBuffer, TensorSlice, TensorSliceMut, TensorStorage};
pub use config::{ModelConfig, OutputActivation};
pub use context::ExecutionContext;
pub use engine::Engine;
pub use error::InferError;
pub use modelsource::{ModelArtifact, ModelSource};
pub use output::OutputTensor;
pub use reporter::{Classification, LogReporter, PrintReporter, ResultReporter, top_k};
pub use runner::{CycleError, CycleState, CycleStats, FailureReason, InferenceRunner};
pub use signature::{ElementType, ImageDims, Normalization, Quantization, TensorSpec};
