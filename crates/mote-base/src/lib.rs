//! Shared building blocks for the mote crates: the logging backends and the
//! dense `Tensor` container used for frames and copied-out engine results.

pub mod logging;
pub mod tensor;

pub use logging::{FileLogger, LogConfig, StdoutLogger, init_logging};
pub use tensor::{Tensor, TensorError, element_count};

// Re-export log crate so downstream crates can use mote_base::log::*
pub use log;
