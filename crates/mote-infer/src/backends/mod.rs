pub mod candle;
#[cfg(feature = "onnx")]
pub mod onnx;

pub use candle::{CandleBackend, CandleEngine};
#[cfg(feature = "onnx")]
pub use onnx::{OnnxBackend, OnnxEngine};
