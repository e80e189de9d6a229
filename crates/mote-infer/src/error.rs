use mote_base::TensorError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InferError {
    #[error("candle error: {0}")]
    Candle(String),
    #[error("model load error: {0}")]
    ModelLoad(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(String),
    #[error("unknown backend '{name}', available: {available:?}")]
    UnknownBackend { name: String, available: Vec<String> },
    #[error("{role} tensor index {index} out of range ({count} available)")]
    TensorIndex {
        role: &'static str,
        index: usize,
        count: usize,
    },
    #[error("execution failed: {0}")]
    Execution(String),
    #[error("unsupported dtype: {0}")]
    UnsupportedDtype(String),
    #[cfg(feature = "onnx")]
    #[error("onnx runtime error: {0}")]
    Onnx(String),
    #[error("tensor error: {0}")]
    Tensor(#[from] TensorError),
}

impl From<candle_core::Error> for InferError {
    fn from(err: candle_core::Error) -> Self {
        InferError::Candle(err.to_string())
    }
}

impl From<serde_json::Error> for InferError {
    fn from(err: serde_json::Error) -> Self {
        InferError::Json(err.to_string())
    }
}
