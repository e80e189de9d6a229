use crate::{Backend, InferError};
use std::collections::HashMap;

pub struct BackendRegistry {
    backends: HashMap<String, Box<dyn Backend>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self {
            backends: HashMap::new(),
        }
    }

    pub fn register(&mut self, backend: Box<dyn Backend>) {
        let name = backend.name().to_string();
        self.backends.insert(name, backend);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Backend> {
        self.backends.get(name).map(|b| &**b as &dyn Backend)
    }

    /// Like [`get`](Self::get), with an error naming the registered backends.
    pub fn require(&self, name: &str) -> Result<&dyn Backend, InferError> {
        self.get(name).ok_or_else(|| {
            let mut available: Vec<String> = self.list().into_iter().map(String::from).collect();
            available.sort();
            InferError::UnknownBackend {
                name: name.to_string(),
                available,
            }
        })
    }

    pub fn list(&self) -> Vec<&str> {
        self.backends.keys().map(|s| s.as_str()).collect()
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Registry with every backend compiled into this build.
pub fn create_registry() -> BackendRegistry {
    let mut registry = BackendRegistry::new();
    registry.register(Box::new(crate::backends::CandleBackend));

    #[cfg(feature = "onnx")]
    registry.register(Box::new(crate::backends::OnnxBackend));

    registry
}
