use crate::{InferError, OutputTensor, TensorBuffer, TensorSpec};

/// A loaded model with its persistent execution state.
///
/// Inputs are written through [`input`](Engine::input), one forward pass runs
/// on [`invoke`](Engine::invoke), and results are read through
/// [`output`](Engine::output). Output views borrow the engine, so the next
/// `invoke` cannot run while one is alive.
pub trait Engine {
    fn name(&self) -> &str;
    fn input_count(&self) -> usize;
    fn output_count(&self) -> usize;
    fn input_spec(&self, index: usize) -> Result<&TensorSpec, InferError>;
    fn output_spec(&self, index: usize) -> Result<&TensorSpec, InferError>;
    fn input(&mut self, index: usize) -> Result<TensorBuffer<'_>, InferError>;
    /// Run one synchronous forward pass over the current input memory.
    fn invoke(&mut self) -> Result<(), InferError>;
    fn output(&self, index: usize) -> Result<OutputTensor<'_>, InferError>;
}

impl<E: Engine + ?Sized> Engine for Box<E> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn input_count(&self) -> usize {
        (**self).input_count()
    }

    fn output_count(&self) -> usize {
        (**self).output_count()
    }

    fn input_spec(&self, index: usize) -> Result<&TensorSpec, InferError> {
        (**self).input_spec(index)
    }

    fn output_spec(&self, index: usize) -> Result<&TensorSpec, InferError> {
        (**self).output_spec(index)
    }

    fn input(&mut self, index: usize) -> Result<TensorBuffer<'_>, InferError> {
        (**self).input(index)
    }

    fn invoke(&mut self) -> Result<(), InferError> {
        (**self).invoke()
    }

    fn output(&self, index: usize) -> Result<OutputTensor<'_>, InferError> {
        (**self).output(index)
    }
}

/// Error for an out-of-range tensor index.
pub fn index_error(role: &'static str, index: usize, count: usize) -> InferError {
    InferError::TensorIndex { role, index, count }
}
