use crate::{ElementType, InferError, TensorSlice, TensorSpec};
use mote_base::{Tensor, TensorError};

/// Read-only view of an engine output after a successful invoke.
///
/// The view borrows the engine, so it cannot outlive the next `invoke`.
/// Copy values out with [`to_vec`](Self::to_vec) or
/// [`to_tensor`](Self::to_tensor) to keep them.
#[derive(Clone, Copy, Debug)]
pub struct OutputTensor<'a> {
    spec: &'a TensorSpec,
    data: TensorSlice<'a>,
}

impl<'a> OutputTensor<'a> {
    pub fn new(spec: &'a TensorSpec, data: TensorSlice<'a>) -> Result<Self, InferError> {
        let expected = spec.element_count()?;
        if data.len() != expected || data.dtype() != spec.dtype {
            return Err(InferError::Execution(format!(
                "output memory is {} x {}, signature declares {} x {}",
                data.len(),
                data.dtype(),
                expected,
                spec.dtype
            )));
        }
        Ok(Self { spec, data })
    }

    pub fn spec(&self) -> &'a TensorSpec {
        self.spec
    }

    pub fn shape(&self) -> &'a [usize] {
        &self.spec.shape
    }

    pub fn dtype(&self) -> ElementType {
        self.spec.dtype
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Raw elements as the engine stored them.
    pub fn data(&self) -> TensorSlice<'a> {
        self.data
    }

    /// Dequantized value of element `index`.
    pub fn value(&self, index: usize) -> Option<f32> {
        self.data.get_f32(index, self.spec.quantization.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = f32> + '_ {
        (0..self.len()).filter_map(|i| self.value(i))
    }

    pub fn to_vec(&self) -> Vec<f32> {
        self.data.to_f32(self.spec.quantization.as_ref())
    }

    pub fn to_tensor(&self) -> Result<Tensor<f32>, TensorError> {
        Tensor::new(self.spec.shape.clone(), self.to_vec())
    }
}
