use std::{cmp::Ordering, fmt};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TensorError {
    #[error("shape dimensions overflow when multiplied")]
    ShapeOverflow,
    #[error("shape mismatch: expected {expected} elements, got {got}")]
    ShapeMismatch { expected: usize, got: usize },
}

/// Number of elements a shape declares.
///
/// An empty shape is a scalar and holds one element.
pub fn element_count(shape: &[usize]) -> Result<usize, TensorError> {
    shape.iter().try_fold(1usize, |product, &dim| {
        product.checked_mul(dim).ok_or(TensorError::ShapeOverflow)
    })
}

/// Dense row-major tensor that owns its data.
#[derive(Clone, PartialEq)]
pub struct Tensor<T> {
    pub shape: Vec<usize>,
    pub data: Vec<T>,
}

impl<T: fmt::Debug> fmt::Debug for Tensor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tensor")
            .field("shape", &self.shape)
            .field("data", &self.data)
            .finish()
    }
}

impl<T> Tensor<T> {
    pub fn new(shape: Vec<usize>, data: Vec<T>) -> Result<Self, TensorError> {
        let expected = element_count(&shape)?;
        if expected != data.len() {
            return Err(TensorError::ShapeMismatch {
                expected,
                got: data.len(),
            });
        }
        Ok(Self { shape, data })
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }
}

impl<T: Copy + PartialOrd> Tensor<T> {
    /// Index of the largest element; the first one wins on ties.
    ///
    /// Returns `None` for an empty tensor or when a comparison is undefined
    /// (NaN in float data).
    pub fn argmax(&self) -> Option<usize> {
        let mut best: Option<(usize, T)> = None;
        for (index, &value) in self.data.iter().enumerate() {
            match best {
                None => best = Some((index, value)),
                Some((_, current)) => {
                    if value.partial_cmp(&current)? == Ordering::Greater {
                        best = Some((index, value));
                    }
                }
            }
        }
        best.map(|(index, _)| index)
    }
}
