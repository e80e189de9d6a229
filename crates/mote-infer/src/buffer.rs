use crate::{ElementType, InferError, Quantization, TensorSpec};
use mote_camera::Frame;
use thiserror::Error;

/// Why a frame could not be written into an input tensor.
///
/// Every variant is a configuration defect: the frame source and the model
/// disagree about the input signature.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PopulateError {
    #[error("input shape {shape:?} is not image-like")]
    NotImageShaped { shape: Vec<usize> },
    #[error("frame is {got:?} but the input expects {expected:?}")]
    Dimensions { expected: Vec<usize>, got: Vec<usize> },
    #[error("input buffer holds {expected} elements, frame has {got}")]
    ElementCount { expected: usize, got: usize },
    #[error("{dtype} input has no quantization parameters")]
    MissingQuantization { dtype: ElementType },
}

/// Check that `frame` can populate a tensor declared by `spec`.
pub fn check_frame(spec: &TensorSpec, frame: &Frame) -> Result<(), PopulateError> {
    let dims = spec.image_dims().ok_or_else(|| PopulateError::NotImageShaped {
        shape: spec.shape.clone(),
    })?;
    let expected = dims.to_shape();
    if frame.shape() != expected.as_slice() {
        return Err(PopulateError::Dimensions {
            expected: expected.to_vec(),
            got: frame.shape().to_vec(),
        });
    }
    if spec.dtype.is_quantized() && spec.quantization.is_none() {
        return Err(PopulateError::MissingQuantization { dtype: spec.dtype });
    }
    Ok(())
}

/// Engine-owned tensor memory.
#[derive(Clone, Debug, PartialEq)]
pub enum TensorStorage {
    F32(Vec<f32>),
    U8(Vec<u8>),
    I8(Vec<i8>),
}

impl TensorStorage {
    pub fn zeros(dtype: ElementType, len: usize) -> Self {
        match dtype {
            ElementType::F32 => TensorStorage::F32(vec![0.0; len]),
            ElementType::U8 => TensorStorage::U8(vec![0; len]),
            ElementType::I8 => TensorStorage::I8(vec![0; len]),
        }
    }

    /// Allocate zeroed storage for `spec`.
    pub fn for_spec(spec: &TensorSpec) -> Result<Self, InferError> {
        Ok(Self::zeros(spec.dtype, spec.element_count()?))
    }

    pub fn dtype(&self) -> ElementType {
        match self {
            TensorStorage::F32(_) => ElementType::F32,
            TensorStorage::U8(_) => ElementType::U8,
            TensorStorage::I8(_) => ElementType::I8,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            TensorStorage::F32(v) => v.len(),
            TensorStorage::U8(v) => v.len(),
            TensorStorage::I8(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_slice(&self) -> TensorSlice<'_> {
        match self {
            TensorStorage::F32(v) => TensorSlice::F32(v),
            TensorStorage::U8(v) => TensorSlice::U8(v),
            TensorStorage::I8(v) => TensorSlice::I8(v),
        }
    }

    pub fn as_mut_slice(&mut self) -> TensorSliceMut<'_> {
        match self {
            TensorStorage::F32(v) => TensorSliceMut::F32(v),
            TensorStorage::U8(v) => TensorSliceMut::U8(v),
            TensorStorage::I8(v) => TensorSliceMut::I8(v),
        }
    }

    /// Real values of the stored elements.
    pub fn to_f32(&self, quantization: Option<&Quantization>) -> Vec<f32> {
        self.as_slice().to_f32(quantization)
    }

    /// Overwrite every element from `values`, quantizing for integer storage.
    pub fn store_f32(
        &mut self,
        values: &[f32],
        quantization: Option<&Quantization>,
    ) -> Result<(), InferError> {
        if values.len() != self.len() {
            return Err(InferError::Execution(format!(
                "produced {} values for a tensor of {} elements",
                values.len(),
                self.len()
            )));
        }
        let dtype = self.dtype();
        match self {
            TensorStorage::F32(dst) => dst.copy_from_slice(values),
            TensorStorage::U8(dst) => {
                let q = quantization.ok_or_else(|| {
                    InferError::UnsupportedDtype(format!("{dtype} without quantization"))
                })?;
                for (d, &v) in dst.iter_mut().zip(values) {
                    *d = q.quantize(v);
                }
            }
            TensorStorage::I8(dst) => {
                let q = quantization.ok_or_else(|| {
                    InferError::UnsupportedDtype(format!("{dtype} without quantization"))
                })?;
                for (d, &v) in dst.iter_mut().zip(values) {
                    *d = q.quantize(v);
                }
            }
        }
        Ok(())
    }
}

/// Borrowed, read-only tensor elements.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TensorSlice<'a> {
    F32(&'a [f32]),
    U8(&'a [u8]),
    I8(&'a [i8]),
}

impl<'a> TensorSlice<'a> {
    pub fn dtype(&self) -> ElementType {
        match self {
            TensorSlice::F32(_) => ElementType::F32,
            TensorSlice::U8(_) => ElementType::U8,
            TensorSlice::I8(_) => ElementType::I8,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            TensorSlice::F32(v) => v.len(),
            TensorSlice::U8(v) => v.len(),
            TensorSlice::I8(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Real value of element `index`. Integer elements without quantization
    /// parameters are returned as-is.
    pub fn get_f32(&self, index: usize, quantization: Option<&Quantization>) -> Option<f32> {
        match self {
            TensorSlice::F32(v) => v.get(index).copied(),
            TensorSlice::U8(v) => v
                .get(index)
                .map(|&q| quantization.map_or(q as f32, |z| z.dequantize(q))),
            TensorSlice::I8(v) => v
                .get(index)
                .map(|&q| quantization.map_or(q as f32, |z| z.dequantize(q))),
        }
    }

    pub fn to_f32(&self, quantization: Option<&Quantization>) -> Vec<f32> {
        match self {
            TensorSlice::F32(v) => v.to_vec(),
            TensorSlice::U8(v) => v
                .iter()
                .map(|&q| quantization.map_or(q as f32, |z| z.dequantize(q)))
                .collect(),
            TensorSlice::I8(v) => v
                .iter()
                .map(|&q| quantization.map_or(q as f32, |z| z.dequantize(q)))
                .collect(),
        }
    }
}

/// Borrowed, writable tensor elements.
#[derive(Debug, PartialEq)]
pub enum TensorSliceMut<'a> {
    F32(&'a mut [f32]),
    U8(&'a mut [u8]),
    I8(&'a mut [i8]),
}

impl TensorSliceMut<'_> {
    pub fn dtype(&self) -> ElementType {
        match self {
            TensorSliceMut::F32(_) => ElementType::F32,
            TensorSliceMut::U8(_) => ElementType::U8,
            TensorSliceMut::I8(_) => ElementType::I8,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            TensorSliceMut::F32(v) => v.len(),
            TensorSliceMut::U8(v) => v.len(),
            TensorSliceMut::I8(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Write access to an engine's input tensor for the duration of one
/// population.
///
/// The buffer is fixed-size: population overwrites every element in place
/// and never reallocates.
#[derive(Debug)]
pub struct TensorBuffer<'a> {
    spec: &'a TensorSpec,
    data: TensorSliceMut<'a>,
}

impl<'a> TensorBuffer<'a> {
    /// Wrap engine memory for `spec`.
    ///
    /// # Errors
    ///
    /// Fails if the memory does not hold exactly the declared element count
    /// and type.
    pub fn new(spec: &'a TensorSpec, data: TensorSliceMut<'a>) -> Result<Self, InferError> {
        let expected = spec.element_count()?;
        if data.len() != expected || data.dtype() != spec.dtype {
            return Err(InferError::Execution(format!(
                "input memory is {} x {}, signature declares {} x {}",
                data.len(),
                data.dtype(),
                expected,
                spec.dtype
            )));
        }
        Ok(Self { spec, data })
    }

    pub fn spec(&self) -> &TensorSpec {
        self.spec
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Write `frame` into the buffer, row-major and channel-last.
    ///
    /// Each sample is normalized into the declared range and, for integer
    /// tensors, quantized. Returns the number of elements written, which is
    /// always the full element count. On error nothing has been written.
    pub fn populate(&mut self, frame: &Frame) -> Result<usize, PopulateError> {
        check_frame(self.spec, frame)?;
        let samples = frame.samples();
        if samples.len() != self.data.len() {
            return Err(PopulateError::ElementCount {
                expected: self.data.len(),
                got: samples.len(),
            });
        }

        let norm = self.spec.normalization;
        let quantization = self.spec.quantization;
        match (&mut self.data, quantization) {
            (TensorSliceMut::F32(dst), _) => {
                for (d, &p) in dst.iter_mut().zip(samples) {
                    *d = norm.apply(p);
                }
            }
            (TensorSliceMut::U8(dst), Some(q)) => {
                for (d, &p) in dst.iter_mut().zip(samples) {
                    *d = q.quantize(norm.apply(p));
                }
            }
            (TensorSliceMut::I8(dst), Some(q)) => {
                for (d, &p) in dst.iter_mut().zip(samples) {
                    *d = q.quantize(norm.apply(p));
                }
            }
            (data, None) => {
                return Err(PopulateError::MissingQuantization {
                    dtype: data.dtype(),
                });
            }
        }
        Ok(samples.len())
    }
}
