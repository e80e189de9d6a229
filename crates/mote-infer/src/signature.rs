use crate::InferError;
use mote_base::{TensorError, element_count};
use num_traits::{AsPrimitive, Bounded};
use serde::Deserialize;
use std::fmt;

/// Element type of an engine tensor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    #[default]
    F32,
    U8,
    I8,
}

impl ElementType {
    pub fn size(self) -> usize {
        match self {
            ElementType::F32 => 4,
            ElementType::U8 | ElementType::I8 => 1,
        }
    }

    pub fn is_quantized(self) -> bool {
        !matches!(self, ElementType::F32)
    }

    fn range(self) -> (i64, i64) {
        match self {
            ElementType::F32 => (i64::MIN, i64::MAX),
            ElementType::U8 => (u8::MIN as i64, u8::MAX as i64),
            ElementType::I8 => (i8::MIN as i64, i8::MAX as i64),
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementType::F32 => write!(f, "f32"),
            ElementType::U8 => write!(f, "u8"),
            ElementType::I8 => write!(f, "i8"),
        }
    }
}

/// Affine quantization: `real = (q - zero_point) * scale`.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct Quantization {
    pub scale: f32,
    pub zero_point: i32,
}

impl Quantization {
    pub fn new(scale: f32, zero_point: i32) -> Self {
        Self { scale, zero_point }
    }

    /// Quantize `real`, rounding half away from zero and saturating at the
    /// bounds of `T`.
    pub fn quantize<T>(&self, real: f32) -> T
    where
        T: Bounded + AsPrimitive<f32>,
        f32: AsPrimitive<T>,
    {
        let q = (real / self.scale).round() + self.zero_point as f32;
        q.clamp(T::min_value().as_(), T::max_value().as_()).as_()
    }

    pub fn dequantize<T: AsPrimitive<f32>>(&self, q: T) -> f32 {
        (q.as_() - self.zero_point as f32) * self.scale
    }
}

/// Real-valued range that 8-bit samples are mapped onto before they are
/// written to an input tensor.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct Normalization {
    pub min: f32,
    pub max: f32,
}

impl Default for Normalization {
    fn default() -> Self {
        Self { min: 0.0, max: 1.0 }
    }
}

impl Normalization {
    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// `min + (sample / 255) * (max - min)`
    pub fn apply(&self, sample: u8) -> f32 {
        self.min + (sample as f32 / 255.0) * (self.max - self.min)
    }
}

/// Height, width and channel count of an image-like tensor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageDims {
    pub height: usize,
    pub width: usize,
    pub channels: usize,
}

impl ImageDims {
    pub fn to_shape(self) -> [usize; 3] {
        [self.height, self.width, self.channels]
    }
}

/// Declared signature of one engine input or output.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct TensorSpec {
    /// Graph name, required by engines that address tensors by name.
    #[serde(default)]
    pub name: Option<String>,
    pub shape: Vec<usize>,
    #[serde(default)]
    pub dtype: ElementType,
    #[serde(default)]
    pub quantization: Option<Quantization>,
    #[serde(default)]
    pub normalization: Normalization,
}

impl TensorSpec {
    pub fn new(shape: Vec<usize>, dtype: ElementType) -> Self {
        Self {
            name: None,
            shape,
            dtype,
            quantization: None,
            normalization: Normalization::default(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_quantization(mut self, quantization: Quantization) -> Self {
        self.quantization = Some(quantization);
        self
    }

    pub fn with_normalization(mut self, normalization: Normalization) -> Self {
        self.normalization = normalization;
        self
    }

    pub fn element_count(&self) -> Result<usize, TensorError> {
        element_count(&self.shape)
    }

    pub fn byte_len(&self) -> Result<usize, TensorError> {
        self.element_count()?
            .checked_mul(self.dtype.size())
            .ok_or(TensorError::ShapeOverflow)
    }

    /// Interpret the shape as an image: `[H, W]`, `[H, W, C]` or `[1, H, W, C]`.
    pub fn image_dims(&self) -> Option<ImageDims> {
        let (height, width, channels) = match self.shape.as_slice() {
            &[h, w] => (h, w, 1),
            &[h, w, c] => (h, w, c),
            &[1, h, w, c] => (h, w, c),
            _ => return None,
        };
        Some(ImageDims {
            height,
            width,
            channels,
        })
    }

    /// Check shape, element type and numeric parameters for consistency.
    ///
    /// `role` names the tensor in error messages ("input", "output").
    pub fn validate(&self, role: &str) -> Result<(), InferError> {
        if self.shape.is_empty() || self.shape.contains(&0) {
            return Err(InferError::Config(format!(
                "{role} shape {:?} must be non-empty with no zero dimensions",
                self.shape
            )));
        }
        self.byte_len()?;

        match (self.dtype.is_quantized(), self.quantization) {
            (true, None) => {
                return Err(InferError::Config(format!(
                    "{role} tensor of type {} needs quantization parameters",
                    self.dtype
                )));
            }
            (true, Some(q)) => {
                if !q.scale.is_finite() || q.scale <= 0.0 {
                    return Err(InferError::Config(format!(
                        "{role} quantization scale must be positive and finite, got {}",
                        q.scale
                    )));
                }
                let (lo, hi) = self.dtype.range();
                let zero_point = q.zero_point as i64;
                if zero_point < lo || zero_point > hi {
                    return Err(InferError::Config(format!(
                        "{role} zero point {} is outside the {} range",
                        q.zero_point, self.dtype
                    )));
                }
            }
            (false, Some(_)) => {
                return Err(InferError::Config(format!(
                    "{role} tensor is f32 and takes no quantization parameters"
                )));
            }
            (false, None) => {}
        }

        let Normalization { min, max } = self.normalization;
        if !min.is_finite() || !max.is_finite() || min >= max {
            return Err(InferError::Config(format!(
                "{role} normalization range [{min}, {max}] is invalid"
            )));
        }
        Ok(())
    }
}
