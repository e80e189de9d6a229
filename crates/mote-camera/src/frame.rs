use crate::CameraError;
use mote_base::Tensor;

/// One captured frame: 8-bit samples in HWC layout `[height, width, channels]`.
///
/// Frames are immutable once built; a frame is consumed by a single
/// conversion into an input tensor and then dropped.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    tensor: Tensor<u8>,
}

impl Frame {
    pub fn new(width: usize, height: usize, channels: usize, data: Vec<u8>) -> Result<Self, CameraError> {
        let tensor = Tensor::new(vec![height, width, channels], data)?;
        Ok(Self { tensor })
    }

    /// Wrap an HWC tensor, as produced by image decoding.
    pub fn from_tensor(tensor: Tensor<u8>) -> Result<Self, CameraError> {
        if tensor.ndim() != 3 {
            return Err(CameraError::Decode(format!(
                "expected [height, width, channels] frame, got shape {:?}",
                tensor.shape
            )));
        }
        Ok(Self { tensor })
    }

    pub fn height(&self) -> usize {
        self.tensor.shape[0]
    }

    pub fn width(&self) -> usize {
        self.tensor.shape[1]
    }

    pub fn channels(&self) -> usize {
        self.tensor.shape[2]
    }

    pub fn shape(&self) -> &[usize] {
        &self.tensor.shape
    }

    /// Row-major, channel-last samples.
    pub fn samples(&self) -> &[u8] {
        self.tensor.as_slice()
    }

    pub fn len(&self) -> usize {
        self.tensor.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tensor.is_empty()
    }

    pub fn into_tensor(self) -> Tensor<u8> {
        self.tensor
    }
}
