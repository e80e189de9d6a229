use crate::{CameraError, Frame};

/// Blocking frame acquisition.
///
/// `capture_frame` waits until the device has a frame or gives up with an
/// error (`CameraError::Timeout` when the device was not ready in time).
pub trait FrameSource {
    fn capture_frame(&mut self) -> Result<Frame, CameraError>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn capture_frame(&mut self) -> Result<Frame, CameraError> {
        (**self).capture_frame()
    }
}

impl<S: FrameSource + ?Sized> FrameSource for &mut S {
    fn capture_frame(&mut self) -> Result<Frame, CameraError> {
        (**self).capture_frame()
    }
}
