//! Frame acquisition for the mote pipeline.
//!
//! This crate provides the `FrameSource` trait for blocking frame capture,
//! the immutable `Frame` it produces, and source implementations for image
//! files and (with the `v4l2` feature) V4L2 cameras.

pub mod config;
pub mod convert;
pub mod error;
pub mod file;
pub mod frame;
pub mod traits;

#[cfg(feature = "v4l2")]
pub mod v4l2;

pub use config::{CameraConfig, PixelFormat, SourceConfig};
pub use error::CameraError;
pub use file::ImageFileSource;
pub use frame::Frame;
pub use traits::FrameSource;

#[cfg(feature = "v4l2")]
pub use v4l2::V4l2Camera;

/// Open the frame source described by `source`, producing frames shaped by `camera`.
pub fn open_source(
    source: &SourceConfig,
    camera: CameraConfig,
) -> Result<Box<dyn FrameSource>, CameraError> {
    match source {
        SourceConfig::Images { paths, repeat } => Ok(Box::new(ImageFileSource::new(
            paths.clone(),
            *repeat,
            camera,
        )?)),
        #[cfg(feature = "v4l2")]
        SourceConfig::V4l2 => Ok(Box::new(V4l2Camera::new(camera)?)),
        #[cfg(not(feature = "v4l2"))]
        SourceConfig::V4l2 => Err(CameraError::Device(
            "V4L2 support not compiled in (enable the `v4l2` feature)".to_string(),
        )),
    }
}
