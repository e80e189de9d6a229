use crate::convert::image_to_frame;
use crate::{CameraConfig, CameraError, Frame, FrameSource};
use std::path::PathBuf;

/// Frame source that decodes image files in order.
///
/// Each capture reads and decodes the next file, converts it to the
/// configured pixel format and resizes it to the configured frame size.
/// Once the list is exhausted captures fail with `CameraError::Unavailable`
/// unless `repeat` is set.
#[derive(Debug)]
pub struct ImageFileSource {
    config: CameraConfig,
    paths: Vec<PathBuf>,
    repeat: bool,
    next: usize,
}

impl ImageFileSource {
    pub fn new(paths: Vec<PathBuf>, repeat: bool, config: CameraConfig) -> Result<Self, CameraError> {
        if paths.is_empty() {
            return Err(CameraError::Device("image source has no files".to_string()));
        }
        if config.width() == 0 || config.height() == 0 {
            return Err(CameraError::Device(format!(
                "invalid frame size {}x{}",
                config.width(),
                config.height()
            )));
        }
        Ok(Self {
            config,
            paths,
            repeat,
            next: 0,
        })
    }

    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    /// Number of frames handed out so far.
    pub fn position(&self) -> usize {
        self.next
    }
}

impl FrameSource for ImageFileSource {
    fn capture_frame(&mut self) -> Result<Frame, CameraError> {
        let index = if self.repeat {
            self.next % self.paths.len()
        } else {
            self.next
        };
        let path = self
            .paths
            .get(index)
            .ok_or_else(|| {
                CameraError::Unavailable(format!("all {} images consumed", self.paths.len()))
            })?
            .clone();
        // a file that fails to decode is skipped on the next capture
        self.next += 1;

        // an unreadable file is a device fault, not the end of the list
        let bytes = std::fs::read(&path)
            .map_err(|e| CameraError::Device(format!("{}: {}", path.display(), e)))?;
        let image = image::load_from_memory(&bytes)?;
        log::debug!(
            "decoded {} ({}x{})",
            path.display(),
            image.width(),
            image.height()
        );

        image_to_frame(
            image,
            self.config.pixel_format(),
            self.config.width(),
            self.config.height(),
        )
    }
}
