use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Sample layout of the frames a source hands out.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    #[default]
    Gray,
    Rgb,
}

impl PixelFormat {
    pub fn channels(self) -> usize {
        match self {
            PixelFormat::Gray => 1,
            PixelFormat::Rgb => 3,
        }
    }
}

/// Configuration for frame capture.
///
/// `width`, `height` and `pixel_format` describe the frames delivered to the
/// pipeline; sources convert and resize whatever the device produces to match.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    device: String,
    width: u32,
    height: u32,
    pixel_format: PixelFormat,
    fps: u32,
    buffer_count: u32,
    timeout_ms: u64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: "/dev/video0".to_string(),
            width: 96,
            height: 96,
            pixel_format: PixelFormat::Gray,
            fps: 15,
            buffer_count: 4,
            timeout_ms: 2000,
        }
    }
}

impl CameraConfig {
    /// Set the device path (e.g., "/dev/video0").
    pub fn with_device(mut self, device: String) -> Self {
        self.device = device;
        self
    }

    /// Set the delivered frame width in pixels.
    pub fn with_width(mut self, width: u32) -> Self {
        self.width = width;
        self
    }

    /// Set the delivered frame height in pixels.
    pub fn with_height(mut self, height: u32) -> Self {
        self.height = height;
        self
    }

    pub fn with_pixel_format(mut self, pixel_format: PixelFormat) -> Self {
        self.pixel_format = pixel_format;
        self
    }

    /// Set the frames per second requested from the device.
    pub fn with_fps(mut self, fps: u32) -> Self {
        self.fps = fps;
        self
    }

    /// Set the buffer count for the capture stream.
    pub fn with_buffer_count(mut self, buffer_count: u32) -> Self {
        self.buffer_count = buffer_count;
        self
    }

    /// Set how long a capture may wait for the device.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = timeout.as_millis() as u64;
        self
    }

    // Getters
    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel_format(&self) -> PixelFormat {
        self.pixel_format
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    pub fn buffer_count(&self) -> u32 {
        self.buffer_count
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Where frames come from.
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    /// Decode frames from image files, in order.
    Images {
        paths: Vec<PathBuf>,
        /// Start over after the last image instead of reporting exhaustion.
        #[serde(default)]
        repeat: bool,
    },
    /// Capture from the V4L2 device named in the camera config.
    V4l2,
}
