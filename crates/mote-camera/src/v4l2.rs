use crate::convert::{image_to_frame, yuyv_to_frame};
use crate::{CameraConfig, CameraError, Frame, FrameSource};
use std::io;
use v4l::buffer::Type;
use v4l::io::mmap::Stream as MmapStream;
use v4l::io::traits::CaptureStream;
use v4l::video::Capture;
use v4l::{Device, Format, FourCC};

/// Pixel format negotiated with the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CaptureFormat {
    Yuyv { width: u32, height: u32 },
    Mjpeg,
}

/// Blocking V4L2 camera.
///
/// Captures on the calling thread. Each `capture_frame` dequeues one buffer,
/// waiting at most `config.timeout()`, and converts it to the configured
/// pixel format and frame size.
pub struct V4l2Camera {
    config: CameraConfig,
    format: CaptureFormat,
    stream: MmapStream<'static>,
    // keeps the device open for the lifetime of the stream
    _device: Device,
}

impl std::fmt::Debug for V4l2Camera {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("V4l2Camera")
            .field("config", &self.config)
            .field("format", &self.format)
            .finish()
    }
}

impl V4l2Camera {
    /// Open `config.device()` and start streaming.
    ///
    /// YUYV is requested at the configured resolution; devices that only
    /// offer MJPEG are accepted and decoded per frame.
    ///
    /// # Errors
    ///
    /// Returns `CameraError::Device` if the device cannot be opened, offers
    /// neither YUYV nor MJPEG, or rejects the stream parameters.
    pub fn new(config: CameraConfig) -> Result<Self, CameraError> {
        let device = Device::with_path(config.device())?;

        let requested = Format::new(config.width(), config.height(), FourCC::new(b"YUYV"));
        let mut format = Capture::set_format(&device, &requested)?;
        if format.fourcc != FourCC::new(b"YUYV") {
            let mjpeg = Format::new(config.width(), config.height(), FourCC::new(b"MJPG"));
            format = Capture::set_format(&device, &mjpeg)?;
        }

        let capture_format = if format.fourcc == FourCC::new(b"YUYV") {
            CaptureFormat::Yuyv {
                width: format.width,
                height: format.height,
            }
        } else if format.fourcc == FourCC::new(b"MJPG") {
            CaptureFormat::Mjpeg
        } else {
            return Err(CameraError::Device(format!(
                "device offers neither YUYV nor MJPEG (got {})",
                format.fourcc
            )));
        };

        let params = v4l::video::capture::Parameters::with_fps(config.fps());
        Capture::set_params(&device, &params)?;

        let mut stream =
            MmapStream::with_buffers(&device, Type::VideoCapture, config.buffer_count())?;
        stream.set_timeout(config.timeout());

        log::info!(
            "camera {} opened: {:?} {}x{} @ {} fps",
            config.device(),
            capture_format,
            format.width,
            format.height,
            config.fps()
        );

        Ok(Self {
            config,
            format: capture_format,
            stream,
            _device: device,
        })
    }

    /// Get a reference to the configuration.
    pub fn config(&self) -> &CameraConfig {
        &self.config
    }
}

impl FrameSource for V4l2Camera {
    fn capture_frame(&mut self) -> Result<Frame, CameraError> {
        let (data, metadata) = match CaptureStream::next(&mut self.stream) {
            Ok(buffer) => buffer,
            Err(e) if e.kind() == io::ErrorKind::TimedOut => {
                return Err(CameraError::Timeout(self.config.timeout()));
            }
            Err(e) => return Err(CameraError::Stream(e.to_string())),
        };
        // some drivers leave bytesused at zero
        let used = match metadata.bytesused as usize {
            0 => data.len(),
            n => n.min(data.len()),
        };
        let data = &data[..used];

        match self.format {
            CaptureFormat::Yuyv { width, height } => yuyv_to_frame(
                data,
                width,
                height,
                self.config.pixel_format(),
                self.config.width(),
                self.config.height(),
            ),
            CaptureFormat::Mjpeg => image_to_frame(
                image::load_from_memory(data)?,
                self.config.pixel_format(),
                self.config.width(),
                self.config.height(),
            ),
        }
    }
}
