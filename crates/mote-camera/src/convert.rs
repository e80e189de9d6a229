use crate::{CameraError, Frame, PixelFormat};
use image::{DynamicImage, GrayImage, RgbImage, imageops::FilterType};

/// Converts YUYV (YUV 4:2:2) pixel data to RGB.
///
/// YUYV packs as `[Y0, U, Y1, V, ...]`, each pair of pixels sharing U and V.
/// Converts using BT.601 coefficients:
/// - R = Y + 1.402 * (V - 128)
/// - G = Y - 0.344 * (U - 128) - 0.714 * (V - 128)
/// - B = Y + 1.772 * (U - 128)
///
/// Returns `None` if `data` is shorter than `width * height * 2` bytes.
pub fn yuyv_to_rgb(data: &[u8], width: u32, height: u32) -> Option<Vec<u8>> {
    let pixel_count = (width as usize) * (height as usize);
    let expected_len = pixel_count * 2;
    if data.len() < expected_len {
        return None;
    }

    let mut rgb = Vec::with_capacity(pixel_count * 3);
    for chunk in data[..expected_len].chunks_exact(4) {
        let u = chunk[1] as f32 - 128.0;
        let v = chunk[3] as f32 - 128.0;
        for y in [chunk[0] as f32, chunk[2] as f32] {
            rgb.push((y + 1.402 * v).clamp(0.0, 255.0) as u8);
            rgb.push((y - 0.344 * u - 0.714 * v).clamp(0.0, 255.0) as u8);
            rgb.push((y + 1.772 * u).clamp(0.0, 255.0) as u8);
        }
    }

    Some(rgb)
}

/// Extracts the luma plane from YUYV data, one byte per pixel.
///
/// Returns `None` if `data` is shorter than `width * height * 2` bytes.
pub fn yuyv_to_gray(data: &[u8], width: u32, height: u32) -> Option<Vec<u8>> {
    let pixel_count = (width as usize) * (height as usize);
    let expected_len = pixel_count * 2;
    if data.len() < expected_len {
        return None;
    }
    Some(data[..expected_len].iter().step_by(2).copied().collect())
}

/// Convert a decoded image into a frame of the requested format and size.
///
/// The image is converted to gray or RGB first, then resized with a
/// triangle filter when its dimensions differ from `width` x `height`.
pub fn image_to_frame(
    image: DynamicImage,
    pixel_format: PixelFormat,
    width: u32,
    height: u32,
) -> Result<Frame, CameraError> {
    let resize = image.width() != width || image.height() != height;
    let data = match pixel_format {
        PixelFormat::Gray => {
            let mut gray: GrayImage = image.into_luma8();
            if resize {
                gray = image::imageops::resize(&gray, width, height, FilterType::Triangle);
            }
            gray.into_raw()
        }
        PixelFormat::Rgb => {
            let mut rgb: RgbImage = image.into_rgb8();
            if resize {
                rgb = image::imageops::resize(&rgb, width, height, FilterType::Triangle);
            }
            rgb.into_raw()
        }
    };
    Frame::new(width as usize, height as usize, pixel_format.channels(), data)
}

/// Build a frame from raw YUYV capture data.
pub fn yuyv_to_frame(
    data: &[u8],
    source_width: u32,
    source_height: u32,
    pixel_format: PixelFormat,
    width: u32,
    height: u32,
) -> Result<Frame, CameraError> {
    let short = || {
        CameraError::Stream(format!(
            "YUYV buffer of {} bytes is too small for {}x{}",
            data.len(),
            source_width,
            source_height
        ))
    };
    let image = match pixel_format {
        PixelFormat::Gray => {
            let luma = yuyv_to_gray(data, source_width, source_height).ok_or_else(short)?;
            GrayImage::from_raw(source_width, source_height, luma).map(DynamicImage::ImageLuma8)
        }
        PixelFormat::Rgb => {
            let rgb = yuyv_to_rgb(data, source_width, source_height).ok_or_else(short)?;
            RgbImage::from_raw(source_width, source_height, rgb).map(DynamicImage::ImageRgb8)
        }
    }
    .ok_or_else(short)?;
    image_to_frame(image, pixel_format, width, height)
}
