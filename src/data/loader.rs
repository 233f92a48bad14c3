use crate::{Result, StitchError};
use image::imageops::FilterType;
use image::RgbImage;
use ndarray::{Array2, Array3, ArrayView3};
use std::path::Path;

/// Decode an uploaded image (any format the `image` crate recognizes) to RGB.
pub fn decode_image(bytes: &[u8]) -> Result<RgbImage> {
    if bytes.is_empty() {
        return Err(StitchError::InvalidImage("empty upload".to_string()));
    }
    let img = image::load_from_memory(bytes)?;
    Ok(img.to_rgb8())
}

pub fn load_image<P: AsRef<Path>>(path: P) -> Result<RgbImage> {
    let img = image::open(path)?;
    Ok(img.to_rgb8())
}

pub fn validate_image_size(img: &RgbImage, min_size: u32) -> Result<()> {
    if img.width() < min_size || img.height() < min_size {
        return Err(StitchError::InvalidImage(format!(
            "image too small: {}x{}, minimum: {}x{}",
            img.width(),
            img.height(),
            min_size,
            min_size
        )));
    }
    Ok(())
}

/// Shrink so the longer side is at most `max_size`, keeping the aspect ratio.
/// Images already within bounds are returned unchanged.
pub fn downscale_to_max(img: RgbImage, max_size: u32) -> RgbImage {
    let (width, height) = img.dimensions();
    let longest = width.max(height);
    if max_size == 0 || longest <= max_size {
        return img;
    }

    let scale = max_size as f64 / longest as f64;
    let new_width = ((width as f64 * scale).round() as u32).max(1);
    let new_height = ((height as f64 * scale).round() as u32).max(1);
    tracing::debug!(
        from_width = width,
        from_height = height,
        to_width = new_width,
        to_height = new_height,
        "Downscaling input image"
    );
    image::imageops::resize(&img, new_width, new_height, FilterType::Triangle)
}

/// `(height, width, 3)` array view of an RGB buffer.
pub fn rgb_to_array(img: &RgbImage) -> Result<Array3<u8>> {
    let (width, height) = img.dimensions();
    Array3::from_shape_vec((height as usize, width as usize, 3), img.as_raw().clone())
        .map_err(|e| StitchError::InvalidImage(e.to_string()))
}

pub fn array_to_rgb(array: &ArrayView3<u8>) -> Result<RgbImage> {
    let (height, width, channels) = array.dim();
    if channels != 3 {
        return Err(StitchError::InvalidImage(format!(
            "expected 3 channels, got {channels}"
        )));
    }
    let raw: Vec<u8> = array.iter().copied().collect();
    RgbImage::from_raw(width as u32, height as u32, raw)
        .ok_or_else(|| StitchError::InvalidImage("pixel buffer size mismatch".to_string()))
}

/// Luma (ITU-R 601) rounded to integer levels, as `f64`.
pub fn to_grayscale(img: &RgbImage) -> Array2<f64> {
    let (width, height) = img.dimensions();
    Array2::from_shape_fn((height as usize, width as usize), |(y, x)| {
        let [r, g, b] = img.get_pixel(x as u32, y as u32).0;
        (0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64).round()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_decode_rejects_empty_and_garbage() {
        assert!(matches!(decode_image(&[]), Err(StitchError::InvalidImage(_))));
        assert!(matches!(decode_image(b"not an image"), Err(StitchError::Decode(_))));
    }

    #[test]
    fn test_downscale_keeps_aspect_ratio() {
        let img = RgbImage::new(400, 200);
        let small = downscale_to_max(img, 100);
        assert_eq!(small.dimensions(), (100, 50));

        let img = RgbImage::new(80, 60);
        assert_eq!(downscale_to_max(img, 100).dimensions(), (80, 60));
    }

    #[test]
    fn test_array_round_trip_layout() {
        let img = RgbImage::from_fn(3, 2, |x, y| Rgb([x as u8, y as u8, 7]));
        let array = rgb_to_array(&img).unwrap();
        assert_eq!(array.dim(), (2, 3, 3));
        assert_eq!(array[[1, 2, 0]], 2);
        assert_eq!(array[[1, 2, 1]], 1);
        assert_eq!(array_to_rgb(&array.view()).unwrap(), img);
    }

    #[test]
    fn test_grayscale_weights() {
        let img = RgbImage::from_fn(2, 1, |x, _| if x == 0 { Rgb([255, 0, 0]) } else { Rgb([100, 100, 100]) });
        let gray = to_grayscale(&img);
        assert_eq!(gray[[0, 0]], 76.0);
        assert_eq!(gray[[0, 1]], 100.0);
    }
}
