use crate::{Result, StitchError};
use image::codecs::jpeg::JpegEncoder;
use image::{ImageFormat, RgbImage};
use std::io::Cursor;
use std::path::Path;

pub const DEFAULT_JPEG_QUALITY: u8 = 92;

/// Encoded panorama bytes with their media type.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub mime: &'static str,
}

/// JPEG at `quality`, falling back to PNG if the JPEG encoder fails.
pub fn encode_panorama(img: &RgbImage, quality: u8) -> Result<EncodedImage> {
    match encode_jpeg(img, quality) {
        Ok(bytes) => Ok(EncodedImage {
            bytes,
            mime: "image/jpeg",
        }),
        Err(e) => {
            tracing::warn!(error = %e, "JPEG encoding failed, falling back to PNG");
            let bytes = encode_png(img)?;
            Ok(EncodedImage {
                bytes,
                mime: "image/png",
            })
        }
    }
}

fn encode_jpeg(img: &RgbImage, quality: u8) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100))
        .encode_image(img)
        .map_err(|e| StitchError::EncodingFailed(e.to_string()))?;
    Ok(bytes)
}

fn encode_png(img: &RgbImage) -> Result<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    img.write_to(&mut cursor, ImageFormat::Png)
        .map_err(|e| StitchError::EncodingFailed(e.to_string()))?;
    Ok(cursor.into_inner())
}

/// Write `img` to `path`; the format follows the file extension.
pub fn save_panorama<P: AsRef<Path>>(img: &RgbImage, path: P, quality: u8) -> Result<()> {
    let path = path.as_ref();
    match ImageFormat::from_path(path) {
        Ok(ImageFormat::Jpeg) => {
            std::fs::write(path, encode_jpeg(img, quality)?)?;
        }
        Ok(_) => img
            .save(path)
            .map_err(|e| StitchError::EncodingFailed(e.to_string()))?,
        Err(_) => {
            return Err(StitchError::EncodingFailed(format!(
                "unrecognized output extension: {}",
                path.display()
            )))
        }
    }
    Ok(())
}
