//! Source image decoding.

use std::path::Path;
use std::sync::Arc;

use image::RgbaImage;
use tracing::debug;

use crate::error::{MediaError, MediaResult};

/// A decoded still image, shared read-only with the encoder.
#[derive(Debug, Clone)]
pub struct SourceImage {
    raster: Arc<RgbaImage>,
    format: Option<image::ImageFormat>,
    byte_len: usize,
}

impl SourceImage {
    /// Decode an image from raw file bytes.
    pub fn decode(bytes: &[u8]) -> MediaResult<Self> {
        let format = image::guess_format(bytes).ok();
        let decoded = image::load_from_memory(bytes).map_err(|e| MediaError::decode(e.to_string()))?;
        let raster = decoded.to_rgba8();

        if raster.width() == 0 || raster.height() == 0 {
            return Err(MediaError::decode("image has zero dimensions"));
        }

        debug!(
            width = raster.width(),
            height = raster.height(),
            format = ?format,
            "Decoded source image"
        );

        Ok(Self {
            raster: Arc::new(raster),
            format,
            byte_len: bytes.len(),
        })
    }

    /// Read and decode an image file.
    pub async fn open(path: impl AsRef<Path>) -> MediaResult<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| MediaError::decode(format!("{}: {}", path.display(), e)))?;
        let display = path.display().to_string();

        tokio::task::spawn_blocking(move || Self::decode(&bytes))
            .await
            .map_err(|e| MediaError::decode(format!("{}: decoder task failed: {}", display, e)))?
    }

    /// Wrap an already decoded raster.
    pub fn from_raster(raster: RgbaImage) -> MediaResult<Self> {
        if raster.width() == 0 || raster.height() == 0 {
            return Err(MediaError::decode("image has zero dimensions"));
        }
        let byte_len = raster.as_raw().len();
        Ok(Self {
            raster: Arc::new(raster),
            format: None,
            byte_len,
        })
    }

    /// Intrinsic width in pixels.
    pub fn width(&self) -> u32 {
        self.raster.width()
    }

    /// Intrinsic height in pixels.
    pub fn height(&self) -> u32 {
        self.raster.height()
    }

    /// RGBA8 pixel data, row-major.
    pub fn pixels(&self) -> &[u8] {
        self.raster.as_raw()
    }

    /// Detected container format of the original bytes, if any.
    pub fn format(&self) -> Option<image::ImageFormat> {
        self.format
    }

    /// Size of the bytes the image was created from.
    pub fn byte_len(&self) -> usize {
        self.byte_len
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{ImageOutputFormat, Rgba};
    use std::io::Cursor;

    /// Encode a small solid-color PNG.
    pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let raster = RgbaImage::from_pixel(width, height, Rgba([200, 40, 10, 255]));
        let mut out = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(raster)
            .write_to(&mut out, ImageOutputFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn test_decode_png() {
        let image = SourceImage::decode(&png_bytes(4, 3)).unwrap();
        assert_eq!(image.width(), 4);
        assert_eq!(image.height(), 3);
        assert_eq!(image.pixels().len(), 4 * 3 * 4);
        assert_eq!(image.format(), Some(image::ImageFormat::Png));
    }

    #[test]
    fn test_decode_garbage_fails() {
        let err = SourceImage::decode(b"definitely not an image").unwrap_err();
        assert!(matches!(err, MediaError::Decode(_)));
    }

    #[tokio::test]
    async fn test_open_missing_file() {
        let err = SourceImage::open("/nonexistent/tkit/photo.png").await.unwrap_err();
        assert!(matches!(err, MediaError::Decode(_)));
    }

    #[test]
    fn test_zero_sized_raster_rejected() {
        let err = SourceImage::from_raster(RgbaImage::new(0, 10)).unwrap_err();
        assert!(matches!(err, MediaError::Decode(_)));
    }
}
