use std::io::Cursor;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use image::{ImageFormat, ImageReader};

use super::{Extraction, TextExtractor};
use crate::gemini::GeminiClient;

// An OCR result shorter than this is treated as noise rather than text.
const MIN_OCR_CHARS: usize = 10;

/// OCR for photographed or scanned documents via the vision model. Formats
/// the model does not accept inline (TIFF) are re-encoded to PNG first.
pub struct VisionOcr {
    gemini: Arc<GeminiClient>,
}

impl VisionOcr {
    pub fn new(gemini: Arc<GeminiClient>) -> Self {
        Self { gemini }
    }
}

#[async_trait]
impl TextExtractor for VisionOcr {
    fn method(&self) -> &'static str {
        "vision_ocr"
    }

    async fn extract(&self, data: &Bytes) -> Result<Extraction> {
        let (mime_type, payload) = normalize_for_ocr(data)?;
        let text = self
            .gemini
            .ocr_document(mime_type, &payload)
            .await
            .context("vision OCR failed")?;

        if text.trim().len() < MIN_OCR_CHARS {
            anyhow::bail!("OCR produced too little text to be usable");
        }

        Ok(Extraction {
            text,
            method: self.method(),
            ocr_confidence: None,
        })
    }
}

/// Decodes the image to confirm it is readable and converts anything that is
/// not already JPEG or PNG into PNG bytes.
fn normalize_for_ocr(data: &Bytes) -> Result<(&'static str, Vec<u8>)> {
    let reader = ImageReader::new(Cursor::new(data.as_ref()))
        .with_guessed_format()
        .context("failed to guess image format")?;

    let format = reader.format().context("unrecognized image format")?;
    match format {
        ImageFormat::Jpeg => Ok(("image/jpeg", data.to_vec())),
        ImageFormat::Png => Ok(("image/png", data.to_vec())),
        _ => {
            let decoded = reader.decode().context("failed to decode image")?;
            let mut out = Vec::new();
            decoded
                .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
                .context("failed to re-encode image as PNG")?;
            Ok(("image/png", out))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_png() -> Vec<u8> {
        let img = image::RgbImage::from_pixel(4, 4, image::Rgb([255, 255, 255]));
        let mut out = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
            .unwrap();
        out
    }

    #[test]
    fn test_png_passes_through() {
        let data = Bytes::from(tiny_png());
        let (mime, payload) = normalize_for_ocr(&data).unwrap();
        assert_eq!(mime, "image/png");
        assert_eq!(payload, data.to_vec());
    }

    #[test]
    fn test_tiff_is_reencoded_as_png() {
        let img = image::RgbImage::from_pixel(4, 4, image::Rgb([0, 0, 0]));
        let mut tiff = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut tiff), ImageFormat::Tiff)
            .unwrap();

        let (mime, payload) = normalize_for_ocr(&Bytes::from(tiff)).unwrap();
        assert_eq!(mime, "image/png");
        assert!(payload.starts_with(&[137, 80, 78, 71]));
    }

    #[test]
    fn test_garbage_bytes_are_rejected() {
        let data = Bytes::from_static(b"not an image at all");
        assert!(normalize_for_ocr(&data).is_err());
    }
}
