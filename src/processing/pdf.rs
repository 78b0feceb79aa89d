use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;

use super::{Extraction, TextExtractor};
use crate::gemini::GeminiClient;

// Below this the text layer is assumed to be missing or broken (scanned
// document) and the OCR fallback takes over.
const MIN_TEXT_LAYER_CHARS: usize = 100;

/// Reads the embedded text layer of a PDF. First choice because it is exact
/// and needs no network call.
pub struct PdfTextLayer;

#[async_trait]
impl TextExtractor for PdfTextLayer {
    fn method(&self) -> &'static str {
        "pdf_text_layer"
    }

    async fn extract(&self, data: &Bytes) -> anyhow::Result<Extraction> {
        use lopdf::Document;

        let doc = Document::load_mem(data).context("failed to load PDF document")?;

        let mut text = String::new();
        for (&page_number, _) in doc.get_pages().iter() {
            if let Ok(page_text) = doc.extract_text(&[page_number]) {
                text.push_str(&page_text);
                text.push('\n');
            }
        }

        if text.trim().len() < MIN_TEXT_LAYER_CHARS {
            anyhow::bail!(
                "text layer too thin ({} chars), document is likely scanned",
                text.trim().len()
            );
        }

        Ok(Extraction {
            text,
            method: self.method(),
            ocr_confidence: None,
        })
    }
}

/// OCR fallback for scanned PDFs: ships the raw PDF bytes to the vision
/// model and asks for a verbatim transcription.
pub struct PdfVisionOcr {
    gemini: Arc<GeminiClient>,
}

impl PdfVisionOcr {
    pub fn new(gemini: Arc<GeminiClient>) -> Self {
        Self { gemini }
    }
}

#[async_trait]
impl TextExtractor for PdfVisionOcr {
    fn method(&self) -> &'static str {
        "vision_ocr"
    }

    async fn extract(&self, data: &Bytes) -> anyhow::Result<Extraction> {
        let text = self
            .gemini
            .ocr_document("application/pdf", data)
            .await
            .context("vision OCR over PDF failed")?;
        Ok(Extraction {
            text,
            method: self.method(),
            ocr_confidence: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_text_layer_rejects_garbage() {
        let data = Bytes::from_static(b"definitely not a pdf");
        assert!(PdfTextLayer.extract(&data).await.is_err());
    }
}
