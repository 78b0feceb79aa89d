use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::domain::DocumentType;
use crate::gemini::GeminiClient;

pub mod docx;
pub mod image;
pub mod pdf;

pub use docx::DocxArchive;
pub use image::VisionOcr;
pub use pdf::{PdfTextLayer, PdfVisionOcr};

/// The result of one successful extraction attempt.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub text: String,
    pub method: &'static str,
    pub ocr_confidence: Option<f64>,
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("no text could be recovered from the document (tried: {attempted})")]
    NoText { attempted: String },
}

/// One text-extraction strategy. Strategies are tried in a fixed priority
/// order per document type until one yields usable text.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    fn method(&self) -> &'static str;
    async fn extract(&self, data: &Bytes) -> anyhow::Result<Extraction>;
}

/// Decodes plain-text uploads. Last in every chain that can contain raw text.
pub struct PlainText;

#[async_trait]
impl TextExtractor for PlainText {
    fn method(&self) -> &'static str {
        "plain_text"
    }

    async fn extract(&self, data: &Bytes) -> anyhow::Result<Extraction> {
        let text = String::from_utf8_lossy(data).into_owned();
        if text.trim().is_empty() {
            anyhow::bail!("file contains no text");
        }
        Ok(Extraction {
            text,
            method: self.method(),
            ocr_confidence: None,
        })
    }
}

/// Holds the shared clients and builds the per-format extractor chains.
pub struct ExtractionPipeline {
    gemini: Arc<GeminiClient>,
}

impl ExtractionPipeline {
    pub fn new(gemini: Arc<GeminiClient>) -> Self {
        Self { gemini }
    }

    fn extractors_for(&self, document_type: DocumentType) -> Vec<Box<dyn TextExtractor>> {
        match document_type {
            DocumentType::Pdf => vec![
                Box::new(PdfTextLayer),
                Box::new(PdfVisionOcr::new(self.gemini.clone())),
            ],
            DocumentType::Doc | DocumentType::Docx => vec![Box::new(DocxArchive)],
            DocumentType::Image => vec![Box::new(VisionOcr::new(self.gemini.clone()))],
            DocumentType::Text => vec![Box::new(PlainText)],
        }
    }

    /// Runs the strategy chain for the given type. The first strategy that
    /// produces non-empty text wins; every failure is logged and the next
    /// strategy is tried.
    pub async fn extract(
        &self,
        document_type: DocumentType,
        data: &Bytes,
    ) -> Result<Extraction, ExtractError> {
        let extractors = self.extractors_for(document_type);
        let mut attempted = Vec::with_capacity(extractors.len());

        for extractor in extractors {
            attempted.push(extractor.method());
            match extractor.extract(data).await {
                Ok(extraction) if !extraction.text.trim().is_empty() => {
                    tracing::info!(
                        "extracted {} chars using {}",
                        extraction.text.len(),
                        extraction.method
                    );
                    return Ok(extraction);
                }
                Ok(_) => {
                    tracing::warn!("{} produced empty text, trying next method", extractor.method());
                }
                Err(e) => {
                    tracing::warn!("{} failed: {}, trying next method", extractor.method(), e);
                }
            }
        }

        Err(ExtractError::NoText {
            attempted: attempted.join(", "),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_plain_text_extraction() {
        let data = Bytes::from_static(b"This agreement is binding.");
        let extraction = PlainText.extract(&data).await.unwrap();
        assert_eq!(extraction.text, "This agreement is binding.");
        assert_eq!(extraction.method, "plain_text");
    }

    #[tokio::test]
    async fn test_plain_text_rejects_empty() {
        let data = Bytes::from_static(b"   \n  ");
        assert!(PlainText.extract(&data).await.is_err());
    }
}
