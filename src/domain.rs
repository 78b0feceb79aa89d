use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Supported document categories, derived from the upload's extension and
/// MIME type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    Pdf,
    Doc,
    Docx,
    Image,
    Text,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Pdf => "pdf",
            DocumentType::Doc => "doc",
            DocumentType::Docx => "docx",
            DocumentType::Image => "image",
            DocumentType::Text => "text",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pdf" => Some(DocumentType::Pdf),
            "doc" => Some(DocumentType::Doc),
            "docx" => Some(DocumentType::Docx),
            "image" => Some(DocumentType::Image),
            "text" => Some(DocumentType::Text),
            _ => None,
        }
    }
}

/// Lifecycle of an uploaded document: uploaded -> processing -> completed|failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    Uploaded,
    Processing,
    Completed,
    Failed,
}

impl ProcessingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingStatus::Uploaded => "uploaded",
            ProcessingStatus::Processing => "processing",
            ProcessingStatus::Completed => "completed",
            ProcessingStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "uploaded" => Some(ProcessingStatus::Uploaded),
            "processing" => Some(ProcessingStatus::Processing),
            "completed" => Some(ProcessingStatus::Completed),
            "failed" => Some(ProcessingStatus::Failed),
            _ => None,
        }
    }
}

/// Controls how verbose the simplification is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimplificationLevel {
    Basic,
    #[default]
    Standard,
    Detailed,
}

impl SimplificationLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SimplificationLevel::Basic => "basic",
            SimplificationLevel::Standard => "standard",
            SimplificationLevel::Detailed => "detailed",
        }
    }

    pub fn prompt_instructions(&self) -> &'static str {
        match self {
            SimplificationLevel::Basic => {
                "Provide a very simple, high-level summary suitable for someone with no \
                 legal background. Focus only on the most important points and use everyday \
                 language. Keep explanations brief and avoid legal terminology."
            }
            SimplificationLevel::Standard => {
                "Provide a comprehensive but accessible explanation suitable for the general \
                 public. Explain key legal concepts in plain language while maintaining \
                 accuracy. Include important details and context."
            }
            SimplificationLevel::Detailed => {
                "Provide a thorough analysis with detailed explanations of legal concepts. \
                 Include specific clauses, terms, and their implications. Suitable for \
                 someone who wants to understand the document in depth."
            }
        }
    }
}

/// Steers the phrasing of the simplified output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetAudience {
    #[default]
    GeneralPublic,
    BusinessOwners,
    Individuals,
    Students,
}

impl TargetAudience {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetAudience::GeneralPublic => "general_public",
            TargetAudience::BusinessOwners => "business_owners",
            TargetAudience::Individuals => "individuals",
            TargetAudience::Students => "students",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            TargetAudience::GeneralPublic => "General Public",
            TargetAudience::BusinessOwners => "Business Owners",
            TargetAudience::Individuals => "Individuals",
            TargetAudience::Students => "Students",
        }
    }

    pub fn prompt_instructions(&self) -> &'static str {
        match self {
            TargetAudience::GeneralPublic => {
                "Use everyday language that anyone can understand. Avoid jargon and explain \
                 all legal terms."
            }
            TargetAudience::BusinessOwners => {
                "Focus on business implications, risks, and opportunities. Use \
                 business-friendly language."
            }
            TargetAudience::Individuals => {
                "Focus on personal rights, obligations, and practical implications for \
                 individuals."
            }
            TargetAudience::Students => {
                "Provide educational context and explain legal concepts with examples."
            }
        }
    }
}

/// Options accepted by the processing endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessOptions {
    #[serde(default)]
    pub simplification_level: SimplificationLevel,
    #[serde(default)]
    pub target_audience: TargetAudience,
    #[serde(default)]
    pub include_original: bool,
}

/// Response payload for a successful upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentUploadResponse {
    pub document_id: Uuid,
    pub filename: String,
    pub file_type: DocumentType,
    pub file_size: i64,
    pub upload_timestamp: DateTime<Utc>,
    pub status: ProcessingStatus,
    pub message: String,
}

/// The structured simplification produced by one successful processing run.
/// Immutable once created; stored verbatim as `simplified.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimplifiedDocument {
    pub document_id: Uuid,
    pub original_filename: String,

    pub summary: String,
    pub key_points: Vec<String>,
    pub important_terms: BTreeMap<String, String>,
    pub deadlines_obligations: Vec<String>,
    pub warnings: Vec<String>,
    pub next_steps: Vec<String>,

    pub processing_timestamp: DateTime<Utc>,
    pub simplification_level: SimplificationLevel,
    pub confidence_score: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_text: Option<String>,

    pub word_count_original: usize,
    pub word_count_simplified: usize,
    pub reading_level: String,
}

/// Request payload for batch processing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchProcessRequest {
    pub document_ids: Vec<Uuid>,
    #[serde(default)]
    pub simplification_level: SimplificationLevel,
    #[serde(default)]
    pub target_audience: TargetAudience,
    #[serde(default)]
    pub include_original: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchProcessResponse {
    pub batch_id: Uuid,
    pub total_documents: usize,
    pub processed_documents: usize,
    pub failed_documents: usize,
    pub results: Vec<SimplifiedDocument>,
    pub errors: Vec<ErrorEnvelope>,
    pub processing_time: f64,
}

/// Request payload for asking a question about a processed document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QaRequest {
    pub question: String,
    #[serde(default)]
    pub target_audience: TargetAudience,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QaResponse {
    pub document_id: Uuid,
    pub question: String,
    pub answer: String,
    pub confidence_score: f64,
}

/// The uniform error body returned for every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            ProcessingStatus::Uploaded,
            ProcessingStatus::Processing,
            ProcessingStatus::Completed,
            ProcessingStatus::Failed,
        ] {
            assert_eq!(ProcessingStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ProcessingStatus::parse("queued"), None);
    }

    #[test]
    fn test_process_options_defaults() {
        let options: ProcessOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options.simplification_level, SimplificationLevel::Standard);
        assert_eq!(options.target_audience, TargetAudience::GeneralPublic);
        assert!(!options.include_original);
    }

    #[test]
    fn test_audience_wire_format() {
        let json = serde_json::to_string(&TargetAudience::BusinessOwners).unwrap();
        assert_eq!(json, "\"business_owners\"");
    }
}
