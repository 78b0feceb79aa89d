use crate::domain::DocumentType;

pub const MAX_FILE_SIZE: usize = 10 * 1024 * 1024; // 10 MiB

pub const ALLOWED_MIME_TYPES: &[&str] = &[
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "image/jpeg",
    "image/png",
    "image/tiff",
    "text/plain",
];

/// Why an upload was refused. Pure data so the client can surface the
/// message without a network round trip.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationFailure {
    #[error("file size of {size} bytes exceeds the maximum allowed size of 10 MB")]
    TooLarge { size: usize },
    #[error("file is empty")]
    Empty,
    #[error(
        "file type {mime} is not supported; allowed types are PDF, DOC, DOCX, JPEG, PNG, TIFF and plain text"
    )]
    UnsupportedType { mime: String },
    #[error("no filename provided")]
    MissingFilename,
}

impl ValidationFailure {
    pub fn is_size_failure(&self) -> bool {
        matches!(self, ValidationFailure::TooLarge { .. })
    }
}

/// Checks a candidate upload against the size ceiling and the MIME
/// allow-list. Performs no I/O; both the client and the upload handler run
/// this same check.
pub fn validate_upload(filename: &str, mime: &str, size: usize) -> Result<(), ValidationFailure> {
    if filename.trim().is_empty() {
        return Err(ValidationFailure::MissingFilename);
    }
    if size == 0 {
        return Err(ValidationFailure::Empty);
    }
    if size > MAX_FILE_SIZE {
        return Err(ValidationFailure::TooLarge { size });
    }
    if !ALLOWED_MIME_TYPES.contains(&mime) {
        return Err(ValidationFailure::UnsupportedType {
            mime: mime.to_string(),
        });
    }
    Ok(())
}

/// Resolves the effective MIME type: the declared one when present,
/// otherwise a guess from the filename extension.
pub fn resolve_mime(filename: &str, declared: Option<&str>) -> String {
    match declared {
        Some(mime) if !mime.is_empty() && mime != "application/octet-stream" => mime.to_string(),
        _ => mime_guess::from_path(filename)
            .first_raw()
            .unwrap_or("application/octet-stream")
            .to_string(),
    }
}

/// Maps an upload to its document category. The extension wins when it is
/// recognized; the MIME type is the fallback.
pub fn document_type_for(filename: &str, mime: &str) -> DocumentType {
    let extension = filename
        .rsplit('.')
        .next()
        .unwrap_or("")
        .to_ascii_lowercase();
    match extension.as_str() {
        "pdf" => DocumentType::Pdf,
        "doc" => DocumentType::Doc,
        "docx" => DocumentType::Docx,
        "jpg" | "jpeg" | "png" | "tiff" | "tif" => DocumentType::Image,
        "txt" => DocumentType::Text,
        _ => {
            if mime.contains("pdf") {
                DocumentType::Pdf
            } else if mime.contains("image") {
                DocumentType::Image
            } else if mime.contains("word") {
                DocumentType::Docx
            } else {
                DocumentType::Text
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_file_size() {
        assert!(validate_upload("test.pdf", "application/pdf", 100).is_ok());
        assert!(validate_upload("test.pdf", "application/pdf", MAX_FILE_SIZE).is_ok());

        let err = validate_upload("test.pdf", "application/pdf", MAX_FILE_SIZE + 1).unwrap_err();
        assert!(err.is_size_failure());
        assert!(err.to_string().contains("10 MB"));
    }

    #[test]
    fn test_validate_empty_file() {
        assert_eq!(
            validate_upload("test.pdf", "application/pdf", 0),
            Err(ValidationFailure::Empty)
        );
    }

    #[test]
    fn test_validate_mime_allow_list() {
        for mime in ALLOWED_MIME_TYPES {
            assert!(validate_upload("file", mime, 100).is_ok(), "{mime} rejected");
        }

        let err = validate_upload("run.exe", "application/x-msdownload", 100).unwrap_err();
        assert!(err.to_string().contains("application/x-msdownload"));
        assert!(err.to_string().contains("not supported"));
    }

    #[test]
    fn test_resolve_mime_falls_back_to_extension() {
        assert_eq!(resolve_mime("a.pdf", None), "application/pdf");
        assert_eq!(resolve_mime("a.pdf", Some("application/pdf")), "application/pdf");
        assert_eq!(
            resolve_mime("a.png", Some("application/octet-stream")),
            "image/png"
        );
    }

    #[test]
    fn test_document_type_mapping() {
        assert_eq!(
            document_type_for("contract.pdf", "application/pdf"),
            DocumentType::Pdf
        );
        assert_eq!(
            document_type_for("scan.jpeg", "image/jpeg"),
            DocumentType::Image
        );
        assert_eq!(
            document_type_for("notes.docx", "application/octet-stream"),
            DocumentType::Docx
        );
        assert_eq!(
            document_type_for("readme", "text/plain"),
            DocumentType::Text
        );
    }
}
