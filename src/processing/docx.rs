use std::io::{Cursor, Read};

use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use quick_xml::Reader;
use quick_xml::events::Event;

use super::{Extraction, TextExtractor};

/// Extracts paragraph text from the `word/document.xml` entry of a DOCX
/// archive. Legacy binary `.doc` files are not zip archives and fail here,
/// which surfaces as an extraction error with guidance for the user.
pub struct DocxArchive;

#[async_trait]
impl TextExtractor for DocxArchive {
    fn method(&self) -> &'static str {
        "docx_archive"
    }

    async fn extract(&self, data: &Bytes) -> Result<Extraction> {
        let text = extract_docx_text(data)?;
        Ok(Extraction {
            text,
            method: self.method(),
            ocr_confidence: None,
        })
    }
}

fn extract_docx_text(data: &[u8]) -> Result<String> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(data)).context("file is not a valid DOCX archive")?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .context("archive has no word/document.xml entry")?
        .read_to_string(&mut xml)
        .context("failed to read document body")?;

    let mut reader = Reader::from_str(&xml);
    let mut text = String::new();
    let mut in_text_run = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                if e.local_name().as_ref() == b"t" {
                    in_text_run = true;
                }
            }
            Ok(Event::Text(e)) if in_text_run => {
                text.push_str(&e.unescape().unwrap_or_default());
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text_run = false,
                // Paragraph boundary
                b"p" => text.push('\n'),
                _ => {}
            },
            Ok(Event::Empty(e)) => {
                // Explicit tabs and line breaks inside a run
                match e.local_name().as_ref() {
                    b"tab" => text.push('\t'),
                    b"br" => text.push('\n'),
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => anyhow::bail!("malformed document XML: {e}"),
            _ => {}
        }
        buf.clear();
    }

    if text.trim().is_empty() {
        anyhow::bail!("document body contains no text");
    }

    Ok(text)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use zip::write::SimpleFileOptions;

    use super::*;

    fn build_docx(document_xml: &str) -> Bytes {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut cursor);
            writer
                .start_file("word/document.xml", SimpleFileOptions::default())
                .unwrap();
            writer.write_all(document_xml.as_bytes()).unwrap();
            writer.finish().unwrap();
        }
        Bytes::from(cursor.into_inner())
    }

    #[tokio::test]
    async fn test_extracts_paragraph_text() {
        let docx = build_docx(
            r#"<?xml version="1.0"?>
            <w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
              <w:body>
                <w:p><w:r><w:t>Section 1.</w:t></w:r><w:r><w:t> The tenant agrees.</w:t></w:r></w:p>
                <w:p><w:r><w:t>Section 2.</w:t></w:r></w:p>
              </w:body>
            </w:document>"#,
        );

        let extraction = DocxArchive.extract(&docx).await.unwrap();
        assert!(extraction.text.contains("Section 1. The tenant agrees."));
        assert!(extraction.text.contains("Section 2."));
        let first = extraction.text.find("Section 1").unwrap();
        let second = extraction.text.find("Section 2").unwrap();
        assert!(first < second);
    }

    #[tokio::test]
    async fn test_rejects_non_archive_input() {
        let data = Bytes::from_static(b"legacy binary doc content");
        let err = DocxArchive.extract(&data).await.unwrap_err();
        assert!(err.to_string().contains("not a valid DOCX archive"));
    }

    #[tokio::test]
    async fn test_rejects_empty_body() {
        let docx = build_docx(
            r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
              <w:body></w:body>
            </w:document>"#,
        );
        assert!(DocxArchive.extract(&docx).await.is_err());
    }
}
