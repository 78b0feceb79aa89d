use std::collections::BTreeMap;
use std::path::Path;

use uuid::Uuid;

use crate::db::models::AnalyticsEvent;
use crate::domain::SimplifiedDocument;

/// The result tabs. Purely presentational; the underlying document never
/// changes when the selection does.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Tab {
    #[default]
    Summary,
    KeyPoints,
    Terms,
    Warnings,
    NextSteps,
}

impl Tab {
    pub fn all() -> [Tab; 5] {
        [
            Tab::Summary,
            Tab::KeyPoints,
            Tab::Terms,
            Tab::Warnings,
            Tab::NextSteps,
        ]
    }

    pub fn label(&self) -> &'static str {
        match self {
            Tab::Summary => "Summary",
            Tab::KeyPoints => "Key Points",
            Tab::Terms => "Terms",
            Tab::Warnings => "Warnings",
            Tab::NextSteps => "Next Steps",
        }
    }
}

const SUMMARY_HEADER: &str = "## Summary";
const KEY_POINTS_HEADER: &str = "## Key Points";
const TERMS_HEADER: &str = "## Important Terms";
const DEADLINES_HEADER: &str = "## Deadlines & Obligations";
const WARNINGS_HEADER: &str = "## Warnings";
const NEXT_STEPS_HEADER: &str = "## Next Steps";

/// Serializes a simplified document into the fixed download template. Pure;
/// the caller decides where the bytes go.
pub fn render_markdown(doc: &SimplifiedDocument) -> String {
    let mut out = String::new();

    out.push_str(&format!("# Simplified Document: {}\n\n", doc.original_filename));

    out.push_str(SUMMARY_HEADER);
    out.push_str("\n\n");
    out.push_str(doc.summary.trim_end());
    out.push_str("\n\n");

    push_list(&mut out, KEY_POINTS_HEADER, &doc.key_points);

    out.push_str(TERMS_HEADER);
    out.push_str("\n\n");
    for (term, definition) in &doc.important_terms {
        out.push_str(&format!("- **{term}**: {definition}\n"));
    }
    out.push('\n');

    push_list(&mut out, DEADLINES_HEADER, &doc.deadlines_obligations);
    push_list(&mut out, WARNINGS_HEADER, &doc.warnings);
    push_list(&mut out, NEXT_STEPS_HEADER, &doc.next_steps);

    out.push_str("---\n");
    out.push_str(&format!(
        "Generated: {} | Confidence: {:.2} | Reading level: {}\n",
        doc.processing_timestamp.to_rfc3339(),
        doc.confidence_score,
        doc.reading_level
    ));

    out
}

fn push_list(out: &mut String, header: &str, items: &[String]) {
    out.push_str(header);
    out.push_str("\n\n");
    for item in items {
        out.push_str(&format!("- {item}\n"));
    }
    out.push('\n');
}

/// The document sections recovered from a rendered markdown file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedSections {
    pub summary: String,
    pub key_points: Vec<String>,
    pub important_terms: BTreeMap<String, String>,
    pub deadlines_obligations: Vec<String>,
    pub warnings: Vec<String>,
    pub next_steps: Vec<String>,
}

/// Parses a markdown file produced by `render_markdown` back into its
/// sections. Returns `None` when the summary header is missing, which means
/// the input was not one of our downloads.
pub fn parse_markdown(markdown: &str) -> Option<ParsedSections> {
    if !markdown.contains(SUMMARY_HEADER) {
        return None;
    }

    let mut sections = ParsedSections::default();
    let mut current: Option<&str> = None;
    let mut summary_lines: Vec<&str> = Vec::new();

    for line in markdown.lines() {
        if line == "---" {
            break;
        }
        if line.starts_with("# ") {
            continue;
        }
        if line.starts_with("## ") {
            current = Some(line);
            continue;
        }

        match current {
            Some(SUMMARY_HEADER) => {
                if !(line.is_empty() && summary_lines.is_empty()) {
                    summary_lines.push(line);
                }
            }
            Some(TERMS_HEADER) => {
                if let Some(rest) = line.strip_prefix("- **") {
                    if let Some((term, definition)) = rest.split_once("**: ") {
                        sections
                            .important_terms
                            .insert(term.to_string(), definition.to_string());
                    }
                }
            }
            Some(header) => {
                if let Some(item) = line.strip_prefix("- ") {
                    let list = match header {
                        KEY_POINTS_HEADER => &mut sections.key_points,
                        DEADLINES_HEADER => &mut sections.deadlines_obligations,
                        WARNINGS_HEADER => &mut sections.warnings,
                        NEXT_STEPS_HEADER => &mut sections.next_steps,
                        _ => continue,
                    };
                    list.push(item.to_string());
                }
            }
            None => {}
        }
    }

    while summary_lines.last().is_some_and(|l| l.is_empty()) {
        summary_lines.pop();
    }
    sections.summary = summary_lines.join("\n");

    Some(sections)
}

/// Suggested filename for the download action.
pub fn download_filename(doc: &SimplifiedDocument) -> String {
    let stem = Path::new(&doc.original_filename)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "document".to_string());
    format!("simplified-{stem}.md")
}

/// Link used by the share action's clipboard fallback.
pub fn share_link(base_url: &str, document_id: Uuid) -> String {
    format!(
        "{}/documents/{document_id}",
        base_url.trim_end_matches('/')
    )
}

/// The feedback action only emits an analytics event; the sink's
/// at-least-once delivery makes duplicates harmless.
pub fn feedback_event(
    document_id: Uuid,
    feedback: &str,
    rating: Option<u8>,
) -> AnalyticsEvent {
    let mut event = AnalyticsEvent::new(document_id.to_string(), "user_feedback");
    event.metadata = serde_json::json!({ "rating": rating });
    event.user_feedback = Some(feedback.to_string());
    event
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SimplificationLevel;
    use chrono::Utc;

    fn sample_document() -> SimplifiedDocument {
        let mut important_terms = BTreeMap::new();
        important_terms.insert("Lessor".to_string(), "The landlord".to_string());
        important_terms.insert(
            "Security Deposit".to_string(),
            "Money held against damage".to_string(),
        );

        SimplifiedDocument {
            document_id: Uuid::new_v4(),
            original_filename: "lease-agreement.pdf".to_string(),
            summary: "This lease binds the tenant to a one-year term.\nRent is due monthly."
                .to_string(),
            key_points: vec![
                "Rent is 1200 per month".to_string(),
                "The deposit is refundable".to_string(),
            ],
            important_terms,
            deadlines_obligations: vec!["Pay rent by the 1st".to_string()],
            warnings: vec!["Late fees apply after the 5th".to_string()],
            next_steps: vec![
                "Sign within 10 days".to_string(),
                "Keep a copy for your records".to_string(),
            ],
            processing_timestamp: Utc::now(),
            simplification_level: SimplificationLevel::Standard,
            confidence_score: 0.85,
            original_text: None,
            word_count_original: 4200,
            word_count_simplified: 160,
            reading_level: "intermediate".to_string(),
        }
    }

    #[test]
    fn test_markdown_round_trip() {
        let doc = sample_document();
        let markdown = render_markdown(&doc);
        let parsed = parse_markdown(&markdown).unwrap();

        assert_eq!(parsed.summary, doc.summary);
        assert_eq!(parsed.key_points, doc.key_points);
        assert_eq!(parsed.important_terms, doc.important_terms);
        assert_eq!(parsed.deadlines_obligations, doc.deadlines_obligations);
        assert_eq!(parsed.warnings, doc.warnings);
        assert_eq!(parsed.next_steps, doc.next_steps);
    }

    #[test]
    fn test_round_trip_preserves_list_order() {
        let doc = sample_document();
        let parsed = parse_markdown(&render_markdown(&doc)).unwrap();
        assert_eq!(parsed.next_steps[0], "Sign within 10 days");
        assert_eq!(parsed.next_steps[1], "Keep a copy for your records");
    }

    #[test]
    fn test_round_trip_with_empty_sections() {
        let mut doc = sample_document();
        doc.warnings.clear();
        doc.deadlines_obligations.clear();
        doc.important_terms.clear();

        let parsed = parse_markdown(&render_markdown(&doc)).unwrap();
        assert!(parsed.warnings.is_empty());
        assert!(parsed.deadlines_obligations.is_empty());
        assert!(parsed.important_terms.is_empty());
        assert_eq!(parsed.key_points, doc.key_points);
    }

    #[test]
    fn test_footer_carries_confidence_and_reading_level() {
        let markdown = render_markdown(&sample_document());
        let footer = markdown.lines().last().unwrap();
        assert!(footer.contains("Confidence: 0.85"));
        assert!(footer.contains("Reading level: intermediate"));
    }

    #[test]
    fn test_parse_rejects_foreign_markdown() {
        assert!(parse_markdown("# Some other file\n\nHello.").is_none());
    }

    #[test]
    fn test_default_tab_is_summary() {
        assert_eq!(Tab::default(), Tab::Summary);
        assert_eq!(Tab::all().len(), 5);
    }

    #[test]
    fn test_download_filename() {
        assert_eq!(
            download_filename(&sample_document()),
            "simplified-lease-agreement.md"
        );
    }

    #[test]
    fn test_share_link() {
        let id = Uuid::new_v4();
        assert_eq!(
            share_link("https://app.example.com/", id),
            format!("https://app.example.com/documents/{id}")
        );
    }

    #[test]
    fn test_feedback_event_shape() {
        let id = Uuid::new_v4();
        let event = feedback_event(id, "very clear", Some(5));
        assert_eq!(event.action, "user_feedback");
        assert_eq!(event.document_id, id.to_string());
        assert_eq!(event.user_feedback.as_deref(), Some("very clear"));
        assert_eq!(event.metadata["rating"], 5);
    }
}
