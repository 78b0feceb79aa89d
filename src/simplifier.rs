use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::Deserialize;

use crate::domain::{SimplificationLevel, TargetAudience};
use crate::gemini::GeminiClient;

// Rough character budget for the document portion of a prompt, sized to the
// model's input limits (~4 chars per token).
const MAX_PROMPT_CHARS: usize = 16_000;

const SIMPLIFICATION_PREAMBLE: &str = "You are a legal expert and communication specialist. \
Your task is to simplify complex legal documents into clear, easy-to-understand language \
for the general public.\n\n\
Please analyze the following legal document and provide:\n\
1. A simple, plain-language summary of the main points\n\
2. Key terms explained in everyday language\n\
3. Important deadlines, obligations, or rights\n\
4. Any warnings or critical information\n\
5. Suggested next steps for the reader\n\n\
Maintain legal accuracy while making the content accessible to non-lawyers.";

static PAGE_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Page \d+ of \d+").expect("valid regex"));
static BRACKET_REF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[^\]]*\]").expect("valid regex"));

#[derive(Debug, thiserror::Error)]
pub enum SimplifyError {
    #[error("language model request failed: {0}")]
    Upstream(String),
    #[error("language model response did not match the expected structure: {0}")]
    Malformed(String),
}

/// The six structured sections requested from the model.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SimplifiedContent {
    pub summary: String,
    pub key_points: Vec<String>,
    pub important_terms: BTreeMap<String, String>,
    pub deadlines_obligations: Vec<String>,
    pub warnings: Vec<String>,
    pub next_steps: Vec<String>,
}

/// A simplification run plus the heuristics derived from it.
#[derive(Debug, Clone)]
pub struct SimplificationOutcome {
    pub content: SimplifiedContent,
    pub confidence_score: f64,
    pub reading_level: &'static str,
}

pub struct Simplifier {
    gemini: Arc<GeminiClient>,
}

impl Simplifier {
    pub fn new(gemini: Arc<GeminiClient>) -> Self {
        Self { gemini }
    }

    /// Simplifies extracted document text into the structured sections.
    pub async fn simplify(
        &self,
        text: &str,
        level: SimplificationLevel,
        audience: TargetAudience,
    ) -> Result<SimplificationOutcome, SimplifyError> {
        let cleaned = preprocess(text);
        let prompt = build_prompt(&cleaned, level, audience);

        let raw = self
            .gemini
            .generate_text(&prompt, true)
            .await
            .map_err(|e| SimplifyError::Upstream(e.to_string()))?;

        let content = parse_response(&raw)?;
        let confidence_score = confidence_score(&content);
        let reading_level = estimate_reading_level(&content.summary);

        Ok(SimplificationOutcome {
            content,
            confidence_score,
            reading_level,
        })
    }

    /// Answers a free-form question about the document in plain language.
    pub async fn answer_question(
        &self,
        text: &str,
        question: &str,
        audience: TargetAudience,
    ) -> Result<(String, f64), SimplifyError> {
        let cleaned = preprocess(text);
        let prompt = format!(
            "You are a helpful legal assistant. Answer the question based on the document \
             content.\n\n\
             TARGET AUDIENCE: {}\n\
             Use plain, simple language. Keep the answer concise but accurate. If the answer \
             is not explicitly in the document, say so.\n\n\
             DOCUMENT:\n{cleaned}\n\n\
             QUESTION:\n{question}\n\n\
             Provide the final answer only.",
            audience.display_name(),
        );

        let answer = self
            .gemini
            .generate_text(&prompt, false)
            .await
            .map_err(|e| SimplifyError::Upstream(e.to_string()))?;
        let answer = answer.trim().to_string();
        let confidence = if answer.is_empty() { 0.3 } else { 0.7 };
        Ok((answer, confidence))
    }
}

/// Strips page markers, bracketed references and excess whitespace, then
/// caps the length so the prompt stays inside the model's input budget.
pub fn preprocess(text: &str) -> String {
    let text = PAGE_MARKER_RE.replace_all(text, "");
    let text = BRACKET_REF_RE.replace_all(&text, "");
    let mut collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.len() > MAX_PROMPT_CHARS {
        let mut cut = MAX_PROMPT_CHARS;
        while !collapsed.is_char_boundary(cut) {
            cut -= 1;
        }
        collapsed.truncate(cut);
        collapsed.push_str("...");
        tracing::warn!("document text truncated to {MAX_PROMPT_CHARS} characters");
    }

    collapsed
}

pub fn build_prompt(text: &str, level: SimplificationLevel, audience: TargetAudience) -> String {
    format!(
        "{SIMPLIFICATION_PREAMBLE}\n\n\
         SIMPLIFICATION LEVEL: {}\n{}\n\n\
         TARGET AUDIENCE: {}\n{}\n\n\
         Respond with a JSON object with exactly these fields:\n\
         {{\n\
           \"summary\": \"A clear, concise summary of the document's main purpose and key points\",\n\
           \"key_points\": [\"List of the most important points in bullet format\"],\n\
           \"important_terms\": {{\"term\": \"definition\"}},\n\
           \"deadlines_obligations\": [\"List of any deadlines, obligations, or time-sensitive items\"],\n\
           \"warnings\": [\"List of warnings, risks, or critical information\"],\n\
           \"next_steps\": [\"List of recommended next steps for the reader\"]\n\
         }}\n\n\
         DOCUMENT TO SIMPLIFY:\n{text}",
        level.as_str().to_uppercase(),
        level.prompt_instructions(),
        audience.display_name(),
        audience.prompt_instructions(),
    )
}

/// Parses the model reply into `SimplifiedContent`. Required fields must be
/// present with the right shapes; everything is trimmed and empty entries
/// are dropped.
pub fn parse_response(raw: &str) -> Result<SimplifiedContent, SimplifyError> {
    let json = extract_json_object(raw)
        .ok_or_else(|| SimplifyError::Malformed("no JSON object in response".to_string()))?;

    let mut content: SimplifiedContent =
        serde_json::from_str(json).map_err(|e| SimplifyError::Malformed(e.to_string()))?;

    content.summary = content.summary.trim().to_string();
    if content.summary.is_empty() {
        return Err(SimplifyError::Malformed("summary is empty".to_string()));
    }

    for list in [
        &mut content.key_points,
        &mut content.deadlines_obligations,
        &mut content.warnings,
        &mut content.next_steps,
    ] {
        let cleaned: Vec<String> = list
            .iter()
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect();
        *list = cleaned;
    }

    let cleaned_terms: BTreeMap<String, String> = content
        .important_terms
        .iter()
        .filter(|(term, definition)| !term.trim().is_empty() && !definition.trim().is_empty())
        .map(|(term, definition)| (term.trim().to_string(), definition.trim().to_string()))
        .collect();
    content.important_terms = cleaned_terms;

    Ok(content)
}

/// Locates the JSON body in a reply that may be wrapped in prose or a
/// markdown code fence.
fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}

/// Heuristic certainty in the result, in [0, 1]. Rewards the presence of a
/// substantive summary and populated sections.
pub fn confidence_score(content: &SimplifiedContent) -> f64 {
    let mut score: f64 = 0.5;
    if content.summary.len() > 50 {
        score += 0.2;
    }
    if !content.key_points.is_empty() {
        score += 0.1;
    }
    if !content.important_terms.is_empty() {
        score += 0.1;
    }
    if !content.next_steps.is_empty() {
        score += 0.1;
    }
    score.min(1.0)
}

/// Coarse reading-level label from average sentence and word lengths.
pub fn estimate_reading_level(text: &str) -> &'static str {
    let sentences: Vec<&str> = text
        .split(['.', '!', '?'])
        .filter(|s| !s.trim().is_empty())
        .collect();
    let words: Vec<&str> = text.split_whitespace().collect();

    if sentences.is_empty() || words.is_empty() {
        return "unknown";
    }

    let avg_sentence_length = words.len() as f64 / sentences.len() as f64;
    let avg_word_length =
        words.iter().map(|w| w.len()).sum::<usize>() as f64 / words.len() as f64;

    if avg_sentence_length < 10.0 && avg_word_length < 5.0 {
        "elementary"
    } else if avg_sentence_length < 15.0 && avg_word_length < 6.0 {
        "intermediate"
    } else if avg_sentence_length < 20.0 && avg_word_length < 7.0 {
        "high_school"
    } else {
        "college"
    }
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> &'static str {
        r#"{
            "summary": "This lease obligates the tenant to pay rent monthly.",
            "key_points": ["Rent is due on the 1st", "  ", "Deposit is refundable"],
            "important_terms": {"Lessor": "The landlord", "": "dropped"},
            "deadlines_obligations": ["Pay rent by the 1st of each month"],
            "warnings": ["Late fees apply after the 5th"],
            "next_steps": ["Sign and return within 10 days"]
        }"#
    }

    #[test]
    fn test_parse_response_normalizes() {
        let content = parse_response(sample_json()).unwrap();
        assert_eq!(content.key_points.len(), 2);
        assert_eq!(content.important_terms.len(), 1);
        assert_eq!(content.important_terms["Lessor"], "The landlord");
    }

    #[test]
    fn test_parse_response_accepts_fenced_json() {
        let fenced = format!("```json\n{}\n```", sample_json());
        assert!(parse_response(&fenced).is_ok());
    }

    #[test]
    fn test_parse_response_rejects_prose() {
        assert!(matches!(
            parse_response("I could not simplify this document."),
            Err(SimplifyError::Malformed(_))
        ));
    }

    #[test]
    fn test_parse_response_rejects_wrong_shapes() {
        let bad = r#"{"summary": "ok", "key_points": "not a list",
                      "important_terms": {}, "deadlines_obligations": [],
                      "warnings": [], "next_steps": []}"#;
        assert!(matches!(
            parse_response(bad),
            Err(SimplifyError::Malformed(_))
        ));
    }

    #[test]
    fn test_parse_response_rejects_missing_fields() {
        let bad = r#"{"summary": "only a summary"}"#;
        assert!(parse_response(bad).is_err());
    }

    #[test]
    fn test_confidence_score_bounds() {
        let content = parse_response(sample_json()).unwrap();
        let score = confidence_score(&content);
        assert!((0.0..=1.0).contains(&score));
        assert!(score > 0.5);

        let sparse = SimplifiedContent {
            summary: "Short.".to_string(),
            key_points: vec![],
            important_terms: BTreeMap::new(),
            deadlines_obligations: vec![],
            warnings: vec![],
            next_steps: vec![],
        };
        assert_eq!(confidence_score(&sparse), 0.5);
    }

    #[test]
    fn test_reading_level_labels() {
        assert_eq!(estimate_reading_level(""), "unknown");
        assert_eq!(estimate_reading_level("The cat sat. The dog ran."), "elementary");
        let academic = "Notwithstanding contradictory jurisprudential interpretations, \
                        contractual counterparties nevertheless maintain extensive \
                        indemnification obligations throughout consecutive renewal periods.";
        assert_eq!(estimate_reading_level(academic), "college");
    }

    #[test]
    fn test_preprocess_strips_artifacts() {
        let text = "Section 1 [ref 12]   applies.\n\nPage 3 of 10\nSection 2 applies.";
        let cleaned = preprocess(text);
        assert_eq!(cleaned, "Section 1 applies. Section 2 applies.");
    }

    #[test]
    fn test_preprocess_truncates_long_documents() {
        let text = "word ".repeat(10_000);
        let cleaned = preprocess(&text);
        assert!(cleaned.len() <= MAX_PROMPT_CHARS + 3);
        assert!(cleaned.ends_with("..."));
    }

    #[test]
    fn test_prompt_carries_level_and_audience() {
        let prompt = build_prompt(
            "the document body",
            SimplificationLevel::Detailed,
            TargetAudience::Students,
        );
        assert!(prompt.contains("SIMPLIFICATION LEVEL: DETAILED"));
        assert!(prompt.contains("TARGET AUDIENCE: Students"));
        assert!(prompt.contains("educational context"));
        assert!(prompt.ends_with("the document body"));
    }
}
