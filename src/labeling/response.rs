use crate::domain::{ParsedRecord, RawResponseRecord, NO_EXPLANATION};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

static LABEL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)label:\s*<?([0-9]+)>?").unwrap());
static EXPLANATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)explanation:\s*(.*)").unwrap());

/// Fields pulled out of a free-text model answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub label: Option<i64>,
    pub explanation: String,
}

/// Never fails: a missing label comes back as `None`, a missing explanation
/// as [`NO_EXPLANATION`].
pub fn extract_label_and_explanation(text: &str) -> Extraction {
    let label = LABEL_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|digits| digits.as_str().parse::<i64>().ok());
    if label.is_none() {
        warn!(response = %text, "label not found in response");
    }

    let explanation = EXPLANATION_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|body| strip_brackets(body.as_str()))
        .unwrap_or_else(|| NO_EXPLANATION.to_string());

    Extraction { label, explanation }
}

fn strip_brackets(body: &str) -> String {
    let body = body.trim();
    let body = body.strip_prefix('<').unwrap_or(body);
    let body = body.strip_suffix('>').unwrap_or(body);
    body.trim().to_string()
}

/// Rows holding a failed-call marker never carry a label, whatever the
/// error text says.
pub fn parse_record(record: RawResponseRecord) -> ParsedRecord {
    if record.is_failure() {
        warn!(response = %record.response, "row holds a failed model call");
        return ParsedRecord {
            previous_sentence: record.previous_sentence,
            current_sentence: record.current_sentence,
            label: None,
            explanation: NO_EXPLANATION.to_string(),
        };
    }
    let Extraction { label, explanation } = extract_label_and_explanation(&record.response);
    ParsedRecord {
        previous_sentence: record.previous_sentence,
        current_sentence: record.current_sentence,
        label,
        explanation,
    }
}
