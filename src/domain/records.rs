use serde::{Deserialize, Serialize};

/// Label value reserved for pairs that must not reach the training set.
pub const SENTINEL_LABEL: i64 = 3;

pub const NO_EXPLANATION: &str = "No explanation provided";

/// Prefix of the response cell written when a model call failed.
pub const FAILED_RESPONSE_PREFIX: &str = "ERROR:";

/// One row of the source spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputRecord {
    pub previous_sentence: String,
    pub current_sentence: String,
}

impl InputRecord {
    pub fn new(previous: impl Into<String>, current: impl Into<String>) -> Self {
        Self {
            previous_sentence: previous.into(),
            current_sentence: current.into(),
        }
    }
}

/// Row of the intermediate table: the input pair plus the raw model output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawResponseRecord {
    pub previous_sentence: String,
    pub current_sentence: String,
    #[serde(default)]
    pub response: String,
}

impl RawResponseRecord {
    pub fn new(input: &InputRecord, response: impl Into<String>) -> Self {
        Self {
            previous_sentence: input.previous_sentence.clone(),
            current_sentence: input.current_sentence.clone(),
            response: response.into(),
        }
    }

    pub fn failed(input: &InputRecord, kind: &str, message: &str) -> Self {
        Self::new(
            input,
            format!("{} {}: {}", FAILED_RESPONSE_PREFIX, kind, message),
        )
    }

    pub fn is_failure(&self) -> bool {
        self.response.starts_with(FAILED_RESPONSE_PREFIX)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRecord {
    pub previous_sentence: String,
    pub current_sentence: String,
    pub label: Option<i64>,
    pub explanation: String,
}

/// A parsed row that survived cleaning: labelled, and not the sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanedRecord {
    pub previous_sentence: String,
    pub current_sentence: String,
    pub label: i64,
    pub explanation: String,
}

impl CleanedRecord {
    pub fn has_placeholder_explanation(&self) -> bool {
        self.explanation == NO_EXPLANATION
    }
}

impl From<CleanedRecord> for ParsedRecord {
    fn from(record: CleanedRecord) -> Self {
        Self {
            previous_sentence: record.previous_sentence,
            current_sentence: record.current_sentence,
            label: Some(record.label),
            explanation: record.explanation,
        }
    }
}
