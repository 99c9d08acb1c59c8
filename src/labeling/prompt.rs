use crate::domain::InputRecord;
use crate::provider::Prompt;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

const PREVIOUS_SLOT: &str = "{previous_sentence}";
const CURRENT_SLOT: &str = "{current_sentence}";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptTemplate {
    pub system: String,
    pub user: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        let system = concat!(
            "You annotate pairs of consecutive sentences taken from scientific papers.\n",
            "You always answer in exactly two lines and nothing else."
        )
        .to_string();

        let user = concat!(
            "Decide how the current sentence relates to the citation context given by ",
            "the previous sentence.\n",
            "Labels:\n",
            "- 0: the current sentence does not continue the cited work\n",
            "- 1: the current sentence continues describing the cited work\n",
            "- 2: the current sentence compares or contrasts with the cited work\n",
            "- 3: the pair cannot be judged (broken text, missing context)\n\n",
            "Previous sentence: {previous_sentence}\n",
            "Current sentence: {current_sentence}\n\n",
            "Answer in this format:\n",
            "label: <number>\n",
            "explanation: <one or two sentences>"
        )
        .to_string();

        Self { system, user }
    }
}

impl PromptTemplate {
    /// Loads a `{"system": ..., "user": ...}` JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("cannot read prompt template {:?}", path))?;
        let template: PromptTemplate = serde_json::from_str(&data)
            .with_context(|| format!("invalid prompt template {:?}", path))?;
        Ok(template)
    }
}

#[derive(Debug, Clone)]
pub struct PromptBuilder {
    template: PromptTemplate,
}

impl PromptBuilder {
    pub fn new(template: PromptTemplate) -> Self {
        Self { template }
    }

    /// Templates without slots get the pair appended at the end.
    pub fn build(&self, record: &InputRecord) -> Prompt {
        let template = &self.template.user;
        let user = if template.contains(PREVIOUS_SLOT) || template.contains(CURRENT_SLOT) {
            fill_slots(template, record)
        } else {
            format!(
                "{}\n\nPrevious sentence: {}\nCurrent sentence: {}",
                template, record.previous_sentence, record.current_sentence
            )
        };

        Prompt {
            system: self.template.system.clone(),
            user,
        }
    }
}

/// Substitutes both slots in one left-to-right pass, so slot-like text inside
/// a sentence is left as is.
fn fill_slots(template: &str, record: &InputRecord) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    loop {
        let previous = rest.find(PREVIOUS_SLOT).map(|at| (at, PREVIOUS_SLOT));
        let current = rest.find(CURRENT_SLOT).map(|at| (at, CURRENT_SLOT));
        let next = match (previous, current) {
            (Some(p), Some(c)) => Some(if p.0 <= c.0 { p } else { c }),
            (p, c) => p.or(c),
        };
        let Some((at, slot)) = next else {
            out.push_str(rest);
            return out;
        };
        out.push_str(&rest[..at]);
        if slot == PREVIOUS_SLOT {
            out.push_str(&record.previous_sentence);
        } else {
            out.push_str(&record.current_sentence);
        }
        rest = &rest[at + slot.len()..];
    }
}
