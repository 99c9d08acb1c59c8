use super::prompt::{PromptBuilder, PromptTemplate};
use crate::domain::{InputRecord, RawResponseRecord};
use crate::provider::ChatModel;
use crate::tables::RawResponseWriter;
use anyhow::{anyhow, Result};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Half-open row range `[start, end)` of the input table to process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryWindow {
    pub start: usize,
    pub end: Option<usize>,
}

impl QueryWindow {
    pub fn new(start: usize, end: Option<usize>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, index: usize) -> bool {
        index >= self.start && !self.is_past_end(index)
    }

    pub fn is_past_end(&self, index: usize) -> bool {
        self.end.is_some_and(|end| index >= end)
    }
}

/// What to do when a single model call fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Record a failure marker for the row and keep going.
    #[default]
    Continue,
    /// Record the marker, then stop the run with an error.
    Abort,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOutcome {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed_rows: Vec<usize>,
    pub skipped: usize,
    /// First row index not processed because the window ended there.
    pub halted_at: Option<usize>,
}

pub struct QueryDriver<C: ChatModel> {
    model: Arc<C>,
    prompt_builder: PromptBuilder,
    window: QueryWindow,
    policy: FailurePolicy,
}

impl<C: ChatModel> QueryDriver<C> {
    pub fn new(model: Arc<C>, template: PromptTemplate) -> Self {
        Self {
            model,
            prompt_builder: PromptBuilder::new(template),
            window: QueryWindow::default(),
            policy: FailurePolicy::default(),
        }
    }

    pub fn with_window(mut self, window: QueryWindow) -> Self {
        self.window = window;
        self
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn run(
        &self,
        records: &[InputRecord],
        writer: &mut RawResponseWriter,
    ) -> Result<QueryOutcome> {
        let mut outcome = QueryOutcome::default();
        info!(
            model = self.model.model_id(),
            rows = records.len(),
            start = self.window.start,
            end = ?self.window.end,
            output = %writer.path().display(),
            "query run started"
        );

        for (index, record) in records.iter().enumerate() {
            if self.window.is_past_end(index) {
                outcome.halted_at = Some(index);
                break;
            }
            if !self.window.contains(index) {
                outcome.skipped += 1;
                continue;
            }

            debug!(index, "querying model");
            outcome.attempted += 1;
            let prompt = self.prompt_builder.build(record);
            match self.model.invoke(&prompt) {
                Ok(response) => {
                    writer.append(&RawResponseRecord::new(record, response))?;
                    outcome.succeeded += 1;
                }
                Err(err) => {
                    error!(index, kind = err.kind(), %err, "model call failed");
                    writer.append(&RawResponseRecord::failed(record, err.kind(), &err.to_string()))?;
                    outcome.failed_rows.push(index);
                    if self.policy == FailurePolicy::Abort {
                        return Err(anyhow!("model call failed at row {}: {}", index, err));
                    }
                }
            }
        }

        info!(
            attempted = outcome.attempted,
            succeeded = outcome.succeeded,
            failed = outcome.failed_rows.len(),
            skipped = outcome.skipped,
            "query run finished"
        );
        if !outcome.failed_rows.is_empty() {
            info!(rows = ?outcome.failed_rows, "failed rows can be re-queried with a narrower window");
        }
        Ok(outcome)
    }
}
