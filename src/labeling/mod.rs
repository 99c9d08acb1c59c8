mod cleaner;
mod driver;
mod prompt;
mod response;

pub use cleaner::{clean_records, process_file, CleaningReport};
pub use driver::{FailurePolicy, QueryDriver, QueryOutcome, QueryWindow};
pub use prompt::{PromptBuilder, PromptTemplate};
pub use response::{extract_label_and_explanation, parse_record, Extraction};
