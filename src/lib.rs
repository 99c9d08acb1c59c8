pub mod domain;
pub mod labeling;
pub mod provider;
pub mod tables;

pub use domain::{CleanedRecord, InputRecord, ParsedRecord, RawResponseRecord};
pub use labeling::{extract_label_and_explanation, process_file, QueryDriver, QueryWindow};
pub use provider::{load_model, BedrockClient, ChatModel, ProviderConfig};
