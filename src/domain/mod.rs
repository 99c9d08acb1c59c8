mod records;

pub use records::{
    CleanedRecord, InputRecord, ParsedRecord, RawResponseRecord, FAILED_RESPONSE_PREFIX,
    NO_EXPLANATION, SENTINEL_LABEL,
};
