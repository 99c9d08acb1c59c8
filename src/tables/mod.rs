mod csv_io;
mod spreadsheet;

pub use csv_io::{read_raw_records, write_cleaned_records, RawResponseWriter};
pub use spreadsheet::read_input_records;
