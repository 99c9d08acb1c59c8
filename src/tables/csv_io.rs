use super::spreadsheet::{column_index, CURRENT_COLUMN, PREVIOUS_COLUMN};
use crate::domain::{CleanedRecord, RawResponseRecord};
use anyhow::{Context, Result};
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::debug;

const RESPONSE_COLUMN: &str = "response";

/// Appends raw response rows to the intermediate table, one flush per row,
/// so an interrupted run leaves every finished row on disk.
pub struct RawResponseWriter {
    path: PathBuf,
    writer: csv::Writer<File>,
    written: usize,
}

impl RawResponseWriter {
    /// Opens `path` for appending; the header is written only when the file
    /// is new or empty.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("cannot create directory {:?}", parent))?;
        }
        let needs_header = fs::metadata(&path).map(|m| m.len() == 0).unwrap_or(true);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("cannot open {:?} for appending", path))?;

        let writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        debug!(path = %path.display(), header = needs_header, "raw response table opened");

        Ok(Self {
            path,
            writer,
            written: 0,
        })
    }

    pub fn append(&mut self, record: &RawResponseRecord) -> Result<()> {
        self.writer
            .serialize(record)
            .with_context(|| format!("cannot write row to {:?}", self.path))?;
        self.writer
            .flush()
            .with_context(|| format!("cannot flush {:?}", self.path))?;
        self.written += 1;
        Ok(())
    }

    pub fn written(&self) -> usize {
        self.written
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

pub fn read_raw_records(path: impl AsRef<Path>) -> Result<Vec<RawResponseRecord>> {
    let path = path.as_ref();
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_path(path)
        .with_context(|| format!("cannot open {:?}", path))?;

    let header: Vec<String> = reader
        .headers()
        .with_context(|| format!("cannot read header of {:?}", path))?
        .iter()
        .map(str::to_string)
        .collect();
    for column in [PREVIOUS_COLUMN, CURRENT_COLUMN, RESPONSE_COLUMN] {
        column_index(&header, column).with_context(|| format!("invalid table {:?}", path))?;
    }

    let mut records = Vec::new();
    for (index, result) in reader.deserialize().enumerate() {
        let record: RawResponseRecord =
            result.with_context(|| format!("row {} of {:?}", index + 1, path))?;
        records.push(record);
    }
    Ok(records)
}

pub fn write_cleaned_records(path: impl AsRef<Path>, records: &[CleanedRecord]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("cannot create directory {:?}", parent))?;
    }
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("cannot create {:?}", path))?;
    if records.is_empty() {
        writer.write_record(["previous_sentence", "current_sentence", "label", "explanation"])?;
    }
    for record in records {
        writer
            .serialize(record)
            .with_context(|| format!("cannot write row to {:?}", path))?;
    }
    writer
        .flush()
        .with_context(|| format!("cannot flush {:?}", path))?;
    Ok(())
}
