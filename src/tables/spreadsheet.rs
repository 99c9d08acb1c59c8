use crate::domain::InputRecord;
use anyhow::{anyhow, Context, Result};
use calamine::{open_workbook_auto, Reader};
use std::path::Path;
use tracing::info;

pub(crate) const PREVIOUS_COLUMN: &str = "previous_sentence";
pub(crate) const CURRENT_COLUMN: &str = "current_sentence";

/// Reads sentence pairs from an XLSX/XLS/ODS workbook (first sheet) or a CSV
/// file. The first row must be a header naming both sentence columns.
pub fn read_input_records(path: impl AsRef<Path>) -> Result<Vec<InputRecord>> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();

    let rows = match extension.as_str() {
        "csv" => read_csv_rows(path)?,
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => read_workbook_rows(path)?,
        other => return Err(anyhow!("unsupported input format {:?} for {:?}", other, path)),
    };

    let records = records_from_rows(rows)
        .with_context(|| format!("invalid input table {:?}", path))?;
    info!(path = %path.display(), rows = records.len(), "input table loaded");
    Ok(records)
}

fn read_workbook_rows(path: &Path) -> Result<Vec<Vec<String>>> {
    let mut workbook = open_workbook_auto(path)
        .with_context(|| format!("cannot open workbook {:?}", path))?;
    let sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| anyhow!("workbook {:?} has no sheet", path))?;
    let range = workbook
        .worksheet_range(&sheet)
        .with_context(|| format!("cannot read sheet {} of {:?}", sheet, path))?;

    Ok(range
        .rows()
        .map(|row| row.iter().map(|cell| cell.to_string()).collect())
        .collect())
}

fn read_csv_rows(path: &Path) -> Result<Vec<Vec<String>>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("cannot open {:?}", path))?;

    let mut rows = Vec::new();
    for (index, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {} of {:?}", index + 1, path))?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(rows)
}

pub(crate) fn column_index(header: &[String], name: &str) -> Result<usize> {
    header
        .iter()
        .position(|column| column.trim() == name)
        .ok_or_else(|| anyhow!("missing column {:?}", name))
}

fn records_from_rows(rows: Vec<Vec<String>>) -> Result<Vec<InputRecord>> {
    let mut rows = rows.into_iter();
    let header = rows.next().ok_or_else(|| anyhow!("table is empty"))?;
    let previous = column_index(&header, PREVIOUS_COLUMN)?;
    let current = column_index(&header, CURRENT_COLUMN)?;

    let cell = |row: &[String], index: usize| row.get(index).cloned().unwrap_or_default();
    Ok(rows
        .map(|row| InputRecord::new(cell(&row, previous), cell(&row, current)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn csv_columns_are_found_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.csv");
        fs::write(
            &path,
            "id,current_sentence,previous_sentence\n1,B.,A.\n2,\"D, again.\",C.\n3,F.\n",
        )
        .unwrap();

        let records = read_input_records(&path).unwrap();
        assert_eq!(
            records,
            vec![
                InputRecord::new("A.", "B."),
                InputRecord::new("C.", "D, again."),
                InputRecord::new("", "F."),
            ]
        );
    }

    #[test]
    fn missing_column_is_named() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.csv");
        fs::write(&path, "previous_sentence,text\nA.,B.\n").unwrap();
        let err = read_input_records(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("current_sentence"));
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let err = read_input_records("input.parquet").unwrap_err();
        assert!(err.to_string().contains("unsupported input format"));
    }

    #[test]
    fn missing_workbook_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_input_records(dir.path().join("10k_input.xlsx")).is_err());
    }
}
