use super::response::parse_record;
use crate::domain::{CleanedRecord, ParsedRecord, NO_EXPLANATION, SENTINEL_LABEL};
use crate::tables::{read_raw_records, write_cleaned_records};
use anyhow::Result;
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// Row counts observed while cleaning. Diagnostic only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CleaningReport {
    pub input_rows: usize,
    pub missing_label: usize,
    pub sentinel_label: usize,
    pub placeholder_explanation: usize,
    pub output_rows: usize,
}

/// Drops unlabeled rows, then sentinel-labeled rows, in that order.
pub fn clean_records(records: Vec<ParsedRecord>) -> (Vec<CleanedRecord>, CleaningReport) {
    let mut report = CleaningReport {
        input_rows: records.len(),
        ..CleaningReport::default()
    };

    let labeled: Vec<CleanedRecord> = records
        .into_iter()
        .filter_map(|record| {
            let label = record.label?;
            Some(CleanedRecord {
                previous_sentence: record.previous_sentence,
                current_sentence: record.current_sentence,
                label,
                explanation: record.explanation,
            })
        })
        .collect();
    report.missing_label = report.input_rows - labeled.len();
    info!(rows = report.missing_label, "rows with no label");

    report.sentinel_label = labeled
        .iter()
        .filter(|record| record.label == SENTINEL_LABEL)
        .count();
    info!(rows = report.sentinel_label, label = SENTINEL_LABEL, "rows with sentinel label");
    let kept: Vec<CleanedRecord> = labeled
        .into_iter()
        .filter(|record| record.label != SENTINEL_LABEL)
        .collect();

    report.placeholder_explanation = kept
        .iter()
        .filter(|record| record.has_placeholder_explanation())
        .count();
    info!(
        rows = report.placeholder_explanation,
        placeholder = NO_EXPLANATION,
        "rows without explanation"
    );

    report.output_rows = kept.len();
    (kept, report)
}

/// Reads the raw response table, extracts and cleans, writes the final table.
pub fn process_file(
    input_csv: impl AsRef<Path>,
    output_csv: impl AsRef<Path>,
) -> Result<CleaningReport> {
    let output_csv = output_csv.as_ref();
    let raw = read_raw_records(input_csv)?;
    let parsed: Vec<ParsedRecord> = raw.into_iter().map(parse_record).collect();

    let (cleaned, report) = clean_records(parsed);
    write_cleaned_records(output_csv, &cleaned)?;

    info!(path = %output_csv.display(), "cleaned data saved");
    info!(
        rows = report.output_rows,
        "rows after removing missing labels and sentinel labels"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn parsed(label: Option<i64>, explanation: &str) -> ParsedRecord {
        ParsedRecord {
            previous_sentence: format!("prev {:?}", label),
            current_sentence: format!("curr {:?}", label),
            label,
            explanation: explanation.to_string(),
        }
    }

    #[test]
    fn drops_missing_then_sentinel_labels() {
        let rows = vec![
            parsed(None, "x"),
            parsed(Some(1), "a"),
            parsed(Some(3), "b"),
            parsed(Some(2), NO_EXPLANATION),
            parsed(Some(3), "c"),
        ];
        let (cleaned, report) = clean_records(rows);

        let labels: Vec<i64> = cleaned.iter().map(|r| r.label).collect();
        assert_eq!(labels, vec![1, 2]);
        assert_eq!(
            report,
            CleaningReport {
                input_rows: 5,
                missing_label: 1,
                sentinel_label: 2,
                placeholder_explanation: 1,
                output_rows: 2,
            }
        );
        assert_eq!(
            report.output_rows,
            report.input_rows - report.missing_label - report.sentinel_label
        );
    }

    #[test]
    fn cleaning_is_idempotent() {
        let rows = vec![parsed(Some(0), "a"), parsed(None, "b"), parsed(Some(3), "c")];
        let (once, _) = clean_records(rows);
        let again: Vec<ParsedRecord> = once.iter().cloned().map(ParsedRecord::from).collect();
        let (twice, report) = clean_records(again);

        assert_eq!(once, twice);
        assert_eq!(report.missing_label, 0);
        assert_eq!(report.sentinel_label, 0);
    }

    #[test]
    fn empty_input_stays_empty() {
        let (cleaned, report) = clean_records(Vec::new());
        assert!(cleaned.is_empty());
        assert_eq!(report, CleaningReport::default());
    }

    #[test]
    fn process_file_writes_four_columns() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("llm_output.csv");
        let output = dir.path().join("training_data.csv");
        fs::write(
            &input,
            concat!(
                "previous_sentence,current_sentence,response\n",
                "A.,B.,\"label: 1\nexplanation: continues, clearly\"\n",
                "C.,D.,\"label: <3>\nexplanation: <broken>\"\n",
                "E.,F.,no idea\n",
                "G.,H.,ERROR: transport: timed out\n",
                "I.,J.,label: 2\n",
            ),
        )
        .unwrap();

        let report = process_file(&input, &output).unwrap();
        assert_eq!(report.input_rows, 5);
        assert_eq!(report.missing_label, 2);
        assert_eq!(report.sentinel_label, 1);
        assert_eq!(report.placeholder_explanation, 1);
        assert_eq!(report.output_rows, 2);

        let written = fs::read_to_string(&output).unwrap();
        let mut lines = written.lines();
        assert_eq!(
            lines.next(),
            Some("previous_sentence,current_sentence,label,explanation")
        );
        assert_eq!(lines.next(), Some("A.,B.,1,\"continues, clearly\""));
        assert_eq!(lines.next(), Some("I.,J.,2,No explanation provided"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn failed_calls_never_reach_the_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("llm_output.csv");
        let output = dir.path().join("training_data.csv");
        fs::write(
            &input,
            concat!(
                "previous_sentence,current_sentence,response\n",
                "A.,B.,\"ERROR: status: provider returned 400: malformed input, label: 2 exceeds schema\"\n",
                "C.,D.,label: 1\n",
            ),
        )
        .unwrap();

        let report = process_file(&input, &output).unwrap();
        assert_eq!(report.missing_label, 1);
        assert_eq!(report.output_rows, 1);
        let written = fs::read_to_string(&output).unwrap();
        assert!(!written.contains("A.,B."));
        assert!(written.contains("C.,D.,1,"));
    }

    #[test]
    fn process_file_requires_response_column() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("llm_output.csv");
        fs::write(&input, "previous_sentence,current_sentence\nA.,B.\n").unwrap();
        let err = process_file(&input, dir.path().join("out.csv")).unwrap_err();
        assert!(format!("{:#}", err).contains("response"));
    }
}
