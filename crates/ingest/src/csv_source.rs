//! CSV reader with delimiter detection
//!
//! Exports come either comma-separated or, from European locales, semicolon-
//! separated with decimal commas. The comma parse is tried first; a header of
//! one column or fewer means the file used `;`.

use std::path::Path;

use csv::{ReaderBuilder, Trim};
use tracing::{debug, warn};

use crate::table::RawTable;
use crate::{read_to_string, IngestError, IngestResult};

pub fn read_csv(path: &Path) -> IngestResult<RawTable> {
    let text = read_to_string(path)?;
    if text.trim().is_empty() {
        return Err(IngestError::Empty(path.display().to_string()));
    }
    parse_csv(&text)
}

/// Parse CSV text, falling back from `,` to `;` once
pub fn parse_csv(text: &str) -> IngestResult<RawTable> {
    match read_with_delimiter(text, b',') {
        Ok(table) if table.headers.len() > 1 => return Ok(table),
        Ok(table) => debug!(
            columns = table.headers.len(),
            "Comma parse found too few columns, retrying with ';'"
        ),
        Err(e) => warn!(error = %e, "Comma parse failed, retrying with ';'"),
    }

    let table = read_with_delimiter(text, b';')?;
    if table.headers.len() > 1 {
        Ok(table.with_decimal_comma())
    } else {
        Err(IngestError::Delimiter)
    }
}

fn read_with_delimiter(text: &str, delimiter: u8) -> IngestResult<RawTable> {
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(String::from).collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(String::from).collect());
    }
    Ok(RawTable::new(headers, rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_comma_delimited() {
        let table = parse_csv("Time,Home,Away,Odd_A_Back\n2024-01-01,A,B,2.5\n").unwrap();
        assert_eq!(table.headers.len(), 4);
        assert!(!table.decimal_comma);
        let ds = table.into_dataset().unwrap();
        assert_eq!(ds.records[0].odds.away(), Some(dec!(2.5)));
    }

    #[test]
    fn test_semicolon_fallback_with_decimal_comma() {
        let table = parse_csv("Time;Home;Away;Odd_A_Back\n2024-01-01;A;B;2,5\n").unwrap();
        assert_eq!(table.headers, vec!["Time", "Home", "Away", "Odd_A_Back"]);
        assert!(table.decimal_comma);
        let ds = table.into_dataset().unwrap();
        assert_eq!(ds.records[0].odds.away(), Some(dec!(2.5)));
    }

    #[test]
    fn test_single_column_is_rejected() {
        assert!(matches!(
            parse_csv("Home\nA\n"),
            Err(IngestError::Delimiter)
        ));
    }

    #[test]
    fn test_quoted_fields_and_bom() {
        let text = "\u{feff}Time,Home,Away,League\n\"2024-01-01 15:00\",\"Brighton, Hove\",B,ENGLAND 1\n";
        let ds = parse_csv(text).unwrap().into_dataset().unwrap();
        assert_eq!(ds.records[0].home, "Brighton, Hove");
        assert_eq!(ds.records[0].league.as_deref(), Some("ENGLAND 1"));
    }
}
