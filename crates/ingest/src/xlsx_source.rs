//! Spreadsheet reader (xlsx, xlsm, xls, ods) backed by calamine
//!
//! Only the first worksheet is read. Its first row is the header.

use std::path::Path;

use calamine::{open_workbook_auto, Data, DataType, Reader};
use tracing::debug;

use crate::table::RawTable;
use crate::{IngestError, IngestResult};

pub fn read_workbook(path: &Path) -> IngestResult<RawTable> {
    let mut workbook =
        open_workbook_auto(path).map_err(|e| IngestError::Workbook(e.to_string()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| IngestError::Empty(path.display().to_string()))?
        .map_err(|e| IngestError::Workbook(e.to_string()))?;

    let mut rows = range.rows();
    let headers: Vec<String> = rows
        .next()
        .ok_or_else(|| IngestError::Empty(path.display().to_string()))?
        .iter()
        .map(cell_to_string)
        .collect();

    let rows: Vec<Vec<String>> = rows
        .map(|row| row.iter().map(cell_to_string).collect())
        .collect();

    debug!(path = %path.display(), columns = headers.len(), rows = rows.len(), "Read worksheet");
    Ok(RawTable::new(headers, rows))
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(_) => cell
            .as_datetime()
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default(),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use rust_xlsxwriter::Workbook;

    #[test]
    fn test_read_first_sheet() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("today.xlsx");

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        for (col, header) in ["Time", "League", "Home", "Away", "Odd_A_Back"]
            .iter()
            .enumerate()
        {
            sheet.write_string(0, col as u16, *header).unwrap();
        }
        sheet.write_string(1, 0, "2024-03-09 15:00").unwrap();
        sheet.write_string(1, 1, "ITALY 1").unwrap();
        sheet.write_string(1, 2, "Roma").unwrap();
        sheet.write_string(1, 3, "Lazio").unwrap();
        sheet.write_number(1, 4, 2.75).unwrap();
        workbook.save(&path).unwrap();

        let ds = read_workbook(&path).unwrap().into_dataset().unwrap();
        assert_eq!(ds.len(), 1);
        assert!(ds.schema.has_league);
        assert_eq!(ds.records[0].away, "Lazio");
        assert_eq!(ds.records[0].odds.away(), Some(dec!(2.75)));
        assert!(ds.records[0].kickoff.is_some());
    }

    #[test]
    fn test_cell_conversion() {
        assert_eq!(cell_to_string(&Data::Float(1.5)), "1.5");
        assert_eq!(cell_to_string(&Data::Float(3.0)), "3");
        assert_eq!(cell_to_string(&Data::Int(2)), "2");
        assert_eq!(cell_to_string(&Data::Empty), "");
    }

    #[test]
    fn test_corrupt_workbook_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.xlsx");
        std::fs::write(&path, b"not a zip archive").unwrap();
        assert!(matches!(
            read_workbook(&path),
            Err(IngestError::Workbook(_))
        ));
    }
}
