use std::fs;
use std::io::Cursor;
use std::path::Path;

use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};

use crate::error::AppError;

use super::{FormatParser, ParsedText};

/// Spreadsheets (`.xlsx` and legacy `.xls`): one text record per worksheet,
/// rows as tab-separated cell values.
///
/// The workbook format is detected from the file content, so a package saved
/// under the other extension still loads.
pub struct XlsxParser;

impl FormatParser for XlsxParser {
    fn parse(&self, path: &Path) -> Result<Vec<ParsedText>, AppError> {
        let bytes = fs::read(path).map_err(|e| {
            AppError::new("INGEST_READ_FAILED", "Failed to read workbook")
                .with_details(format!("path={}; err={}", path.display(), e))
        })?;
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes)).map_err(|e| {
            AppError::new("INGEST_PARSE_FAILED", "File is not a readable Excel workbook")
                .with_details(format!("path={}; err={}", path.display(), e))
        })?;

        let names = workbook.sheet_names();
        if names.is_empty() {
            return Err(AppError::new("INGEST_PARSE_FAILED", "Workbook has no worksheets")
                .with_details(format!("path={}", path.display())));
        }

        let mut out = Vec::with_capacity(names.len());
        for name in names {
            let range = workbook.worksheet_range(&name).map_err(|e| {
                AppError::new("INGEST_PARSE_FAILED", "Failed to read worksheet")
                    .with_details(format!("path={}; sheet={}; err={}", path.display(), name, e))
            })?;
            let mut parsed = ParsedText::plain(sheet_text(&range));
            parsed.extra.insert("sheet".to_string(), name);
            out.push(parsed);
        }
        Ok(out)
    }
}

/// Rows with no visible value are dropped; trailing empty cells are kept as separators.
fn sheet_text(range: &Range<Data>) -> String {
    range
        .rows()
        .filter(|row| row.iter().any(|c| !c.to_string().trim().is_empty()))
        .map(|row| row.iter().map(cell_text).collect::<Vec<_>>().join("\t"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::Bool(true) => "TRUE".to_string(),
        Data::Bool(false) => "FALSE".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sheet_rows_render_cell_values() {
        let mut range = Range::new((0, 0), (2, 2));
        range.set_value((0, 0), Data::String("Defect".to_string()));
        range.set_value((0, 1), Data::String("Count".to_string()));
        range.set_value((1, 0), Data::String("Porosity".to_string()));
        range.set_value((1, 1), Data::Float(12.0));
        range.set_value((1, 2), Data::Bool(true));
        assert_eq!(sheet_text(&range), "Defect\tCount\t\nPorosity\t12\tTRUE");
    }
}
