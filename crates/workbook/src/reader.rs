use crate::error::{Result, WorkbookError};
use calamine::{open_workbook, Data, Reader, Xlsx};
use cellgraph_protocol::{CellRecord, SheetData};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// File extensions the reader accepts.
pub const SUPPORTED_EXTENSIONS: [&str; 2] = ["xlsx", "xlsm"];

/// Reject paths whose extension the reader cannot decode.
pub fn validate_extension(path: &Path) -> Result<()> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
        Ok(())
    } else {
        Err(WorkbookError::UnsupportedExtension(extension))
    }
}

/// Read every sheet of the workbook at `path`.
///
/// Sheets whose data cannot be decoded are skipped with a warning; a
/// workbook that cannot be opened at all is an error.
pub fn read_workbook(path: &Path) -> Result<Vec<SheetData>> {
    validate_extension(path)?;
    let mut workbook: Xlsx<BufReader<File>> = open_workbook(path)?;
    let names = workbook.sheet_names();
    log::info!("reading workbook with {} sheets", names.len());

    let mut sheets = Vec::with_capacity(names.len());
    for name in names {
        match read_sheet(&mut workbook, &name) {
            Ok(sheet) => sheets.push(sheet),
            Err(err) => log::warn!("skipping unreadable sheet '{name}': {err}"),
        }
    }
    Ok(sheets)
}

fn read_sheet(workbook: &mut Xlsx<BufReader<File>>, name: &str) -> Result<SheetData> {
    let values = workbook.worksheet_range(name)?;
    let formulas = workbook.worksheet_formula(name)?;

    // Formulas indexed by absolute coordinates; the two ranges need not
    // share a start corner.
    let mut formula_map: HashMap<(u32, u32), String> = HashMap::new();
    let (formula_start_row, formula_start_col) = formulas.start().unwrap_or((0, 0));
    for (row_offset, row) in formulas.rows().enumerate() {
        for (col_offset, formula) in row.iter().enumerate() {
            if formula.is_empty() {
                continue;
            }
            let coords = (
                formula_start_row + row_offset as u32,
                formula_start_col + col_offset as u32,
            );
            formula_map.insert(coords, normalize_formula(formula));
        }
    }

    let (row_count, col_count) = values.get_size();
    let mut cells = Vec::new();
    let (start_row, start_col) = values.start().unwrap_or((0, 0));
    for (row_offset, row) in values.rows().enumerate() {
        for (col_offset, data) in row.iter().enumerate() {
            let coords = (start_row + row_offset as u32, start_col + col_offset as u32);
            let formula = formula_map.remove(&coords);
            if matches!(data, Data::Empty) && formula.is_none() {
                continue;
            }
            cells.push(record(coords, data_to_string(data), formula, type_hint(data)));
        }
    }

    // Formula cells with no cached value never appeared in the value
    // range; emit them as value-less records.
    let mut leftovers: Vec<((u32, u32), String)> = formula_map.into_iter().collect();
    leftovers.sort_by_key(|(coords, _)| *coords);
    for (coords, formula) in leftovers {
        cells.push(record(coords, None, Some(formula), "empty".to_string()));
    }

    log::debug!("read sheet '{}': {} populated cells", name, cells.len());

    Ok(SheetData {
        name: name.to_string(),
        cells,
        row_count: row_count as u32,
        col_count: col_count as u32,
    })
}

fn record(
    coords: (u32, u32),
    value: Option<String>,
    formula: Option<String>,
    data_type: String,
) -> CellRecord {
    CellRecord {
        // Rows are 1-indexed in cell addresses.
        row: coords.0 + 1,
        column: column_letters(coords.1),
        value,
        formula,
        data_type,
    }
}

/// Formula text is stored without the leading marker; put it back so
/// records look the way users see them.
fn normalize_formula(formula: &str) -> String {
    if formula.starts_with('=') {
        formula.to_string()
    } else {
        format!("={formula}")
    }
}

fn data_to_string(data: &Data) -> Option<String> {
    match data {
        Data::Int(i) => Some(i.to_string()),
        Data::Float(f) => Some(f.to_string()),
        Data::String(s) => Some(s.clone()),
        Data::Bool(b) => Some(b.to_string()),
        Data::DateTime(dt) => Some(dt.as_f64().to_string()),
        Data::DateTimeIso(dt) => Some(dt.clone()),
        Data::DurationIso(d) => Some(d.clone()),
        Data::Error(e) => Some(format!("{e}")),
        Data::Empty => None,
    }
}

fn type_hint(data: &Data) -> String {
    let hint = match data {
        Data::Int(_) => "int",
        Data::Float(_) => "float",
        Data::String(_) => "string",
        Data::Bool(_) => "bool",
        Data::DateTime(_) => "datetime",
        Data::DateTimeIso(_) => "datetime_iso",
        Data::DurationIso(_) => "duration_iso",
        Data::Error(_) => "error",
        Data::Empty => "empty",
    };
    hint.to_string()
}

/// Convert a 0-based column index to letters (0 → "A", 26 → "AA").
#[must_use]
pub fn column_letters(mut index: u32) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_column_letters() {
        assert_eq!(column_letters(0), "A");
        assert_eq!(column_letters(25), "Z");
        assert_eq!(column_letters(26), "AA");
        assert_eq!(column_letters(27), "AB");
        assert_eq!(column_letters(701), "ZZ");
        assert_eq!(column_letters(702), "AAA");
        // Last column of a worksheet.
        assert_eq!(column_letters(16_383), "XFD");
    }

    #[test]
    fn test_normalize_formula() {
        assert_eq!(normalize_formula("A1+B1"), "=A1+B1");
        assert_eq!(normalize_formula("=A1+B1"), "=A1+B1");
    }

    #[test]
    fn test_validate_extension() {
        assert!(validate_extension(Path::new("model.xlsx")).is_ok());
        assert!(validate_extension(Path::new("model.XLSM")).is_ok());
        assert!(validate_extension(Path::new("model.csv")).is_err());
        assert!(validate_extension(Path::new("model")).is_err());
    }

    #[test]
    fn test_data_conversion() {
        assert_eq!(data_to_string(&Data::Float(2.5)), Some("2.5".to_string()));
        assert_eq!(data_to_string(&Data::Empty), None);
        assert_eq!(type_hint(&Data::Bool(true)), "bool");
        assert_eq!(type_hint(&Data::String("x".to_string())), "string");
    }
}
