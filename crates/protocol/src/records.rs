use serde::{Deserialize, Serialize};

/// One populated cell as produced by the workbook reader.
///
/// `formula` is `Some` iff the cell holds a formula; the stored text may or
/// may not carry the leading `=` marker, and consumers must tolerate both.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CellRecord {
    /// 1-indexed row number
    pub row: u32,

    /// Column letters ("A".."XFD")
    pub column: String,

    /// Display value, if any (cached result for formula cells)
    pub value: Option<String>,

    /// Formula text, present iff the cell holds a formula
    pub formula: Option<String>,

    /// Loose type hint from the reader ("float", "string", "error", ...)
    pub data_type: String,
}

impl CellRecord {
    /// Whether the record carries a formula.
    #[must_use]
    pub const fn has_formula(&self) -> bool {
        self.formula.is_some()
    }

    /// Whether the record carries a non-empty display value.
    #[must_use]
    pub fn has_value(&self) -> bool {
        self.value.as_deref().is_some_and(|v| !v.is_empty())
    }
}

/// One worksheet: its name plus every populated cell.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SheetData {
    /// Sheet name as it appears in the workbook
    pub name: String,

    /// Populated cells in reader order
    pub cells: Vec<CellRecord>,

    /// Extent of the used range
    pub row_count: u32,
    pub col_count: u32,
}

impl SheetData {
    /// Create an empty sheet with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cells: Vec::new(),
            row_count: 0,
            col_count: 0,
        }
    }

    /// Iterate over the formula cells only.
    pub fn formula_cells(&self) -> impl Iterator<Item = &CellRecord> {
        self.cells.iter().filter(|c| c.has_formula())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_value_ignores_empty_strings() {
        let cell = CellRecord {
            row: 1,
            column: "A".to_string(),
            value: Some(String::new()),
            formula: None,
            data_type: "string".to_string(),
        };
        assert!(!cell.has_value());
    }

    #[test]
    fn test_formula_cells_filter() {
        let mut sheet = SheetData::new("Sheet1");
        sheet.cells.push(CellRecord {
            row: 1,
            column: "A".to_string(),
            value: Some("5".to_string()),
            formula: None,
            data_type: "float".to_string(),
        });
        sheet.cells.push(CellRecord {
            row: 1,
            column: "B".to_string(),
            value: Some("10".to_string()),
            formula: Some("=A1*2".to_string()),
            data_type: "float".to_string(),
        });
        assert_eq!(sheet.formula_cells().count(), 1);
    }
}
