use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Largest addressable row.
pub const MAX_ROW: u32 = 1_048_576;

/// Longest valid column designator ("XFD" is the last column).
pub const MAX_COLUMN_LETTERS: usize = 3;

/// A sheet-qualified cell coordinate.
///
/// `sheet` is `None` for references that bind to the sheet containing the
/// formula; callers attribute the current sheet at extraction time.
///
/// Identity is the canonical string form (`Sheet!A1` or `A1`): two
/// addresses are equal iff their canonical forms match. The
/// absolute-reference markers only affect [`CellAddress::display_form`],
/// never equality or hashing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CellAddress {
    pub sheet: Option<String>,
    pub column: String,
    pub row: u32,
    pub column_absolute: bool,
    pub row_absolute: bool,
}

impl CellAddress {
    /// Create a relative address.
    pub fn new(sheet: Option<&str>, column: &str, row: u32) -> Self {
        Self {
            sheet: sheet.map(str::to_string),
            column: column.to_ascii_uppercase(),
            row,
            column_absolute: false,
            row_absolute: false,
        }
    }

    /// Parse a reference like `$AB$12`, attributing `sheet`.
    ///
    /// Returns `None` for anything failing the validity rule: after
    /// stripping `$` markers the text must be one to three letters
    /// followed by a row number in `[1, 1_048_576]`. False positives
    /// (text that merely looks like a reference) are discarded this way.
    pub fn parse(text: &str, sheet: Option<&str>) -> Option<Self> {
        let stripped: String = text.chars().filter(|&c| c != '$').collect();

        let letters_len = stripped
            .chars()
            .take_while(|c| c.is_ascii_alphabetic())
            .count();
        if letters_len == 0 || letters_len > MAX_COLUMN_LETTERS {
            return None;
        }

        let (column, digits) = stripped.split_at(letters_len);
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        let row: u32 = digits.parse().ok()?;
        if !(1..=MAX_ROW).contains(&row) {
            return None;
        }

        let column_absolute = text.starts_with('$');
        let body = text.strip_prefix('$').unwrap_or(text);
        let body_letters = body
            .chars()
            .take_while(|c| c.is_ascii_alphabetic())
            .count();
        let row_absolute = body[body_letters..].starts_with('$');

        Some(Self {
            sheet: sheet.map(str::to_string),
            column: column.to_ascii_uppercase(),
            row,
            column_absolute,
            row_absolute,
        })
    }

    /// Canonical form without absolute markers: `Sheet!A1` or `A1`.
    ///
    /// This is the cross-component identity key and the node id used by
    /// the dependency graph.
    #[must_use]
    pub fn canonical(&self) -> String {
        match &self.sheet {
            Some(sheet) => format!("{}!{}{}", sheet, self.column, self.row),
            None => format!("{}{}", self.column, self.row),
        }
    }

    /// Display form preserving absolute markers: `Sheet!$A$1`.
    #[must_use]
    pub fn display_form(&self) -> String {
        let col = if self.column_absolute {
            format!("${}", self.column)
        } else {
            self.column.clone()
        };
        let row = if self.row_absolute {
            format!("${}", self.row)
        } else {
            self.row.to_string()
        };
        match &self.sheet {
            Some(sheet) => format!("{sheet}!{col}{row}"),
            None => format!("{col}{row}"),
        }
    }

}

impl PartialEq for CellAddress {
    fn eq(&self, other: &Self) -> bool {
        self.canonical() == other.canonical()
    }
}

impl Eq for CellAddress {}

impl Hash for CellAddress {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical().hash(state);
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}
