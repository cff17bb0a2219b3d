use crate::address::CellAddress;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};

/// Functions whose references may be computed at runtime. A formula
/// invoking any of these is marked dynamic and its edges are tagged
/// accordingly.
pub const DYNAMIC_FUNCTIONS: [&str; 6] = [
    "INDIRECT", "OFFSET", "INDEX", "CHOOSE", "VLOOKUP", "HLOOKUP",
];

/// Sheet-qualified reference, optionally quoted, optionally a range:
/// `Sheet1!A1`, `'My Sheet'!A1:B10`.
static SHEET_REF_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)(['"]?[\w\s]+['"]?!)(\$?[A-Z]+\$?\d+(?::\$?[A-Z]+\$?\d+)?)"#)
        .expect("sheet reference pattern")
});

/// Same-sheet range: `A1:B10`.
static RANGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\$?[A-Z]+\$?\d+:\$?[A-Z]+\$?\d+").expect("range pattern"));

/// Bare cell reference: `A1`, `$A$1`. Matches are validity-filtered
/// afterwards, so over-matching here is harmless.
static CELL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\$?[A-Z]+\$?\d+").expect("cell pattern"));

/// Function invocation: `IDENTIFIER(`.
static FUNCTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)([A-Z_][A-Z0-9_.]*)\s*\(").expect("function pattern"));

static INDIRECT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)INDIRECT\s*\(\s*([^)]+)\s*\)").expect("INDIRECT pattern"));

static OFFSET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)OFFSET\s*\(\s*([^,]+)").expect("OFFSET pattern"));

/// Everything recovered from one formula.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedRefs {
    /// Referenced cells; ranges contribute their two corners only.
    pub dependencies: HashSet<CellAddress>,

    /// Function names in match order, upper-cased.
    pub functions: Vec<String>,

    /// Whether any invoked function can compute references at runtime.
    pub is_dynamic: bool,
}

/// Extract all references and function names from `formula`.
///
/// A leading `=` is stripped before matching. References without a sheet
/// qualifier are attributed to `current_sheet`. Matching never fails:
/// text yielding no reference produces an empty result.
pub fn extract(formula: &str, current_sheet: Option<&str>) -> ExtractedRefs {
    let text = formula.trim_start_matches('=').trim();
    if text.is_empty() {
        return ExtractedRefs::default();
    }

    let mut dependencies = HashSet::new();

    // Cross-sheet references claim their spans first so the same
    // characters cannot re-match as bare cells below.
    for caps in SHEET_REF_RE.captures_iter(text) {
        let sheet = caps[1].trim_matches(|c| c == '\'' || c == '"' || c == '!');
        push_ref(&mut dependencies, &caps[2], Some(sheet));
    }
    let without_sheets = SHEET_REF_RE.replace_all(text, "");

    for m in RANGE_RE.find_iter(&without_sheets) {
        push_ref(&mut dependencies, m.as_str(), current_sheet);
    }
    let without_ranges = RANGE_RE.replace_all(&without_sheets, "");

    for m in CELL_RE.find_iter(&without_ranges) {
        if let Some(addr) = CellAddress::parse(m.as_str(), current_sheet) {
            dependencies.insert(addr);
        }
    }

    // Function names come from the original, unmodified text.
    let functions: Vec<String> = FUNCTION_RE
        .captures_iter(text)
        .map(|caps| caps[1].to_ascii_uppercase())
        .collect();

    let is_dynamic = functions
        .iter()
        .any(|f| DYNAMIC_FUNCTIONS.contains(&f.as_str()));

    log::debug!(
        "extracted {} dependencies, {} functions (dynamic={}) from formula",
        dependencies.len(),
        functions.len(),
        is_dynamic
    );

    ExtractedRefs {
        dependencies,
        functions,
        is_dynamic,
    }
}

/// Opportunistically resolve `INDIRECT`/`OFFSET` targets.
///
/// `known_values` maps canonical cell addresses to their current display
/// values. Two patterns are handled: an `INDIRECT` argument that is a
/// literal address or a known cell whose value is an address, and the
/// base cell of `OFFSET` (no offset arithmetic is applied, which keeps
/// this a conservative under-approximation).
pub fn resolve_dynamic(
    formula: &str,
    known_values: &HashMap<String, String>,
    current_sheet: Option<&str>,
) -> HashSet<CellAddress> {
    let mut resolved = HashSet::new();

    if !extract(formula, current_sheet).is_dynamic {
        return resolved;
    }

    for caps in INDIRECT_RE.captures_iter(formula) {
        let arg = caps[1].trim().trim_matches(|c| c == '"' || c == '\'');
        if let Some(value) = known_values.get(arg) {
            // The argument names a cell; follow its value when that value
            // is itself a valid address.
            if let Some(addr) = CellAddress::parse(value, current_sheet) {
                resolved.insert(addr);
            }
        } else if let Some(addr) = CellAddress::parse(arg, current_sheet) {
            resolved.insert(addr);
        }
    }

    for caps in OFFSET_RE.captures_iter(formula) {
        if let Some(addr) = CellAddress::parse(caps[1].trim(), current_sheet) {
            resolved.insert(addr);
        }
    }

    log::debug!("resolved {} dynamic dependencies", resolved.len());

    resolved
}

/// Add a single reference or both corners of a range.
fn push_ref(dependencies: &mut HashSet<CellAddress>, text: &str, sheet: Option<&str>) {
    match text.split_once(':') {
        Some((start, end)) => {
            if let Some(addr) = CellAddress::parse(start, sheet) {
                dependencies.insert(addr);
            }
            if let Some(addr) = CellAddress::parse(end, sheet) {
                dependencies.insert(addr);
            }
        }
        None => {
            if let Some(addr) = CellAddress::parse(text, sheet) {
                dependencies.insert(addr);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canonical_set(refs: &ExtractedRefs) -> HashSet<String> {
        refs.dependencies.iter().map(CellAddress::canonical).collect()
    }

    #[test]
    fn test_simple_addition() {
        let refs = extract("=A1+B2", Some("Sheet1"));
        assert_eq!(
            canonical_set(&refs),
            HashSet::from(["Sheet1!A1".to_string(), "Sheet1!B2".to_string()])
        );
        assert!(!refs.is_dynamic);
        assert!(refs.functions.is_empty());
    }

    #[test]
    fn test_cross_sheet_reference() {
        let refs = extract("=Sheet2!C3*2", Some("Sheet1"));
        assert_eq!(canonical_set(&refs), HashSet::from(["Sheet2!C3".to_string()]));
    }

    #[test]
    fn test_quoted_sheet_name_with_spaces() {
        let refs = extract("='Cost Model'!B2+1", Some("Sheet1"));
        assert_eq!(
            canonical_set(&refs),
            HashSet::from(["Cost Model!B2".to_string()])
        );
    }

    #[test]
    fn test_range_contributes_corners_only() {
        let refs = extract("=SUM(A1:A5)", Some("Sheet1"));
        assert_eq!(
            canonical_set(&refs),
            HashSet::from(["Sheet1!A1".to_string(), "Sheet1!A5".to_string()])
        );
        assert_eq!(refs.functions, vec!["SUM".to_string()]);
    }

    #[test]
    fn test_cross_sheet_range() {
        let refs = extract("=SUM(Data!B1:B10)", Some("Sheet1"));
        assert_eq!(
            canonical_set(&refs),
            HashSet::from(["Data!B1".to_string(), "Data!B10".to_string()])
        );
    }

    #[test]
    fn test_indirect_is_dynamic() {
        let refs = extract("=INDIRECT(\"A1\")", Some("Sheet1"));
        assert!(refs.is_dynamic);
        assert_eq!(refs.functions, vec!["INDIRECT".to_string()]);
    }

    #[test]
    fn test_function_names_ordered_and_uppercased() {
        let refs = extract("=if(sum(A1:A3)>0, vlookup(B1, C1:D9, 2), 0)", None);
        assert_eq!(
            refs.functions,
            vec!["IF".to_string(), "SUM".to_string(), "VLOOKUP".to_string()]
        );
        assert!(refs.is_dynamic); // VLOOKUP
    }

    #[test]
    fn test_invalid_references_discarded() {
        // Column longer than three letters and out-of-range rows must
        // never survive into the dependency set.
        let refs = extract("=ABCD1+A0+A1048577+XFD1048576", None);
        assert_eq!(canonical_set(&refs), HashSet::from(["XFD1048576".to_string()]));
    }

    #[test]
    fn test_absolute_markers_do_not_split_identity() {
        let refs = extract("=$A$1+A1", Some("Sheet1"));
        assert_eq!(refs.dependencies.len(), 1);
    }

    #[test]
    fn test_no_sheet_attribution_without_current_sheet() {
        let refs = extract("=A1", None);
        let addr = refs.dependencies.iter().next().unwrap();
        assert_eq!(addr.sheet, None);
        assert_eq!(addr.canonical(), "A1");
    }

    #[test]
    fn test_empty_and_unparseable_input() {
        assert_eq!(extract("", Some("Sheet1")), ExtractedRefs::default());
        assert_eq!(extract("=", Some("Sheet1")), ExtractedRefs::default());
        let refs = extract("=1+2*3", Some("Sheet1"));
        assert!(refs.dependencies.is_empty());
        assert!(refs.functions.is_empty());
    }

    #[test]
    fn test_resolve_dynamic_literal_indirect() {
        let resolved = resolve_dynamic("=INDIRECT(\"B5\")", &HashMap::new(), Some("Sheet1"));
        let canonical: HashSet<String> = resolved.iter().map(CellAddress::canonical).collect();
        assert_eq!(canonical, HashSet::from(["Sheet1!B5".to_string()]));
    }

    #[test]
    fn test_resolve_dynamic_through_known_value() {
        let mut values = HashMap::new();
        values.insert("A1".to_string(), "C9".to_string());
        let resolved = resolve_dynamic("=INDIRECT(A1)", &values, Some("Sheet1"));
        let canonical: HashSet<String> = resolved.iter().map(CellAddress::canonical).collect();
        assert_eq!(canonical, HashSet::from(["Sheet1!C9".to_string()]));
    }

    #[test]
    fn test_resolve_dynamic_known_value_not_an_address() {
        let mut values = HashMap::new();
        values.insert("A1".to_string(), "hello".to_string());
        let resolved = resolve_dynamic("=INDIRECT(A1)", &values, Some("Sheet1"));
        assert!(resolved.is_empty());
    }

    #[test]
    fn test_resolve_dynamic_offset_base() {
        let resolved = resolve_dynamic("=OFFSET(B2, 1, 1)", &HashMap::new(), Some("Sheet1"));
        let canonical: HashSet<String> = resolved.iter().map(CellAddress::canonical).collect();
        assert_eq!(canonical, HashSet::from(["Sheet1!B2".to_string()]));
    }

    #[test]
    fn test_resolve_dynamic_requires_dynamic_formula() {
        let mut values = HashMap::new();
        values.insert("A1".to_string(), "C9".to_string());
        assert!(resolve_dynamic("=A1+B2", &values, Some("Sheet1")).is_empty());
    }

    #[test]
    fn test_all_dependencies_within_bounds() {
        // Bounds hold for every extraction path, including cross-sheet
        // and range corners.
        let formulas = [
            "=SUM(A1:ZZZ999)",
            "=Sheet2!AAAA1",
            "=OFFSET(A1,1,1)+'My Data'!B2:C3",
            "=$XFD$1048576",
        ];
        for formula in formulas {
            for dep in extract(formula, Some("S")).dependencies {
                assert!(dep.row >= 1 && dep.row <= crate::MAX_ROW);
                assert!(dep.column.len() <= crate::MAX_COLUMN_LETTERS);
            }
        }
    }
}
