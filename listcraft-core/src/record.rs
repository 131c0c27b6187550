//! Price-list and supplier record data structures

use serde::{Deserialize, Serialize};

/// Identity fields used to pair a supplier record to a base row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityField {
    Code,
    SupplierCode,
    Ean,
}

impl IdentityField {
    pub fn as_str(&self) -> &str {
        match self {
            IdentityField::Code => "code",
            IdentityField::SupplierCode => "supplier_code",
            IdentityField::Ean => "ean",
        }
    }
}

impl std::fmt::Display for IdentityField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Normalized identity key values extracted from a row or record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityKeys {
    pub code: Option<String>,
    pub supplier_code: Option<String>,
    pub ean: Option<String>,
}

impl IdentityKeys {
    pub fn get(&self, field: IdentityField) -> Option<&str> {
        match field {
            IdentityField::Code => self.code.as_deref(),
            IdentityField::SupplierCode => self.supplier_code.as_deref(),
            IdentityField::Ean => self.ean.as_deref(),
        }
    }

    pub fn set(&mut self, field: IdentityField, value: Option<String>) {
        match field {
            IdentityField::Code => self.code = value,
            IdentityField::SupplierCode => self.supplier_code = value,
            IdentityField::Ean => self.ean = value,
        }
    }

    /// A record with no identity key at all can never be matched
    pub fn is_matchable(&self) -> bool {
        self.code.is_some() || self.supplier_code.is_some() || self.ean.is_some()
    }
}

/// Cell value types
///
/// Formula cells are a distinct variant: the engine only ever overwrites
/// literal-value cells, so formulas survive a reconciliation untouched. The
/// workbook's cached result rides along so downstream consumers (offer
/// generation) can still read the number a formula last evaluated to.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Number(f64),
    Text(String),
    Boolean(bool),
    Formula { text: String, cached: Option<f64> },
}

impl CellValue {
    /// A formula cell with no cached result (freshly built rows)
    pub fn formula(text: impl Into<String>) -> Self {
        CellValue::Formula {
            text: text.into(),
            cached: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    pub fn is_formula(&self) -> bool {
        matches!(self, CellValue::Formula { .. })
    }

    pub fn as_formula(&self) -> Option<&str> {
        match self {
            CellValue::Formula { text, .. } => Some(text),
            _ => None,
        }
    }

    /// Numeric view of the cell, if it has one
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

/// One article in the canonical price list
///
/// `cells` is aligned with the owning [`PriceList`]'s column schema, so the
/// column set and order are fixed at load time.
#[derive(Debug, Clone, Default)]
pub struct PriceListRow {
    pub cells: Vec<CellValue>,
    pub keys: IdentityKeys,
}

impl PriceListRow {
    pub fn new(cells: Vec<CellValue>) -> Self {
        Self {
            cells,
            keys: IdentityKeys::default(),
        }
    }
}

/// A literal-cell overwrite recorded for the copy-on-write writer
///
/// `row` is a 0-based data-row index (header excluded), `col` a 0-based
/// schema column index.
#[derive(Debug, Clone, PartialEq)]
pub struct CellPatch {
    pub row: usize,
    pub col: usize,
    pub value: CellValue,
}

/// The canonical price list: fixed column schema plus data rows
///
/// Rows present at load time are only ever mutated through [`set_cell`],
/// which journals the change as a [`CellPatch`]; rows appended afterwards are
/// written out whole. The writer consumes both to patch the original
/// workbook without rewriting anything else.
///
/// [`set_cell`]: PriceList::set_cell
#[derive(Debug, Clone, Default)]
pub struct PriceList {
    columns: Vec<String>,
    rows: Vec<PriceListRow>,
    /// Absolute sheet coordinates of the header row's first cell (0-based)
    origin: (u32, u32),
    original_rows: usize,
    patches: Vec<CellPatch>,
}

impl PriceList {
    pub fn new(columns: Vec<String>, origin: (u32, u32)) -> Self {
        Self {
            columns,
            rows: Vec::new(),
            origin,
            original_rows: 0,
            patches: Vec::new(),
        }
    }

    /// Build a list from already-loaded rows; the given rows become the
    /// "original" set that the writer patches in place.
    pub fn with_rows(columns: Vec<String>, rows: Vec<PriceListRow>, origin: (u32, u32)) -> Self {
        let original_rows = rows.len();
        Self {
            columns,
            rows,
            origin,
            original_rows,
            patches: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        let name = name.trim();
        self.columns.iter().position(|c| c.trim() == name)
    }

    pub fn rows(&self) -> &[PriceListRow] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> &PriceListRow {
        &self.rows[index]
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn origin(&self) -> (u32, u32) {
        self.origin
    }

    /// Number of rows that existed before this reconciliation pass
    pub fn original_rows(&self) -> usize {
        self.original_rows
    }

    /// Rows appended since load, in insertion order
    pub fn appended(&self) -> &[PriceListRow] {
        &self.rows[self.original_rows..]
    }

    pub fn patches(&self) -> &[CellPatch] {
        &self.patches
    }

    /// Overwrite a single cell. Edits to pre-existing rows are journaled for
    /// the writer; appended rows are serialized whole, so no patch is needed.
    pub fn set_cell(&mut self, row: usize, col: usize, value: CellValue) {
        if row < self.original_rows {
            self.patches.push(CellPatch {
                row,
                col,
                value: value.clone(),
            });
        }
        self.rows[row].cells[col] = value;
    }

    pub fn push_row(&mut self, row: PriceListRow) {
        debug_assert_eq!(row.cells.len(), self.columns.len());
        self.rows.push(row);
    }

    pub(crate) fn rows_mut(&mut self) -> &mut [PriceListRow] {
        &mut self.rows
    }
}

/// One row from a supplier's file: identity keys plus an ordered
/// column-name -> value mapping. Read-only once built.
#[derive(Debug, Clone, Default)]
pub struct SupplierRecord {
    pub keys: IdentityKeys,
    fields: Vec<(String, String)>,
}

impl SupplierRecord {
    pub fn new(fields: Vec<(String, String)>) -> Self {
        Self {
            keys: IdentityKeys::default(),
            fields,
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        let name = name.trim();
        self.fields
            .iter()
            .find(|(n, _)| n.trim() == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_journal_only_for_original_rows() {
        let mut list = PriceList::with_rows(
            vec!["a".to_string(), "b".to_string()],
            vec![PriceListRow::new(vec![CellValue::Empty, CellValue::Empty])],
            (0, 0),
        );

        list.set_cell(0, 1, CellValue::Number(2.0));
        assert_eq!(list.patches().len(), 1);

        list.push_row(PriceListRow::new(vec![
            CellValue::Text("x".to_string()),
            CellValue::Empty,
        ]));
        list.set_cell(1, 1, CellValue::Number(3.0));

        // Appended row edits are not journaled
        assert_eq!(list.patches().len(), 1);
        assert_eq!(list.appended().len(), 1);
        assert_eq!(list.original_rows(), 1);
    }

    #[test]
    fn test_column_index_trims() {
        let list = PriceList::new(vec!["codice ".to_string(), "prezzo".to_string()], (0, 0));
        assert_eq!(list.column_index("codice"), Some(0));
        assert_eq!(list.column_index(" prezzo "), Some(1));
        assert_eq!(list.column_index("ean"), None);
    }

    #[test]
    fn test_matchable_keys() {
        let mut keys = IdentityKeys::default();
        assert!(!keys.is_matchable());
        keys.set(IdentityField::Ean, Some("8001234".to_string()));
        assert!(keys.is_matchable());
        assert_eq!(keys.get(IdentityField::Ean), Some("8001234"));
        assert_eq!(keys.get(IdentityField::Code), None);
    }
}
