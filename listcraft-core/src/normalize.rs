//! Record normalization: identity-key extraction and value coercion
//!
//! Supplier files and base sheets disagree about types constantly: codes
//! arrive as floats ("8001234.0"), EANs in scientific notation, prices with
//! decimal commas. Everything funnels through here before the matcher sees
//! it.

use crate::config::ColumnBindings;
use crate::record::{CellValue, IdentityKeys, PriceList, SupplierRecord};

/// Trim a header cell into a canonical column name
pub fn clean_header(raw: &str) -> String {
    raw.trim().to_string()
}

/// Normalize a raw identity value into a comparable key
///
/// Returns `None` for blank values so an empty string never matches another
/// empty string. Values that are really numbers rendered as floats
/// ("8001234.0", "8.012345678901E12") are collapsed to their integer form;
/// plain strings, including zero-padded codes like "0042", pass through
/// untouched.
pub fn normalize_key(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let looks_float = trimmed.contains('.') || trimmed.contains('e') || trimmed.contains('E');
    if looks_float {
        if let Ok(f) = trimmed.parse::<f64>() {
            if f.fract() == 0.0 && f.abs() < 1e15 {
                return Some(format!("{}", f as i64));
            }
        }
    }

    Some(trimmed.to_string())
}

/// Identity key from a literal cell; formula cells never act as keys
pub fn cell_key(cell: &CellValue) -> Option<String> {
    match cell {
        CellValue::Number(n) => {
            if n.fract() == 0.0 && n.abs() < 1e15 {
                Some(format!("{}", *n as i64))
            } else {
                Some(format!("{n}"))
            }
        }
        CellValue::Text(s) => normalize_key(s),
        _ => None,
    }
}

/// Parse a price that may use a decimal comma ("12,50")
pub fn parse_price(raw: &str) -> Option<f64> {
    let cleaned = raw.trim().replace(',', ".");
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok()
}

/// Convert a raw supplier value into a cell for writing into the base list
///
/// Clean decimals become numbers (decimal commas included); everything else
/// stays text. Zero-padded values like "0042" are kept textual so codes
/// survive round trips.
pub fn supplier_value_to_cell(raw: &str) -> CellValue {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return CellValue::Empty;
    }

    let zero_padded = trimmed.len() > 1
        && trimmed.starts_with('0')
        && !trimmed.starts_with("0.")
        && !trimmed.starts_with("0,");
    if !zero_padded {
        if let Some(n) = parse_price(trimmed) {
            return CellValue::Number(n);
        }
    }

    CellValue::Text(trimmed.to_string())
}

/// Extracts identity keys for both sides of the reconciliation
#[derive(Debug, Clone)]
pub struct RecordNormalizer {
    bindings: ColumnBindings,
}

impl RecordNormalizer {
    pub fn new(bindings: ColumnBindings) -> Self {
        Self { bindings }
    }

    /// Extract identity keys for one base row
    pub fn keys_for_row(&self, columns: &[String], cells: &[CellValue]) -> IdentityKeys {
        let mut keys = IdentityKeys::default();
        for field in [
            crate::record::IdentityField::Code,
            crate::record::IdentityField::SupplierCode,
            crate::record::IdentityField::Ean,
        ] {
            let column = self.bindings.column_for(field).trim();
            let value = columns
                .iter()
                .position(|c| c.trim() == column)
                .and_then(|i| cells.get(i))
                .and_then(cell_key);
            keys.set(field, value);
        }
        keys
    }

    /// Re-extract identity keys on every row of the list
    ///
    /// Called before each reconciliation pass so keys stay consistent when
    /// several supplier lists are applied sequentially against the evolving
    /// base list.
    pub fn refresh_keys(&self, list: &mut PriceList) {
        let columns: Vec<String> = list.columns().to_vec();
        for row in list.rows_mut() {
            row.keys = self.keys_for_row(&columns, &row.cells);
        }
    }

    /// Build a supplier record from raw header/value pairs, applying the
    /// configured rename table and extracting identity keys
    pub fn supplier_record(
        &self,
        headers: &[String],
        values: Vec<String>,
        renames: &std::collections::HashMap<String, String>,
    ) -> SupplierRecord {
        let fields: Vec<(String, String)> = headers
            .iter()
            .zip(values)
            .map(|(h, v)| {
                let name = renames
                    .get(h.trim())
                    .cloned()
                    .unwrap_or_else(|| clean_header(h));
                (name, v.trim().to_string())
            })
            .collect();

        let mut record = SupplierRecord::new(fields);
        for field in [
            crate::record::IdentityField::Code,
            crate::record::IdentityField::SupplierCode,
            crate::record::IdentityField::Ean,
        ] {
            let column = self.bindings.column_for(field);
            let value = record.get(column).and_then(normalize_key);
            record.keys.set(field, value);
        }
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::IdentityField;
    use std::collections::HashMap;

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key("  ABC-12 "), Some("ABC-12".to_string()));
        assert_eq!(normalize_key(""), None);
        assert_eq!(normalize_key("   "), None);
        // Floats collapse to integer form
        assert_eq!(normalize_key("8001234.0"), Some("8001234".to_string()));
        assert_eq!(
            normalize_key("8.012345678901E12"),
            Some("8012345678901".to_string())
        );
        // Zero-padded codes keep their zeros
        assert_eq!(normalize_key("0042"), Some("0042".to_string()));
        // Genuine decimals are left alone
        assert_eq!(normalize_key("12.5"), Some("12.5".to_string()));
    }

    #[test]
    fn test_cell_key() {
        assert_eq!(
            cell_key(&CellValue::Number(8012345678901.0)),
            Some("8012345678901".to_string())
        );
        assert_eq!(cell_key(&CellValue::Text(" A1 ".to_string())), Some("A1".to_string()));
        assert_eq!(cell_key(&CellValue::Empty), None);
        assert_eq!(cell_key(&CellValue::formula("=B2")), None);
    }

    #[test]
    fn test_parse_price() {
        assert_eq!(parse_price("12,50"), Some(12.5));
        assert_eq!(parse_price(" 100.00 "), Some(100.0));
        assert_eq!(parse_price("n/a"), None);
        assert_eq!(parse_price(""), None);
    }

    #[test]
    fn test_supplier_value_to_cell() {
        assert_eq!(supplier_value_to_cell("12,50"), CellValue::Number(12.5));
        assert_eq!(supplier_value_to_cell("100"), CellValue::Number(100.0));
        assert_eq!(
            supplier_value_to_cell("0042"),
            CellValue::Text("0042".to_string())
        );
        assert_eq!(supplier_value_to_cell("0.5"), CellValue::Number(0.5));
        assert_eq!(
            supplier_value_to_cell("widget"),
            CellValue::Text("widget".to_string())
        );
        assert_eq!(supplier_value_to_cell("  "), CellValue::Empty);
    }

    #[test]
    fn test_supplier_record_with_renames() {
        let normalizer = RecordNormalizer::new(ColumnBindings::default());
        let headers = vec!["PRICE EUR".to_string(), "codice".to_string()];
        let mut renames = HashMap::new();
        renames.insert("PRICE EUR".to_string(), "prezzo di listino".to_string());

        let record = normalizer.supplier_record(
            &headers,
            vec!["9,90".to_string(), "A100".to_string()],
            &renames,
        );

        assert_eq!(record.get("prezzo di listino"), Some("9,90"));
        assert_eq!(record.keys.get(IdentityField::Code), Some("A100"));
        assert!(record.keys.is_matchable());
    }

    #[test]
    fn test_keys_for_row() {
        let normalizer = RecordNormalizer::new(ColumnBindings::default());
        let columns = vec!["codice".to_string(), "Codice EAN".to_string()];
        let cells = vec![
            CellValue::Text("A1".to_string()),
            CellValue::Number(8001234567890.0),
        ];

        let keys = normalizer.keys_for_row(&columns, &cells);
        assert_eq!(keys.get(IdentityField::Code), Some("A1"));
        assert_eq!(keys.get(IdentityField::Ean), Some("8001234567890"));
        assert_eq!(keys.get(IdentityField::SupplierCode), None);
    }
}
