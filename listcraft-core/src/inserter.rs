//! Appending unmatched supplier records as new price-list rows

use crate::config::NewRowFormulas;
use crate::normalize;
use crate::record::{CellValue, PriceList, PriceListRow, SupplierRecord};
use crate::report::ReconcileReport;
use crate::updater::FieldCopy;

pub struct RowInserter {
    columns: Vec<String>,
    formulas: NewRowFormulas,
    copy: FieldCopy,
}

impl RowInserter {
    pub fn new(columns: Vec<String>, formulas: NewRowFormulas) -> Self {
        Self {
            columns,
            formulas,
            copy: Box::new(normalize::supplier_value_to_cell),
        }
    }

    pub fn with_field_copy(mut self, copy: FieldCopy) -> Self {
        self.copy = copy;
        self
    }

    /// Build and append one full-schema row per unmatched supplier record,
    /// preserving the order they appear in the supplier file
    pub fn apply(
        &self,
        list: &mut PriceList,
        records: &[SupplierRecord],
        unmatched: &[usize],
        report: &mut ReconcileReport,
    ) {
        let template: Option<(usize, Vec<CellValue>)> = match self.formulas {
            NewRowFormulas::CopyTemplate if list.original_rows() > 0 => {
                let idx = list.original_rows() - 1;
                Some((idx, list.row(idx).cells.to_vec()))
            }
            _ => None,
        };

        let columns: Vec<String> = list.columns().to_vec();

        for &rec_idx in unmatched {
            let record = &records[rec_idx];
            let new_row_idx = list.len();

            let cells: Vec<CellValue> = columns
                .iter()
                .enumerate()
                .map(|(col_idx, name)| {
                    let mapped = self.columns.iter().any(|c| c.trim() == name.trim());
                    if mapped {
                        if let Some(raw) = record.get(name) {
                            if !raw.trim().is_empty() {
                                return (self.copy)(raw);
                            }
                        }
                    }
                    if let Some((template_idx, template_cells)) = &template {
                        if let Some(CellValue::Formula { text, .. }) = template_cells.get(col_idx) {
                            let delta = new_row_idx as i64 - *template_idx as i64;
                            return CellValue::formula(shift_formula_rows(text, delta));
                        }
                    }
                    CellValue::Empty
                })
                .collect();

            let mut row = PriceListRow::new(cells);
            row.keys = record.keys.clone();
            list.push_row(row);
            report.inserted += 1;
        }
    }
}

/// Shift the row number of every relative cell reference in a formula
///
/// Absolute rows (`A$12`), function names (`LOG10(`), sheet names
/// (`Sheet1!`) and quoted string literals are left untouched. This is the
/// whole of what template propagation needs; it is not a formula parser.
pub fn shift_formula_rows(formula: &str, delta: i64) -> String {
    let chars: Vec<char> = formula.chars().collect();
    let mut out = String::with_capacity(formula.len() + 8);
    let mut in_string = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c == '"' {
            in_string = !in_string;
            out.push(c);
            i += 1;
            continue;
        }
        if in_string {
            out.push(c);
            i += 1;
            continue;
        }

        if c.is_ascii_alphabetic() || c == '$' {
            let start = i;
            let mut j = i;
            if chars[j] == '$' {
                j += 1;
            }
            let col_start = j;
            while j < chars.len() && chars[j].is_ascii_alphabetic() {
                j += 1;
            }
            let col_len = j - col_start;

            let mut k = j;
            let abs_row = k < chars.len() && chars[k] == '$';
            if abs_row {
                k += 1;
            }
            let digit_start = k;
            while k < chars.len() && chars[k].is_ascii_digit() {
                k += 1;
            }
            let digit_len = k - digit_start;

            let next = chars.get(k).copied();
            let is_ref = (1..=3).contains(&col_len)
                && digit_len >= 1
                && next != Some('(')
                && next != Some('!')
                && !matches!(next, Some(ch) if ch.is_ascii_alphanumeric() || ch == '_' || ch == '.');

            if is_ref && !abs_row {
                let row: i64 = chars[digit_start..k]
                    .iter()
                    .collect::<String>()
                    .parse()
                    .unwrap_or(0);
                out.extend(chars[start..digit_start].iter());
                out.push_str(&(row + delta).to_string());
                i = k;
            } else if is_ref {
                out.extend(chars[start..k].iter());
                i = k;
            } else {
                // Not a cell reference: swallow the whole identifier run so
                // a name like PIPPO1A2 is never half-shifted
                while k < chars.len()
                    && (chars[k].is_ascii_alphanumeric() || chars[k] == '_' || chars[k] == '.')
                {
                    k += 1;
                }
                let end = k.max(start + 1);
                out.extend(chars[start..end].iter());
                i = end;
            }
            continue;
        }

        out.push(c);
        i += 1;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::ReconcileReport;

    fn base_list() -> PriceList {
        PriceList::with_rows(
            vec![
                "codice".to_string(),
                "prezzo di listino".to_string(),
                "prezzo ivato".to_string(),
            ],
            vec![PriceListRow::new(vec![
                CellValue::Text("A1".to_string()),
                CellValue::Number(10.0),
                CellValue::formula("B2*1.22"),
            ])],
            (0, 0),
        )
    }

    fn record(fields: Vec<(&str, &str)>) -> SupplierRecord {
        SupplierRecord::new(
            fields
                .into_iter()
                .map(|(n, v)| (n.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_insert_maps_only_configured_columns() {
        let mut list = base_list();
        let records = vec![record(vec![
            ("codice", "B7"),
            ("prezzo di listino", "5,50"),
            ("prezzo ivato", "99"),
        ])];
        let mut report = ReconcileReport::default();

        let inserter = RowInserter::new(
            vec!["codice".to_string(), "prezzo di listino".to_string()],
            NewRowFormulas::Blank,
        );
        inserter.apply(&mut list, &records, &[0], &mut report);

        assert_eq!(list.len(), 2);
        assert_eq!(report.inserted, 1);
        let new_row = list.row(1);
        assert_eq!(new_row.cells[0], CellValue::Text("B7".to_string()));
        assert_eq!(new_row.cells[1], CellValue::Number(5.5));
        // "prezzo ivato" is not in the mapping, so the supplier value is dropped
        assert_eq!(new_row.cells[2], CellValue::Empty);
    }

    #[test]
    fn test_insert_copy_template_shifts_formulas() {
        let mut list = base_list();
        let records = vec![record(vec![("codice", "B7")])];
        let mut report = ReconcileReport::default();

        let inserter = RowInserter::new(vec!["codice".to_string()], NewRowFormulas::CopyTemplate);
        inserter.apply(&mut list, &records, &[0], &mut report);

        let new_row = list.row(1);
        assert_eq!(new_row.cells[2], CellValue::formula("B3*1.22"));
    }

    #[test]
    fn test_insertion_completeness_and_order() {
        let mut list = base_list();
        let records = vec![
            record(vec![("codice", "X1")]),
            record(vec![("codice", "X2")]),
            record(vec![("codice", "X3")]),
        ];
        let mut report = ReconcileReport::default();

        let inserter = RowInserter::new(vec!["codice".to_string()], NewRowFormulas::Blank);
        inserter.apply(&mut list, &records, &[0, 1, 2], &mut report);

        assert_eq!(list.len(), 4);
        assert_eq!(report.inserted, 3);
        assert_eq!(list.appended().len(), 3);
        let codes: Vec<_> = list.appended().iter().map(|r| r.cells[0].clone()).collect();
        assert_eq!(
            codes,
            vec![
                CellValue::Text("X1".to_string()),
                CellValue::Text("X2".to_string()),
                CellValue::Text("X3".to_string()),
            ]
        );
    }

    #[test]
    fn test_shift_formula_rows() {
        assert_eq!(shift_formula_rows("B2*1.22", 3), "B5*1.22");
        assert_eq!(shift_formula_rows("SUM(A2:C2)", 1), "SUM(A3:C3)");
        // Absolute rows stay put, absolute columns still shift their row
        assert_eq!(shift_formula_rows("A$1+$B2", 5), "A$1+$B7");
        // Function names with digits are not references
        assert_eq!(shift_formula_rows("LOG10(B2)", 2), "LOG10(B4)");
        // Sheet names are not references
        assert_eq!(shift_formula_rows("Sheet1!B2", 1), "Sheet1!B3");
        // Quoted literals are untouched
        assert_eq!(shift_formula_rows("IF(B2>0,\"A1 ok\",C2)", 1), "IF(B3>0,\"A1 ok\",C3)");
    }
}
