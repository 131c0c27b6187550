//! Whitelist-driven field updates on matched rows

use crate::matcher::MatchPair;
use crate::normalize;
use crate::record::{CellValue, PriceList, SupplierRecord};
use crate::report::{AdvisoryKind, ReconcileReport};

/// Converts a raw supplier value into the cell to write; swap it to change
/// coercion rules (e.g. force everything textual) without touching the
/// update policy
pub type FieldCopy = Box<dyn Fn(&str) -> CellValue + Send + Sync>;

pub struct FieldUpdater {
    fields: Vec<String>,
    copy: FieldCopy,
}

impl FieldUpdater {
    pub fn new(fields: Vec<String>) -> Self {
        Self {
            fields,
            copy: Box::new(normalize::supplier_value_to_cell),
        }
    }

    pub fn with_field_copy(mut self, copy: FieldCopy) -> Self {
        self.copy = copy;
        self
    }

    /// Apply whitelisted supplier values onto matched base rows
    ///
    /// Cells outside the whitelist are never touched; neither are formula
    /// cells, whitelisted or not. The updated counter moves once per pair
    /// with at least one real change, so a value-identical pass is a no-op.
    pub fn apply(
        &self,
        list: &mut PriceList,
        records: &[SupplierRecord],
        pairs: &[MatchPair],
        report: &mut ReconcileReport,
    ) {
        for pair in pairs {
            let record = &records[pair.supplier_row];
            let mut changed = false;

            for field in &self.fields {
                let Some(col) = list.column_index(field) else {
                    continue;
                };
                let Some(raw) = record.get(field) else {
                    continue;
                };
                if raw.trim().is_empty() {
                    continue;
                }

                let existing = &list.row(pair.base_row).cells[col];
                if existing.is_formula() {
                    report.advise(
                        AdvisoryKind::FormulaProtected,
                        format!(
                            "row {}: column '{}' holds a formula, supplier value '{}' not applied",
                            pair.base_row + 1,
                            field,
                            raw.trim()
                        ),
                    );
                    continue;
                }

                let incoming = (self.copy)(raw);
                if incoming.is_empty() || incoming == *existing {
                    continue;
                }

                list.set_cell(pair.base_row, col, incoming);
                changed = true;
            }

            if changed {
                report.updated += 1;
            }
        }
    }
}
