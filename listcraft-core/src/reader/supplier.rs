//! Supplier list loading
//!
//! Spreadsheets go through calamine, delimited text through the csv crate.
//! Either way the result is the same: trimmed headers (renamed per the
//! supplier config) and one [`SupplierRecord`] per non-empty data row.

use super::{data_to_string, extension_of};
use crate::config::ReconcileConfig;
use crate::error::{ReconcileError, Result};
use crate::normalize::{RecordNormalizer, clean_header};
use crate::record::SupplierRecord;
use calamine::{Reader, open_workbook_auto};
use std::path::Path;

pub fn load_supplier(path: &Path, config: &ReconcileConfig) -> Result<Vec<SupplierRecord>> {
    let ext = extension_of(path);
    match ext.as_str() {
        "xlsx" | "xlsm" | "xls" | "ods" => load_spreadsheet(path, config),
        "csv" | "txt" => load_delimited(path, config),
        other => Err(ReconcileError::load(
            path,
            format!("unsupported supplier format '.{other}'"),
        )),
    }
}

fn load_spreadsheet(path: &Path, config: &ReconcileConfig) -> Result<Vec<SupplierRecord>> {
    let mut workbook =
        open_workbook_auto(path).map_err(|e| ReconcileError::load(path, e.to_string()))?;
    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| ReconcileError::load(path, "workbook has no sheets"))?;
    let range = workbook.worksheet_range(&sheet_name)?;

    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(header_row) => header_row
            .iter()
            .map(|cell| clean_header(&data_to_string(cell)))
            .collect(),
        None => {
            return Err(ReconcileError::load(path, "supplier list has no header row"));
        }
    };

    let normalizer = RecordNormalizer::new(config.columns.clone());
    let mut records = Vec::new();
    for row in rows {
        let values: Vec<String> = row.iter().map(data_to_string).collect();
        if values.iter().all(|v| v.is_empty()) {
            continue;
        }
        records.push(normalizer.supplier_record(&headers, values, &config.supplier.columns));
    }

    Ok(records)
}

fn load_delimited(path: &Path, config: &ReconcileConfig) -> Result<Vec<SupplierRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| ReconcileError::load(path, e.to_string()))?;

    let headers: Vec<String> = reader.headers()?.iter().map(clean_header).collect();

    let normalizer = RecordNormalizer::new(config.columns.clone());
    let mut records = Vec::new();
    for record in reader.records() {
        let record = record?;
        let values: Vec<String> = record.iter().map(|v| v.to_string()).collect();
        if values.iter().all(|v| v.trim().is_empty()) {
            continue;
        }
        records.push(normalizer.supplier_record(&headers, values, &config.supplier.columns));
    }

    Ok(records)
}
