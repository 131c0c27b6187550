//! Base price-list loading
//!
//! Reads the first sheet of the workbook through calamine twice: once for
//! cached values, once for formulas. Where both exist the cell becomes a
//! formula variant carrying the cached number, so the rest of the engine
//! refuses to overwrite it but can still read its last evaluated value.

use super::{data_to_cell, extension_of};
use crate::error::{ReconcileError, Result};
use crate::record::{CellValue, PriceList, PriceListRow};
use calamine::{Data, Range, Reader, open_workbook_auto};
use std::path::Path;

pub fn load_price_list(path: &Path) -> Result<PriceList> {
    let ext = extension_of(path);
    if ext != "xlsx" && ext != "xlsm" {
        return Err(ReconcileError::load(
            path,
            format!("unsupported base list format '.{ext}' (expected .xlsx or .xlsm)"),
        ));
    }

    let mut workbook =
        open_workbook_auto(path).map_err(|e| ReconcileError::load(path, e.to_string()))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| ReconcileError::load(path, "workbook has no sheets"))?;

    let range = workbook.worksheet_range(&sheet_name)?;
    // A sheet without formulas is fine; a formula parse failure is not worth
    // aborting over either, the cells just read as values.
    let formula_range = workbook.worksheet_formula(&sheet_name).ok();

    let (grid, origin) = build_grid(&range, formula_range.as_ref());

    let mut rows_iter = grid.into_iter();
    let header = rows_iter
        .next()
        .ok_or_else(|| ReconcileError::load(path, "base list has no header row"))?;
    let columns: Vec<String> = header.iter().map(header_name).collect();

    let rows: Vec<PriceListRow> = rows_iter.map(PriceListRow::new).collect();

    Ok(PriceList::with_rows(columns, rows, origin))
}

/// Merge the value range and the formula range into one row-major grid over
/// their union bounding box
fn build_grid(
    range: &Range<Data>,
    formula_range: Option<&Range<String>>,
) -> (Vec<Vec<CellValue>>, (u32, u32)) {
    let (r_start, r_end) = (
        range.start().unwrap_or((u32::MAX, u32::MAX)),
        range.end().unwrap_or((0, 0)),
    );
    let (f_start, f_end) = match formula_range {
        Some(f) => (
            f.start().unwrap_or((u32::MAX, u32::MAX)),
            f.end().unwrap_or((0, 0)),
        ),
        None => ((u32::MAX, u32::MAX), (0, 0)),
    };

    let min_row = r_start.0.min(f_start.0);
    let min_col = r_start.1.min(f_start.1);
    let max_row = r_end.0.max(f_end.0);
    let max_col = r_end.1.max(f_end.1);

    if min_row > max_row || min_col > max_col {
        return (Vec::new(), (0, 0));
    }

    let mut grid = Vec::with_capacity((max_row - min_row + 1) as usize);
    for row in min_row..=max_row {
        let mut cells = Vec::with_capacity((max_col - min_col + 1) as usize);
        for col in min_col..=max_col {
            let formula = formula_range
                .and_then(|f| get_at(f, f_start, row, col))
                .filter(|f: &&String| !f.is_empty());

            let cell = if let Some(f) = formula {
                // Keep the workbook's cached result next to the formula text
                let cached = get_at(range, r_start, row, col)
                    .map(data_to_cell)
                    .and_then(|c| c.as_number());
                CellValue::Formula {
                    text: f.clone(),
                    cached,
                }
            } else {
                get_at(range, r_start, row, col)
                    .map(data_to_cell)
                    .unwrap_or(CellValue::Empty)
            };
            cells.push(cell);
        }
        grid.push(cells);
    }

    (grid, (min_row, min_col))
}

fn get_at<T: calamine::CellType>(range: &Range<T>, start: (u32, u32), row: u32, col: u32) -> Option<&T> {
    if row < start.0 || col < start.1 {
        return None;
    }
    range.get(((row - start.0) as usize, (col - start.1) as usize))
}

fn header_name(cell: &CellValue) -> String {
    match cell {
        CellValue::Text(s) => s.trim().to_string(),
        CellValue::Number(n) => {
            if n.fract() == 0.0 {
                format!("{}", *n as i64)
            } else {
                format!("{n}")
            }
        }
        _ => String::new(),
    }
}
