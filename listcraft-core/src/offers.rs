//! Promotional offer generation from the refreshed price list

use crate::config::ReconcileConfig;
use crate::error::{ReconcileError, Result};
use crate::normalize;
use crate::record::{CellValue, PriceList, PriceListRow};
use crate::report::{AdvisoryKind, ReconcileReport};

/// One derived offer row; never written back into the price list
#[derive(Debug, Clone, PartialEq)]
pub struct Offer {
    pub code: String,
    pub description: String,
    pub original_price: f64,
    pub discount_rate: f64,
    /// Discount amount, rounded to 2 decimals
    pub discount: f64,
    /// `round(original_price * (1 - discount_rate), 2)`
    pub promotional_price: f64,
}

/// Discount policy; implement it to vary the rate by category, volume or any
/// other row attribute
pub trait RatePolicy: Send + Sync {
    fn rate(&self, row: &PriceListRow, list: &PriceList) -> f64;
}

/// Uniform discount rate for every row
pub struct FlatRate(pub f64);

impl RatePolicy for FlatRate {
    fn rate(&self, _row: &PriceListRow, _list: &PriceList) -> f64 {
        self.0
    }
}

pub struct OfferGenerator {
    code_column: String,
    description_column: String,
    price_column: String,
    policy: Box<dyn RatePolicy>,
}

impl OfferGenerator {
    pub fn new(config: &ReconcileConfig) -> Self {
        Self {
            code_column: config.columns.code.clone(),
            description_column: config.columns.description.clone(),
            price_column: config.columns.price.clone(),
            policy: Box::new(FlatRate(config.offers.discount)),
        }
    }

    pub fn with_policy(mut self, policy: Box<dyn RatePolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Produce one offer per row with a resolvable positive price
    ///
    /// Formula-priced rows use the workbook's cached result. Rows whose
    /// price is missing, non-numeric, a formula with no cached value, or
    /// not positive are skipped and counted.
    pub fn generate(&self, list: &PriceList, report: &mut ReconcileReport) -> Result<Vec<Offer>> {
        let code_col = list
            .column_index(&self.code_column)
            .ok_or_else(|| ReconcileError::schema(&self.code_column, "offer code column"))?;
        let price_col = list
            .column_index(&self.price_column)
            .ok_or_else(|| ReconcileError::schema(&self.price_column, "offer price column"))?;
        let description_col = list.column_index(&self.description_column);

        let mut offers = Vec::new();

        for (row_idx, row) in list.rows().iter().enumerate() {
            let price = match &row.cells[price_col] {
                CellValue::Number(n) => Some(*n),
                CellValue::Text(s) => normalize::parse_price(s),
                CellValue::Formula { cached, .. } => *cached,
                _ => None,
            };

            let Some(price) = price.filter(|p| *p > 0.0) else {
                report.offers_skipped += 1;
                report.advise(
                    AdvisoryKind::UnresolvedPrice,
                    format!(
                        "row {}: no usable price in '{}', excluded from offers",
                        row_idx + 1,
                        self.price_column
                    ),
                );
                continue;
            };

            let rate = self.policy.rate(row, list);
            offers.push(Offer {
                code: cell_display(&row.cells[code_col]),
                description: description_col
                    .map(|c| cell_display(&row.cells[c]))
                    .unwrap_or_default(),
                original_price: price,
                discount_rate: rate,
                discount: round2(price * rate),
                promotional_price: round2(price * (1.0 - rate)),
            });
        }

        report.offers_generated = offers.len();
        Ok(offers)
    }
}

fn cell_display(cell: &CellValue) -> String {
    match cell {
        CellValue::Empty => String::new(),
        CellValue::Number(n) => {
            if n.fract() == 0.0 && n.abs() < 1e15 {
                format!("{}", *n as i64)
            } else {
                format!("{n}")
            }
        }
        CellValue::Text(s) => s.clone(),
        CellValue::Boolean(b) => b.to_string(),
        CellValue::Formula { text, .. } => format!("={text}"),
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
