//! listcraft-core: price-list reconciliation engine
//!
//! Matches supplier records to the rows of a formula-bearing base workbook,
//! updates whitelisted fields, appends what never matched, and generates
//! discounted offers. The base workbook is rewritten copy-on-write: only
//! patched cells and appended rows change, every other byte survives.

pub mod cellref;
pub mod config;
pub mod error;
pub mod inserter;
pub mod matcher;
pub mod normalize;
pub mod offers;
pub mod reader;
pub mod record;
pub mod report;
pub mod updater;
pub mod writer;

pub use config::ReconcileConfig;
pub use error::{ReconcileError, Result};
pub use offers::Offer;
pub use reader::{load_price_list, load_supplier};
pub use record::{CellValue, IdentityField, PriceList, SupplierRecord};
pub use report::{Advisory, AdvisoryKind, ReconcileReport};
pub use writer::{write_offers, write_price_list};

use inserter::RowInserter;
use matcher::Matcher;
use normalize::RecordNormalizer;
use offers::OfferGenerator;
use updater::FieldUpdater;

/// Main reconciliation interface
pub struct Reconciler {
    config: ReconcileConfig,
}

impl Reconciler {
    /// Create a reconciler with default configuration
    pub fn new() -> Self {
        Self::with_config(ReconcileConfig::default())
    }

    /// Create a reconciler with custom configuration
    pub fn with_config(config: ReconcileConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    /// Apply one supplier list to the base list in place
    ///
    /// Runs the full match/update/insert pipeline and returns the report.
    /// The list accumulates patches and appended rows; calling this again
    /// with further supplier lists keeps reconciling against the evolving
    /// state.
    pub fn reconcile(
        &self,
        list: &mut PriceList,
        records: &[SupplierRecord],
    ) -> Result<ReconcileReport> {
        self.config.validate(list)?;

        let normalizer = RecordNormalizer::new(self.config.columns.clone());
        normalizer.refresh_keys(list);

        let mut report = ReconcileReport::default();

        let outcome = Matcher::new(self.config.matching.priority.clone()).pair(list, records);
        report.advisories.extend(outcome.advisories.iter().cloned());
        report.unmatched_base = outcome.unmatched_base.len();
        report.unmatched_supplier = outcome.unmatched_supplier.len();

        let whitelist = self.update_whitelist(list, records);
        FieldUpdater::new(whitelist).apply(list, records, &outcome.matched, &mut report);

        // Inserted rows also carry their identity columns, which the update
        // whitelist deliberately excludes
        let insert_columns = self
            .config
            .insert
            .columns
            .clone()
            .unwrap_or_else(|| self.shared_columns(list, records));
        RowInserter::new(insert_columns, self.config.insert.new_row_formulas).apply(
            list,
            records,
            &outcome.unmatched_supplier,
            &mut report,
        );

        Ok(report)
    }

    /// Generate the discounted offer table for the reconciled list
    pub fn generate_offers(
        &self,
        list: &PriceList,
        report: &mut ReconcileReport,
    ) -> Result<Vec<Offer>> {
        OfferGenerator::new(&self.config).generate(list, report)
    }

    /// The columns eligible for update: the configured whitelist, or when
    /// none is configured, the supplier columns that also exist in the base
    /// schema (identity columns excluded, they are keys, not payload)
    fn update_whitelist(&self, list: &PriceList, records: &[SupplierRecord]) -> Vec<String> {
        if let Some(fields) = &self.config.update.fields {
            return fields.clone();
        }

        let identity: Vec<&str> = self
            .config
            .matching
            .priority
            .iter()
            .map(|&f| self.config.columns.column_for(f))
            .collect();

        self.shared_columns(list, records)
            .into_iter()
            .filter(|name| !identity.iter().any(|c| c.trim() == name.trim()))
            .collect()
    }

    /// Supplier field names that also exist in the base schema, in the order
    /// they first appear
    fn shared_columns(&self, list: &PriceList, records: &[SupplierRecord]) -> Vec<String> {
        let mut seen = Vec::new();
        for record in records {
            for name in record.field_names() {
                if list.column_index(name).is_none() {
                    continue;
                }
                if !seen.iter().any(|s: &String| s == name) {
                    seen.push(name.to_string());
                }
            }
        }
        seen
    }
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new()
    }
}
