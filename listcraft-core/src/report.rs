//! Run summary: counters plus accumulated advisories

use serde::{Deserialize, Serialize};

/// Non-fatal condition kinds surfaced in the final report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AdvisoryKind {
    /// An identity field value mapped to more than one base row
    AmbiguousMatch,
    /// A whitelisted field landed on a formula cell and was left alone
    FormulaProtected,
    /// A row's price could not be parsed during offer generation
    UnresolvedPrice,
}

impl AdvisoryKind {
    pub fn as_str(&self) -> &str {
        match self {
            AdvisoryKind::AmbiguousMatch => "ambiguous-match",
            AdvisoryKind::FormulaProtected => "formula-protected",
            AdvisoryKind::UnresolvedPrice => "unresolved-price",
        }
    }
}

/// A single non-fatal advisory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advisory {
    pub kind: AdvisoryKind,
    pub message: String,
}

impl Advisory {
    pub fn new(kind: AdvisoryKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Aggregated counts for one reconciliation run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReconcileReport {
    /// Matched rows with at least one field actually changed
    pub updated: usize,
    /// New rows appended from unmatched supplier records
    pub inserted: usize,
    /// Base rows no supplier record paired with
    pub unmatched_base: usize,
    /// Supplier records no base row paired with (same records that were inserted)
    pub unmatched_supplier: usize,
    /// Offers generated
    pub offers_generated: usize,
    /// Rows excluded from offer generation
    pub offers_skipped: usize,
    pub advisories: Vec<Advisory>,
}

impl ReconcileReport {
    pub fn advise(&mut self, kind: AdvisoryKind, message: impl Into<String>) {
        self.advisories.push(Advisory::new(kind, message));
    }

    pub fn advisory_count(&self, kind: AdvisoryKind) -> usize {
        self.advisories.iter().filter(|a| a.kind == kind).count()
    }
}
