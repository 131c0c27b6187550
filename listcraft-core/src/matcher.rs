//! Pairing of supplier records to base rows
//!
//! Deterministic, priority-ordered exact matching: for each supplier record
//! the identity fields are probed in priority order and the first field that
//! yields exactly one live candidate wins. An ambiguous field (value shared
//! by several base rows) is skipped for that record instead of guessing.

use crate::record::{IdentityField, PriceList, SupplierRecord};
use crate::report::{Advisory, AdvisoryKind};
use std::collections::HashMap;

/// One matched (base row, supplier record) pair, tagged with the identity
/// field that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchPair {
    pub base_row: usize,
    pub supplier_row: usize,
    pub field: IdentityField,
}

/// Partition produced by a matching pass
#[derive(Debug, Clone, Default)]
pub struct MatchOutcome {
    pub matched: Vec<MatchPair>,
    /// Supplier record indices with no base row, in file order
    pub unmatched_supplier: Vec<usize>,
    /// Base row indices left untouched
    pub unmatched_base: Vec<usize>,
    pub advisories: Vec<Advisory>,
}

/// Folds an identity key into its comparable form; swap it to get looser
/// matching (e.g. case-insensitive codes) without touching the pairing logic
pub type KeyFold = Box<dyn Fn(&str) -> String + Send + Sync>;

pub struct Matcher {
    priority: Vec<IdentityField>,
    fold: KeyFold,
}

impl Matcher {
    pub fn new(priority: Vec<IdentityField>) -> Self {
        Self {
            priority,
            fold: Box::new(|key| key.to_string()),
        }
    }

    pub fn with_key_fold(mut self, fold: KeyFold) -> Self {
        self.fold = fold;
        self
    }

    /// Compute the match partition for one supplier list
    pub fn pair(&self, list: &PriceList, records: &[SupplierRecord]) -> MatchOutcome {
        let mut outcome = MatchOutcome::default();

        // One index per identity field: folded key -> base row indices
        let mut indices: HashMap<IdentityField, HashMap<String, Vec<usize>>> = HashMap::new();
        for &field in &self.priority {
            let index = indices.entry(field).or_default();
            for (row_idx, row) in list.rows().iter().enumerate() {
                if let Some(key) = row.keys.get(field) {
                    index.entry((self.fold)(key)).or_default().push(row_idx);
                }
            }
        }

        let mut taken = vec![false; list.len()];

        for (rec_idx, record) in records.iter().enumerate() {
            let mut matched = None;

            for &field in &self.priority {
                let Some(raw) = record.keys.get(field) else {
                    continue;
                };
                let key = (self.fold)(raw);
                let Some(candidates) = indices.get(&field).and_then(|idx| idx.get(&key)) else {
                    continue;
                };

                let live: Vec<usize> = candidates
                    .iter()
                    .copied()
                    .filter(|&row| !taken[row])
                    .collect();

                match live.len() {
                    0 => continue,
                    1 => {
                        matched = Some(MatchPair {
                            base_row: live[0],
                            supplier_row: rec_idx,
                            field,
                        });
                        break;
                    }
                    n => {
                        outcome.advisories.push(Advisory::new(
                            AdvisoryKind::AmbiguousMatch,
                            format!(
                                "supplier record {}: {} '{}' matches {} base rows, trying next field",
                                rec_idx + 1,
                                field,
                                raw,
                                n
                            ),
                        ));
                        continue;
                    }
                }
            }

            match matched {
                Some(pair) => {
                    taken[pair.base_row] = true;
                    outcome.matched.push(pair);
                }
                None => outcome.unmatched_supplier.push(rec_idx),
            }
        }

        outcome.unmatched_base = taken
            .iter()
            .enumerate()
            .filter(|&(_, &t)| !t)
            .map(|(i, _)| i)
            .collect();

        outcome
    }
}
