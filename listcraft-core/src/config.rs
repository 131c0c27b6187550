//! Configuration for the reconciliation pipeline
//!
//! Loaded from TOML. Every table is optional; the defaults reproduce the
//! column layout of the original listino workbook.

use crate::error::{ReconcileError, Result};
use crate::record::{IdentityField, PriceList};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Main reconciliation configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReconcileConfig {
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub columns: ColumnBindings,
    #[serde(default)]
    pub update: UpdateConfig,
    #[serde(default)]
    pub insert: InsertConfig,
    #[serde(default)]
    pub offers: OffersConfig,
    #[serde(default)]
    pub supplier: SupplierConfig,
}

impl ReconcileConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let config: ReconcileConfig = toml::from_str(&content)
            .map_err(|e| ReconcileError::load(path, format!("invalid config: {e}")))?;
        Ok(config)
    }

    /// Check the loaded base schema against the configured identity and
    /// update columns. A missing column here is fatal: matching against a
    /// column that does not exist would silently never pair anything.
    pub fn validate(&self, list: &PriceList) -> Result<()> {
        for &field in &self.matching.priority {
            let column = self.columns.column_for(field);
            if list.column_index(column).is_none() {
                return Err(ReconcileError::schema(
                    column,
                    format!("bound to identity field '{field}'"),
                ));
            }
        }

        if let Some(fields) = &self.update.fields {
            for column in fields {
                if list.column_index(column).is_none() {
                    return Err(ReconcileError::schema(column, "listed in update.fields"));
                }
            }
        }

        if let Some(columns) = &self.insert.columns {
            for column in columns {
                if list.column_index(column).is_none() {
                    return Err(ReconcileError::schema(column, "listed in insert.columns"));
                }
            }
        }

        Ok(())
    }
}

/// Identity-field priority for matching
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
    #[serde(default = "default_priority")]
    pub priority: Vec<IdentityField>,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            priority: default_priority(),
        }
    }
}

fn default_priority() -> Vec<IdentityField> {
    vec![
        IdentityField::Code,
        IdentityField::SupplierCode,
        IdentityField::Ean,
    ]
}

/// Column names bound to the fields the engine reasons about
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnBindings {
    #[serde(default = "default_code_column")]
    pub code: String,
    #[serde(default = "default_supplier_code_column")]
    pub supplier_code: String,
    #[serde(default = "default_ean_column")]
    pub ean: String,
    #[serde(default = "default_price_column")]
    pub price: String,
    #[serde(default = "default_description_column")]
    pub description: String,
}

impl ColumnBindings {
    pub fn column_for(&self, field: IdentityField) -> &str {
        match field {
            IdentityField::Code => &self.code,
            IdentityField::SupplierCode => &self.supplier_code,
            IdentityField::Ean => &self.ean,
        }
    }
}

impl Default for ColumnBindings {
    fn default() -> Self {
        Self {
            code: default_code_column(),
            supplier_code: default_supplier_code_column(),
            ean: default_ean_column(),
            price: default_price_column(),
            description: default_description_column(),
        }
    }
}

fn default_code_column() -> String {
    "codice".to_string()
}

fn default_supplier_code_column() -> String {
    "codice fornitore".to_string()
}

fn default_ean_column() -> String {
    "Codice EAN".to_string()
}

fn default_price_column() -> String {
    "prezzo di listino".to_string()
}

fn default_description_column() -> String {
    "Descrizione articolo".to_string()
}

/// Update-field whitelist
///
/// When `fields` is absent the whitelist is derived per run as the supplier
/// columns that also exist in the base schema.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateConfig {
    pub fields: Option<Vec<String>>,
}

/// Insertion policy for unmatched supplier records
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InsertConfig {
    /// Base columns populated from the supplier record; defaults to the
    /// update whitelist.
    pub columns: Option<Vec<String>>,
    #[serde(default)]
    pub new_row_formulas: NewRowFormulas,
}

/// Whether newly inserted rows inherit computed-column formulas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NewRowFormulas {
    /// Leave non-mapped columns empty
    #[default]
    Blank,
    /// Re-apply the last original row's formulas, shifting relative row
    /// references to the new row
    CopyTemplate,
}

/// Offer generation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OffersConfig {
    #[serde(default = "default_discount")]
    pub discount: f64,
}

impl Default for OffersConfig {
    fn default() -> Self {
        Self {
            discount: default_discount(),
        }
    }
}

fn default_discount() -> f64 {
    0.10
}

/// Supplier-side adjustments applied while loading a supplier list
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SupplierConfig {
    /// Rename table from supplier header to base column name, for suppliers
    /// whose files use their own headings
    #[serde(default)]
    pub columns: HashMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::PriceList;

    #[test]
    fn test_defaults() {
        let config = ReconcileConfig::default();
        assert_eq!(
            config.matching.priority,
            vec![
                IdentityField::Code,
                IdentityField::SupplierCode,
                IdentityField::Ean
            ]
        );
        assert_eq!(config.columns.code, "codice");
        assert_eq!(config.columns.ean, "Codice EAN");
        assert_eq!(config.offers.discount, 0.10);
        assert_eq!(config.insert.new_row_formulas, NewRowFormulas::Blank);
        assert!(config.update.fields.is_none());
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
            [matching]
            priority = ["ean", "code"]

            [columns]
            code = "sku"
            price = "list price"

            [update]
            fields = ["list price"]

            [insert]
            new_row_formulas = "copy-template"

            [offers]
            discount = 0.25

            [supplier.columns]
            "PRICE EUR" = "list price"
        "#;
        let config: ReconcileConfig = toml::from_str(toml).unwrap();
        assert_eq!(
            config.matching.priority,
            vec![IdentityField::Ean, IdentityField::Code]
        );
        assert_eq!(config.columns.code, "sku");
        // Unspecified bindings keep their defaults
        assert_eq!(config.columns.ean, "Codice EAN");
        assert_eq!(config.update.fields.as_deref(), Some(&["list price".to_string()][..]));
        assert_eq!(config.insert.new_row_formulas, NewRowFormulas::CopyTemplate);
        assert_eq!(config.offers.discount, 0.25);
        assert_eq!(
            config.supplier.columns.get("PRICE EUR").map(String::as_str),
            Some("list price")
        );
    }

    #[test]
    fn test_validate_missing_identity_column() {
        let config = ReconcileConfig::default();
        let list = PriceList::new(vec!["codice".to_string(), "prezzo di listino".to_string()], (0, 0));

        // "codice fornitore" and "Codice EAN" are bound but absent
        let err = config.validate(&list).unwrap_err();
        match err {
            ReconcileError::Schema { column, .. } => assert_eq!(column, "codice fornitore"),
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_update_fields() {
        let mut config = ReconcileConfig::default();
        config.matching.priority = vec![IdentityField::Code];
        config.update.fields = Some(vec!["peso".to_string()]);
        let list = PriceList::new(vec!["codice".to_string()], (0, 0));

        let err = config.validate(&list).unwrap_err();
        match err {
            ReconcileError::Schema { column, .. } => assert_eq!(column, "peso"),
            other => panic!("expected schema error, got {other:?}"),
        }
    }
}
