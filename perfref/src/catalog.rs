//! Reference catalogs
//!
//! A check usually carries several reference tables, one per variant
//! (precision, problem size, toolchain, file system). The catalog maps the
//! variant discriminator to its table; the discriminator itself is supplied
//! by the caller.

use crate::bound::RawBound;
use crate::error::{ReferenceError, ReferenceResult};
use crate::table::ReferenceTable;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Name used for the table of a single-table catalog.
pub const DEFAULT_VARIANT: &str = "default";

/// Immutable mapping from variant discriminator to reference table.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReferenceCatalog {
    variants: BTreeMap<String, ReferenceTable>,
    default_variant: Option<String>,
}

impl ReferenceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog with one table that answers requests without a variant.
    pub fn single(table: ReferenceTable) -> Self {
        Self::new()
            .with_variant(DEFAULT_VARIANT, table)
            .with_default(DEFAULT_VARIANT)
    }

    pub fn with_variant(mut self, variant: impl Into<String>, table: ReferenceTable) -> Self {
        self.variants.insert(variant.into(), table);
        self
    }

    pub fn with_default(mut self, variant: impl Into<String>) -> Self {
        self.default_variant = Some(variant.into());
        self
    }

    /// Table for `variant`, or the default table when `variant` is `None`.
    ///
    /// Without a variant, a catalog with exactly one table returns it; a
    /// catalog with several tables and no default needs an explicit variant.
    pub fn select(&self, variant: Option<&str>) -> ReferenceResult<&ReferenceTable> {
        let name = match variant {
            Some(v) => v,
            None => match (&self.default_variant, self.variants.len()) {
                (Some(default), _) => default.as_str(),
                (None, 1) => self.variants.keys().next().map(String::as_str).unwrap_or_default(),
                (None, _) => {
                    return Err(ReferenceError::VariantRequired {
                        known: self.variant_names(),
                    })
                }
            },
        };
        self.variants
            .get(name)
            .ok_or_else(|| ReferenceError::UnknownVariant {
                variant: name.to_string(),
                known: self.variant_names(),
            })
    }

    pub fn variant_names(&self) -> Vec<String> {
        self.variants.keys().cloned().collect()
    }

    pub fn default_variant(&self) -> Option<&str> {
        self.default_variant.as_deref()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ReferenceTable)> {
        self.variants.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    /// Validate and assemble a catalog from its file form.
    pub fn from_file(file: &CatalogFile) -> ReferenceResult<Self> {
        let mut catalog = Self::new();
        for (variant, raw) in &file.variants {
            let table = ReferenceTable::from_raw(raw)?;
            catalog = catalog.with_variant(variant.clone(), table);
        }
        if let Some(default) = &file.default_variant {
            if !catalog.variants.contains_key(default) {
                return Err(ReferenceError::UnknownVariant {
                    variant: default.clone(),
                    known: catalog.variant_names(),
                });
            }
            catalog = catalog.with_default(default.clone());
        }
        Ok(catalog)
    }

    pub fn to_file(&self) -> CatalogFile {
        CatalogFile {
            default_variant: self.default_variant.clone(),
            variants: self
                .variants
                .iter()
                .map(|(name, table)| (name.clone(), table.to_raw()))
                .collect(),
        }
    }
}

/// Serialized form of a [`ReferenceCatalog`].
///
/// ```toml
/// default_variant = "double"
///
/// [variants.double."kebnekaise:2xV100"]
/// gpu_perf_min = { target = 6300, lower = -0.10, unit = "Gflop/s" }
///
/// [variants.double."*"]
/// gpu_temp_max = { target = 0, unit = "degC" }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct CatalogFile {
    /// Variant used when the caller does not name one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_variant: Option<String>,
    /// variant -> scope key -> metric -> bound
    #[serde(default)]
    pub variants: BTreeMap<String, BTreeMap<String, BTreeMap<String, RawBound>>>,
}

/// JSON Schema describing the catalog file format.
pub fn catalog_schema() -> schemars::schema::RootSchema {
    schemars::schema_for!(CatalogFile)
}
