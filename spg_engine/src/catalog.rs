//! The product catalog, as far as order intake is concerned: which products exist, what a unit costs, what it weighs
//! and how many units a single order may contain.
//!
//! The catalog is configuration data. [`Catalog::default`] holds the shop's standard assortment, and the server can
//! replace it with a JSON file.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use spg_common::EuroCents;

/// The maximum deviation (in euros) between a client-supplied total and the server-side total before the order is
/// rejected.
pub const PRICE_TOLERANCE: f64 = 0.01;

pub const DEFAULT_MAX_QUANTITY: u32 = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub unit_price: EuroCents,
    pub unit_weight_grams: u32,
    #[serde(default = "default_max_quantity")]
    pub max_quantity: u32,
}

fn default_max_quantity() -> u32 {
    DEFAULT_MAX_QUANTITY
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    entries: BTreeMap<String, CatalogEntry>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
            .with_product("heel", CatalogEntry {
                unit_price: EuroCents::from(500),
                unit_weight_grams: 800,
                max_quantity: DEFAULT_MAX_QUANTITY,
            })
            .with_product("half", CatalogEntry {
                unit_price: EuroCents::from(300),
                unit_weight_grams: 400,
                max_quantity: DEFAULT_MAX_QUANTITY,
            })
    }
}

impl Catalog {
    pub fn new() -> Self {
        Self { entries: BTreeMap::new() }
    }

    pub fn with_product<S: Into<String>>(mut self, code: S, entry: CatalogEntry) -> Self {
        self.entries.insert(code.into(), entry);
        self
    }

    pub fn get(&self, code: &str) -> Option<&CatalogEntry> {
        self.entries.get(code)
    }

    pub fn product_codes(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|k| k.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
