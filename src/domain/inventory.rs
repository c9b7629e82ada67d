use super::catalog::Catalog;
use crate::error::Result;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use std::collections::HashMap;

/// Micro-units per currency unit in provider price metadata.
const MICROS_SCALE: u32 = 6;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default, Hash)]
pub enum ItemType {
    #[default]
    #[serde(rename = "inapp")]
    InApp,
    #[serde(rename = "subs")]
    Subscription,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductFields {
    product_id: String,
    #[serde(rename = "type", default)]
    item_type: ItemType,
    #[serde(default)]
    price: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(rename = "price_amount_micros", default)]
    price_amount_micros: Option<i64>,
    #[serde(rename = "price_currency_code", default)]
    price_currency_code: Option<String>,
}

/// Catalog metadata for a single product, as reported by the provider.
///
/// The raw JSON the provider returned is kept verbatim; the individual fields
/// are extracted from it once on construction.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductDescriptor {
    pub product_id: String,
    pub item_type: ItemType,
    pub price: String,
    pub title: String,
    pub description: String,
    pub price_amount_micros: Option<i64>,
    pub price_currency_code: Option<String>,
    raw: String,
}

impl ProductDescriptor {
    pub fn from_json(raw: &str) -> Result<Self> {
        let fields: ProductFields = serde_json::from_str(raw)?;
        Ok(Self {
            product_id: fields.product_id,
            item_type: fields.item_type,
            price: fields.price,
            title: fields.title,
            description: fields.description,
            price_amount_micros: fields.price_amount_micros,
            price_currency_code: fields.price_currency_code,
            raw: raw.to_string(),
        })
    }

    /// The provider's metadata exactly as received.
    pub fn raw_json(&self) -> &str {
        &self.raw
    }

    /// The numeric price in currency units, when the provider reported micros.
    pub fn price_amount(&self) -> Option<Decimal> {
        self.price_amount_micros
            .map(|micros| Decimal::new(micros, MICROS_SCALE))
    }
}

/// A purchase the provider has on record for the current user.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRecord {
    pub product_id: String,
    #[serde(default)]
    pub item_type: ItemType,
    #[serde(default)]
    pub order_id: String,
    /// Opaque verification string echoed back from the purchase request.
    #[serde(default)]
    pub developer_payload: String,
    #[serde(default)]
    pub purchase_token: String,
    #[serde(default)]
    pub signature: String,
    #[serde(default = "default_purchased")]
    pub purchased: bool,
}

fn default_purchased() -> bool {
    true
}

impl PurchaseRecord {
    pub fn new(product_id: impl Into<String>, item_type: ItemType) -> Self {
        Self {
            product_id: product_id.into(),
            item_type,
            order_id: String::new(),
            developer_payload: String::new(),
            purchase_token: String::new(),
            signature: String::new(),
            purchased: true,
        }
    }

    pub fn with_payload(mut self, payload: impl Into<String>) -> Self {
        self.developer_payload = payload.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct InventoryDocument {
    #[serde(default)]
    products: Vec<Box<RawValue>>,
    #[serde(default)]
    purchases: Vec<PurchaseRecord>,
}

/// A snapshot of product metadata and owned purchases.
///
/// Snapshots are built once and then shared read-only; a refresh produces a
/// new snapshot rather than editing an existing one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Inventory {
    products: HashMap<String, ProductDescriptor>,
    purchases: HashMap<String, PurchaseRecord>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a `{"products": [...], "purchases": [...]}` document.
    pub fn from_json(document: &str) -> Result<Self> {
        let document: InventoryDocument = serde_json::from_str(document)?;
        let mut inventory = Self::new();
        for product in document.products {
            inventory.add_product(ProductDescriptor::from_json(product.get())?);
        }
        for purchase in document.purchases {
            inventory.add_purchase(purchase);
        }
        Ok(inventory)
    }

    pub fn add_product(&mut self, product: ProductDescriptor) {
        self.products.insert(product.product_id.clone(), product);
    }

    pub fn add_purchase(&mut self, purchase: PurchaseRecord) {
        self.purchases.insert(purchase.product_id.clone(), purchase);
    }

    pub fn erase_purchase(&mut self, product_id: &str) -> Option<PurchaseRecord> {
        self.purchases.remove(product_id)
    }

    pub fn product(&self, product_id: &str) -> Option<&ProductDescriptor> {
        self.products.get(product_id)
    }

    pub fn purchase(&self, product_id: &str) -> Option<&PurchaseRecord> {
        self.purchases.get(product_id)
    }

    pub fn has_purchase(&self, product_id: &str) -> bool {
        self.purchases.contains_key(product_id)
    }

    pub fn product_count(&self) -> usize {
        self.products.len()
    }

    pub fn purchase_count(&self) -> usize {
        self.purchases.len()
    }

    /// Copies this snapshot keeping only the product metadata the catalog admits.
    /// Owned purchases are always kept.
    pub fn restricted_to(&self, catalog: &Catalog) -> Self {
        Self {
            products: self
                .products
                .iter()
                .filter(|(id, _)| catalog.admits(id))
                .map(|(id, product)| (id.clone(), product.clone()))
                .collect(),
            purchases: self.purchases.clone(),
        }
    }
}
