/// Splits a comma-separated list of product identifiers.
///
/// Identifiers are opaque: they are kept byte for byte, whitespace and case
/// included. Empty segments are dropped, so `""` yields an empty list. An
/// identifier cannot itself contain a comma; there is no escaping.
pub fn parse_catalog_ids(input: &str) -> Vec<String> {
    input
        .split(',')
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

/// The product identifiers an inventory query is restricted to.
///
/// An empty catalog places no restriction on the query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    pub in_app: Vec<String>,
    pub subscriptions: Vec<String>,
}

impl Catalog {
    pub fn new(in_app: Vec<String>, subscriptions: Vec<String>) -> Self {
        Self {
            in_app,
            subscriptions,
        }
    }

    /// Builds a catalog from the two comma-separated lists a host passes on init.
    pub fn parse(in_app: &str, subscriptions: &str) -> Self {
        Self::new(parse_catalog_ids(in_app), parse_catalog_ids(subscriptions))
    }

    pub fn is_unrestricted(&self) -> bool {
        self.in_app.is_empty() && self.subscriptions.is_empty()
    }

    /// Returns true when `product_id` may appear in a query restricted to this catalog.
    pub fn admits(&self, product_id: &str) -> bool {
        self.is_unrestricted()
            || self.in_app.iter().any(|id| id == product_id)
            || self.subscriptions.iter().any(|id| id == product_id)
    }
}
