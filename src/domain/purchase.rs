use super::inventory::{ItemType, PurchaseRecord};
use std::fmt;

/// Everything a provider needs to start a purchase flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseRequest {
    pub product_id: String,
    pub item_type: ItemType,
    pub payload: String,
    /// Correlates the host's activity result with this flow.
    pub request_code: i32,
}

/// A failed purchase or consume, as reported by the provider.
///
/// The provider may or may not hand back the purchase it was working on.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderFailure {
    pub purchase: Option<PurchaseRecord>,
    pub message: String,
}

impl ProviderFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            purchase: None,
            message: message.into(),
        }
    }

    pub fn with_purchase(purchase: PurchaseRecord, message: impl Into<String>) -> Self {
        Self {
            purchase: Some(purchase),
            message: message.into(),
        }
    }
}

impl fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

pub type PurchaseOutcome = Result<PurchaseRecord, ProviderFailure>;

/// Which flow dispatched a consume.
///
/// The tag travels with the consume request so its completion can be routed
/// without inspecting the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeOrigin {
    /// Finishing a consumable purchase made in this session.
    NewPurchase,
    /// Consuming a purchase restored from the inventory snapshot.
    Restore,
}
