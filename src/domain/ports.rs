use super::catalog::Catalog;
use super::inventory::{Inventory, PurchaseRecord};
use super::purchase::{PurchaseOutcome, PurchaseRequest};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// The platform billing service.
///
/// Every async method stands for a provider call that completes on the
/// provider's own schedule; the controller never awaits one on the caller's
/// path.
#[async_trait]
pub trait BillingProvider: Send + Sync {
    /// Connects to the billing service using the app's public key.
    async fn setup(&self, public_key: &str) -> Result<()>;
    async fn query_inventory(&self, catalog: &Catalog) -> Result<Inventory>;
    async fn launch_purchase(&self, request: PurchaseRequest) -> PurchaseOutcome;
    async fn consume(&self, purchase: PurchaseRecord) -> PurchaseOutcome;
    fn subscriptions_supported(&self) -> bool;
    /// Returns true when the provider recognised and handled the result.
    fn handle_activity_result(&self, request_code: i32, result_code: i32, data: Option<&str>)
    -> bool;
    /// Opens the platform store app, e.g. to manage subscriptions.
    fn open_store(&self) -> Result<()>;
    fn dispose(&self);
}

/// Fire-and-forget delivery of messages to a named recipient in the host.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, recipient: &str, method: &str, message: &str) -> Result<()>;
}

pub type BillingProviderRef = Arc<dyn BillingProvider>;
pub type NotificationSinkRef = Arc<dyn NotificationSink>;
