use crate::domain::catalog::Catalog;
use crate::domain::inventory::{Inventory, ItemType, PurchaseRecord};
use crate::domain::notification::Envelope;
use crate::domain::ports::{BillingProvider, NotificationSink};
use crate::domain::purchase::{ProviderFailure, PurchaseOutcome, PurchaseRequest};
use crate::error::{BridgeError, Result};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU64, AtomicUsize, Ordering};
use tokio::sync::{RwLock, mpsc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum SetupBehavior {
    #[default]
    Succeed,
    Fail,
    Hang,
}

#[derive(Debug, Clone)]
struct Behavior {
    setup: SetupBehavior,
    subscriptions_supported: bool,
    failing_purchases: HashSet<String>,
    failing_consumes: HashSet<String>,
}

impl Default for Behavior {
    fn default() -> Self {
        Self {
            setup: SetupBehavior::default(),
            subscriptions_supported: true,
            failing_purchases: HashSet::new(),
            failing_consumes: HashSet::new(),
        }
    }
}

#[derive(Default)]
struct ProviderState {
    inventory: RwLock<Inventory>,
    connected: AtomicBool,
    orders: AtomicU64,
    awaiting_result: AtomicBool,
    last_request_code: AtomicI32,
    store_opens: AtomicUsize,
    disposals: AtomicUsize,
}

/// A billing provider backed by an in-memory inventory.
///
/// Purchases are recorded in the inventory and consumes remove them, so the
/// provider behaves like a store account for a single user. Failures can be
/// scripted per product. Clones share the same account.
#[derive(Clone, Default)]
pub struct InMemoryBillingProvider {
    behavior: Behavior,
    state: Arc<ProviderState>,
}

impl InMemoryBillingProvider {
    /// Creates a provider whose store offers the products of `inventory` and
    /// whose account already owns its purchases.
    pub fn new(inventory: Inventory) -> Self {
        Self {
            behavior: Behavior::default(),
            state: Arc::new(ProviderState {
                inventory: RwLock::new(inventory),
                ..ProviderState::default()
            }),
        }
    }

    pub fn with_subscriptions(mut self, supported: bool) -> Self {
        self.behavior.subscriptions_supported = supported;
        self
    }

    pub fn failing_setup(mut self) -> Self {
        self.behavior.setup = SetupBehavior::Fail;
        self
    }

    /// Setup never completes.
    pub fn unresponsive_setup(mut self) -> Self {
        self.behavior.setup = SetupBehavior::Hang;
        self
    }

    /// Purchase flows for `product_id` end as if the user cancelled.
    pub fn failing_purchase(mut self, product_id: &str) -> Self {
        self.behavior.failing_purchases.insert(product_id.to_string());
        self
    }

    pub fn failing_consume(mut self, product_id: &str) -> Self {
        self.behavior.failing_consumes.insert(product_id.to_string());
        self
    }

    pub async fn owns(&self, product_id: &str) -> bool {
        self.state.inventory.read().await.has_purchase(product_id)
    }

    pub fn store_open_count(&self) -> usize {
        self.state.store_opens.load(Ordering::SeqCst)
    }

    pub fn dispose_count(&self) -> usize {
        self.state.disposals.load(Ordering::SeqCst)
    }

    fn is_connected(&self) -> bool {
        self.state.connected.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BillingProvider for InMemoryBillingProvider {
    async fn setup(&self, _public_key: &str) -> Result<()> {
        match self.behavior.setup {
            SetupBehavior::Succeed => {
                self.state.connected.store(true, Ordering::SeqCst);
                Ok(())
            }
            SetupBehavior::Fail => Err(BridgeError::SetupFailure(
                "billing service unavailable".to_string(),
            )),
            SetupBehavior::Hang => std::future::pending().await,
        }
    }

    async fn query_inventory(&self, catalog: &Catalog) -> Result<Inventory> {
        if !self.is_connected() {
            return Err(BridgeError::ProviderFailure("not connected".to_string()));
        }
        Ok(self.state.inventory.read().await.restricted_to(catalog))
    }

    async fn launch_purchase(&self, request: PurchaseRequest) -> PurchaseOutcome {
        if !self.is_connected() {
            return Err(ProviderFailure::new("not connected"));
        }
        if self.behavior.failing_purchases.contains(&request.product_id) {
            return Err(ProviderFailure::new("user cancelled"));
        }
        if request.item_type == ItemType::Subscription && !self.behavior.subscriptions_supported {
            return Err(ProviderFailure::new("subscriptions not available"));
        }

        let mut inventory = self.state.inventory.write().await;
        if inventory.product(&request.product_id).is_none() {
            return Err(ProviderFailure::new("item unavailable"));
        }
        if let Some(owned) = inventory.purchase(&request.product_id) {
            return Err(ProviderFailure::with_purchase(
                owned.clone(),
                "item already owned",
            ));
        }

        let order = self.state.orders.fetch_add(1, Ordering::SeqCst) + 1;
        let purchase = PurchaseRecord {
            order_id: format!("order.{order}"),
            purchase_token: format!("token.{}.{order}", request.product_id),
            ..PurchaseRecord::new(request.product_id, request.item_type)
                .with_payload(request.payload)
        };
        inventory.add_purchase(purchase.clone());

        self.state
            .last_request_code
            .store(request.request_code, Ordering::SeqCst);
        self.state.awaiting_result.store(true, Ordering::SeqCst);
        Ok(purchase)
    }

    async fn consume(&self, purchase: PurchaseRecord) -> PurchaseOutcome {
        if !self.is_connected() {
            return Err(ProviderFailure::with_purchase(purchase, "not connected"));
        }
        if self.behavior.failing_consumes.contains(&purchase.product_id) {
            return Err(ProviderFailure::with_purchase(purchase, "consume rejected"));
        }
        match self
            .state
            .inventory
            .write()
            .await
            .erase_purchase(&purchase.product_id)
        {
            Some(_) => Ok(purchase),
            None => Err(ProviderFailure::with_purchase(purchase, "item not owned")),
        }
    }

    fn subscriptions_supported(&self) -> bool {
        self.behavior.subscriptions_supported
    }

    fn handle_activity_result(
        &self,
        request_code: i32,
        _result_code: i32,
        _data: Option<&str>,
    ) -> bool {
        request_code == self.state.last_request_code.load(Ordering::SeqCst)
            && self.state.awaiting_result.swap(false, Ordering::SeqCst)
    }

    fn open_store(&self) -> Result<()> {
        if !self.is_connected() {
            return Err(BridgeError::ProviderFailure("not connected".to_string()));
        }
        self.state.store_opens.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn dispose(&self) {
        self.state.connected.store(false, Ordering::SeqCst);
        self.state.disposals.fetch_add(1, Ordering::SeqCst);
    }
}

/// A sink that keeps every delivered message in order.
#[derive(Default, Clone)]
pub struct RecordingSink {
    envelopes: Arc<RwLock<Vec<Envelope>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivered `(method, message)` pairs.
    pub async fn messages(&self) -> Vec<(String, String)> {
        self.envelopes
            .read()
            .await
            .iter()
            .map(|envelope| (envelope.method.clone(), envelope.message.clone()))
            .collect()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn send(&self, recipient: &str, method: &str, message: &str) -> Result<()> {
        let mut envelopes = self.envelopes.write().await;
        envelopes.push(Envelope::new(recipient, method, message));
        Ok(())
    }
}

/// A sink that forwards every message to an unbounded channel.
#[derive(Clone)]
pub struct ChannelSink {
    sender: mpsc::UnboundedSender<Envelope>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Envelope>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl NotificationSink for ChannelSink {
    async fn send(&self, recipient: &str, method: &str, message: &str) -> Result<()> {
        self.sender
            .send(Envelope::new(recipient, method, message))
            .map_err(|_| BridgeError::DeliveryFailure("receiver closed".to_string()))
    }
}
