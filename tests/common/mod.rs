#![allow(dead_code)]

use async_trait::async_trait;
use billing_bridge::application::config::ControllerConfig;
use billing_bridge::application::controller::PurchaseSessionController;
use billing_bridge::domain::catalog::Catalog;
use billing_bridge::domain::inventory::{Inventory, ItemType, ProductDescriptor, PurchaseRecord};
use billing_bridge::domain::notification::Envelope;
use billing_bridge::domain::ports::BillingProvider;
use billing_bridge::domain::purchase::{PurchaseOutcome, PurchaseRequest};
use billing_bridge::error::Result;
use billing_bridge::infrastructure::in_memory::{ChannelSink, InMemoryBillingProvider};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Semaphore, mpsc};

pub const GAS: &str = r#"{"productId":"gas","type":"inapp","price":"$0.99","title":"Gas","description":"A quarter tank","price_amount_micros":990000,"price_currency_code":"USD"}"#;
pub const PREMIUM: &str = r#"{"productId":"premium","type":"inapp","price":"$1.99","title":"Premium","description":"Upgrade to premium"}"#;
pub const INFINITE_GAS: &str = r#"{"productId":"infinite_gas","type":"subs","price":"$2.99","title":"Infinite gas","description":"Never run out"}"#;

/// The store used by most tests: two in-app products and a subscription.
pub fn sample_inventory() -> Inventory {
    let mut inventory = Inventory::new();
    for raw in [GAS, PREMIUM, INFINITE_GAS] {
        inventory.add_product(ProductDescriptor::from_json(raw).unwrap());
    }
    inventory
}

/// Same store, but the account already owns `premium` and an unconsumed `gas`.
pub fn inventory_with_purchases() -> Inventory {
    let mut inventory = sample_inventory();
    inventory.add_purchase(PurchaseRecord::new("premium", ItemType::InApp).with_payload("old"));
    inventory.add_purchase(PurchaseRecord::new("gas", ItemType::InApp));
    inventory
}

/// Wraps a provider so purchases and consumes only complete when the test
/// releases them.
#[derive(Clone)]
pub struct GatedProvider {
    pub inner: InMemoryBillingProvider,
    gate: Arc<Semaphore>,
}

impl GatedProvider {
    pub fn new(inner: InMemoryBillingProvider) -> Self {
        Self {
            inner,
            gate: Arc::new(Semaphore::new(0)),
        }
    }

    /// Lets the next `count` provider calls complete.
    pub fn release(&self, count: usize) {
        self.gate.add_permits(count);
    }

    async fn pass(&self) {
        if let Ok(permit) = self.gate.acquire().await {
            permit.forget();
        }
    }
}

#[async_trait]
impl BillingProvider for GatedProvider {
    async fn setup(&self, public_key: &str) -> Result<()> {
        self.inner.setup(public_key).await
    }

    async fn query_inventory(&self, catalog: &Catalog) -> Result<Inventory> {
        self.inner.query_inventory(catalog).await
    }

    async fn launch_purchase(&self, request: PurchaseRequest) -> PurchaseOutcome {
        self.pass().await;
        self.inner.launch_purchase(request).await
    }

    async fn consume(&self, purchase: PurchaseRecord) -> PurchaseOutcome {
        self.pass().await;
        self.inner.consume(purchase).await
    }

    fn subscriptions_supported(&self) -> bool {
        self.inner.subscriptions_supported()
    }

    fn handle_activity_result(
        &self,
        request_code: i32,
        result_code: i32,
        data: Option<&str>,
    ) -> bool {
        self.inner
            .handle_activity_result(request_code, result_code, data)
    }

    fn open_store(&self) -> Result<()> {
        self.inner.open_store()
    }

    fn dispose(&self) {
        self.inner.dispose()
    }
}

pub struct Harness {
    pub controller: PurchaseSessionController,
    pub envelopes: mpsc::UnboundedReceiver<Envelope>,
}

impl Harness {
    pub fn new(provider: Arc<dyn BillingProvider>, config: ControllerConfig) -> Self {
        let (sink, envelopes) = ChannelSink::new();
        Self {
            controller: PurchaseSessionController::new(provider, Arc::new(sink), config),
            envelopes,
        }
    }

    /// Initializes with `in_app` ids, waits for setup and drains the
    /// `InitMessage`.
    pub async fn ready(provider: Arc<dyn BillingProvider>, in_app: &str) -> Self {
        let mut harness = Self::new(provider, ControllerConfig::default());
        harness
            .controller
            .initialize("key123", in_app)
            .await
            .unwrap();
        let init = harness.next().await;
        assert_eq!(init.to_string(), "InitMessage true");
        harness.controller.settled().await;
        harness
    }

    /// The next delivered envelope. Fails the test after a second.
    pub async fn next(&mut self) -> Envelope {
        tokio::time::timeout(Duration::from_secs(1), self.envelopes.recv())
            .await
            .expect("timed out waiting for a notification")
            .expect("notification channel closed")
    }

    /// Asserts nothing else is delivered within a short grace period.
    pub async fn assert_quiet(&mut self) {
        let extra = tokio::time::timeout(Duration::from_millis(50), self.envelopes.recv()).await;
        assert!(
            !matches!(extra, Ok(Some(_))),
            "unexpected notification: {:?}",
            extra
        );
    }
}
