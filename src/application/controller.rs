use super::config::ControllerConfig;
use super::notifier::Notifier;
use crate::domain::catalog::Catalog;
use crate::domain::inventory::{Inventory, ItemType, ProductDescriptor, PurchaseRecord};
use crate::domain::notification::Notification;
use crate::domain::ports::{BillingProviderRef, NotificationSinkRef};
use crate::domain::purchase::{ConsumeOrigin, PurchaseOutcome, PurchaseRequest};
use crate::domain::session::{PurchaseStep, Session, SessionState, SessionStatus, Ticket};
use crate::error::{BridgeError, Result};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, RwLock, watch};
use tracing::{debug, error, info, warn};

struct Inner {
    config: ControllerConfig,
    provider: BillingProviderRef,
    notifier: Notifier,
    session: Mutex<Session>,
    status: watch::Sender<SessionStatus>,
    inventory: RwLock<Option<Arc<Inventory>>>,
    disposed: AtomicBool,
}

/// Serializes purchase, subscription and restore flows against one billing
/// provider and reports their results to the host.
///
/// Public operations return as soon as the provider call is dispatched; the
/// provider's completion runs on a spawned task that updates the session and
/// emits the notification. Only one flow may be in flight: a request made
/// while the session is busy is rejected, never queued.
///
/// Cloning is cheap and every clone drives the same session.
#[derive(Clone)]
pub struct PurchaseSessionController {
    inner: Arc<Inner>,
}

impl PurchaseSessionController {
    pub fn new(
        provider: BillingProviderRef,
        sink: NotificationSinkRef,
        config: ControllerConfig,
    ) -> Self {
        let notifier = Notifier::new(&config.recipient, sink);
        let (status, _) = watch::channel(SessionStatus::default());
        Self {
            inner: Arc::new(Inner {
                config,
                provider,
                notifier,
                session: Mutex::new(Session::new()),
                status,
                inventory: RwLock::new(None),
                disposed: AtomicBool::new(false),
            }),
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.inner.config
    }

    pub fn state(&self) -> SessionState {
        self.inner.status.borrow().state
    }

    pub fn status(&self) -> SessionStatus {
        *self.inner.status.borrow()
    }

    /// Waits until the session status satisfies `predicate` and returns it.
    pub async fn wait_until(
        &self,
        mut predicate: impl FnMut(&SessionStatus) -> bool,
    ) -> SessionStatus {
        let mut status = self.inner.status.subscribe();
        let reached = status
            .wait_for(|current| predicate(current))
            .await
            .map(|current| *current);
        // The sender lives in `self`, so the channel cannot close here
        reached.unwrap_or_else(|_| self.status())
    }

    /// Waits until no setup or billing flow is waiting on the provider.
    pub async fn settled(&self) -> SessionStatus {
        self.wait_until(SessionStatus::is_settled).await
    }

    fn publish(&self, session: &Session) {
        self.inner.status.send_replace(session.status());
    }

    /// Reports the end of a flow, then publishes the session status so that
    /// observers of a settled status have already seen the notification.
    async fn finish(&self, notification: Option<Notification>) {
        if let Some(notification) = notification {
            self.inner.notifier.notify(notification).await;
        }
        let session = self.inner.session.lock().await;
        self.publish(&session);
    }

    async fn bounded<T>(&self, call: impl Future<Output = T>) -> Result<T> {
        match self.inner.config.callback_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| BridgeError::Timeout(limit)),
            None => Ok(call.await),
        }
    }

    /// Sets up the provider and fetches the inventory for a comma-separated
    /// list of in-app product ids. An empty list fetches everything.
    pub async fn initialize(&self, public_key: &str, catalog_ids: &str) -> Result<()> {
        self.initialize_with_catalog(public_key, Catalog::parse(catalog_ids, ""))
            .await
    }

    /// Starts provider setup followed by an inventory query.
    ///
    /// The result arrives as an `InitMessage`. The session stays
    /// `Uninitialized` until both steps succeed; on failure it stays there
    /// until the next call.
    pub async fn initialize_with_catalog(&self, public_key: &str, catalog: Catalog) -> Result<()> {
        if public_key.is_empty() {
            warn!("billing setup requested without a public key");
            self.inner.notifier.notify(Notification::init(false)).await;
            return Err(BridgeError::SetupFailure("public key is empty".to_string()));
        }

        let ticket = {
            let mut session = self.inner.session.lock().await;
            match session.begin_setup() {
                Ok(ticket) => {
                    self.inner.disposed.store(false, Ordering::SeqCst);
                    *self.inner.inventory.write().await = None;
                    self.publish(&session);
                    ticket
                }
                Err(e) => {
                    drop(session);
                    warn!(error = %e, "billing setup rejected");
                    self.inner.notifier.notify(Notification::init(false)).await;
                    return Err(e);
                }
            }
        };
        info!(
            in_app = catalog.in_app.len(),
            subscriptions = catalog.subscriptions.len(),
            "starting billing setup"
        );
        let controller = self.clone();
        let public_key = public_key.to_string();
        tokio::spawn(async move {
            controller.run_setup(ticket, public_key, catalog).await;
        });
        Ok(())
    }

    async fn run_setup(&self, ticket: Ticket, public_key: String, catalog: Catalog) {
        if !self.inner.session.lock().await.is_setup_current(ticket) {
            debug!("setup superseded before it started");
            return;
        }
        let provider = &self.inner.provider;
        let result = self
            .bounded(async {
                match provider.setup(&public_key).await {
                    Ok(()) => provider.query_inventory(&catalog).await,
                    Err(e) => Err(e),
                }
            })
            .await
            .and_then(|result| result);

        let mut session = self.inner.session.lock().await;
        if !session.complete_setup(ticket, result.is_ok()) {
            debug!("discarding stale setup result");
            return;
        }
        let success = match result {
            Ok(inventory) => {
                info!(
                    products = inventory.product_count(),
                    purchases = inventory.purchase_count(),
                    "billing ready"
                );
                *self.inner.inventory.write().await = Some(Arc::new(inventory));
                true
            }
            Err(e) => {
                error!(error = %e, "billing setup failed");
                false
            }
        };
        drop(session);

        self.finish(Some(Notification::init(success))).await;
    }

    async fn begin(&self, start: impl FnOnce(&mut Session) -> Result<Ticket>) -> Result<Ticket> {
        let mut session = self.inner.session.lock().await;
        let ticket = start(&mut session)?;
        debug!(
            state = ?session.state(),
            product_id = ?session.active_product_id(),
            "billing flow started"
        );
        self.publish(&session);
        Ok(ticket)
    }

    /// Starts a one-time purchase. `consume` marks the item as consumable: it
    /// is consumed right after a successful purchase and reported once the
    /// consume completes.
    ///
    /// Rejected without a notification when the session is not `Idle`.
    pub async fn purchase(&self, product_id: &str, consume: bool, payload: &str) -> Result<()> {
        let ticket = self
            .begin(|session| session.begin_purchase(product_id, consume))
            .await
            .inspect_err(|e| warn!(product_id, error = %e, "purchase rejected"))?;

        self.dispatch_purchase(
            ticket,
            PurchaseRequest {
                product_id: product_id.to_string(),
                item_type: ItemType::InApp,
                payload: payload.to_string(),
                request_code: self.inner.config.request_code,
            },
        );
        Ok(())
    }

    /// Starts a subscription purchase.
    ///
    /// When subscriptions are unsupported or the session is busy, the call is
    /// rejected and a failed `PurchaseMessage` is delivered from a separate
    /// task.
    pub async fn subscribe(&self, product_id: &str, payload: &str) -> Result<()> {
        let supported = self.subscriptions_supported().await;
        let ticket = match self
            .begin(|session| session.begin_subscription(product_id, supported))
            .await
        {
            Ok(ticket) => ticket,
            Err(e) => {
                warn!(product_id, error = %e, "subscription rejected");
                self.inner
                    .notifier
                    .notify_deferred(Notification::purchase_failed(product_id));
                return Err(e);
            }
        };

        self.dispatch_purchase(
            ticket,
            PurchaseRequest {
                product_id: product_id.to_string(),
                item_type: ItemType::Subscription,
                payload: payload.to_string(),
                request_code: self.inner.config.request_code,
            },
        );
        Ok(())
    }

    /// Looks up a previously recorded purchase in the inventory snapshot.
    ///
    /// With `consume` set, the purchase is also consumed in the background;
    /// that consume never produces a notification.
    pub async fn restore_and_consume(
        &self,
        product_id: &str,
        consume: bool,
    ) -> Result<PurchaseRecord> {
        let mut session = self.inner.session.lock().await;
        session.ensure_idle()?;

        let inventory = self.inventory().await.ok_or(BridgeError::NotInitialized)?;
        let purchase = inventory
            .purchase(product_id)
            .cloned()
            .ok_or_else(|| BridgeError::NotFound(product_id.to_string()))?;

        if consume {
            let ticket = session.begin_restore(product_id)?;
            debug!(product_id, "consuming restored purchase");
            self.publish(&session);
            drop(session);
            self.dispatch_consume(ticket, ConsumeOrigin::Restore, purchase.clone());
        }
        Ok(purchase)
    }

    fn dispatch_purchase(&self, ticket: Ticket, request: PurchaseRequest) {
        let controller = self.clone();
        tokio::spawn(async move {
            let provider = &controller.inner.provider;
            match controller.bounded(provider.launch_purchase(request)).await {
                Ok(outcome) => controller.on_purchase_finished(ticket, outcome).await,
                Err(e) => controller.abandon(ticket, e).await,
            }
        });
    }

    fn dispatch_consume(&self, ticket: Ticket, origin: ConsumeOrigin, purchase: PurchaseRecord) {
        let controller = self.clone();
        tokio::spawn(async move {
            let provider = &controller.inner.provider;
            match controller.bounded(provider.consume(purchase)).await {
                Ok(outcome) => controller.on_consume_finished(ticket, origin, outcome).await,
                Err(e) => controller.abandon(ticket, e).await,
            }
        });
    }

    async fn on_purchase_finished(&self, ticket: Ticket, outcome: PurchaseOutcome) {
        if let Err(failure) = &outcome {
            warn!(reason = %failure, "purchase failed");
        }
        let step = self
            .inner
            .session
            .lock()
            .await
            .complete_purchase(ticket, outcome);

        match step {
            PurchaseStep::Notify(notification) => self.finish(Some(notification)).await,
            PurchaseStep::Consume(purchase) => {
                debug!(product_id = %purchase.product_id, "consuming new purchase");
                self.dispatch_consume(ticket, ConsumeOrigin::NewPurchase, purchase);
            }
            PurchaseStep::Stale => debug!("discarding stale purchase result"),
        }
    }

    async fn on_consume_finished(
        &self,
        ticket: Ticket,
        origin: ConsumeOrigin,
        outcome: PurchaseOutcome,
    ) {
        if let Err(failure) = &outcome {
            warn!(?origin, reason = %failure, "consume failed");
        }
        let notification = self
            .inner
            .session
            .lock()
            .await
            .complete_consume(ticket, origin, outcome);
        self.finish(notification).await;
    }

    async fn abandon(&self, ticket: Ticket, error: BridgeError) {
        warn!(%error, "abandoning billing flow");
        let notification = self.inner.session.lock().await.abandon(ticket);
        self.finish(notification).await;
    }

    fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    async fn ensure_available(&self) -> Result<()> {
        if self.is_disposed() {
            return Err(BridgeError::Disposed);
        }
        match self.inner.session.lock().await.state() {
            SessionState::Uninitialized => Err(BridgeError::NotInitialized),
            _ => Ok(()),
        }
    }

    /// False until setup has completed.
    pub async fn subscriptions_supported(&self) -> bool {
        self.ensure_available().await.is_ok() && self.inner.provider.subscriptions_supported()
    }

    /// The current inventory snapshot, if setup has completed.
    pub async fn inventory(&self) -> Option<Arc<Inventory>> {
        self.inner.inventory.read().await.clone()
    }

    pub async fn product(&self, product_id: &str) -> Option<ProductDescriptor> {
        self.inventory().await?.product(product_id).cloned()
    }

    /// Asks the provider to open the platform store app.
    pub async fn open_store(&self) -> Result<()> {
        self.ensure_available().await?;
        self.inner.provider.open_store()
    }

    /// Forwards a host activity result to the provider.
    pub async fn handle_activity_result(
        &self,
        request_code: i32,
        result_code: i32,
        data: Option<&str>,
    ) -> bool {
        self.ensure_available().await.is_ok()
            && self
                .inner
                .provider
                .handle_activity_result(request_code, result_code, data)
    }

    /// Releases the provider and drops any in-flight flow. Safe to call more
    /// than once; `initialize` brings the controller back.
    pub async fn dispose(&self) {
        let mut session = self.inner.session.lock().await;
        if self.inner.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        session.shut_down();
        *self.inner.inventory.write().await = None;
        self.inner.provider.dispose();
        self.publish(&session);
        drop(session);
        info!("billing provider disposed");
    }
}
