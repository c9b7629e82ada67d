use super::notification::Notification;
use super::purchase::{ConsumeOrigin, PurchaseOutcome};
use super::inventory::PurchaseRecord;
use crate::error::{BridgeError, Result};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum SessionState {
    #[default]
    Uninitialized,
    Idle,
    PurchasingConsumable,
    PurchasingNonConsumable,
    PurchasingSubscription,
    RestoringConsumedPurchase,
}

impl SessionState {
    /// True while a purchase, consume or restore is waiting on the provider.
    pub fn is_busy(self) -> bool {
        !matches!(self, Self::Uninitialized | Self::Idle)
    }
}

/// An observable summary of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionStatus {
    pub state: SessionState,
    pub setup_pending: bool,
}

impl SessionStatus {
    /// No setup and no billing flow is waiting on the provider.
    pub fn is_settled(&self) -> bool {
        !self.setup_pending && !self.state.is_busy()
    }
}

/// Identifies one dispatched flow.
///
/// Every accepted operation gets a fresh ticket; a completion carrying any
/// other ticket is stale and leaves the session untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

/// What to do after the provider finished a purchase flow.
#[derive(Debug, Clone, PartialEq)]
pub enum PurchaseStep {
    /// The flow is over; report this to the host.
    Notify(Notification),
    /// A consumable was bought; consume it before reporting.
    Consume(PurchaseRecord),
    /// The completion belongs to a flow that is no longer current.
    Stale,
}

/// The single live billing operation.
///
/// At most one flow is in flight. Accepting an operation and moving out of
/// `Idle` happen in the same call, so a caller holding `&mut Session` gets an
/// atomic check-and-set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    state: SessionState,
    active_product_id: Option<String>,
    setup_pending: bool,
    ticket: u64,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn active_product_id(&self) -> Option<&str> {
        self.active_product_id.as_deref()
    }

    pub fn is_setup_pending(&self) -> bool {
        self.setup_pending
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            state: self.state,
            setup_pending: self.setup_pending,
        }
    }

    fn issue_ticket(&mut self) -> Ticket {
        self.ticket += 1;
        Ticket(self.ticket)
    }

    fn is_current(&self, ticket: Ticket) -> bool {
        ticket.0 == self.ticket
    }

    pub fn ensure_idle(&self) -> Result<()> {
        match self.state {
            SessionState::Idle => Ok(()),
            SessionState::Uninitialized => Err(BridgeError::NotInitialized),
            busy => Err(BridgeError::Busy(busy)),
        }
    }

    fn reset(&mut self) {
        self.state = SessionState::Idle;
        self.active_product_id = None;
    }

    /// Starts provider setup. The session drops back to `Uninitialized` until
    /// setup completes.
    pub fn begin_setup(&mut self) -> Result<Ticket> {
        if self.state.is_busy() || self.setup_pending {
            return Err(BridgeError::Busy(self.state));
        }
        self.state = SessionState::Uninitialized;
        self.active_product_id = None;
        self.setup_pending = true;
        Ok(self.issue_ticket())
    }

    /// True while the setup identified by `ticket` is still the one awaited.
    pub fn is_setup_current(&self, ticket: Ticket) -> bool {
        self.is_current(ticket) && self.setup_pending
    }

    /// Applies the setup result. Returns false for a stale completion.
    pub fn complete_setup(&mut self, ticket: Ticket, success: bool) -> bool {
        if !self.is_current(ticket) || !self.setup_pending {
            return false;
        }
        self.setup_pending = false;
        if success {
            self.reset();
        }
        true
    }

    pub fn begin_purchase(&mut self, product_id: &str, consume: bool) -> Result<Ticket> {
        self.ensure_idle()?;
        self.state = if consume {
            SessionState::PurchasingConsumable
        } else {
            SessionState::PurchasingNonConsumable
        };
        self.active_product_id = Some(product_id.to_string());
        Ok(self.issue_ticket())
    }

    pub fn begin_subscription(&mut self, product_id: &str, supported: bool) -> Result<Ticket> {
        if !supported {
            return Err(BridgeError::Unsupported);
        }
        self.ensure_idle()?;
        self.state = SessionState::PurchasingSubscription;
        self.active_product_id = Some(product_id.to_string());
        Ok(self.issue_ticket())
    }

    /// Starts consuming a purchase restored from the inventory snapshot.
    pub fn begin_restore(&mut self, product_id: &str) -> Result<Ticket> {
        self.ensure_idle()?;
        self.state = SessionState::RestoringConsumedPurchase;
        self.active_product_id = Some(product_id.to_string());
        Ok(self.issue_ticket())
    }

    pub fn complete_purchase(&mut self, ticket: Ticket, outcome: PurchaseOutcome) -> PurchaseStep {
        if !self.is_current(ticket) {
            return PurchaseStep::Stale;
        }
        match (self.state, outcome) {
            (
                SessionState::PurchasingConsumable
                | SessionState::PurchasingNonConsumable
                | SessionState::PurchasingSubscription,
                Err(failure),
            ) => {
                let product_id = failure
                    .purchase
                    .map(|purchase| purchase.product_id)
                    .or_else(|| self.active_product_id.take())
                    .unwrap_or_default();
                self.reset();
                PurchaseStep::Notify(Notification::purchase_failed(product_id))
            }
            // The consumable stays in flight until the consume completes
            (SessionState::PurchasingConsumable, Ok(purchase)) => PurchaseStep::Consume(purchase),
            (
                SessionState::PurchasingNonConsumable | SessionState::PurchasingSubscription,
                Ok(purchase),
            ) => {
                self.reset();
                PurchaseStep::Notify(Notification::purchase_succeeded(
                    purchase.product_id,
                    purchase.developer_payload,
                ))
            }
            (state, _) => {
                warn!(?state, "purchase completion outside of a purchase flow");
                PurchaseStep::Stale
            }
        }
    }

    /// Applies a consume result. Restore-side consumption never produces a
    /// notification, whatever its outcome.
    pub fn complete_consume(
        &mut self,
        ticket: Ticket,
        origin: ConsumeOrigin,
        outcome: PurchaseOutcome,
    ) -> Option<Notification> {
        if !self.is_current(ticket) || !self.state.is_busy() {
            return None;
        }
        let expected = match origin {
            ConsumeOrigin::NewPurchase => SessionState::PurchasingConsumable,
            ConsumeOrigin::Restore => SessionState::RestoringConsumedPurchase,
        };
        if self.state != expected {
            warn!(state = ?self.state, ?origin, "consume origin disagrees with session state");
        }

        let active_product_id = self.active_product_id.take().unwrap_or_default();
        self.reset();
        match origin {
            ConsumeOrigin::Restore => None,
            ConsumeOrigin::NewPurchase => Some(match outcome {
                Ok(purchase) => {
                    Notification::purchase_succeeded(purchase.product_id, purchase.developer_payload)
                }
                Err(failure) => Notification::purchase_failed(
                    failure
                        .purchase
                        .map(|purchase| purchase.product_id)
                        .unwrap_or(active_product_id),
                ),
            }),
        }
    }

    /// Gives up on the current flow after the provider stopped responding.
    ///
    /// Purchase flows report a failure for the active product; a restore
    /// resets silently.
    pub fn abandon(&mut self, ticket: Ticket) -> Option<Notification> {
        if !self.is_current(ticket) || !self.state.is_busy() {
            return None;
        }
        let state = self.state;
        let product_id = self.active_product_id.take().unwrap_or_default();
        self.reset();
        match state {
            SessionState::RestoringConsumedPurchase => None,
            _ => Some(Notification::purchase_failed(product_id)),
        }
    }

    /// Drops any in-flight flow and returns to `Uninitialized`.
    pub fn shut_down(&mut self) {
        self.state = SessionState::Uninitialized;
        self.active_product_id = None;
        self.setup_pending = false;
        self.issue_ticket();
    }
}
