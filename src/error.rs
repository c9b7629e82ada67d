use crate::domain::session::SessionState;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Billing setup failed: {0}")]
    SetupFailure(String),
    #[error("A billing operation is already in flight ({0:?})")]
    Busy(SessionState),
    #[error("Subscriptions are not supported")]
    Unsupported,
    #[error("Product not found: {0}")]
    NotFound(String),
    #[error("Billing provider failure: {0}")]
    ProviderFailure(String),
    #[error("Billing is not initialized")]
    NotInitialized,
    #[error("Billing provider has been disposed")]
    Disposed,
    #[error("Billing provider did not respond within {0:?}")]
    Timeout(Duration),
    #[error("Notification delivery failed: {0}")]
    DeliveryFailure(String),
    #[error("Malformed message: {0}")]
    MalformedMessage(String),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
