use crate::error::{BridgeError, Result};
use std::fmt;

pub const INIT_METHOD: &str = "InitMessage";
pub const PURCHASE_METHOD: &str = "PurchaseMessage";

/// A result reported back to the host.
///
/// On the wire each notification is a method name plus a comma-joined message:
/// `InitMessage` carries `success`, `PurchaseMessage` carries
/// `product_id,success,payload` with an empty trailing field for no payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Init {
        success: bool,
    },
    Purchase {
        product_id: String,
        success: bool,
        payload: String,
    },
}

impl Notification {
    pub fn init(success: bool) -> Self {
        Self::Init { success }
    }

    pub fn purchase_succeeded(product_id: impl Into<String>, payload: impl Into<String>) -> Self {
        Self::Purchase {
            product_id: product_id.into(),
            success: true,
            payload: payload.into(),
        }
    }

    pub fn purchase_failed(product_id: impl Into<String>) -> Self {
        Self::Purchase {
            product_id: product_id.into(),
            success: false,
            payload: String::new(),
        }
    }

    pub fn method(&self) -> &'static str {
        match self {
            Self::Init { .. } => INIT_METHOD,
            Self::Purchase { .. } => PURCHASE_METHOD,
        }
    }

    pub fn encode(&self) -> String {
        match self {
            Self::Init { success } => success.to_string(),
            Self::Purchase {
                product_id,
                success,
                payload,
            } => format!("{product_id},{success},{payload}"),
        }
    }

    /// Parses a message received under `method`.
    ///
    /// A purchase message is split into at most three fields, so the payload
    /// may itself contain commas.
    pub fn decode(method: &str, message: &str) -> Result<Self> {
        match method {
            INIT_METHOD => Ok(Self::Init {
                success: parse_bool(message)?,
            }),
            PURCHASE_METHOD => {
                let mut fields = message.splitn(3, ',');
                let product_id = fields.next().unwrap_or_default();
                let success = fields.next().ok_or_else(|| {
                    BridgeError::MalformedMessage(format!("missing success field: {message}"))
                })?;
                Ok(Self::Purchase {
                    product_id: product_id.to_string(),
                    success: parse_bool(success)?,
                    payload: fields.next().unwrap_or_default().to_string(),
                })
            }
            other => Err(BridgeError::MalformedMessage(format!(
                "unknown method: {other}"
            ))),
        }
    }

    pub fn is_success(&self) -> bool {
        match self {
            Self::Init { success } | Self::Purchase { success, .. } => *success,
        }
    }
}

fn parse_bool(field: &str) -> Result<bool> {
    match field {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(BridgeError::MalformedMessage(format!(
            "expected true or false, got `{other}`"
        ))),
    }
}

/// A notification as addressed and delivered to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub recipient: String,
    pub method: String,
    pub message: String,
}

impl Envelope {
    pub fn new(recipient: &str, method: &str, message: &str) -> Self {
        Self {
            recipient: recipient.to_string(),
            method: method.to_string(),
            message: message.to_string(),
        }
    }

    pub fn notification(&self) -> Result<Notification> {
        Notification::decode(&self.method, &self.message)
    }
}

impl fmt::Display for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.message)
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method(), self.encode())
    }
}
