use std::time::Duration;

/// Host object that receives notifications unless configured otherwise.
pub const DEFAULT_RECIPIENT: &str = "BillingPlugin";
/// Request code attached to purchase flows so activity results can be matched.
pub const DEFAULT_REQUEST_CODE: i32 = 10001;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Name of the host object notifications are addressed to.
    pub recipient: String,
    /// How long to wait for any single provider call.
    ///
    /// `None` waits forever: a provider that never completes keeps the
    /// session busy until `dispose`.
    pub callback_timeout: Option<Duration>,
    pub request_code: i32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            recipient: DEFAULT_RECIPIENT.to_string(),
            callback_timeout: None,
            request_code: DEFAULT_REQUEST_CODE,
        }
    }
}

impl ControllerConfig {
    pub fn with_recipient(mut self, recipient: impl Into<String>) -> Self {
        self.recipient = recipient.into();
        self
    }

    pub fn with_callback_timeout(mut self, timeout: Duration) -> Self {
        self.callback_timeout = Some(timeout);
        self
    }
}
