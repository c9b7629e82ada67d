mod common;

use billing_bridge::domain::session::SessionState;
use billing_bridge::error::BridgeError;
use billing_bridge::infrastructure::in_memory::InMemoryBillingProvider;
use common::{GatedProvider, Harness, sample_inventory};
use std::sync::Arc;

#[tokio::test]
async fn test_subscription_purchase() {
    let provider = InMemoryBillingProvider::new(sample_inventory());
    let mut harness = Harness::ready(Arc::new(provider.clone()), "").await;

    assert!(harness.controller.subscriptions_supported().await);
    harness
        .controller
        .subscribe("infinite_gas", "sub-payload")
        .await
        .unwrap();

    assert_eq!(
        harness.next().await.to_string(),
        "PurchaseMessage infinite_gas,true,sub-payload"
    );
    assert!(provider.owns("infinite_gas").await);
}

#[tokio::test]
async fn test_unsupported_subscription_rejected_with_notification() {
    let provider = InMemoryBillingProvider::new(sample_inventory()).with_subscriptions(false);
    let mut harness = Harness::ready(Arc::new(provider), "").await;

    assert!(!harness.controller.subscriptions_supported().await);
    let result = harness.controller.subscribe("infinite_gas", "x").await;
    assert!(matches!(result, Err(BridgeError::Unsupported)));
    assert_eq!(harness.controller.state(), SessionState::Idle);

    assert_eq!(
        harness.next().await.to_string(),
        "PurchaseMessage infinite_gas,false,"
    );
    harness.assert_quiet().await;
}

#[tokio::test]
async fn test_subscription_while_busy_rejected_with_notification() {
    let gated = GatedProvider::new(InMemoryBillingProvider::new(sample_inventory()));
    let mut harness = Harness::ready(Arc::new(gated.clone()), "").await;

    harness
        .controller
        .purchase("premium", false, "")
        .await
        .unwrap();
    let result = harness.controller.subscribe("infinite_gas", "").await;
    assert!(matches!(result, Err(BridgeError::Busy(_))));
    assert_eq!(
        harness.next().await.to_string(),
        "PurchaseMessage infinite_gas,false,"
    );

    gated.release(1);
    assert_eq!(
        harness.next().await.to_string(),
        "PurchaseMessage premium,true,"
    );
}

#[tokio::test]
async fn test_subscriptions_unsupported_before_setup() {
    let provider = InMemoryBillingProvider::new(sample_inventory());
    let harness = Harness::new(Arc::new(provider), Default::default());

    assert!(!harness.controller.subscriptions_supported().await);
}
