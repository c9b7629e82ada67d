mod common;

use billing_bridge::domain::session::SessionState;
use billing_bridge::error::BridgeError;
use billing_bridge::infrastructure::in_memory::InMemoryBillingProvider;
use common::{GatedProvider, Harness, inventory_with_purchases};
use std::sync::Arc;

#[tokio::test]
async fn test_restore_without_consume() {
    let provider = InMemoryBillingProvider::new(inventory_with_purchases());
    let mut harness = Harness::ready(Arc::new(provider.clone()), "").await;

    let purchase = harness
        .controller
        .restore_and_consume("premium", false)
        .await
        .unwrap();
    assert_eq!(purchase.developer_payload, "old");

    assert_eq!(harness.controller.state(), SessionState::Idle);
    assert!(provider.owns("premium").await);
    harness.assert_quiet().await;
}

#[tokio::test]
async fn test_restore_unknown_product() {
    let provider = InMemoryBillingProvider::new(inventory_with_purchases());
    let harness = Harness::ready(Arc::new(provider), "").await;

    let result = harness
        .controller
        .restore_and_consume("infinite_gas", true)
        .await;
    assert!(matches!(result, Err(BridgeError::NotFound(id)) if id == "infinite_gas"));
    assert_eq!(harness.controller.state(), SessionState::Idle);
}

#[tokio::test]
async fn test_restore_with_consume_is_silent() {
    let gated = GatedProvider::new(InMemoryBillingProvider::new(inventory_with_purchases()));
    let mut harness = Harness::ready(Arc::new(gated.clone()), "").await;

    harness
        .controller
        .restore_and_consume("gas", true)
        .await
        .unwrap();
    assert_eq!(
        harness.controller.state(),
        SessionState::RestoringConsumedPurchase
    );

    // Nothing else may start while the restore consume is in flight
    let purchase = harness.controller.purchase("premium", false, "").await;
    assert!(matches!(purchase, Err(BridgeError::Busy(_))));

    gated.release(1);
    assert_eq!(harness.controller.settled().await.state, SessionState::Idle);
    harness.assert_quiet().await;
    assert!(!gated.inner.owns("gas").await);
}

#[tokio::test]
async fn test_failed_restore_consume_is_silent() {
    let provider = InMemoryBillingProvider::new(inventory_with_purchases()).failing_consume("gas");
    let mut harness = Harness::ready(Arc::new(provider.clone()), "").await;

    assert!(
        harness
            .controller
            .restore_and_consume("gas", true)
            .await
            .is_ok()
    );
    assert_eq!(harness.controller.settled().await.state, SessionState::Idle);
    harness.assert_quiet().await;
    assert!(provider.owns("gas").await);
}

#[tokio::test]
async fn test_snapshot_is_not_refreshed_by_purchases() {
    let provider = InMemoryBillingProvider::new(inventory_with_purchases());
    let mut harness = Harness::ready(Arc::new(provider), "").await;

    harness
        .controller
        .restore_and_consume("gas", true)
        .await
        .unwrap();
    harness.controller.settled().await;

    // Still in the snapshot taken at setup
    assert!(
        harness
            .controller
            .restore_and_consume("gas", false)
            .await
            .is_ok()
    );

    // A fresh setup picks up the consume
    harness.controller.initialize("key123", "").await.unwrap();
    assert_eq!(harness.next().await.to_string(), "InitMessage true");
    harness.controller.settled().await;
    assert!(
        harness
            .controller
            .restore_and_consume("gas", false)
            .await
            .is_err()
    );
}
