use crate::application::controller::PurchaseSessionController;
use crate::domain::catalog::Catalog;
use crate::domain::inventory::ProductDescriptor;
use crate::error::Result;
use tracing::debug;

/// The host-facing billing surface.
///
/// Mirrors the calls a game engine makes into a native billing plugin: every
/// operation answers with a plain `bool` or `String`, and results of
/// asynchronous flows arrive later as notifications. Errors never escape; a
/// rejected call answers `false` and a missing product answers `""`.
#[derive(Clone)]
pub struct BillingPlugin {
    controller: PurchaseSessionController,
}

fn accepted<T>(operation: &str, result: Result<T>) -> bool {
    match result {
        Ok(_) => true,
        Err(e) => {
            debug!(operation, error = %e, "call answered false");
            false
        }
    }
}

impl BillingPlugin {
    pub fn new(controller: PurchaseSessionController) -> Self {
        Self { controller }
    }

    pub fn controller(&self) -> &PurchaseSessionController {
        &self.controller
    }

    /// Starts setup. `in_app` and `subscriptions` are comma-separated product
    /// id lists; the outcome arrives as an `InitMessage`.
    pub async fn init_plugin(&self, public_key: &str, in_app: &str, subscriptions: &str) -> bool {
        let catalog = Catalog::parse(in_app, subscriptions);
        accepted(
            "init_plugin",
            self.controller
                .initialize_with_catalog(public_key, catalog)
                .await,
        )
    }

    pub async fn purchase_in_app(&self, product_id: &str, consume: bool, payload: &str) -> bool {
        accepted(
            "purchase_in_app",
            self.controller.purchase(product_id, consume, payload).await,
        )
    }

    pub async fn purchase_subscription(&self, product_id: &str, payload: &str) -> bool {
        accepted(
            "purchase_subscription",
            self.controller.subscribe(product_id, payload).await,
        )
    }

    pub async fn get_subscriptions_supported(&self) -> bool {
        self.controller.subscriptions_supported().await
    }

    /// True when the current inventory holds a purchase of `product_id`.
    /// With `consume`, that purchase is also consumed without notification.
    pub async fn get_purchase_data(&self, product_id: &str, consume: bool) -> bool {
        accepted(
            "get_purchase_data",
            self.controller
                .restore_and_consume(product_id, consume)
                .await,
        )
    }

    async fn product_field(
        &self,
        product_id: &str,
        field: impl FnOnce(&ProductDescriptor) -> &str,
    ) -> String {
        self.controller
            .product(product_id)
            .await
            .map(|product| field(&product).to_string())
            .unwrap_or_default()
    }

    /// The provider's raw metadata for `product_id`.
    pub async fn get_product_detail(&self, product_id: &str) -> String {
        self.product_field(product_id, ProductDescriptor::raw_json)
            .await
    }

    pub async fn get_product_price(&self, product_id: &str) -> String {
        self.product_field(product_id, |product| product.price.as_str())
            .await
    }

    /// The numeric price in currency units, e.g. `0.99`, or `""` when the
    /// provider reported no micros.
    pub async fn get_product_price_amount(&self, product_id: &str) -> String {
        self.controller
            .product(product_id)
            .await
            .and_then(|product| product.price_amount())
            .map(|amount| amount.normalize().to_string())
            .unwrap_or_default()
    }

    pub async fn get_product_title(&self, product_id: &str) -> String {
        self.product_field(product_id, |product| product.title.as_str())
            .await
    }

    pub async fn get_product_description(&self, product_id: &str) -> String {
        self.product_field(product_id, |product| product.description.as_str())
            .await
    }

    /// Opens the store app, typically so the user can manage a subscription.
    pub async fn start_play_store(&self) -> bool {
        accepted("start_play_store", self.controller.open_store().await)
    }

    pub async fn handle_activity_result(
        &self,
        request_code: i32,
        result_code: i32,
        data: Option<&str>,
    ) -> bool {
        self.controller
            .handle_activity_result(request_code, result_code, data)
            .await
    }

    pub async fn dispose(&self) {
        self.controller.dispose().await;
    }
}
