use super::csv::script_reader::{ScriptCommand, ScriptOp};
use super::plugin::BillingPlugin;

/// Runs one scripted call and waits for any flow it started to settle.
///
/// Returns the call's immediate answer as text: `true`/`false` for
/// operations, the field value for product lookups.
pub async fn execute(plugin: &BillingPlugin, command: &ScriptCommand) -> String {
    let product = command.product.as_str();
    let payload = command.payload.as_deref().unwrap_or_default();
    let consume = command.consume.unwrap_or(false);

    let answer = match command.op {
        ScriptOp::Purchase => plugin
            .purchase_in_app(product, consume, payload)
            .await
            .to_string(),
        ScriptOp::Subscribe => plugin
            .purchase_subscription(product, payload)
            .await
            .to_string(),
        ScriptOp::Restore => plugin.get_purchase_data(product, consume).await.to_string(),
        ScriptOp::Supported => plugin.get_subscriptions_supported().await.to_string(),
        ScriptOp::Detail => plugin.get_product_detail(product).await,
        ScriptOp::Price => plugin.get_product_price(product).await,
        ScriptOp::Amount => plugin.get_product_price_amount(product).await,
        ScriptOp::Title => plugin.get_product_title(product).await,
        ScriptOp::Description => plugin.get_product_description(product).await,
        ScriptOp::Store => plugin.start_play_store().await.to_string(),
    };

    plugin.controller().settled().await;
    answer
}
