use billing_bridge::application::config::{ControllerConfig, DEFAULT_RECIPIENT};
use billing_bridge::application::controller::PurchaseSessionController;
use billing_bridge::domain::inventory::Inventory;
use billing_bridge::domain::session::SessionState;
use billing_bridge::infrastructure::in_memory::{ChannelSink, InMemoryBillingProvider};
use billing_bridge::interfaces::csv::script_reader::ScriptReader;
use billing_bridge::interfaces::plugin::BillingPlugin;
use billing_bridge::interfaces::script;
use clap::Parser;
use miette::{IntoDiagnostic, Result, miette};
use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Script of plugin calls (CSV columns: op, product, consume, payload)
    script: PathBuf,

    /// Inventory JSON the in-memory store is seeded with
    #[arg(long)]
    inventory: Option<PathBuf>,

    #[arg(long, default_value = "debug-public-key")]
    public_key: String,

    /// Comma-separated in-app product ids to query. Empty queries everything.
    #[arg(long, default_value = "")]
    in_app: String,

    /// Comma-separated subscription product ids to query
    #[arg(long, default_value = "")]
    subs: String,

    /// Host object notifications are addressed to
    #[arg(long, default_value = DEFAULT_RECIPIENT)]
    recipient: String,

    /// Make the store report subscriptions as unsupported
    #[arg(long)]
    no_subscriptions: bool,

    /// Give up on a provider call after this many milliseconds
    #[arg(long)]
    callback_timeout_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let inventory = match &cli.inventory {
        Some(path) => {
            let document = std::fs::read_to_string(path).into_diagnostic()?;
            Inventory::from_json(&document).into_diagnostic()?
        }
        None => Inventory::new(),
    };
    let provider =
        InMemoryBillingProvider::new(inventory).with_subscriptions(!cli.no_subscriptions);

    let mut config = ControllerConfig::default().with_recipient(cli.recipient.as_str());
    if let Some(millis) = cli.callback_timeout_ms {
        config = config.with_callback_timeout(Duration::from_millis(millis));
    }

    let (sink, mut envelopes) = ChannelSink::new();
    let plugin = BillingPlugin::new(PurchaseSessionController::new(
        Arc::new(provider),
        Arc::new(sink),
        config,
    ));

    // Notifications are printed as they arrive
    let printer = tokio::spawn(async move {
        while let Some(envelope) = envelopes.recv().await {
            println!("{envelope}");
        }
    });

    let file = File::open(&cli.script).into_diagnostic()?;

    plugin
        .init_plugin(&cli.public_key, &cli.in_app, &cli.subs)
        .await;
    let ready = plugin.controller().settled().await.state == SessionState::Idle;

    if ready {
        for command in ScriptReader::new(file).commands() {
            match command {
                Ok(command) => {
                    let answer = script::execute(&plugin, &command).await;
                    println!("{} {} -> {}", command.op, command.product, answer);
                }
                Err(e) => {
                    eprintln!("Error reading command: {}", e);
                }
            }
        }
    }

    // The printer stops once every handle on the sink is gone
    plugin.dispose().await;
    drop(plugin);
    printer.await.into_diagnostic()?;

    if ready {
        Ok(())
    } else {
        Err(miette!("Billing setup failed"))
    }
}
