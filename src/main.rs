// WorryTree - CBT worry-tree journaling application
// Entry point and application setup

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "worrytree=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting WorryTree application");

    if let Err(e) = worrytree::app::run().await {
        tracing::error!("Fatal error: {}", e);
        std::process::exit(1);
    }
}
