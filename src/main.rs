use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use matchbook::{Api, Config, MatchingEngine};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();

    let engine = Arc::new(MatchingEngine::with_options(
        config.recent_trades_cap,
        config.default_depth,
        config.event_queue_cap,
    ));
    for spec in &config.symbols {
        engine.register_symbol(spec.clone());
    }

    info!(
        addr = %config.listen_addr,
        symbols = config.symbols.len(),
        "starting matchbook"
    );

    let api = Api::new(
        config.listen_addr,
        engine,
        config.default_depth,
        config.max_trades_limit,
    );
    if let Err(err) = api.serve().await {
        error!(%err, "server terminated");
        std::process::exit(1);
    }
}
