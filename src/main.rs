use fsroute::config::{Config, DEFAULT_CONFIG_FILE};
use fsroute::{logger, server};
use std::collections::HashMap;

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string());
    let cfg = Config::load_from(&config_path)?;
    logger::init(&cfg)?;

    // Worker threads follow `server.workers`, CPU cores otherwise
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    // Handler files are answered with 405 until handlers are registered for
    // their rule; embedders call `server::start` with their own registries.
    runtime.block_on(server::start(cfg, HashMap::new()))
}
