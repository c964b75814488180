use settlemint::config::CONFIG;
use settlemint::core::scheduler::SimplifyScheduler;
use settlemint::core::services::LedgerService;
use settlemint::infrastructure::logging::in_memory::InMemoryLogging;
use settlemint::infrastructure::registry::in_memory::InMemoryRegistry;
use settlemint::infrastructure::storage::in_memory::InMemoryStorage;
use settlemint::settlement::{SettlementDispatcher, settlement_queue};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&CONFIG.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    info!(config = ?*CONFIG, "starting ledger worker");
    CONFIG.registry.validate()?;

    let storage = Arc::new(InMemoryStorage::new());
    let logging = Arc::new(InMemoryLogging::new());
    let (queue, jobs) = settlement_queue();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let registry = if CONFIG.registry.is_configured() {
        warn!(
            contract_address = ?CONFIG.registry.contract_address,
            "no on-chain client is built in; settlements are recorded by the in-process registry only"
        );
        Some(Arc::new(InMemoryRegistry::new()))
    } else {
        warn!("settlement registry not configured, confirmed payments will stay pending configuration");
        None
    };

    let dispatcher = Arc::new(SettlementDispatcher::new(
        storage.clone(),
        registry,
        logging.clone(),
        CONFIG.retry_policy(),
        CONFIG.settlement_decimals,
    ));
    let worker = dispatcher.spawn(jobs, shutdown_rx.clone());

    let service = Arc::new(LedgerService::new(storage, logging, queue));
    let simplifier = CONFIG
        .simplify_interval
        .map(|period| SimplifyScheduler::new(service.clone(), period).start(shutdown_rx.clone()));

    tokio::signal::ctrl_c().await?;
    info!("shutdown requested");
    shutdown_tx.send(true)?;

    worker.await?;
    if let Some(simplifier) = simplifier {
        simplifier.await?;
    }
    info!("ledger worker stopped");
    Ok(())
}
