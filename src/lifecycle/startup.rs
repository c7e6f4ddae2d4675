//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the chain client, reader, renderer and supervisor from config
//! - Register signal handlers and the optional template watcher
//! - Run the controller and hand back the process exit code

use std::path::PathBuf;
use std::time::Duration;

use alloy::primitives::U256;
use tokio::sync::mpsc;

use crate::blockchain::{BlockchainClient, StakingContract};
use crate::config::watcher::TemplateWatcher;
use crate::config::ControllerConfig;
use crate::controller::Controller;
use crate::lifecycle::signals;
use crate::render::{ConfigRenderer, LiveConfig};
use crate::supervisor::{ProcessSupervisor, EXIT_SENTINEL};
use crate::topology::{ChainStateReader, SystemResolver};

/// Run the controller until the proxy exits. Returns the process exit code.
pub async fn run(config: ControllerConfig) -> i32 {
    let client = match BlockchainClient::new(&config.chain) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!(error = %e, "Failed to create blockchain client");
            return EXIT_SENTINEL;
        }
    };
    let contract = match StakingContract::new(client, &config.chain.contract_address) {
        Ok(contract) => contract,
        Err(e) => {
            tracing::error!(error = %e, "Invalid staking contract");
            return EXIT_SENTINEL;
        }
    };
    tracing::info!(
        contract = %contract.address(),
        rpc_url = %config.chain.rpc_url,
        "Staking registry configured"
    );

    let reader = ChainStateReader::new(
        contract,
        SystemResolver,
        U256::from(config.chain.min_stake_unit_wei),
        Duration::from_secs(config.chain.rpc_timeout_secs),
    )
    .with_limits(config.chain.max_members, config.chain.query_concurrency);
    let template = PathBuf::from(&config.proxy.template);
    let mut controller = Controller::new(
        reader,
        ConfigRenderer::new(config.proxy.fallback_upstream.clone()),
        ProcessSupervisor::from_config(&config.proxy),
        LiveConfig::for_process(),
        template.clone(),
        Duration::from_millis(config.reconcile.poll_interval_ms),
    );

    let (tx, mut rx) = mpsc::unbounded_channel();
    let signal_task = match signals::listen(tx.clone()) {
        Ok(handle) => handle,
        Err(e) => {
            tracing::error!(error = %e, "Failed to install signal handlers");
            return EXIT_SENTINEL;
        }
    };

    match controller.init_interruptible(&mut rx).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            signal_task.abort();
            return EXIT_SENTINEL;
        }
        Err(e) => {
            tracing::error!(error = %e, "Startup failed, proxy not launched");
            signal_task.abort();
            return EXIT_SENTINEL;
        }
    }

    // Dropping the watcher stops it, so it lives until run returns.
    let _watcher = if config.reconcile.watch_template {
        match TemplateWatcher::new(&template, tx).run() {
            Ok(watcher) => Some(watcher),
            Err(e) => {
                tracing::warn!(error = %e, "Template watcher unavailable");
                None
            }
        }
    } else {
        drop(tx);
        None
    };

    let code = controller.run(rx).await;
    signal_task.abort();
    code
}
