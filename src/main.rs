//! Staking gateway controller.
//!
//! Supervises an nginx process whose upstream list follows the stakers
//! registered in an on-chain staking contract.
//!
//! # Architecture Overview
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────┐
//!   │                       CONTROLLER                             │
//!   │                                                              │
//!   │  ┌────────────┐   ┌──────────┐   ┌──────────┐   ┌─────────┐  │
//!   │  │ blockchain │──▶│ topology │──▶│  render  │──▶│supervis-│──┼──▶ nginx
//!   │  │  registry  │   │  reader  │   │ template │   │   or    │  │   (child)
//!   │  └────────────┘   └──────────┘   └──────────┘   └─────────┘  │
//!   │         ▲                                            │       │
//!   │         │          ┌─────────────────────┐           │       │
//!   │         └──────────│ controller (select) │◀──────────┘       │
//!   │                    └─────────────────────┘   exit status     │
//!   │                       ▲                                      │
//!   │   signals / watcher ──┘                                      │
//!   └──────────────────────────────────────────────────────────────┘
//! ```

use std::process::ExitCode;

use clap::Parser;

use gateway_proxy::cli::Args;
use gateway_proxy::lifecycle::startup;
use gateway_proxy::observability::{logging, metrics};
use gateway_proxy::supervisor::EXIT_SENTINEL;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let level = args.log_level.clone().unwrap_or_else(|| "info".to_string());

    let config = match args.into_config() {
        Ok(config) => config,
        Err(e) => {
            logging::init(&level);
            tracing::error!("Invalid configuration: {}", e);
            return exit(EXIT_SENTINEL);
        }
    };
    logging::init(&config.observability.log_level);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        template = %config.proxy.template,
        proxy = %config.proxy.binary,
        poll_interval_ms = config.reconcile.poll_interval_ms,
        "gateway-proxy starting"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    exit(startup::run(config).await)
}

fn exit(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(EXIT_SENTINEL as u8))
}
