//! Command-line interface.
//!
//! Flags override values from the optional `--settings` TOML file; the merged
//! configuration is validated as a whole.

use std::path::PathBuf;

use clap::Parser;

use crate::config::loader::{read_config, ConfigError};
use crate::config::validation::validate_config;
use crate::config::ControllerConfig;

#[derive(Debug, Parser)]
#[command(name = "gateway-proxy")]
#[command(about = "Keeps an nginx upstream list in sync with an on-chain staking registry", long_about = None)]
pub struct Args {
    /// Config template containing the $STAKERS placeholder
    #[arg(short = 'c', long = "config", env = "GATEWAY_TEMPLATE")]
    pub template: Option<PathBuf>,

    /// Proxy binary
    #[arg(short = 'n', long = "nginx", env = "GATEWAY_PROXY_BINARY")]
    pub binary: Option<String>,

    /// Staking contract address
    #[arg(short = 'a', long, env = "GATEWAY_CONTRACT_ADDRESS")]
    pub address: Option<String>,

    /// JSON-RPC endpoint
    #[arg(short = 'r', long, env = "GATEWAY_RPC_URL")]
    pub rpc: Option<String>,

    /// Upstream used when no staker qualifies (host:port)
    #[arg(short = 'f', long, env = "GATEWAY_FALLBACK")]
    pub fallback: Option<String>,

    /// Passed to the proxy as -e
    #[arg(short = 'e')]
    pub error_log: Option<String>,

    /// Passed to the proxy as -g
    #[arg(short = 'g')]
    pub globals: Option<String>,

    /// Passed to the proxy as -p
    #[arg(short = 'p')]
    pub prefix: Option<String>,

    /// TOML settings file
    #[arg(short = 's', long, env = "GATEWAY_SETTINGS")]
    pub settings: Option<PathBuf>,

    /// Log level used when RUST_LOG is unset
    #[arg(long, env = "GATEWAY_LOG_LEVEL")]
    pub log_level: Option<String>,
}

impl Args {
    /// Merge flags over the settings file (or defaults) and validate.
    pub fn into_config(self) -> Result<ControllerConfig, ConfigError> {
        let mut config = match &self.settings {
            Some(path) => read_config(path)?,
            None => ControllerConfig::default(),
        };

        if let Some(template) = self.template {
            config.proxy.template = template.to_string_lossy().into_owned();
        }
        if let Some(binary) = self.binary {
            config.proxy.binary = binary;
        }
        if let Some(address) = self.address {
            config.chain.contract_address = address;
        }
        if let Some(rpc) = self.rpc {
            config.chain.rpc_url = rpc;
        }
        if let Some(fallback) = self.fallback {
            config.proxy.fallback_upstream = fallback;
        }
        if self.error_log.is_some() {
            config.proxy.error_log = self.error_log;
        }
        if self.globals.is_some() {
            config.proxy.globals = self.globals;
        }
        if self.prefix.is_some() {
            config.proxy.prefix = self.prefix;
        }
        if let Some(level) = self.log_level {
            config.observability.log_level = level;
        }

        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}
