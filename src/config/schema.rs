//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the controller.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Placeholder replaced with the rendered upstream list.
pub const STAKERS_PLACEHOLDER: &str = "$STAKERS";

/// Root configuration for the gateway controller.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ControllerConfig {
    /// Staking contract and RPC settings.
    pub chain: ChainConfig,

    /// Supervised proxy settings.
    pub proxy: ProxyConfig,

    /// Reconciliation loop settings.
    pub reconcile: ReconcileConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Blockchain integration configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ChainConfig {
    /// JSON-RPC endpoint URL.
    pub rpc_url: String,

    /// Failover JSON-RPC endpoint URLs.
    pub failover_urls: Vec<String>,

    /// Address of the staking contract.
    pub contract_address: String,

    /// Timeout for each individual RPC call in seconds.
    pub rpc_timeout_secs: u64,

    /// Smallest staked amount (wei) that counts as one unit of weight.
    pub min_stake_unit_wei: u64,

    /// Largest registry member count the controller will query.
    pub max_members: u64,

    /// Member slots queried concurrently during one fetch.
    pub query_concurrency: usize,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://localhost:8545".to_string(),
            failover_urls: Vec::new(),
            contract_address: String::new(),
            rpc_timeout_secs: 10,
            // one szabo
            min_stake_unit_wei: 1_000_000_000_000,
            max_members: 1024,
            query_concurrency: 32,
        }
    }
}

/// Supervised reverse proxy configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Path to the proxy binary.
    pub binary: String,

    /// Path to the config template containing the stakers placeholder.
    pub template: String,

    /// Upstream used when no staker qualifies (e.g., "127.0.0.1:8000").
    pub fallback_upstream: String,

    /// Passed through as `-e <value>`.
    pub error_log: Option<String>,

    /// Passed through as `-g <value>`.
    pub globals: Option<String>,

    /// Passed through as `-p <value>`.
    pub prefix: Option<String>,

    /// Additional raw arguments appended after the pass-through flags.
    pub extra_args: Vec<String>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            binary: "/usr/sbin/nginx".to_string(),
            template: String::new(),
            fallback_upstream: String::new(),
            error_log: None,
            globals: None,
            prefix: None,
            extra_args: Vec::new(),
        }
    }
}

impl ProxyConfig {
    /// Arguments forwarded to every proxy invocation, in flag order.
    pub fn passthrough_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(e) = &self.error_log {
            args.extend(["-e".to_string(), e.clone()]);
        }
        if let Some(g) = &self.globals {
            args.extend(["-g".to_string(), g.clone()]);
        }
        if let Some(p) = &self.prefix {
            args.extend(["-p".to_string(), p.clone()]);
        }
        args.extend(self.extra_args.iter().cloned());
        args
    }
}

/// Reconciliation loop configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Interval between registry polls in milliseconds.
    pub poll_interval_ms: u64,

    /// Re-apply the current topology whenever the template file changes.
    pub watch_template: bool,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            watch_template: false,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_toml_uses_defaults() {
        let config: ControllerConfig = toml::from_str(
            r#"
            [chain]
            contract_address = "0x0000000000000000000000000000000000000001"

            [proxy]
            template = "/etc/gateway/nginx.conf.tmpl"
            fallback_upstream = "127.0.0.1:8000"
            "#,
        )
        .unwrap();

        assert_eq!(config.chain.rpc_timeout_secs, 10);
        assert_eq!(config.chain.min_stake_unit_wei, 1_000_000_000_000);
        assert_eq!(config.chain.max_members, 1024);
        assert_eq!(config.chain.query_concurrency, 32);
        assert_eq!(config.reconcile.poll_interval_ms, 1000);
        assert_eq!(config.proxy.binary, "/usr/sbin/nginx");
        assert!(!config.observability.metrics_enabled);
    }

    #[test]
    fn test_passthrough_args_order() {
        let proxy = ProxyConfig {
            error_log: Some("stderr".into()),
            globals: Some("worker_processes 2;".into()),
            prefix: Some("/var/lib/gateway".into()),
            extra_args: vec!["-q".into()],
            ..ProxyConfig::default()
        };

        assert_eq!(
            proxy.passthrough_args(),
            vec!["-e", "stderr", "-g", "worker_processes 2;", "-p", "/var/lib/gateway", "-q"]
        );
    }

    #[test]
    fn test_passthrough_args_empty_by_default() {
        assert!(ProxyConfig::default().passthrough_args().is_empty());
    }
}
