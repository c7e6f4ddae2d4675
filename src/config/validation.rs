//! Configuration validation.
//!
//! Semantic checks on top of what serde already enforces. All problems are
//! collected so an operator can fix a config in one pass.

use std::fmt;

use alloy::primitives::Address;

use crate::config::schema::ControllerConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: &'static str,
    /// What is wrong with it.
    pub message: String,
}

impl ValidationError {
    pub(crate) fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a fully merged configuration.
pub fn validate_config(config: &ControllerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.chain.contract_address.parse::<Address>().is_err() {
        errors.push(ValidationError::new(
            "chain.contract_address",
            format!("'{}' is not a valid address", config.chain.contract_address),
        ));
    }

    if let Err(e) = config.chain.rpc_url.parse::<url::Url>() {
        errors.push(ValidationError::new(
            "chain.rpc_url",
            format!("'{}': {}", config.chain.rpc_url, e),
        ));
    }

    if config.chain.rpc_timeout_secs == 0 {
        errors.push(ValidationError::new("chain.rpc_timeout_secs", "must be greater than 0"));
    }

    if config.chain.min_stake_unit_wei == 0 {
        errors.push(ValidationError::new("chain.min_stake_unit_wei", "must be greater than 0"));
    }

    if config.chain.max_members == 0 {
        errors.push(ValidationError::new("chain.max_members", "must be greater than 0"));
    }

    if config.chain.query_concurrency == 0 {
        errors.push(ValidationError::new("chain.query_concurrency", "must be greater than 0"));
    }

    if config.proxy.binary.trim().is_empty() {
        errors.push(ValidationError::new("proxy.binary", "must not be empty"));
    }

    if config.proxy.template.trim().is_empty() {
        errors.push(ValidationError::new("proxy.template", "must not be empty"));
    }

    if !is_host_port(&config.proxy.fallback_upstream) {
        errors.push(ValidationError::new(
            "proxy.fallback_upstream",
            format!("'{}' is not host:port", config.proxy.fallback_upstream),
        ));
    }

    if config.reconcile.poll_interval_ms == 0 {
        errors.push(ValidationError::new("reconcile.poll_interval_ms", "must be greater than 0"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<std::net::SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_host_port(value: &str) -> bool {
    match value.rsplit_once(':') {
        Some((host, port)) => !host.is_empty() && port.parse::<u16>().is_ok(),
        None => false,
    }
}
