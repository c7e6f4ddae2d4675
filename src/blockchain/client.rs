//! Blockchain RPC client with timeout and error handling.
//!
//! # Responsibilities
//! - Connect to JSON-RPC endpoints (primary + failovers)
//! - Bound every call with the configured timeout
//! - Try providers in order until one answers

use std::future::Future;
use std::time::Duration;

use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use tokio::time::timeout;

use crate::blockchain::types::{BlockchainError, BlockchainResult};
use crate::config::ChainConfig;

/// Blockchain RPC client wrapper with failover support.
#[derive(Clone)]
pub struct BlockchainClient {
    /// List of providers (primary + failovers).
    providers: Vec<DynProvider>,
    /// Primary endpoint, kept for diagnostics.
    rpc_url: String,
    /// Per-call timeout duration.
    timeout_duration: Duration,
}

impl BlockchainClient {
    /// Create a new blockchain client.
    ///
    /// No network traffic happens here; an unreachable endpoint surfaces on
    /// the first query.
    pub fn new(config: &ChainConfig) -> BlockchainResult<Self> {
        let timeout_duration = Duration::from_secs(config.rpc_timeout_secs);
        let mut providers = Vec::new();

        // 1. Add primary provider
        let primary_url: url::Url = config.rpc_url.parse().map_err(|e| {
            BlockchainError::Rpc(format!("Invalid RPC URL '{}': {}", config.rpc_url, e))
        })?;
        providers.push(ProviderBuilder::new().connect_http(primary_url).erased());

        // 2. Add failover providers
        for url_str in &config.failover_urls {
            if let Ok(url) = url_str.parse::<url::Url>() {
                providers.push(ProviderBuilder::new().connect_http(url).erased());
            } else {
                tracing::warn!(url = %url_str, "Ignoring invalid failover RPC URL");
            }
        }

        tracing::info!(
            rpc_url = %config.rpc_url,
            failovers = providers.len() - 1,
            timeout_secs = config.rpc_timeout_secs,
            "Blockchain client initialized"
        );

        Ok(Self {
            providers,
            rpc_url: config.rpc_url.clone(),
            timeout_duration,
        })
    }

    /// Get the latest block number.
    pub async fn get_block_number(&self) -> BlockchainResult<u64> {
        self.with_failover("get block number", |provider| async move {
            provider.get_block_number().await
        })
        .await
    }

    /// Run `call` against each provider in turn until one succeeds.
    ///
    /// Each attempt is bounded by the client timeout. When every provider
    /// fails the error reflects the last attempt.
    pub async fn with_failover<T, E, F, Fut>(&self, what: &str, call: F) -> BlockchainResult<T>
    where
        F: Fn(DynProvider) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let mut last_timed_out = false;
        for (i, provider) in self.providers.iter().enumerate() {
            match timeout(self.timeout_duration, call(provider.clone())).await {
                Ok(Ok(result)) => return Ok(result),
                Ok(Err(e)) => {
                    last_timed_out = false;
                    tracing::warn!(provider_idx = i, error = %e, "RPC error, trying next provider");
                }
                Err(_) => {
                    last_timed_out = true;
                    tracing::warn!(provider_idx = i, "RPC timeout, trying next provider");
                }
            }
        }
        if last_timed_out {
            Err(BlockchainError::Timeout(self.timeout_duration.as_secs()))
        } else {
            Err(BlockchainError::Rpc(format!("All providers failed to {}", what)))
        }
    }

    /// Number of configured providers.
    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }
}

impl std::fmt::Debug for BlockchainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockchainClient")
            .field("rpc_url", &self.rpc_url)
            .field("providers", &self.providers.len())
            .field("timeout", &self.timeout_duration)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> ChainConfig {
        ChainConfig {
            // Nothing listens on port 1
            rpc_url: "http://127.0.0.1:1".to_string(),
            rpc_timeout_secs: 2,
            ..ChainConfig::default()
        }
    }

    #[tokio::test]
    async fn test_client_creation() {
        let client = BlockchainClient::new(&test_config()).unwrap();
        assert_eq!(client.provider_count(), 1);
    }

    #[test]
    fn test_invalid_primary_url_rejected() {
        let mut config = test_config();
        config.rpc_url = "not a url".into();
        let err = BlockchainClient::new(&config).unwrap_err();
        assert!(err.to_string().contains("Invalid RPC URL"));
    }

    #[tokio::test]
    async fn test_invalid_failover_ignored() {
        let mut config = test_config();
        config.failover_urls = vec!["::bogus::".into(), "http://127.0.0.1:2".into()];
        let client = BlockchainClient::new(&config).unwrap();
        assert_eq!(client.provider_count(), 2);
    }

    #[tokio::test]
    async fn test_rpc_failover_exhausted() {
        let mut config = test_config();
        config.failover_urls.push("http://127.0.0.1:2".to_string());

        let client = BlockchainClient::new(&config).unwrap();
        let result = client.get_block_number().await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("All providers failed"));
    }

    #[tokio::test]
    async fn test_failover_returns_first_success() {
        let mut config = test_config();
        config.failover_urls.push("http://127.0.0.1:2".to_string());
        let client = BlockchainClient::new(&config).unwrap();

        let attempts = std::sync::atomic::AtomicUsize::new(0);
        let result: BlockchainResult<u32> = client
            .with_failover("count", |_provider| {
                let n = attempts.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Err("primary down")
                    } else {
                        Ok(7)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(attempts.load(std::sync::atomic::Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_reported() {
        let client = BlockchainClient::new(&test_config()).unwrap();
        let result: BlockchainResult<()> = client
            .with_failover("hang", |_provider| async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok::<_, String>(())
            })
            .await;

        assert!(matches!(result, Err(BlockchainError::Timeout(2))));
    }
}
