//! Chain-specific types and error definitions.

use alloy::primitives::U256;
use thiserror::Error;

/// Errors that can occur during blockchain operations.
#[derive(Debug, Error)]
pub enum BlockchainError {
    /// RPC connection or request failed.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// RPC request timed out.
    #[error("RPC timeout after {0} seconds")]
    Timeout(u64),

    /// Contract address could not be parsed.
    #[error("Invalid contract address '{0}'")]
    InvalidAddress(String),

    /// The registry reports more members than the controller will query.
    #[error("registry reports {count} members, above the limit of {max}")]
    TooManyMembers { count: U256, max: u64 },
}

/// Result type for blockchain operations.
pub type BlockchainResult<T> = Result<T, BlockchainError>;
