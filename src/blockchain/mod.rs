//! Blockchain integration subsystem.
//!
//! # Data Flow
//! ```text
//! ChainConfig (RPC URLs, contract address, timeout)
//!     → client.rs (RPC connection with timeouts and failover)
//!     → registry.rs (staking contract calls pinned to a block)
//! ```
//!
//! # Constraints
//! - Read-only: the controller never signs or sends transactions
//! - All RPC calls have configurable timeouts
//! - Callers pin reads to one block height for a consistent snapshot

pub mod client;
pub mod registry;
pub mod types;

pub use client::BlockchainClient;
pub use registry::{StakingContract, StakingRegistry};
pub use types::{BlockchainError, BlockchainResult};
