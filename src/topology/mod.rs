//! Staker topology subsystem.
//!
//! # Data Flow
//! ```text
//! StakingRegistry (block-pinned contract reads)
//!     → reader.rs (fan-out per member, fan-in in registry order)
//!     → upstream.rs (strict upstream URL parsing)
//!     → resolver.rs (hostname → IPv4)
//!     → ObservedTopology (weighted, resolved upstreams)
//! ```
//!
//! # Design Decisions
//! - A broken entry is dropped and logged, never fails the whole batch
//! - Sub-minimum stakes are excluded rather than given weight 0
//! - Registry order is preserved so renders are stable

pub mod reader;
pub mod resolver;
pub mod upstream;

use std::fmt;
use std::net::SocketAddrV4;

use alloy::primitives::{Address, U256};
use thiserror::Error;

use crate::blockchain::BlockchainError;

pub use reader::ChainStateReader;
pub use resolver::{HostResolver, SystemResolver};

/// A staker that qualifies as an upstream.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StakerRecord {
    /// Registry member address.
    pub address: Address,
    /// Resolved upstream endpoint.
    pub upstream: SocketAddrV4,
    /// Load-balancing weight, always at least 1.
    pub weight: u64,
}

/// The set of qualifying stakers observed at one block height.
///
/// Equality is structural: same records in the same order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObservedTopology {
    stakers: Vec<StakerRecord>,
}

impl ObservedTopology {
    pub fn new(stakers: Vec<StakerRecord>) -> Self {
        Self { stakers }
    }

    pub fn stakers(&self) -> &[StakerRecord] {
        &self.stakers
    }

    pub fn len(&self) -> usize {
        self.stakers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stakers.is_empty()
    }

    /// Sum of all weights, saturating.
    pub fn total_weight(&self) -> u64 {
        self.stakers
            .iter()
            .fold(0u64, |acc, s| acc.saturating_add(s.weight))
    }
}

/// Why a single registry entry was left out of the topology.
#[derive(Debug, Error)]
pub enum EntryError {
    #[error("registry query failed: {0}")]
    Query(#[from] BlockchainError),

    #[error("unable to parse upstream URL '{0}'")]
    MalformedUrl(String),

    #[error("failed to resolve '{host}': {reason}")]
    Resolve { host: String, reason: String },

    #[error("staked {0} wei is less than the minimum stake unit")]
    BelowMinimumStake(U256),
}

impl EntryError {
    /// Short label for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            EntryError::Query(_) => "query",
            EntryError::MalformedUrl(_) => "url",
            EntryError::Resolve { .. } => "dns",
            EntryError::BelowMinimumStake(_) => "stake",
        }
    }
}

/// An [`EntryError`] together with where it happened.
#[derive(Debug)]
pub struct EntryFailure {
    /// Slot index in the staker role.
    pub index: u64,
    /// Member address, when it could be read.
    pub address: Option<Address>,
    pub error: EntryError,
}

impl fmt::Display for EntryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.address {
            Some(addr) => write!(f, "entry {} ({}): {}", self.index, addr, self.error),
            None => write!(f, "entry {} (unknown): {}", self.index, self.error),
        }
    }
}

/// Weight for a stake: `floor(staked / unit)`, or `None` when that is zero.
///
/// Weights beyond `u64::MAX` saturate.
pub fn stake_weight(staked: U256, unit: U256) -> Option<u64> {
    if unit.is_zero() {
        return None;
    }
    let units = staked / unit;
    if units.is_zero() {
        None
    } else {
        Some(units.saturating_to::<u64>())
    }
}
