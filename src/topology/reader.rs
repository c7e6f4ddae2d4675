//! Registry snapshot reader.
//!
//! # Responsibilities
//! - Anchor every read of one fetch to a single block height
//! - Query each staker slot concurrently and join in slot order
//! - Turn each member into a weighted, resolved upstream or a logged skip

use std::net::SocketAddrV4;
use std::time::Duration;

use alloy::primitives::{Address, B256, U256};
use futures_util::stream::{self, StreamExt};
use tokio::time::timeout;

use crate::blockchain::{BlockchainError, BlockchainResult, StakingRegistry};
use crate::observability::metrics;
use crate::topology::resolver::HostResolver;
use crate::topology::upstream::parse_upstream_url;
use crate::topology::{stake_weight, EntryError, EntryFailure, ObservedTopology, StakerRecord};

/// Largest member count queried unless configured otherwise.
pub const DEFAULT_MAX_MEMBERS: u64 = 1024;

/// Slot queries in flight at once unless configured otherwise.
pub const DEFAULT_QUERY_CONCURRENCY: usize = 32;

/// Reads the current staker topology from a [`StakingRegistry`].
#[derive(Debug)]
pub struct ChainStateReader<R, H> {
    registry: R,
    resolver: H,
    min_stake_unit: U256,
    resolve_timeout: Duration,
    max_members: u64,
    concurrency: usize,
}

impl<R: StakingRegistry, H: HostResolver> ChainStateReader<R, H> {
    pub fn new(registry: R, resolver: H, min_stake_unit: U256, resolve_timeout: Duration) -> Self {
        Self {
            registry,
            resolver,
            min_stake_unit,
            resolve_timeout,
            max_members: DEFAULT_MAX_MEMBERS,
            concurrency: DEFAULT_QUERY_CONCURRENCY,
        }
    }

    /// Refuse registries with more than `max_members` slots and keep at most
    /// `concurrency` slot queries in flight.
    pub fn with_limits(mut self, max_members: u64, concurrency: usize) -> Self {
        self.max_members = max_members;
        self.concurrency = concurrency.max(1);
        self
    }

    /// Fetch the qualifying stakers at the latest block.
    ///
    /// Only failing to read the block height, role or member count, or a
    /// member count above the limit, is an error. Individual entries that
    /// fail are logged and left out, so the result may be empty.
    pub async fn fetch_topology(&self) -> BlockchainResult<ObservedTopology> {
        let block = self.registry.block_number().await?;
        let role = self.registry.staker_role(block).await?;
        let reported = self.registry.member_count(block, role).await?;
        if reported > U256::from(self.max_members) {
            return Err(BlockchainError::TooManyMembers {
                count: reported,
                max: self.max_members,
            });
        }
        let count = reported.saturating_to::<u64>();

        let results: Vec<_> = stream::iter(0..count)
            .map(|index| self.query_entry(block, role, index))
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut stakers = Vec::with_capacity(results.len());
        for result in results {
            match result {
                Ok(Some(record)) => stakers.push(record),
                Ok(None) => {}
                Err(failure) => {
                    tracing::warn!(block, "Skipping {}", failure);
                    metrics::record_entry_skipped(failure.error.reason());
                }
            }
        }

        tracing::debug!(block, members = count, stakers = stakers.len(), "Fetched staker topology");
        Ok(ObservedTopology::new(stakers))
    }

    /// Resolve one role slot. `Ok(None)` means the slot is empty.
    async fn query_entry(
        &self,
        block: u64,
        role: B256,
        index: u64,
    ) -> Result<Option<StakerRecord>, EntryFailure> {
        let address = self
            .registry
            .member_at(block, role, index)
            .await
            .map_err(|e| EntryFailure {
                index,
                address: None,
                error: e.into(),
            })?;

        if address == Address::ZERO {
            return Ok(None);
        }

        let fail = |error: EntryError| EntryFailure {
            index,
            address: Some(address),
            error,
        };

        let (url, staked) = tokio::join!(
            self.registry.upstream_url(block, address),
            self.registry.staked_amount(block, address),
        );
        let url = url.map_err(|e| fail(e.into()))?;
        let staked = staked.map_err(|e| fail(e.into()))?;

        let upstream = parse_upstream_url(&url).map_err(fail)?;
        let weight = stake_weight(staked, self.min_stake_unit)
            .ok_or_else(|| fail(EntryError::BelowMinimumStake(staked)))?;

        let resolved = timeout(self.resolve_timeout, self.resolver.resolve_ipv4(&upstream.host)).await;
        let ip = match resolved {
            Ok(Ok(ip)) => ip,
            Ok(Err(e)) => {
                return Err(fail(EntryError::Resolve {
                    host: upstream.host,
                    reason: e.to_string(),
                }))
            }
            Err(_) => {
                return Err(fail(EntryError::Resolve {
                    host: upstream.host,
                    reason: format!("timed out after {:?}", self.resolve_timeout),
                }))
            }
        };

        Ok(Some(StakerRecord {
            address,
            upstream: SocketAddrV4::new(ip, upstream.port),
            weight,
        }))
    }
}
