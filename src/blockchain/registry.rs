//! Staking registry contract bindings.
//!
//! The registry is an access-control style contract: stakers are members of
//! `STAKER_ROLE`, and each member declares an upstream URL and a staked amount.

use std::future::Future;

use alloy::eips::BlockId;
use alloy::primitives::{Address, B256, U256};
use alloy::sol;

use crate::blockchain::client::BlockchainClient;
use crate::blockchain::types::{BlockchainError, BlockchainResult};

sol! {
    #[sol(rpc)]
    interface IStakingRegistry {
        function STAKER_ROLE() external view returns (bytes32);
        function getRoleMemberCount(bytes32 role) external view returns (uint256);
        function getRoleMember(bytes32 role, uint256 index) external view returns (address);
        function getUpstreamUrl(address staker) external view returns (string memory);
        function getAmount(address staker) external view returns (uint256);
    }
}

/// Read-only view of the staking registry, pinned to an explicit block.
///
/// Every method takes the block height so a caller can anchor a whole batch
/// of reads to one consistent snapshot.
pub trait StakingRegistry: Send + Sync {
    /// Latest block height.
    fn block_number(&self) -> impl Future<Output = BlockchainResult<u64>> + Send;

    /// Identifier of the staker role.
    fn staker_role(&self, block: u64) -> impl Future<Output = BlockchainResult<B256>> + Send;

    /// Number of role member slots, including emptied ones.
    fn member_count(
        &self,
        block: u64,
        role: B256,
    ) -> impl Future<Output = BlockchainResult<U256>> + Send;

    /// Member in slot `index`; the zero address marks an emptied slot.
    fn member_at(
        &self,
        block: u64,
        role: B256,
        index: u64,
    ) -> impl Future<Output = BlockchainResult<Address>> + Send;

    /// Upstream URL declared by `staker`.
    fn upstream_url(
        &self,
        block: u64,
        staker: Address,
    ) -> impl Future<Output = BlockchainResult<String>> + Send;

    /// Amount staked by `staker`, in wei.
    fn staked_amount(
        &self,
        block: u64,
        staker: Address,
    ) -> impl Future<Output = BlockchainResult<U256>> + Send;
}

/// [`StakingRegistry`] backed by a deployed contract.
#[derive(Debug, Clone)]
pub struct StakingContract {
    client: BlockchainClient,
    address: Address,
}

impl StakingContract {
    /// Bind to the registry at `address`.
    pub fn new(client: BlockchainClient, address: &str) -> BlockchainResult<Self> {
        let address = address
            .parse::<Address>()
            .map_err(|_| BlockchainError::InvalidAddress(address.to_string()))?;
        Ok(Self { client, address })
    }

    /// Contract address.
    pub fn address(&self) -> Address {
        self.address
    }
}

impl StakingRegistry for StakingContract {
    async fn block_number(&self) -> BlockchainResult<u64> {
        self.client.get_block_number().await
    }

    async fn staker_role(&self, block: u64) -> BlockchainResult<B256> {
        let address = self.address;
        self.client
            .with_failover("read STAKER_ROLE", |provider| async move {
                let registry = IStakingRegistry::new(address, provider);
                registry
                    .STAKER_ROLE()
                    .block(BlockId::number(block))
                    .call()
                    .await
            })
            .await
    }

    async fn member_count(&self, block: u64, role: B256) -> BlockchainResult<U256> {
        let address = self.address;
        self.client
            .with_failover("read role member count", |provider| async move {
                let registry = IStakingRegistry::new(address, provider);
                registry
                    .getRoleMemberCount(role)
                    .block(BlockId::number(block))
                    .call()
                    .await
            })
            .await
    }

    async fn member_at(&self, block: u64, role: B256, index: u64) -> BlockchainResult<Address> {
        let address = self.address;
        self.client
            .with_failover("read role member", |provider| async move {
                let registry = IStakingRegistry::new(address, provider);
                registry
                    .getRoleMember(role, U256::from(index))
                    .block(BlockId::number(block))
                    .call()
                    .await
            })
            .await
    }

    async fn upstream_url(&self, block: u64, staker: Address) -> BlockchainResult<String> {
        let address = self.address;
        self.client
            .with_failover("read upstream url", |provider| async move {
                let registry = IStakingRegistry::new(address, provider);
                registry
                    .getUpstreamUrl(staker)
                    .block(BlockId::number(block))
                    .call()
                    .await
            })
            .await
    }

    async fn staked_amount(&self, block: u64, staker: Address) -> BlockchainResult<U256> {
        let address = self.address;
        self.client
            .with_failover("read staked amount", |provider| async move {
                let registry = IStakingRegistry::new(address, provider);
                registry
                    .getAmount(staker)
                    .block(BlockId::number(block))
                    .call()
                    .await
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::sol_types::SolCall;
    use crate::config::ChainConfig;

    #[test]
    fn test_selectors_match_deployed_registry() {
        assert_eq!(IStakingRegistry::STAKER_ROLECall::SELECTOR, [0x37, 0x80, 0xb3, 0xed]);
        assert_eq!(IStakingRegistry::getRoleMemberCountCall::SELECTOR, [0xca, 0x15, 0xc8, 0x73]);
        assert_eq!(IStakingRegistry::getRoleMemberCall::SELECTOR, [0x90, 0x10, 0xd0, 0x7c]);
        assert_eq!(IStakingRegistry::getUpstreamUrlCall::SELECTOR, [0x2b, 0xdb, 0xee, 0x58]);
        assert_eq!(IStakingRegistry::getAmountCall::SELECTOR, [0xf5, 0xa7, 0x97, 0x67]);
    }

    #[test]
    fn test_rejects_bad_address() {
        let client = BlockchainClient::new(&ChainConfig::default()).unwrap();
        let err = StakingContract::new(client, "0x1234").unwrap_err();
        assert!(matches!(err, BlockchainError::InvalidAddress(_)));
    }

    #[test]
    fn test_binds_valid_address() {
        let client = BlockchainClient::new(&ChainConfig::default()).unwrap();
        let contract =
            StakingContract::new(client, "0x0000000000000000000000000000000000000abc").unwrap();
        assert_eq!(contract.address(), Address::left_padding_from(&[0x0a, 0xbc]));
    }
}
