use ethers::types::{Address, TransactionReceipt, TxHash, U256};
use swapkit_core::{
    AssetDescriptor, GasOverrides, Operation, PaymentConfig, ReferenceAddresses, SwapCall,
    SwapIntent,
};

use crate::Result;

pub mod ethereum;

/// Transaction accepted by the node but not yet confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingSwap {
    pub tx_hash: TxHash,
    pub operation: Operation,
}

/// Connected handle to the swap contract.
///
/// Implementors provide:
/// - The identity that signs write transactions
/// - Read accessors for the contract's configuration and stored swaps
/// - Submission of a write, and waiting for its confirmation
#[async_trait::async_trait]
pub trait SwapContract: Send + Sync {
    /// Address of the swap contract.
    fn address(&self) -> Address;

    /// Account that authorizes write transactions.
    async fn sender(&self) -> Result<Address>;

    async fn payment(&self) -> Result<PaymentConfig>;

    async fn reference_addresses(&self) -> Result<ReferenceAddresses>;

    /// ERC721 `balanceOf(owner)` on `collection`.
    async fn balance_of(&self, collection: Address, owner: Address) -> Result<U256>;

    async fn swap_intent(&self, maker: Address, swap_id: U256) -> Result<SwapIntent>;

    /// Number of assets stored on the maker (`true`) or taker side of a swap.
    async fn swap_asset_count(&self, swap_id: U256, maker_side: bool) -> Result<U256>;

    async fn swap_asset(
        &self,
        swap_id: U256,
        maker_side: bool,
        index: U256,
    ) -> Result<AssetDescriptor>;

    async fn erc20_whitelisted(&self, token: Address) -> Result<bool>;

    async fn nft_blacklisted(&self, collection: Address) -> Result<bool>;

    async fn banned(&self, account: Address) -> Result<bool>;

    /// Send `call` with `value` attached; returns once the node accepted it.
    async fn submit(&self, call: &SwapCall, value: U256, gas: GasOverrides) -> Result<PendingSwap>;

    /// Wait until `pending` is buried under `confirmations` blocks.
    ///
    /// # Errors
    /// A dropped, replaced or reverted transaction is reported as an error; it is
    /// never resubmitted.
    async fn confirm(&self, pending: &PendingSwap, confirmations: usize)
        -> Result<TransactionReceipt>;
}
