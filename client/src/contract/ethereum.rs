use std::sync::Arc;

use ethers::abi::{Abi, Detokenize, Token, Tokenize};
use ethers::contract::Contract;
use ethers::middleware::SignerMiddleware;
use ethers::providers::{Http, Middleware, PendingTransaction, Provider};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, TransactionReceipt, TransactionRequest, U256, U64};
use serde_json::Value;
use swapkit_core::{
    AssetDescriptor, GasOverrides, PaymentConfig, ReferenceAddresses, SwapCall, SwapIntent,
};
use tracing::{debug, info, instrument, trace, warn};

use super::{PendingSwap, SwapContract};
use crate::error::ClientError;
use crate::Result;

// Swap contract ABI for encoding calls and decoding reads
const SWAP_CONTRACT_JSON: &str = include_str!("../../abi/NFTTraderSwap.json");

// Only `balanceOf` is needed from the privileged collections.
const ERC721_BALANCE_OF: &str = "function balanceOf(address owner) view returns (uint256)";

// Read-only accessors of the swap contract.
const PAYMENT: &str = "payment";
const REFERENCE_ADDRESS: &str = "referenceAddress";
const GET_SWAP_INTENT: &str = "getSwapIntentByAddress";
const GET_SWAP_STRUCT_SIZE: &str = "getSwapStructSize";
const GET_SWAP_STRUCT: &str = "getSwapStruct";
const GET_ERC20_WHITELIST: &str = "getERC20WhiteList";
const GET_NFT_BLACKLIST: &str = "getNFTBlacklist";
const BANNED_ADDRESS: &str = "bannedAddress";
const BALANCE_OF: &str = "balanceOf";

/// Loads the swap contract ABI from its build artifact.
pub fn swap_contract_abi() -> Result<Abi> {
    let artifact: Value = serde_json::from_str(SWAP_CONTRACT_JSON)
        .map_err(|e| ClientError::Serialization(e.to_string()))?;
    let abi_json = artifact
        .get("abi")
        .ok_or_else(|| ClientError::Serialization("Missing ABI section".into()))?
        .to_string();
    serde_json::from_str::<Abi>(&abi_json).map_err(|e| ClientError::Serialization(e.to_string()))
}

/// Swap contract reached over an Ethereum JSON-RPC provider.
///
/// Writes are signed by the local wallet when one is configured, and by
/// the node's first account otherwise.
pub struct EthereumSwapContract {
    // JSON-RPC provider
    provider: Provider<Http>,
    // Swap contract bound to the provider, for reads
    swap: Contract<Provider<Http>>,
    // ERC721 ABI used for the fee-waiver balance checks
    erc721: Abi,
    // Local signer; `None` signs through the node
    wallet: Option<LocalWallet>,
}

impl EthereumSwapContract {
    pub async fn connect(
        provider: Provider<Http>,
        address: Address,
        wallet: Option<LocalWallet>,
    ) -> Result<Self> {
        let wallet = match wallet {
            Some(wallet) => {
                let chain_id = provider.get_chainid().await?.as_u64();
                debug!(%chain_id, "Connected to Ethereum");
                Some(wallet.with_chain_id(chain_id))
            }
            None => None,
        };
        debug!(has_wallet = wallet.is_some(), contract = ?address, "Swap contract configured");

        let erc721 = ethers::abi::parse_abi(&[ERC721_BALANCE_OF])
            .map_err(|e| ClientError::Serialization(e.to_string()))?;
        let swap = Contract::new(address, swap_contract_abi()?, Arc::new(provider.clone()));

        Ok(Self {
            provider,
            swap,
            erc721,
            wallet,
        })
    }

    pub fn provider(&self) -> &Provider<Http> {
        &self.provider
    }

    async fn read<T, D>(&self, method: &'static str, args: T) -> Result<D>
    where
        T: Tokenize + Send,
        D: Detokenize + Send + Sync,
    {
        trace!(method, "Reading swap contract");
        self.swap
            .method::<T, D>(method, args)
            .map_err(|e| read_error(method, e))?
            .call()
            .await
            .map_err(|e| read_error(method, e))
    }
}

fn read_error(method: &'static str, err: impl std::fmt::Display) -> ClientError {
    ClientError::ContractRead {
        method,
        message: err.to_string(),
    }
}

#[async_trait::async_trait]
impl SwapContract for EthereumSwapContract {
    fn address(&self) -> Address {
        self.swap.address()
    }

    async fn sender(&self) -> Result<Address> {
        if let Some(wallet) = &self.wallet {
            return Ok(wallet.address());
        }
        self.provider
            .get_accounts()
            .await?
            .first()
            .copied()
            .ok_or(ClientError::NoAccount)
    }

    async fn payment(&self) -> Result<PaymentConfig> {
        let (flag_flat_fee, flag_royalties, flat_fee, bps, scale_percent) = self
            .read::<_, (bool, bool, U256, U256, U256)>(PAYMENT, ())
            .await?;
        Ok(PaymentConfig {
            flag_flat_fee,
            flag_royalties,
            flat_fee,
            bps,
            scale_percent,
        })
    }

    async fn reference_addresses(&self) -> Result<ReferenceAddresses> {
        let (royalty_engine, trade_squad, partner_squad, vault) = self
            .read::<_, (Address, Address, Address, Address)>(REFERENCE_ADDRESS, ())
            .await?;
        Ok(ReferenceAddresses {
            royalty_engine,
            trade_squad,
            partner_squad,
            vault,
        })
    }

    async fn balance_of(&self, collection: Address, owner: Address) -> Result<U256> {
        let erc721 = Contract::new(
            collection,
            self.erc721.clone(),
            Arc::new(self.provider.clone()),
        );
        erc721
            .method::<_, U256>(BALANCE_OF, owner)
            .map_err(|e| read_error(BALANCE_OF, e))?
            .call()
            .await
            .map_err(|e| read_error(BALANCE_OF, e))
    }

    async fn swap_intent(&self, maker: Address, swap_id: U256) -> Result<SwapIntent> {
        let token = self
            .read::<_, Token>(GET_SWAP_INTENT, (maker, swap_id))
            .await?;
        Ok(SwapIntent::from_token(token)?)
    }

    async fn swap_asset_count(&self, swap_id: U256, maker_side: bool) -> Result<U256> {
        self.read(GET_SWAP_STRUCT_SIZE, (swap_id, maker_side)).await
    }

    async fn swap_asset(
        &self,
        swap_id: U256,
        maker_side: bool,
        index: U256,
    ) -> Result<AssetDescriptor> {
        let token = self
            .read::<_, Token>(GET_SWAP_STRUCT, (swap_id, maker_side, index))
            .await?;
        Ok(AssetDescriptor::from_token(token)?)
    }

    async fn erc20_whitelisted(&self, token: Address) -> Result<bool> {
        self.read(GET_ERC20_WHITELIST, token).await
    }

    async fn nft_blacklisted(&self, collection: Address) -> Result<bool> {
        self.read(GET_NFT_BLACKLIST, collection).await
    }

    async fn banned(&self, account: Address) -> Result<bool> {
        self.read(BANNED_ADDRESS, account).await
    }

    #[instrument(skip(self, call, gas), fields(method = call.method()))]
    async fn submit(&self, call: &SwapCall, value: U256, gas: GasOverrides) -> Result<PendingSwap> {
        let data = self
            .swap
            .abi()
            .function(call.method())?
            .encode_input(&call.to_tokens())?;
        let from = self.sender().await?;

        let mut tx = TransactionRequest::new()
            .from(from)
            .to(self.swap.address())
            .data(data)
            .value(value);
        if let Some(limit) = gas.gas_limit {
            tx = tx.gas(limit);
        }
        if let Some(price) = gas.gas_price {
            tx = tx.gas_price(price);
        }

        info!(?from, "Sending {} transaction", call.method());
        let tx_hash = match &self.wallet {
            Some(wallet) => {
                let client = SignerMiddleware::new(self.provider.clone(), wallet.clone());
                let tx_hash = client
                    .send_transaction(tx, None)
                    .await
                    .map_err(|e| ClientError::BlockchainError(e.to_string()))?
                    .tx_hash();
                tx_hash
            }
            None => self.provider.send_transaction(tx, None).await?.tx_hash(),
        };
        debug!(?tx_hash, "Transaction accepted by node");

        Ok(PendingSwap {
            tx_hash,
            operation: call.operation(),
        })
    }

    #[instrument(skip(self, pending), fields(tx_hash = ?pending.tx_hash))]
    async fn confirm(
        &self,
        pending: &PendingSwap,
        confirmations: usize,
    ) -> Result<TransactionReceipt> {
        let receipt = PendingTransaction::new(pending.tx_hash, &self.provider)
            .confirmations(confirmations)
            .await?
            .ok_or(ClientError::TxDropped(pending.tx_hash))?;
        if receipt.status == Some(U64::zero()) {
            warn!(block = ?receipt.block_number, "Transaction reverted");
            return Err(ClientError::TxReverted(pending.tx_hash));
        }
        info!(block = ?receipt.block_number, "Transaction mined");
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use swapkit_core::{AssetList, CreateSwapParams};

    use super::*;

    #[test]
    fn artifact_exposes_every_used_method() {
        let abi = swap_contract_abi().unwrap();
        for name in [
            PAYMENT,
            REFERENCE_ADDRESS,
            GET_SWAP_INTENT,
            GET_SWAP_STRUCT_SIZE,
            GET_SWAP_STRUCT,
            GET_ERC20_WHITELIST,
            GET_NFT_BLACKLIST,
            BANNED_ADDRESS,
            "createSwapIntent",
            "closeSwapIntent",
            "cancelSwapIntent",
            "editCounterPart",
        ] {
            assert!(abi.function(name).is_ok(), "missing {name}");
        }
    }

    #[test]
    fn create_call_encodes_against_artifact() {
        let abi = swap_contract_abi().unwrap();
        let mut params = CreateSwapParams::new(Address::repeat_byte(2));
        params.maker_assets = {
            let mut list = AssetList::new();
            list.add_erc20(Address::repeat_byte(7), 5u64).unwrap();
            list.add_erc1155(Address::repeat_byte(8), [1u64, 2], [3u64, 4])
                .unwrap();
            list
        };
        let call = SwapCall::CreateSwapIntent {
            intent: SwapIntent::proposal(Address::repeat_byte(1), &params),
            maker_assets: params.maker_assets.clone(),
            taker_assets: params.taker_assets.clone(),
            referral: params.referral,
        };

        let function = abi.function(call.method()).unwrap();
        let data = function.encode_input(&call.to_tokens()).unwrap();
        assert_eq!(&data[..4], &function.short_signature()[..]);

        let decoded = function.decode_input(&data[4..]).unwrap();
        assert_eq!(decoded, call.to_tokens());
    }

    #[test]
    fn erc721_balance_of_parses() {
        let abi = ethers::abi::parse_abi(&[ERC721_BALANCE_OF]).unwrap();
        assert!(abi.function(BALANCE_OF).is_ok());
    }
}
