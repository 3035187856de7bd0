//! Transaction lifecycle for the swap contract's write operations.
//!
//! Each write runs a precondition check, submission and confirmation.
//! Submission emits `<op>TransactionCreated`; confirmation emits
//! `<op>TransactionMined`. A failure in either phase emits
//! `<op>TransactionError` and is then returned to the caller as
//! [`ClientError::Transaction`].

use ethers::types::{Address, TransactionReceipt, U256};
use swapkit_core::{
    transmitted_value, AssetDescriptor, Channel, CloseSwapParams, ConfigError, CreateSwapParams,
    EventHub, FailurePhase, GasOverrides, Operation, PaymentConfig, ReferenceAddresses, Stage,
    SubscriptionId, SwapAssets, SwapCall, SwapIntent, TxEvent,
};
use tracing::{debug, info, instrument, warn};

use crate::contract::SwapContract;
use crate::error::ClientError;
use crate::Result;

/// Blocks required on top of a transaction before it counts as mined.
pub const DEFAULT_CONFIRMATIONS: usize = 3;

/// SDK instance: one contract handle, one signer, one event registry.
pub struct SwapClient<C> {
    contract: C,
    events: EventHub,
    confirmations: usize,
    read_only: bool,
    gas: GasOverrides,
}

impl<C: SwapContract> SwapClient<C> {
    pub fn new(contract: C) -> Self {
        Self {
            contract,
            events: EventHub::new(),
            confirmations: DEFAULT_CONFIRMATIONS,
            read_only: false,
            gas: GasOverrides::default(),
        }
    }

    /// Disables every write operation; reads keep working.
    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Gas settings used when a write is given no overrides of its own.
    pub fn with_gas(mut self, gas: GasOverrides) -> Self {
        self.gas = gas;
        self
    }

    pub fn contract(&self) -> &C {
        &self.contract
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn confirmations(&self) -> usize {
        self.confirmations
    }

    /// Sets the confirmation depth awaited by write operations.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidConfirmationDepth`] for zero.
    pub fn set_confirmations(&mut self, confirmations: usize) -> Result<()> {
        if confirmations < 1 {
            return Err(ConfigError::InvalidConfirmationDepth(confirmations).into());
        }
        self.confirmations = confirmations;
        Ok(())
    }

    /// Registers `callback` on the lifecycle channel named `name`.
    pub fn on<F>(&self, name: &str, callback: F) -> Result<SubscriptionId>
    where
        F: Fn(&TxEvent) + Send + Sync + 'static,
    {
        Ok(self.events.register(name, callback)?)
    }

    /// Typed variant of [`SwapClient::on`].
    pub fn subscribe<F>(&self, channel: Channel, callback: F) -> SubscriptionId
    where
        F: Fn(&TxEvent) + Send + Sync + 'static,
    {
        self.events.subscribe(channel, callback)
    }

    /// Removes one callback, or all callbacks of the channel when `id` is `None`.
    pub fn off(&self, name: &str, id: Option<SubscriptionId>) -> Result<()> {
        Ok(self.events.unregister(name, id)?)
    }

    /// Creates a swap intent with the sender as maker.
    ///
    /// The transmitted value is the maker's contribution plus the flat fee,
    /// unless the maker holds one of the privileged collections.
    #[instrument(skip(self, params, gas), fields(taker = ?params.taker))]
    pub async fn create_swap(
        &self,
        params: &CreateSwapParams,
        gas: Option<GasOverrides>,
    ) -> Result<TransactionReceipt> {
        self.ensure_writable()?;

        let maker = self.contract.sender().await?;
        let value = self.fee_adjusted(params.maker_value, maker).await?;

        let call = SwapCall::CreateSwapIntent {
            intent: SwapIntent::proposal(maker, params),
            maker_assets: params.maker_assets.clone(),
            taker_assets: params.taker_assets.clone(),
            referral: params.referral,
        };
        self.execute(call, value, gas).await
    }

    /// Closes a swap as taker, paying the value stored for the taker side.
    #[instrument(skip(self, params, gas), fields(maker = ?params.maker, swap_id = %params.swap_id))]
    pub async fn close_swap(
        &self,
        params: &CloseSwapParams,
        gas: Option<GasOverrides>,
    ) -> Result<TransactionReceipt> {
        self.ensure_writable()?;

        let taker = self.contract.sender().await?;
        let intent = self.contract.swap_intent(params.maker, params.swap_id).await?;
        let value = self.fee_adjusted(intent.value_taker, taker).await?;

        let call = SwapCall::CloseSwapIntent {
            maker: params.maker,
            swap_id: params.swap_id,
            referral: params.referral,
        };
        self.execute(call, value, gas).await
    }

    /// Cancels a swap; only its maker may do so.
    #[instrument(skip(self, gas))]
    pub async fn cancel_swap(
        &self,
        swap_id: U256,
        gas: Option<GasOverrides>,
    ) -> Result<TransactionReceipt> {
        self.ensure_writable()?;
        let call = SwapCall::CancelSwapIntent { swap_id };
        self.execute(call, U256::zero(), gas).await
    }

    /// Replaces the designated taker of a swap; only its maker may do so.
    #[instrument(skip(self, gas))]
    pub async fn edit_taker(
        &self,
        swap_id: U256,
        taker: Address,
        gas: Option<GasOverrides>,
    ) -> Result<TransactionReceipt> {
        self.ensure_writable()?;
        let call = SwapCall::EditCounterPart { swap_id, taker };
        self.execute(call, U256::zero(), gas).await
    }

    pub async fn payment(&self) -> Result<PaymentConfig> {
        self.contract.payment().await
    }

    pub async fn reference_addresses(&self) -> Result<ReferenceAddresses> {
        self.contract.reference_addresses().await
    }

    pub async fn swap_details(&self, maker: Address, swap_id: U256) -> Result<SwapIntent> {
        self.contract.swap_intent(maker, swap_id).await
    }

    /// Reads both stored asset lists of a swap, entry by entry.
    pub async fn swap_assets(&self, swap_id: U256) -> Result<SwapAssets> {
        Ok(SwapAssets {
            maker: self.side_assets(swap_id, true).await?,
            taker: self.side_assets(swap_id, false).await?,
        })
    }

    pub async fn is_erc20_whitelisted(&self, token: Address) -> Result<bool> {
        self.contract.erc20_whitelisted(token).await
    }

    pub async fn is_nft_blacklisted(&self, collection: Address) -> Result<bool> {
        self.contract.nft_blacklisted(collection).await
    }

    pub async fn is_banned_address(&self, account: Address) -> Result<bool> {
        self.contract.banned(account).await
    }

    async fn side_assets(
        &self,
        swap_id: U256,
        maker_side: bool,
    ) -> Result<Vec<AssetDescriptor>> {
        let count = self.contract.swap_asset_count(swap_id, maker_side).await?;
        let mut assets = Vec::new();
        let mut index = U256::zero();
        while index < count {
            assets.push(self.contract.swap_asset(swap_id, maker_side, index).await?);
            index += U256::one();
        }
        Ok(assets)
    }

    fn ensure_writable(&self) -> Result<()> {
        if self.read_only {
            return Err(ClientError::ReadOnlyMode);
        }
        Ok(())
    }

    // Both collections are always queried; any read failure aborts the write.
    async fn fee_adjusted(&self, base: U256, sender: Address) -> Result<U256> {
        let payment = self.contract.payment().await?;
        let references = self.contract.reference_addresses().await?;

        let mut privileged = false;
        for collection in references.privileged_collections() {
            let balance = self.contract.balance_of(collection, sender).await?;
            privileged |= !balance.is_zero();
        }
        debug!(%base, flat_fee = %payment.flat_fee_due(), privileged, "Sizing transaction value");

        Ok(transmitted_value(base, &payment, privileged)?)
    }

    async fn execute(
        &self,
        call: SwapCall,
        value: U256,
        gas: Option<GasOverrides>,
    ) -> Result<TransactionReceipt> {
        let op = call.operation();
        let gas = gas.unwrap_or(self.gas);

        let pending = match self.contract.submit(&call, value, gas).await {
            Ok(pending) => pending,
            Err(e) => return Err(self.fail(op, FailurePhase::Submission, e)),
        };
        info!(%op, tx_hash = ?pending.tx_hash, "Transaction submitted");
        self.events.emit(
            op.channel(Stage::Created),
            &TxEvent::Created {
                tx_hash: pending.tx_hash,
            },
        );

        match self.contract.confirm(&pending, self.confirmations).await {
            Ok(receipt) => {
                info!(%op, tx_hash = ?pending.tx_hash, "Transaction mined");
                self.events.emit(
                    op.channel(Stage::Mined),
                    &TxEvent::Mined {
                        receipt: Box::new(receipt.clone()),
                    },
                );
                Ok(receipt)
            }
            Err(e) => Err(self.fail(op, FailurePhase::Confirmation, e)),
        }
    }

    fn fail(&self, op: Operation, phase: FailurePhase, err: ClientError) -> ClientError {
        let message = err.to_string();
        warn!(%op, %phase, error = %message, "Transaction failed");
        self.events.emit(
            op.channel(Stage::Error),
            &TxEvent::Failed {
                phase,
                error: message.clone(),
            },
        );
        ClientError::Transaction { op, phase, message }
    }
}
