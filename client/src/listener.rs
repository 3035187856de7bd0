//! Websocket subscriptions to the swap contract's own events.
//!
//! These are the contract-emitted logs (`swapEvent`, `counterpartEvent`,
//! `paymentReceived`), independent of the SDK's lifecycle channels.

use ethers::abi::{Abi, LogParam, RawLog, Token};
use ethers::providers::{Middleware, Provider, Ws};
use ethers::types::{Address, Filter, Log, H256, U256};
use futures::StreamExt;
use swapkit_core::{SwapError, SwapStatus};
use tracing::{debug, info, warn};

use crate::contract::ethereum::swap_contract_abi;
use crate::error::ClientError;
use crate::Result;

pub const SWAP_EVENT: &str = "swapEvent(address,uint256,uint8,uint256,address,address)";
pub const COUNTERPART_EVENT: &str = "counterpartEvent(uint256,address)";
pub const PAYMENT_RECEIVED: &str = "paymentReceived(address,uint256)";

/// Decoded swap contract event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwapLog {
    /// A swap was opened, closed or cancelled.
    Swap {
        creator: Address,
        time: U256,
        status: SwapStatus,
        swap_id: U256,
        counterpart: Address,
        referral: Address,
    },
    /// The taker of a swap was replaced.
    Counterpart { swap_id: U256, counterpart: Address },
    PaymentReceived { payer: Address, value: U256 },
}

/// Filter on `swapEvent`; every `None` matches anything.
pub fn swap_event_filter(
    contract: Address,
    creator: Option<Address>,
    time: Option<U256>,
    status: Option<SwapStatus>,
) -> Filter {
    let mut filter = Filter::new().address(contract).event(SWAP_EVENT);
    if let Some(creator) = creator {
        filter = filter.topic1(address_topic(creator));
    }
    if let Some(time) = time {
        filter = filter.topic2(uint_topic(time));
    }
    if let Some(status) = status {
        filter = filter.topic3(uint_topic(status.tag().into()));
    }
    filter
}

/// Filter on `counterpartEvent`.
pub fn counterpart_event_filter(
    contract: Address,
    swap_id: Option<U256>,
    counterpart: Option<Address>,
) -> Filter {
    let mut filter = Filter::new().address(contract).event(COUNTERPART_EVENT);
    if let Some(swap_id) = swap_id {
        filter = filter.topic1(uint_topic(swap_id));
    }
    if let Some(counterpart) = counterpart {
        filter = filter.topic2(address_topic(counterpart));
    }
    filter
}

/// Filter on `paymentReceived`.
pub fn payment_received_filter(contract: Address, payer: Option<Address>) -> Filter {
    let mut filter = Filter::new().address(contract).event(PAYMENT_RECEIVED);
    if let Some(payer) = payer {
        filter = filter.topic1(address_topic(payer));
    }
    filter
}

fn address_topic(address: Address) -> H256 {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(address.as_bytes());
    H256(word)
}

fn uint_topic(value: U256) -> H256 {
    let mut word = [0u8; 32];
    value.to_big_endian(&mut word);
    H256(word)
}

/// Decodes a raw log emitted by the swap contract.
pub fn decode_log(abi: &Abi, log: &Log) -> Result<SwapLog> {
    let topic0 = log
        .topics
        .first()
        .ok_or_else(|| ClientError::Serialization("log without topics".into()))?;
    let event = abi
        .events()
        .find(|e| e.signature() == *topic0)
        .ok_or_else(|| ClientError::Serialization(format!("unknown event topic {topic0:?}")))?;

    let parsed = event.parse_log(RawLog {
        topics: log.topics.clone(),
        data: log.data.to_vec(),
    })?;
    let mut params = Params(parsed.params);

    match event.name.as_str() {
        "swapEvent" => Ok(SwapLog::Swap {
            creator: params.address("_creator")?,
            time: params.uint("_time")?,
            status: {
                let raw = params.uint("_status")?;
                if raw > U256::from(u8::MAX) {
                    return Err(SwapError::MalformedIntent("status").into());
                }
                SwapStatus::try_from(raw.as_u32() as u8)?
            },
            swap_id: params.uint("_swapId")?,
            counterpart: params.address("_counterpart")?,
            referral: params.address("_referral")?,
        }),
        "counterpartEvent" => Ok(SwapLog::Counterpart {
            swap_id: params.uint("_swapId")?,
            counterpart: params.address("_counterpart")?,
        }),
        "paymentReceived" => Ok(SwapLog::PaymentReceived {
            payer: params.address("_payer")?,
            value: params.uint("_value")?,
        }),
        other => Err(ClientError::Serialization(format!(
            "unsupported event {other}"
        ))),
    }
}

struct Params(Vec<LogParam>);

impl Params {
    fn take(&mut self, name: &str) -> Result<Token> {
        let index = self
            .0
            .iter()
            .position(|p| p.name == name)
            .ok_or_else(|| ClientError::Serialization(format!("missing event field {name}")))?;
        Ok(self.0.swap_remove(index).value)
    }

    fn uint(&mut self, name: &str) -> Result<U256> {
        self.take(name)?
            .into_uint()
            .ok_or_else(|| ClientError::Serialization(format!("{name} is not a uint")))
    }

    fn address(&mut self, name: &str) -> Result<Address> {
        self.take(name)?
            .into_address()
            .ok_or_else(|| ClientError::Serialization(format!("{name} is not an address")))
    }
}

/// Streams swap contract logs over a websocket provider.
pub struct LogListener {
    provider: Provider<Ws>,
    contract: Address,
    abi: Abi,
}

impl LogListener {
    pub async fn connect(ws_url: &str, contract: Address) -> Result<Self> {
        let provider = Provider::<Ws>::connect(ws_url).await?;
        debug!(%ws_url, ?contract, "Log listener connected");
        Ok(Self {
            provider,
            contract,
            abi: swap_contract_abi()?,
        })
    }

    pub fn contract(&self) -> Address {
        self.contract
    }

    /// Runs `handler` for every decoded log matching `filter` until the
    /// subscription ends. Logs that fail to decode are skipped.
    pub async fn watch<F>(&self, filter: Filter, mut handler: F) -> Result<()>
    where
        F: FnMut(SwapLog),
    {
        let mut stream = self.provider.subscribe_logs(&filter).await?;
        info!(contract = ?self.contract, "Watching swap contract logs");

        while let Some(log) = stream.next().await {
            match decode_log(&self.abi, &log) {
                Ok(event) => handler(event),
                Err(e) => warn!(tx_hash = ?log.transaction_hash, error = %e, "Skipping log"),
            }
        }
        debug!("Log subscription closed");
        Ok(())
    }
}
