//! Swap-intent records exchanged with the contract, and the fee sizing
//! applied before a write is submitted.

use ethers_core::abi::Token;
use ethers_core::types::{Address, U256};
#[cfg(feature = "json")]
use serde::{Deserialize, Serialize};

use crate::asset::{AssetDescriptor, AssetList};
use crate::error::SwapError;
use crate::events::Operation;

/// Gas limit applied to write transactions unless overridden.
pub const DEFAULT_GAS_LIMIT: u64 = 2_000_000;

/// On-chain lifecycle of a swap intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
pub enum SwapStatus {
    Opened,
    Closed,
    Cancelled,
}

impl SwapStatus {
    pub fn tag(&self) -> u8 {
        match self {
            Self::Opened => 0,
            Self::Closed => 1,
            Self::Cancelled => 2,
        }
    }
}

impl TryFrom<u8> for SwapStatus {
    type Error = SwapError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Opened),
            1 => Ok(Self::Closed),
            2 => Ok(Self::Cancelled),
            other => Err(SwapError::UnknownStatus(other)),
        }
    }
}

/// The contract's `swapIntent` struct.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
pub struct SwapIntent {
    pub id: U256,
    pub maker: Address,
    pub discount_maker: bool,
    /// Native value contributed by the maker, in wei.
    pub value_maker: U256,
    pub flat_fee_maker: U256,
    /// Zero address for an open swap.
    pub taker: Address,
    pub discount_taker: bool,
    /// Native value requested from the taker, in wei.
    pub value_taker: U256,
    pub flat_fee_taker: U256,
    pub swap_start: U256,
    pub swap_end: U256,
    pub flag_flat_fee: bool,
    pub flag_royalties: bool,
    pub status: SwapStatus,
    pub royalties_maker: U256,
    pub royalties_taker: U256,
}

impl SwapIntent {
    /// Intent submitted by `maker` when creating a swap. Fee, royalty and
    /// discount fields are left zeroed; the contract fills them in.
    pub fn proposal(maker: Address, params: &CreateSwapParams) -> Self {
        Self {
            id: U256::zero(),
            maker,
            discount_maker: false,
            value_maker: params.maker_value,
            flat_fee_maker: U256::zero(),
            taker: params.taker,
            discount_taker: false,
            value_taker: params.taker_value,
            flat_fee_taker: U256::zero(),
            swap_start: U256::zero(),
            swap_end: U256::from(params.expiry_offset),
            flag_flat_fee: false,
            flag_royalties: false,
            status: SwapStatus::Opened,
            royalties_maker: U256::zero(),
            royalties_taker: U256::zero(),
        }
    }

    pub fn to_token(&self) -> Token {
        Token::Tuple(vec![
            Token::Uint(self.id),
            Token::Address(self.maker),
            Token::Bool(self.discount_maker),
            Token::Uint(self.value_maker),
            Token::Uint(self.flat_fee_maker),
            Token::Address(self.taker),
            Token::Bool(self.discount_taker),
            Token::Uint(self.value_taker),
            Token::Uint(self.flat_fee_taker),
            Token::Uint(self.swap_start),
            Token::Uint(self.swap_end),
            Token::Bool(self.flag_flat_fee),
            Token::Bool(self.flag_royalties),
            Token::Uint(U256::from(self.status.tag())),
            Token::Uint(self.royalties_maker),
            Token::Uint(self.royalties_taker),
        ])
    }

    pub fn from_token(token: Token) -> Result<Self, SwapError> {
        let fields = token
            .into_tuple()
            .ok_or(SwapError::MalformedIntent("expected a tuple"))?;
        if fields.len() != 16 {
            return Err(SwapError::MalformedIntent("expected sixteen fields"));
        }
        let mut r = TupleReader(fields.into_iter());

        Ok(Self {
            id: r.uint("id")?,
            maker: r.address("addressMaker")?,
            discount_maker: r.boolean("discountMaker")?,
            value_maker: r.uint("valueMaker")?,
            flat_fee_maker: r.uint("flatFeeMaker")?,
            taker: r.address("addressTaker")?,
            discount_taker: r.boolean("discountTaker")?,
            value_taker: r.uint("valueTaker")?,
            flat_fee_taker: r.uint("flatFeeTaker")?,
            swap_start: r.uint("swapStart")?,
            swap_end: r.uint("swapEnd")?,
            flag_flat_fee: r.boolean("flagFlatFee")?,
            flag_royalties: r.boolean("flagRoyalties")?,
            status: r.status()?,
            royalties_maker: r.uint("royaltiesMaker")?,
            royalties_taker: r.uint("royaltiesTaker")?,
        })
    }
}

struct TupleReader(std::vec::IntoIter<Token>);

impl TupleReader {
    fn uint(&mut self, field: &'static str) -> Result<U256, SwapError> {
        self.0
            .next()
            .and_then(Token::into_uint)
            .ok_or(SwapError::MalformedIntent(field))
    }

    fn address(&mut self, field: &'static str) -> Result<Address, SwapError> {
        self.0
            .next()
            .and_then(Token::into_address)
            .ok_or(SwapError::MalformedIntent(field))
    }

    fn boolean(&mut self, field: &'static str) -> Result<bool, SwapError> {
        self.0
            .next()
            .and_then(Token::into_bool)
            .ok_or(SwapError::MalformedIntent(field))
    }

    fn status(&mut self) -> Result<SwapStatus, SwapError> {
        let raw = self.uint("status")?;
        if raw > U256::from(u8::MAX) {
            return Err(SwapError::MalformedIntent("status"));
        }
        SwapStatus::try_from(raw.as_u32() as u8)
    }
}

/// The contract's payment configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
pub struct PaymentConfig {
    pub flag_flat_fee: bool,
    pub flag_royalties: bool,
    /// Flat fee in wei, charged when `flag_flat_fee` is set.
    pub flat_fee: U256,
    pub bps: U256,
    pub scale_percent: U256,
}

impl PaymentConfig {
    /// The flat fee a non-privileged caller has to add to the transmitted value.
    pub fn flat_fee_due(&self) -> U256 {
        if self.flag_flat_fee {
            self.flat_fee
        } else {
            U256::zero()
        }
    }
}

/// The contract's reference addresses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
pub struct ReferenceAddresses {
    pub royalty_engine: Address,
    /// First collection whose holders have the flat fee waived.
    pub trade_squad: Address,
    /// Second collection whose holders have the flat fee waived.
    pub partner_squad: Address,
    pub vault: Address,
}

impl ReferenceAddresses {
    /// Collections checked for the fee waiver, in lookup order.
    pub fn privileged_collections(&self) -> [Address; 2] {
        [self.trade_squad, self.partner_squad]
    }
}

/// Value to transmit with a write: `base`, plus the flat fee unless the
/// sender holds a privileged collection.
pub fn transmitted_value(
    base: U256,
    payment: &PaymentConfig,
    privileged: bool,
) -> Result<U256, SwapError> {
    if privileged {
        return Ok(base);
    }
    base.checked_add(payment.flat_fee_due())
        .ok_or(SwapError::ValueOverflow)
}

/// Per-transaction gas settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
pub struct GasOverrides {
    /// `None` lets the provider estimate.
    pub gas_limit: Option<u64>,
    /// `None` lets the provider price the transaction.
    pub gas_price: Option<U256>,
}

impl Default for GasOverrides {
    fn default() -> Self {
        Self {
            gas_limit: Some(DEFAULT_GAS_LIMIT),
            gas_price: None,
        }
    }
}

/// Arguments of a create-swap write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateSwapParams {
    /// Native value the maker contributes.
    pub maker_value: U256,
    /// Designated taker, or the zero address for anyone.
    pub taker: Address,
    /// Native value requested from the taker.
    pub taker_value: U256,
    /// Validity of the swap; zero means no expiry.
    pub expiry_offset: u64,
    pub maker_assets: AssetList,
    pub taker_assets: AssetList,
    pub referral: Address,
}

impl CreateSwapParams {
    pub fn new(taker: Address) -> Self {
        Self {
            maker_value: U256::zero(),
            taker,
            taker_value: U256::zero(),
            expiry_offset: 0,
            maker_assets: AssetList::new(),
            taker_assets: AssetList::new(),
            referral: Address::zero(),
        }
    }
}

/// Arguments of a close-swap write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloseSwapParams {
    pub maker: Address,
    pub swap_id: U256,
    pub referral: Address,
}

impl CloseSwapParams {
    pub fn new(maker: Address, swap_id: U256) -> Self {
        Self {
            maker,
            swap_id,
            referral: Address::zero(),
        }
    }
}

/// A state-changing contract call with its named arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwapCall {
    CreateSwapIntent {
        intent: SwapIntent,
        maker_assets: AssetList,
        taker_assets: AssetList,
        referral: Address,
    },
    CloseSwapIntent {
        maker: Address,
        swap_id: U256,
        referral: Address,
    },
    CancelSwapIntent {
        swap_id: U256,
    },
    EditCounterPart {
        swap_id: U256,
        taker: Address,
    },
}

impl SwapCall {
    pub fn operation(&self) -> Operation {
        match self {
            Self::CreateSwapIntent { .. } => Operation::CreateSwap,
            Self::CloseSwapIntent { .. } => Operation::CloseSwap,
            Self::CancelSwapIntent { .. } => Operation::CancelSwap,
            Self::EditCounterPart { .. } => Operation::EditTaker,
        }
    }

    pub fn method(&self) -> &'static str {
        self.operation().method()
    }

    /// Positional call arguments, in ABI order.
    pub fn to_tokens(&self) -> Vec<Token> {
        match self {
            Self::CreateSwapIntent {
                intent,
                maker_assets,
                taker_assets,
                referral,
            } => vec![
                intent.to_token(),
                maker_assets.to_token(),
                taker_assets.to_token(),
                Token::Address(*referral),
            ],
            Self::CloseSwapIntent {
                maker,
                swap_id,
                referral,
            } => vec![
                Token::Address(*maker),
                Token::Uint(*swap_id),
                Token::Address(*referral),
            ],
            Self::CancelSwapIntent { swap_id } => vec![Token::Uint(*swap_id)],
            Self::EditCounterPart { swap_id, taker } => {
                vec![Token::Uint(*swap_id), Token::Address(*taker)]
            }
        }
    }
}

/// Both asset lists stored for a swap.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
pub struct SwapAssets {
    pub maker: Vec<AssetDescriptor>,
    pub taker: Vec<AssetDescriptor>,
}
