//! Asset lists for one side (maker or taker) of a swap.
//!
//! Descriptors are validated when they are added, and only turned into the
//! contract's positional tuple `(address, uint8, uint256[], uint256[],
//! uint256[], bytes)` at the encoding boundary.

use std::fmt;

use ethers_core::abi::Token;
use ethers_core::types::{Address, Bytes, U256};
#[cfg(feature = "json")]
use serde::{Deserialize, Serialize};

use crate::error::AssetError;

/// Token standards understood by the swap contract, tagged as on-chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "json", serde(rename_all = "UPPERCASE"))]
pub enum TokenStandard {
    Erc20,
    Erc721,
    Erc1155,
}

impl TokenStandard {
    pub fn tag(&self) -> u8 {
        match self {
            Self::Erc20 => 0,
            Self::Erc721 => 1,
            Self::Erc1155 => 2,
        }
    }
}

impl TryFrom<u8> for TokenStandard {
    type Error = AssetError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Erc20),
            1 => Ok(Self::Erc721),
            2 => Ok(Self::Erc1155),
            other => Err(AssetError::UnknownStandard(other)),
        }
    }
}

impl fmt::Display for TokenStandard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Erc20 => f.write_str("ERC20"),
            Self::Erc721 => f.write_str("ERC721"),
            Self::Erc1155 => f.write_str("ERC1155"),
        }
    }
}

/// A single entry of a swap side's asset list.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
pub struct AssetDescriptor {
    /// Token contract address.
    pub contract: Address,
    pub standard: TokenStandard,
    /// Empty for ERC20.
    pub token_ids: Vec<U256>,
    /// One element for ERC20, paired with `token_ids` for ERC1155,
    /// empty for ERC721.
    pub token_amounts: Vec<U256>,
    /// Reserved; filled in by the contract.
    pub royalty_amounts: Vec<U256>,
    /// Reserved.
    pub data: Bytes,
}

impl AssetDescriptor {
    fn new(contract: Address, standard: TokenStandard, ids: Vec<U256>, amounts: Vec<U256>) -> Self {
        Self {
            contract,
            standard,
            token_ids: ids,
            token_amounts: amounts,
            royalty_amounts: Vec::new(),
            data: Bytes::new(),
        }
    }

    /// Checks the per-standard shape of the id and amount lists.
    pub fn validate(&self) -> Result<(), AssetError> {
        match self.standard {
            TokenStandard::Erc20 => {
                if !self.token_ids.is_empty() {
                    return Err(AssetError::MalformedTuple("ERC20 entries carry no token ids"));
                }
                if self.token_amounts.len() != 1 {
                    return Err(AssetError::InvalidAmountList);
                }
            }
            TokenStandard::Erc721 => {
                if self.token_ids.is_empty() {
                    return Err(AssetError::InvalidTokenIdList);
                }
                if !self.token_amounts.is_empty() {
                    return Err(AssetError::MalformedTuple("ERC721 entries carry no amounts"));
                }
            }
            TokenStandard::Erc1155 => {
                check_pairs(self.token_ids.len(), self.token_amounts.len())?;
            }
        }
        Ok(())
    }

    /// Encodes the descriptor as the contract's positional tuple.
    pub fn to_token(&self) -> Token {
        Token::Tuple(vec![
            Token::Address(self.contract),
            Token::Uint(U256::from(self.standard.tag())),
            uint_array(&self.token_ids),
            uint_array(&self.token_amounts),
            uint_array(&self.royalty_amounts),
            Token::Bytes(self.data.to_vec()),
        ])
    }

    /// Decodes a tuple returned by the contract. Stored entries are taken
    /// as-is; the contract validated them when the swap was created.
    pub fn from_token(token: Token) -> Result<Self, AssetError> {
        let Token::Tuple(fields) = token else {
            return Err(AssetError::MalformedTuple("expected a tuple"));
        };
        let [contract, tag, ids, amounts, royalties, data]: [Token; 6] = fields
            .try_into()
            .map_err(|_| AssetError::MalformedTuple("expected six fields"))?;

        let contract = contract
            .into_address()
            .ok_or(AssetError::MalformedTuple("dapp is not an address"))?;
        let tag = tag
            .into_uint()
            .filter(|t| *t <= U256::from(u8::MAX))
            .ok_or(AssetError::MalformedTuple("typeStd is not a uint8"))?;
        let data = data
            .into_bytes()
            .ok_or(AssetError::MalformedTuple("data is not bytes"))?;

        Ok(Self {
            contract,
            standard: TokenStandard::try_from(tag.as_u32() as u8)?,
            token_ids: read_uint_array(ids)?,
            token_amounts: read_uint_array(amounts)?,
            royalty_amounts: read_uint_array(royalties)?,
            data: data.into(),
        })
    }
}

impl fmt::Display for AssetDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{:#x}", self.standard, self.contract)?;
        match self.standard {
            TokenStandard::Erc20 => {
                if let Some(amount) = self.token_amounts.first() {
                    write!(f, " x{}", amount)?;
                }
            }
            TokenStandard::Erc721 => {
                let ids: Vec<_> = self.token_ids.iter().map(U256::to_string).collect();
                write!(f, " #{}", ids.join(","))?;
            }
            TokenStandard::Erc1155 => {
                for (id, amount) in self.token_ids.iter().zip(&self.token_amounts) {
                    write!(f, " {}x#{}", amount, id)?;
                }
            }
        }
        if !self.data.is_empty() {
            write!(f, " data=0x{}", hex::encode(&self.data))?;
        }
        f.write_str("]")
    }
}

/// Conversion of caller-supplied amounts into a `uint256`.
///
/// Strings are parsed as decimal, or hexadecimal with a `0x` prefix.
pub trait IntoAmount {
    fn into_amount(self) -> Result<U256, AssetError>;
}

impl IntoAmount for U256 {
    fn into_amount(self) -> Result<U256, AssetError> {
        Ok(self)
    }
}

impl IntoAmount for u64 {
    fn into_amount(self) -> Result<U256, AssetError> {
        Ok(U256::from(self))
    }
}

impl IntoAmount for u128 {
    fn into_amount(self) -> Result<U256, AssetError> {
        Ok(U256::from(self))
    }
}

impl IntoAmount for i64 {
    fn into_amount(self) -> Result<U256, AssetError> {
        u64::try_from(self)
            .map(U256::from)
            .map_err(|_| AssetError::InvalidAmount(self.to_string()))
    }
}

impl IntoAmount for &str {
    fn into_amount(self) -> Result<U256, AssetError> {
        let s = self.trim();
        let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(digits) if !digits.is_empty() => U256::from_str_radix(digits, 16).ok(),
            Some(_) => None,
            None if s.is_empty() => None,
            None => U256::from_dec_str(s).ok(),
        };
        parsed.ok_or_else(|| AssetError::InvalidAmount(self.to_string()))
    }
}

impl IntoAmount for String {
    fn into_amount(self) -> Result<U256, AssetError> {
        self.as_str().into_amount()
    }
}

/// Ordered, validated asset list for one side of a swap.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetList {
    assets: Vec<AssetDescriptor>,
}

impl AssetList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an ERC20 entry carrying a single `amount`.
    pub fn add_erc20<A: IntoAmount>(
        &mut self,
        contract: Address,
        amount: A,
    ) -> Result<&mut Self, AssetError> {
        let amount = amount.into_amount()?;
        self.assets.push(AssetDescriptor::new(
            contract,
            TokenStandard::Erc20,
            Vec::new(),
            vec![amount],
        ));
        Ok(self)
    }

    /// Appends an ERC721 entry for one or more token ids.
    pub fn add_erc721<I>(&mut self, contract: Address, token_ids: I) -> Result<&mut Self, AssetError>
    where
        I: IntoIterator,
        I::Item: Into<U256>,
    {
        let ids: Vec<U256> = token_ids.into_iter().map(Into::into).collect();
        if ids.is_empty() {
            return Err(AssetError::InvalidTokenIdList);
        }
        self.assets.push(AssetDescriptor::new(
            contract,
            TokenStandard::Erc721,
            ids,
            Vec::new(),
        ));
        Ok(self)
    }

    /// Appends an ERC1155 entry; `token_amounts[i]` is the amount of `token_ids[i]`.
    pub fn add_erc1155<I, A>(
        &mut self,
        contract: Address,
        token_ids: I,
        token_amounts: A,
    ) -> Result<&mut Self, AssetError>
    where
        I: IntoIterator,
        I::Item: Into<U256>,
        A: IntoIterator,
        A::Item: Into<U256>,
    {
        let ids: Vec<U256> = token_ids.into_iter().map(Into::into).collect();
        let amounts: Vec<U256> = token_amounts.into_iter().map(Into::into).collect();
        check_pairs(ids.len(), amounts.len())?;
        self.assets.push(AssetDescriptor::new(
            contract,
            TokenStandard::Erc1155,
            ids,
            amounts,
        ));
        Ok(self)
    }

    /// Appends an already-built descriptor, e.g. one read back from the contract.
    pub fn push(&mut self, asset: AssetDescriptor) -> Result<&mut Self, AssetError> {
        asset.validate()?;
        self.assets.push(asset);
        Ok(self)
    }

    pub fn clear(&mut self) {
        self.assets.clear();
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn descriptors(&self) -> &[AssetDescriptor] {
        &self.assets
    }

    /// Renders every entry, in insertion order, as the contract's tuple.
    pub fn to_list(&self) -> Vec<Token> {
        self.assets.iter().map(AssetDescriptor::to_token).collect()
    }

    /// The whole list as a single `tuple[]` argument.
    pub fn to_token(&self) -> Token {
        Token::Array(self.to_list())
    }
}

impl<'a> IntoIterator for &'a AssetList {
    type Item = &'a AssetDescriptor;
    type IntoIter = std::slice::Iter<'a, AssetDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.assets.iter()
    }
}

// Mismatch is reported before emptiness so that any length difference
// surfaces as `MismatchedLengths`.
fn check_pairs(ids: usize, amounts: usize) -> Result<(), AssetError> {
    if ids != amounts {
        return Err(AssetError::MismatchedLengths { ids, amounts });
    }
    if ids == 0 {
        return Err(AssetError::InvalidTokenIdList);
    }
    Ok(())
}

fn uint_array(values: &[U256]) -> Token {
    Token::Array(values.iter().copied().map(Token::Uint).collect())
}

fn read_uint_array(token: Token) -> Result<Vec<U256>, AssetError> {
    token
        .into_array()
        .ok_or(AssetError::MalformedTuple("expected a uint256[]"))?
        .into_iter()
        .map(|t| {
            t.into_uint()
                .ok_or(AssetError::MalformedTuple("expected a uint256"))
        })
        .collect()
}
