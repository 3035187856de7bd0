//! Client SDK for the NFT swap-escrow contract.
//!
//! Build a connected [`SwapClient`] with [`SdkBuilder`], register lifecycle
//! callbacks with [`SwapClient::on`], then drive the contract's write
//! operations. Asset lists are assembled with [`AssetList`].

pub use config::{load_config, SdkBuilder, SdkConfig};
pub use contract::ethereum::EthereumSwapContract;
pub use contract::{PendingSwap, SwapContract};
pub use error::{ClientError, Result};
pub use listener::LogListener;
pub use sdk::{SwapClient, DEFAULT_CONFIRMATIONS};
pub use swapkit_core::{
    AssetDescriptor, AssetList, Channel, CloseSwapParams, CreateSwapParams, FailurePhase,
    GasOverrides, Network, Operation, Stage, SubscriptionId, SwapIntent, TxEvent,
};

pub mod config;
pub mod contract;
pub mod error;
pub mod listener;
pub mod sdk;

/// SDK instance talking to a live Ethereum node.
pub type EthereumClient = SwapClient<EthereumSwapContract>;
