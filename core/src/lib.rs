/// Asset lists and their on-chain tuple encoding
pub mod asset;
/// Lifecycle event channels and the callback registry
pub mod events;
/// Contract deployments per network
pub mod network;
/// Swap-intent records and fee sizing
pub mod swap;

pub mod error;
pub use asset::{AssetDescriptor, AssetList, IntoAmount, TokenStandard};
pub use error::{AssetError, ConfigError, CoreError, EventError, SwapError};
pub use events::{Channel, EventHub, FailurePhase, Operation, Stage, SubscriptionId, TxEvent};
pub use network::Network;
pub use swap::{
    transmitted_value, CloseSwapParams, CreateSwapParams, GasOverrides, PaymentConfig,
    ReferenceAddresses, SwapAssets, SwapCall, SwapIntent, SwapStatus, DEFAULT_GAS_LIMIT,
};

pub type Result<T> = std::result::Result<T, CoreError>;
