use ethers::types::TxHash;
use swapkit_core::{AssetError, ConfigError, CoreError, EventError, FailurePhase, Operation, SwapError};

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("write operations are disabled in read-only mode")]
    ReadOnlyMode,

    #[error("contract read `{method}` failed: {message}")]
    ContractRead {
        method: &'static str,
        message: String,
    },

    #[error("{op} {phase}: {message}")]
    Transaction {
        op: Operation,
        phase: FailurePhase,
        message: String,
    },

    #[error("Transaction {0:?} dropped from the mempool")]
    TxDropped(TxHash),

    #[error("Transaction {0:?} reverted")]
    TxReverted(TxHash),

    #[error("Provider exposes no account to send from")]
    NoAccount,

    #[error("Blockchain error: {0}")]
    BlockchainError(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ClientError {
    /// Lifecycle phase for failures of a submitted write, if any.
    pub fn phase(&self) -> Option<FailurePhase> {
        match self {
            Self::Transaction { phase, .. } => Some(*phase),
            _ => None,
        }
    }
}

impl From<EventError> for ClientError {
    fn from(value: EventError) -> Self {
        Self::Core(value.into())
    }
}

impl From<AssetError> for ClientError {
    fn from(value: AssetError) -> Self {
        Self::Core(value.into())
    }
}

impl From<ConfigError> for ClientError {
    fn from(value: ConfigError) -> Self {
        Self::Core(value.into())
    }
}

impl From<SwapError> for ClientError {
    fn from(value: SwapError) -> Self {
        Self::Core(value.into())
    }
}

impl From<ethers::providers::ProviderError> for ClientError {
    fn from(value: ethers::providers::ProviderError) -> Self {
        Self::BlockchainError(value.to_string())
    }
}

impl From<ethers::abi::Error> for ClientError {
    fn from(value: ethers::abi::Error) -> Self {
        Self::Serialization(value.to_string())
    }
}
