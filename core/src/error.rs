use thiserror::Error;

/// Top-level error for everything `swapkit-core` can reject.
#[derive(Debug, Error, PartialEq)]
pub enum CoreError {
    #[error("event error: {0}")]
    Event(EventError),

    #[error("asset list error: {0}")]
    Asset(AssetError),

    #[error("configuration error: {0}")]
    Config(ConfigError),

    #[error("invalid argument: {0}")]
    Swap(SwapError),
}

/// Misuse of the lifecycle event registry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventError {
    /// The channel name is not one of the twelve lifecycle channels.
    #[error("unknown event channel: {0}")]
    UnknownChannel(String),

    /// The subscription handle is not registered on the channel.
    #[error("subscription {id} is not registered on {channel}")]
    InvalidCallback { channel: String, id: u64 },
}

/// Shape violations when building an asset list.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AssetError {
    #[error("amount must be a non-negative integer, got {0:?}")]
    InvalidAmount(String),

    #[error("token id list must contain at least one id")]
    InvalidTokenIdList,

    #[error("token amount list must contain at least one amount")]
    InvalidAmountList,

    #[error("token ids and amounts differ in length (ids={ids}, amounts={amounts})")]
    MismatchedLengths { ids: usize, amounts: usize },

    #[error("unknown token standard tag: {0}")]
    UnknownStandard(u8),

    #[error("malformed asset tuple: {0}")]
    MalformedTuple(&'static str),
}

/// Rejected SDK construction arguments.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("just one provider at a time is supported")]
    ConflictingProviders,

    #[error("either a provider handle or a JSON-RPC URL is required")]
    MissingProvider,

    #[error("invalid JSON-RPC URL: {0}")]
    InvalidRpcUrl(String),

    #[error("a signer is mandatory when using a JSON-RPC provider outside read-only mode")]
    MissingSigner,

    #[error("provide a valid private key for the signer")]
    InvalidPrivateKey,

    #[error("network not supported: {0}")]
    UnsupportedNetwork(String),

    #[error("confirmation depth cannot be lower than one (got {0})")]
    InvalidConfirmationDepth(usize),
}

/// Caller-supplied write arguments rejected before any network call.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SwapError {
    #[error("value overflow while adding the flat fee")]
    ValueOverflow,

    #[error("malformed swap intent: {0}")]
    MalformedIntent(&'static str),

    #[error("unknown swap status: {0}")]
    UnknownStatus(u8),
}

impl From<EventError> for CoreError {
    fn from(value: EventError) -> Self {
        Self::Event(value)
    }
}

impl From<AssetError> for CoreError {
    fn from(value: AssetError) -> Self {
        Self::Asset(value)
    }
}

impl From<ConfigError> for CoreError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<SwapError> for CoreError {
    fn from(value: SwapError) -> Self {
        Self::Swap(value)
    }
}
