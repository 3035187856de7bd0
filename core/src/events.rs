//! Lifecycle event channels for the state-changing swap operations.
//!
//! Every write operation moves through `Created` (submitted, pending),
//! `Mined` (confirmed to the configured depth) or `Error`. Observers
//! register callbacks per channel and are invoked synchronously, in
//! registration order.

use std::collections::HashMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use ethers_core::types::{TransactionReceipt, TxHash};
use tracing::{debug, trace, warn};

use crate::error::EventError;

/// State-changing operations of the swap contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateSwap,
    CloseSwap,
    CancelSwap,
    EditTaker,
}

impl Operation {
    pub const ALL: [Self; 4] = [
        Self::CreateSwap,
        Self::CancelSwap,
        Self::CloseSwap,
        Self::EditTaker,
    ];

    /// Name of the contract method this operation invokes.
    pub fn method(&self) -> &'static str {
        match self {
            Self::CreateSwap => "createSwapIntent",
            Self::CloseSwap => "closeSwapIntent",
            Self::CancelSwap => "cancelSwapIntent",
            Self::EditTaker => "editCounterPart",
        }
    }

    pub fn channel(self, stage: Stage) -> Channel {
        Channel {
            operation: self,
            stage,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::CreateSwap => "createSwap",
            Self::CloseSwap => "closeSwap",
            Self::CancelSwap => "cancelSwap",
            Self::EditTaker => "editTaker",
        };
        f.write_str(s)
    }
}

/// Where in its lifecycle a submitted transaction is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Created,
    Mined,
    Error,
}

impl Stage {
    pub const ALL: [Self; 3] = [Self::Created, Self::Mined, Self::Error];
}

/// One of the twelve lifecycle channels, e.g. `createSwapTransactionMined`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Channel {
    pub operation: Operation,
    pub stage: Stage,
}

impl Channel {
    /// Every channel, grouped by operation.
    pub fn all() -> impl Iterator<Item = Channel> {
        Operation::ALL
            .into_iter()
            .flat_map(|op| Stage::ALL.into_iter().map(move |stage| op.channel(stage)))
    }

    pub fn name(&self) -> &'static str {
        use Operation::*;
        use Stage::*;

        match (self.operation, self.stage) {
            (CreateSwap, Created) => "createSwapTransactionCreated",
            (CreateSwap, Mined) => "createSwapTransactionMined",
            (CreateSwap, Error) => "createSwapTransactionError",
            (CancelSwap, Created) => "cancelSwapTransactionCreated",
            (CancelSwap, Mined) => "cancelSwapTransactionMined",
            (CancelSwap, Error) => "cancelSwapTransactionError",
            (CloseSwap, Created) => "closeSwapTransactionCreated",
            (CloseSwap, Mined) => "closeSwapTransactionMined",
            (CloseSwap, Error) => "closeSwapTransactionError",
            (EditTaker, Created) => "editTakerTransactionCreated",
            (EditTaker, Mined) => "editTakerTransactionMined",
            (EditTaker, Error) => "editTakerTransactionError",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Channel {
    type Err = EventError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .find(|channel| channel.name() == s)
            .ok_or_else(|| EventError::UnknownChannel(s.to_string()))
    }
}

/// Phase of a write operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePhase {
    /// The contract call was rejected before a transaction hash existed.
    Submission,
    /// The transaction was submitted but never reached the confirmation depth.
    Confirmation,
}

impl FailurePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submission => "submissionError",
            Self::Confirmation => "confirmationError",
        }
    }
}

impl fmt::Display for FailurePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload delivered to lifecycle callbacks.
#[derive(Debug, Clone, PartialEq)]
pub enum TxEvent {
    /// Transaction accepted by the node; confirmation still pending.
    Created { tx_hash: TxHash },
    /// Transaction confirmed to the configured depth.
    Mined { receipt: Box<TransactionReceipt> },
    /// Submission or confirmation failed.
    Failed { phase: FailurePhase, error: String },
}

/// Handle returned by [`EventHub::register`], used to unregister later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub fn get(&self) -> u64 {
        self.0
    }
}

pub type Callback = Arc<dyn Fn(&TxEvent) + Send + Sync>;

/// Named-channel publish/subscribe registry owned by one SDK instance.
///
/// The channel set is fixed at construction. Emission works on a snapshot
/// of the callback list, so callbacks may register or unregister (even
/// themselves) while being invoked.
pub struct EventHub {
    channels: RwLock<HashMap<Channel, Vec<(SubscriptionId, Callback)>>>,
    next_id: AtomicU64,
}

impl EventHub {
    pub fn new() -> Self {
        let channels = Channel::all().map(|c| (c, Vec::new())).collect();
        Self {
            channels: RwLock::new(channels),
            next_id: AtomicU64::new(1),
        }
    }

    /// Appends `callback` to the channel named `name`.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::UnknownChannel`] if `name` is not a lifecycle channel.
    /// Nothing is registered in that case.
    pub fn register<F>(&self, name: &str, callback: F) -> Result<SubscriptionId, EventError>
    where
        F: Fn(&TxEvent) + Send + Sync + 'static,
    {
        let channel = name.parse::<Channel>()?;
        Ok(self.subscribe(channel, callback))
    }

    /// Typed variant of [`EventHub::register`].
    pub fn subscribe<F>(&self, channel: Channel, callback: F) -> SubscriptionId
    where
        F: Fn(&TxEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut channels = self.channels.write().unwrap_or_else(PoisonError::into_inner);
        channels
            .entry(channel)
            .or_default()
            .push((id, Arc::new(callback)));
        debug!(%channel, id = id.0, "Callback registered");
        id
    }

    /// Removes one subscription, or every subscription when `id` is `None`.
    ///
    /// # Errors
    ///
    /// - [`EventError::UnknownChannel`] if `name` is not a lifecycle channel.
    /// - [`EventError::InvalidCallback`] if `id` is not registered on that channel.
    pub fn unregister(&self, name: &str, id: Option<SubscriptionId>) -> Result<(), EventError> {
        let channel = name.parse::<Channel>()?;
        let mut channels = self.channels.write().unwrap_or_else(PoisonError::into_inner);
        let callbacks = channels.entry(channel).or_default();

        match id {
            None => {
                debug!(%channel, removed = callbacks.len(), "Channel cleared");
                callbacks.clear();
            }
            Some(id) => {
                let pos = callbacks
                    .iter()
                    .position(|(registered, _)| *registered == id)
                    .ok_or_else(|| EventError::InvalidCallback {
                        channel: channel.name().to_string(),
                        id: id.0,
                    })?;
                callbacks.remove(pos);
                debug!(%channel, id = id.0, "Callback unregistered");
            }
        }
        Ok(())
    }

    /// Delivers `event` to every callback registered on `channel`, in
    /// registration order. A panicking callback is logged and skipped;
    /// its siblings still run. Returns how many callbacks completed.
    pub fn emit(&self, channel: Channel, event: &TxEvent) -> usize {
        let snapshot: Vec<Callback> = {
            let channels = self.channels.read().unwrap_or_else(PoisonError::into_inner);
            channels
                .get(&channel)
                .map(|cbs| cbs.iter().map(|(_, cb)| Arc::clone(cb)).collect())
                .unwrap_or_default()
        };
        trace!(%channel, listeners = snapshot.len(), "Emitting");

        let mut delivered = 0;
        for (index, callback) in snapshot.iter().enumerate() {
            match catch_unwind(AssertUnwindSafe(|| callback(event))) {
                Ok(()) => delivered += 1,
                Err(_) => warn!(%channel, index, "Lifecycle callback panicked"),
            }
        }
        delivered
    }

    /// Number of callbacks currently registered on `channel`.
    pub fn listener_count(&self, channel: Channel) -> usize {
        let channels = self.channels.read().unwrap_or_else(PoisonError::into_inner);
        channels.get(&channel).map_or(0, Vec::len)
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let channels = self.channels.read().unwrap_or_else(PoisonError::into_inner);
        let registered: usize = channels.values().map(Vec::len).sum();
        f.debug_struct("EventHub")
            .field("channels", &channels.len())
            .field("registered", &registered)
            .finish()
    }
}
