//! # Core Shard Framework
//!
//! This module defines the generic building blocks for single-writer keyed state.
//!
//! ## Key Types
//!
//! - [`ShardEntry`]: The trait that every value kept in a shard implements.
//! - [`ShardActor`]: The generic actor that owns one shard's map.
//! - [`ShardClient`]: The cloneable handle used to read and write the shard.
//! - [`FrameworkError`]: Common errors (e.g., ActorClosed, ActorDropped).

use std::collections::HashMap;
use std::fmt::{Debug, Display};
use std::hash::Hash;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

// =============================================================================
// 1. THE ABSTRACTION
// =============================================================================

/// Trait that any value kept in a [`ShardActor`] must implement.
///
/// # Architecture Note
/// A shard only ever sees two operations: a point read and a write. What a write
/// *means* (overwrite, merge, reject as stale) is up to the entry, so the actor
/// loop is written once and the merge rule lives next to the data it protects.
pub trait ShardEntry: Clone + Send + Sync + 'static {
    /// The key entries are stored under (e.g., an order id).
    type Key: Eq + Hash + Clone + Send + Sync + Display + Debug;

    /// The data carried by a write.
    type Write: Send + Sync + Debug;

    /// Builds the entry from the first write observed for its key.
    fn from_write(key: &Self::Key, write: Self::Write) -> Self;

    /// Merges a later write into the existing entry.
    ///
    /// Return `false` to reject the write and keep the current value.
    fn merge(&mut self, write: Self::Write) -> bool;
}

// =============================================================================
// 2. THE GENERIC MESSAGES & ERRORS
// =============================================================================

/// Errors that can occur within the shard framework itself.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum FrameworkError {
    #[error("Shard closed")]
    ActorClosed,
    #[error("Shard dropped response channel")]
    ActorDropped,
}

/// Type alias for the one-shot response channel used by shards.
pub type Response<T> = oneshot::Sender<Result<T, FrameworkError>>;

/// Internal message type sent to the shard actor.
#[derive(Debug)]
pub enum ShardRequest<E: ShardEntry> {
    Put {
        key: E::Key,
        write: E::Write,
        respond_to: Response<bool>,
    },
    Get {
        key: E::Key,
        respond_to: Response<Option<E>>,
    },
    Len {
        respond_to: Response<usize>,
    },
}

// =============================================================================
// 3. THE GENERIC SHARD ACTOR
// =============================================================================

/// The generic actor that owns one shard.
///
/// **Concurrency Model**:
/// The actor is the only task that touches `store`. Writes and reads are queued on
/// one channel and handled in arrival order, so no lock guards the map and a read
/// sent after a write has been acknowledged always observes that write.
pub struct ShardActor<E: ShardEntry> {
    receiver: mpsc::Receiver<ShardRequest<E>>,
    store: HashMap<E::Key, E>,
}

impl<E: ShardEntry> ShardActor<E> {
    pub fn new(buffer_size: usize) -> (Self, ShardClient<E>) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let actor = Self {
            receiver,
            store: HashMap::new(),
        };
        (actor, ShardClient::new(sender))
    }

    /// Runs the shard's event loop until every client has been dropped.
    pub async fn run(mut self, shard: impl Display) {
        let shard = shard.to_string();
        info!(%shard, "Shard started");

        while let Some(msg) = self.receiver.recv().await {
            match msg {
                ShardRequest::Put {
                    key,
                    write,
                    respond_to,
                } => {
                    debug!(%shard, %key, ?write, "Put");
                    let applied = match self.store.get_mut(&key) {
                        Some(entry) => entry.merge(write),
                        None => {
                            let entry = E::from_write(&key, write);
                            self.store.insert(key.clone(), entry);
                            true
                        }
                    };
                    if !applied {
                        warn!(%shard, %key, "Stale write ignored");
                    }
                    let _ = respond_to.send(Ok(applied));
                }
                ShardRequest::Get { key, respond_to } => {
                    let entry = self.store.get(&key).cloned();
                    debug!(%shard, %key, found = entry.is_some(), "Get");
                    let _ = respond_to.send(Ok(entry));
                }
                ShardRequest::Len { respond_to } => {
                    let _ = respond_to.send(Ok(self.store.len()));
                }
            }
        }

        info!(%shard, size = self.store.len(), "Shard closed");
    }
}

// =============================================================================
// 4. THE GENERIC CLIENT
// =============================================================================

/// A type-safe, cheaply cloneable handle on a [`ShardActor`].
pub struct ShardClient<E: ShardEntry> {
    sender: mpsc::Sender<ShardRequest<E>>,
}

impl<E: ShardEntry> Clone for ShardClient<E> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<E: ShardEntry> ShardClient<E> {
    pub fn new(sender: mpsc::Sender<ShardRequest<E>>) -> Self {
        Self { sender }
    }

    /// Writes to the shard. Resolves to whether the entry accepted the write.
    pub async fn put(&self, key: E::Key, write: E::Write) -> Result<bool, FrameworkError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(ShardRequest::Put {
                key,
                write,
                respond_to,
            })
            .await
            .map_err(|_| FrameworkError::ActorClosed)?;
        response.await.map_err(|_| FrameworkError::ActorDropped)?
    }

    pub async fn get(&self, key: E::Key) -> Result<Option<E>, FrameworkError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(ShardRequest::Get { key, respond_to })
            .await
            .map_err(|_| FrameworkError::ActorClosed)?;
        response.await.map_err(|_| FrameworkError::ActorDropped)?
    }

    pub async fn len(&self) -> Result<usize, FrameworkError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(ShardRequest::Len { respond_to })
            .await
            .map_err(|_| FrameworkError::ActorClosed)?;
        response.await.map_err(|_| FrameworkError::ActorDropped)?
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

// =============================================================================
// 5. EXAMPLE USAGE (Test)
// =============================================================================
