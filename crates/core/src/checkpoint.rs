//! Checkpoints and where they are kept.
//!
//! A checkpoint is the full message history of a thread right after one
//! step of the agent loop. Checkpoints are append-only: the runtime writes
//! a new one after every step and never touches an old one again.

mod memory;

use std::fmt::{self, Display};

use chrono::{DateTime, Utc};
use uuid::Uuid;

pub use memory::MemoryStore;

use crate::message::Message;

/// Identifies a conversation thread.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ThreadId(String);

impl ThreadId {
    /// Creates a thread identifier.
    #[inline]
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ThreadId {
    #[inline]
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What caused a checkpoint to be written.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CheckpointSource {
    /// New user input was added to the thread.
    Input,
    /// A step of the agent loop finished.
    Loop,
}

/// Bookkeeping attached to a checkpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CheckpointMetadata {
    /// What caused the checkpoint.
    pub source: CheckpointSource,
    /// Step counter of the thread, increasing across invocations.
    pub step: u64,
}

/// A snapshot of a thread's message history.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Checkpoint {
    id: String,
    ts: DateTime<Utc>,
    parent_id: Option<String>,
    metadata: CheckpointMetadata,
    messages: Vec<Message>,
}

impl Checkpoint {
    /// Creates a checkpoint stamped with the current time.
    ///
    /// The identifier is a time-ordered UUID, so identifiers sort in
    /// creation order.
    pub fn new(
        parent_id: Option<String>,
        metadata: CheckpointMetadata,
        messages: Vec<Message>,
    ) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            ts: Utc::now(),
            parent_id,
            metadata,
            messages,
        }
    }

    /// Returns the identifier.
    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns when the checkpoint was taken.
    #[inline]
    pub fn ts(&self) -> DateTime<Utc> {
        self.ts
    }

    /// Returns the checkpoint this one follows, if any.
    #[inline]
    pub fn parent_id(&self) -> Option<&str> {
        self.parent_id.as_deref()
    }

    /// Returns the bookkeeping data.
    #[inline]
    pub fn metadata(&self) -> &CheckpointMetadata {
        &self.metadata
    }

    /// Returns the messages in insertion order.
    #[inline]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }
}

/// Errors from a checkpoint store.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A writer panicked while holding the store.
    #[error("checkpoint store is poisoned")]
    Poisoned,
    /// A checkpoint with the same identifier is already in the thread.
    #[error("checkpoint `{0}` already exists in the thread")]
    Duplicate(String),
}

/// Storage for the checkpoints of many threads.
pub trait CheckpointStore: Send + Sync {
    /// Appends a checkpoint to a thread.
    fn put(&self, thread: &ThreadId, checkpoint: Checkpoint)
    -> Result<(), Error>;

    /// Returns all checkpoints of a thread, newest first.
    fn list(&self, thread: &ThreadId) -> Result<Vec<Checkpoint>, Error>;

    /// Returns the newest checkpoint of a thread.
    fn latest(&self, thread: &ThreadId) -> Result<Option<Checkpoint>, Error> {
        Ok(self.list(thread)?.into_iter().next())
    }
}
