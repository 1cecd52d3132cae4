use std::collections::HashMap;
use std::sync::RwLock;

use super::{Checkpoint, CheckpointStore, Error, ThreadId};

/// A checkpoint store that lives in process memory.
///
/// Everything is lost when the store is dropped.
#[derive(Debug, Default)]
pub struct MemoryStore {
    threads: RwLock<HashMap<ThreadId, Vec<Checkpoint>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CheckpointStore for MemoryStore {
    fn put(
        &self,
        thread: &ThreadId,
        checkpoint: Checkpoint,
    ) -> Result<(), Error> {
        let mut threads = self.threads.write().map_err(|_| Error::Poisoned)?;
        let checkpoints = threads.entry(thread.clone()).or_default();
        if checkpoints.iter().any(|c| c.id == checkpoint.id) {
            return Err(Error::Duplicate(checkpoint.id));
        }
        trace!("thread {thread}: stored checkpoint {}", checkpoint.id);
        checkpoints.push(checkpoint);
        Ok(())
    }

    fn list(&self, thread: &ThreadId) -> Result<Vec<Checkpoint>, Error> {
        let threads = self.threads.read().map_err(|_| Error::Poisoned)?;
        Ok(threads
            .get(thread)
            .map(|checkpoints| checkpoints.iter().rev().cloned().collect())
            .unwrap_or_default())
    }

    fn latest(&self, thread: &ThreadId) -> Result<Option<Checkpoint>, Error> {
        let threads = self.threads.read().map_err(|_| Error::Poisoned)?;
        Ok(threads.get(thread).and_then(|c| c.last().cloned()))
    }
}
