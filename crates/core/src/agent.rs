mod builder;
mod invocation;

use std::sync::Arc;

use crate::checkpoint::{self, Checkpoint, CheckpointStore, ThreadId};
use crate::model_client::ModelClient;
use crate::tool::Manager as ToolManager;
pub use builder::AgentBuilder;
pub use invocation::Invocation;

/// An agent that alternates between consulting a model and running the
/// tools it asks for, until the model gives a final answer.
///
/// The agent itself holds no conversation state. Each thread's history
/// lives in the checkpoint store, and every call to [`Agent::stream`]
/// picks up from the newest checkpoint of its thread.
pub struct Agent {
    model_client: ModelClient,
    tools: Arc<ToolManager>,
    store: Arc<dyn CheckpointStore>,
    recursion_limit: usize,
}

impl Agent {
    /// Starts an invocation that adds `input` to the thread.
    ///
    /// Nothing happens until the returned [`Invocation`] is polled for
    /// chunks.
    pub fn stream<S: Into<String>>(
        &self,
        thread: &ThreadId,
        input: S,
    ) -> Invocation {
        Invocation::new(
            self.model_client.clone(),
            Arc::clone(&self.tools),
            Arc::clone(&self.store),
            thread.clone(),
            input.into(),
            self.recursion_limit,
        )
    }

    /// Returns all checkpoints of a thread, newest first.
    #[inline]
    pub fn checkpoints(
        &self,
        thread: &ThreadId,
    ) -> Result<Vec<Checkpoint>, checkpoint::Error> {
        self.store.list(thread)
    }
}

impl Agent {
    fn from_builder(builder: AgentBuilder) -> Self {
        let AgentBuilder {
            model_client,
            tools,
            store,
            recursion_limit,
        } = builder;

        Self {
            model_client,
            tools: Arc::new(tools),
            store: store
                .unwrap_or_else(|| Arc::new(checkpoint::MemoryStore::new())),
            recursion_limit,
        }
    }
}
