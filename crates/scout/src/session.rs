use std::sync::Arc;

use scout_core::{
    Agent, AgentBuilder, Checkpoint, CheckpointStore, Invocation, ThreadId,
    checkpoint,
};
use scout_model::ModelProvider;

use crate::tools::SearchTool;

/// The thread all messages go to unless another one is chosen.
const DEFAULT_THREAD_ID: &str = "1";

/// A session builder.
///
/// See [`Session`].
pub struct SessionBuilder {
    agent_builder: AgentBuilder,
    thread: ThreadId,
}

impl SessionBuilder {
    /// Creates a session builder with a specified model provider.
    pub fn with_model_provider<M: ModelProvider + 'static>(
        provider: M,
    ) -> Self {
        let agent_builder = AgentBuilder::with_model_provider(provider);
        Self {
            agent_builder,
            thread: ThreadId::new(DEFAULT_THREAD_ID),
        }
    }

    /// Offers the web search tool to the agent.
    #[inline]
    pub fn with_search_tool(mut self, tool: SearchTool) -> Self {
        self.agent_builder = self.agent_builder.with_tool(tool);
        self
    }

    /// Sets where checkpoints are kept.
    #[inline]
    pub fn with_checkpoint_store(
        mut self,
        store: Arc<dyn CheckpointStore>,
    ) -> Self {
        self.agent_builder = self.agent_builder.with_checkpoint_store(store);
        self
    }

    /// Sets the thread the session talks on.
    #[inline]
    pub fn with_thread_id<T: Into<ThreadId>>(mut self, thread: T) -> Self {
        self.thread = thread.into();
        self
    }

    /// Builds a new session.
    pub fn build(self) -> Session {
        Session {
            agent: self.agent_builder.build(),
            thread: self.thread,
        }
    }
}

/// A chat session on a single conversation thread.
///
/// The session holds a fully configured agent that you can use directly, and
/// it is basically a wrapper around [`Agent`].
pub struct Session {
    agent: Agent,
    thread: ThreadId,
}

impl Session {
    /// Sends a message to the session.
    ///
    /// The returned invocation yields the agent's work step by step.
    #[inline]
    pub fn send_message(&self, message: &str) -> Invocation {
        self.agent.stream(&self.thread, message)
    }

    /// Returns the checkpoints of the session's thread, newest first.
    #[inline]
    pub fn checkpoints(&self) -> Result<Vec<Checkpoint>, checkpoint::Error> {
        self.agent.checkpoints(&self.thread)
    }

    /// Returns the thread the session talks on.
    #[inline]
    pub fn thread(&self) -> &ThreadId {
        &self.thread
    }
}
