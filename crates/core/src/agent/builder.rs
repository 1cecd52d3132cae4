use std::sync::Arc;

use scout_model::ModelProvider;

use super::Agent;
use crate::checkpoint::CheckpointStore;
use crate::model_client::ModelClient;
use crate::tool::{Manager as ToolManager, Tool};

/// How many model and tool steps one invocation may take by default.
const DEFAULT_RECURSION_LIMIT: usize = 25;

/// [`Agent`] builder.
pub struct AgentBuilder {
    pub(crate) model_client: ModelClient,
    pub(crate) tools: ToolManager,
    pub(crate) store: Option<Arc<dyn CheckpointStore>>,
    pub(crate) recursion_limit: usize,
}

impl AgentBuilder {
    /// Creates a new builder with the specified model provider.
    #[inline]
    pub fn with_model_provider<P: ModelProvider + 'static>(
        provider: P,
    ) -> Self {
        Self {
            model_client: ModelClient::new(provider),
            tools: ToolManager::default(),
            store: None,
            recursion_limit: DEFAULT_RECURSION_LIMIT,
        }
    }

    /// Registers a tool.
    #[inline]
    pub fn with_tool<T: Tool>(mut self, tool: T) -> Self {
        self.tools.add_tool(tool);
        self
    }

    /// Sets where checkpoints are kept.
    ///
    /// Defaults to a fresh [`MemoryStore`](crate::MemoryStore).
    #[inline]
    pub fn with_checkpoint_store(
        mut self,
        store: Arc<dyn CheckpointStore>,
    ) -> Self {
        self.store = Some(store);
        self
    }

    /// Sets how many steps one invocation may take before giving up.
    #[inline]
    pub fn with_recursion_limit(mut self, limit: usize) -> Self {
        self.recursion_limit = limit;
        self
    }

    /// Builds the agent.
    #[inline]
    pub fn build(self) -> Agent {
        Agent::from_builder(self)
    }
}
