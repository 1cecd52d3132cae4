use std::mem;
use std::sync::Arc;

use scout_model::ModelRequest;
use uuid::Uuid;

use crate::checkpoint::{
    Checkpoint, CheckpointMetadata, CheckpointSource, CheckpointStore,
    ThreadId,
};
use crate::error::Error;
use crate::message::{Message, ToolCall};
use crate::model_client::ModelClient;
use crate::stream::{Stage, StreamChunk};
use crate::tool::{ErrorKind as ToolErrorKind, Manager as ToolManager};

enum Step {
    Start(String),
    CallModel,
    RunTools(Vec<ToolCall>),
    Done,
}

/// A running agent invocation.
///
/// Each call to [`Invocation::next_chunk`] drives the agent loop by one
/// step and returns what that step produced. The sequence is finite and
/// can't be restarted: once it has returned `None` or an error, every
/// further call returns `None`.
pub struct Invocation {
    model_client: ModelClient,
    tools: Arc<ToolManager>,
    store: Arc<dyn CheckpointStore>,
    thread: ThreadId,
    recursion_limit: usize,

    step: Step,
    steps_taken: usize,
    messages: Vec<Message>,
    last_checkpoint: Option<(String, u64)>,
}

impl Invocation {
    pub(super) fn new(
        model_client: ModelClient,
        tools: Arc<ToolManager>,
        store: Arc<dyn CheckpointStore>,
        thread: ThreadId,
        input: String,
        recursion_limit: usize,
    ) -> Self {
        Self {
            model_client,
            tools,
            store,
            thread,
            recursion_limit,
            step: Step::Start(input),
            steps_taken: 0,
            messages: vec![],
            last_checkpoint: None,
        }
    }

    /// Returns the thread this invocation writes to.
    #[inline]
    pub fn thread(&self) -> &ThreadId {
        &self.thread
    }

    /// Runs the next step and returns its output, or `None` when the
    /// agent has produced its final answer.
    pub async fn next_chunk(&mut self) -> Result<Option<StreamChunk>, Error> {
        loop {
            // Any error leaves the invocation in the `Done` step.
            match mem::replace(&mut self.step, Step::Done) {
                Step::Start(input) => {
                    self.add_input(input)?;
                    self.step = Step::CallModel;
                }
                Step::CallModel => {
                    self.count_step()?;
                    let message = self.call_model().await?;
                    let next = if message.tool_calls().is_empty() {
                        Step::Done
                    } else {
                        Step::RunTools(message.tool_calls().to_vec())
                    };
                    let chunk = self.finish_step(Stage::Agent, vec![message])?;
                    self.step = next;
                    return Ok(Some(chunk));
                }
                Step::RunTools(calls) => {
                    self.count_step()?;
                    let messages = self.run_tools(calls).await?;
                    let chunk = self.finish_step(Stage::Tools, messages)?;
                    self.step = Step::CallModel;
                    return Ok(Some(chunk));
                }
                Step::Done => return Ok(None),
            }
        }
    }

    fn add_input(&mut self, input: String) -> Result<(), Error> {
        if let Some(latest) = self.store.latest(&self.thread)? {
            debug!(
                "thread {}: resuming from checkpoint {}",
                self.thread,
                latest.id()
            );
            self.messages = latest.messages().to_vec();
            self.last_checkpoint =
                Some((latest.id().to_owned(), latest.metadata().step));
        }
        self.messages.push(Message::user(input));
        self.checkpoint(CheckpointSource::Input)
    }

    fn count_step(&mut self) -> Result<(), Error> {
        if self.steps_taken >= self.recursion_limit {
            warn!(
                "thread {}: giving up after {} steps",
                self.thread, self.steps_taken
            );
            return Err(Error::RecursionLimit(self.recursion_limit));
        }
        self.steps_taken += 1;
        Ok(())
    }

    async fn call_model(&self) -> Result<Message, Error> {
        let request = ModelRequest {
            messages: self
                .messages
                .iter()
                .map(Message::to_model_message)
                .collect(),
            tools: self.tools.definitions(),
        };
        let resp = self
            .model_client
            .send_request(request)
            .await
            .map_err(Error::Model)?;
        trace!("model finished with {:?}", resp.finish_reason);

        let id = resp
            .message_id
            .unwrap_or_else(|| format!("run-{}", Uuid::new_v4()));
        let tool_calls = resp.tool_calls.into_iter().map(Into::into).collect();
        Ok(Message::agent(id, resp.transcript, tool_calls))
    }

    async fn run_tools(
        &self,
        calls: Vec<ToolCall>,
    ) -> Result<Vec<Message>, Error> {
        let mut messages = Vec::with_capacity(calls.len());
        for call in calls {
            let content = match self.tools.execute(&call).await {
                Ok(content) => content,
                // Bad calls are the model's fault, let it try again.
                Err(err) if err.kind() != ToolErrorKind::ExecutionError => {
                    debug!("tool call {} rejected: {err}", call.id);
                    format!("Error: {}", err.reason())
                }
                Err(err) => {
                    error!("tool {} failed: {err}", call.name);
                    return Err(Error::Tool {
                        name: call.name,
                        source: err,
                    });
                }
            };
            messages.push(Message::tool(call.id, content));
        }
        Ok(messages)
    }

    fn finish_step(
        &mut self,
        stage: Stage,
        messages: Vec<Message>,
    ) -> Result<StreamChunk, Error> {
        self.messages.extend(messages.iter().cloned());
        self.checkpoint(CheckpointSource::Loop)?;
        Ok(StreamChunk { stage, messages })
    }

    fn checkpoint(&mut self, source: CheckpointSource) -> Result<(), Error> {
        let (parent_id, step) = match self.last_checkpoint.take() {
            Some((id, step)) => (Some(id), step + 1),
            None => (None, 0),
        };
        let checkpoint = Checkpoint::new(
            parent_id,
            CheckpointMetadata { source, step },
            self.messages.clone(),
        );
        let id = checkpoint.id().to_owned();
        self.store.put(&self.thread, checkpoint)?;
        debug!("thread {}: wrote checkpoint {id} (step {step})", self.thread);
        self.last_checkpoint = Some((id, step));
        Ok(())
    }
}
