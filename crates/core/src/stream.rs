use crate::message::Message;

/// The part of the agent loop that produced a chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    /// The model answered or asked for tools.
    Agent,
    /// Requested tools were executed.
    Tools,
}

/// One step of output from an agent invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamChunk {
    /// Where the chunk comes from.
    pub stage: Stage,
    /// Messages produced in this step, in order.
    pub messages: Vec<Message>,
}
