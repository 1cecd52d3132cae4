//! The agent runtime: conversation data model, checkpoint storage, tool
//! execution and the step-by-step agent loop.

#![deny(missing_docs)]
#![deny(clippy::missing_safety_doc)]

#[macro_use]
extern crate tracing;

mod agent;
pub mod checkpoint;
mod error;
mod message;
mod model_client;
mod stream;
pub mod tool;

pub use agent::{Agent, AgentBuilder, Invocation};
pub use checkpoint::{Checkpoint, CheckpointStore, MemoryStore, ThreadId};
pub use error::Error;
pub use message::{Message, Role, ToolCall};
pub use stream::{Stage, StreamChunk};
