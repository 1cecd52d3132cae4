use scout_model::{ErrorKind, ModelProviderError};

use crate::{checkpoint, tool};

/// Errors that end an agent invocation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The model provider failed.
    #[error("model request failed: {0}")]
    Model(Box<dyn ModelProviderError>),
    /// A tool could not run at all.
    #[error("tool `{name}` failed")]
    Tool {
        /// Name of the failing tool.
        name: String,
        /// What went wrong.
        #[source]
        source: tool::Error,
    },
    /// The checkpoint store failed.
    #[error(transparent)]
    Store(#[from] checkpoint::Error),
    /// The agent kept calling tools without reaching an answer.
    #[error("recursion limit of {0} steps reached without a final answer")]
    RecursionLimit(usize),
}

impl Error {
    /// Returns the model error kind, if the model provider failed.
    #[inline]
    pub fn model_error_kind(&self) -> Option<ErrorKind> {
        match self {
            Error::Model(err) => Some(err.kind()),
            _ => None,
        }
    }
}
