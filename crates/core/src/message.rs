use std::fmt::{self, Display};

use scout_model::{ModelMessage, ToolCallRequest, ToolCallResult};
use uuid::Uuid;

/// Who produced a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    /// Typed by the user.
    User,
    /// Produced by the model.
    Agent,
    /// The result of a tool call.
    Tool,
}

impl Role {
    /// Returns the lowercase name of the role.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Agent => "agent",
            Role::Tool => "tool",
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tool call the agent asked for.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ToolCall {
    /// Identifier pairing the call with its result.
    pub id: String,
    /// Name of the requested tool.
    pub name: String,
    /// The raw serialized arguments.
    pub arguments: String,
}

impl From<ToolCallRequest> for ToolCall {
    #[inline]
    fn from(req: ToolCallRequest) -> Self {
        Self {
            id: req.id,
            name: req.name,
            arguments: req.arguments,
        }
    }
}

impl From<&ToolCall> for ToolCallRequest {
    #[inline]
    fn from(call: &ToolCall) -> Self {
        Self {
            id: call.id.clone(),
            name: call.name.clone(),
            arguments: call.arguments.clone(),
        }
    }
}

/// A message in a conversation thread.
///
/// Messages are never modified once they are part of a history, so there
/// are no setters.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Message {
    id: String,
    role: Role,
    content: String,
    tool_calls: Vec<ToolCall>,
    tool_call_id: Option<String>,
}

impl Message {
    /// Creates a user message with a fresh identifier.
    pub fn user<S: Into<String>>(content: S) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: Role::User,
            content: content.into(),
            tool_calls: vec![],
            tool_call_id: None,
        }
    }

    /// Creates an agent message.
    pub fn agent<I: Into<String>, S: Into<String>>(
        id: I,
        content: S,
        tool_calls: Vec<ToolCall>,
    ) -> Self {
        Self {
            id: id.into(),
            role: Role::Agent,
            content: content.into(),
            tool_calls,
            tool_call_id: None,
        }
    }

    /// Creates a tool result message answering the call `tool_call_id`.
    pub fn tool<I: Into<String>, S: Into<String>>(
        tool_call_id: I,
        content: S,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: Role::Tool,
            content: content.into(),
            tool_calls: vec![],
            tool_call_id: Some(tool_call_id.into()),
        }
    }

    /// Replaces the identifier of the message.
    #[inline]
    pub fn with_id<S: Into<String>>(mut self, id: S) -> Self {
        self.id = id.into();
        self
    }

    /// Returns the identifier of the message.
    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns who produced the message.
    #[inline]
    pub fn role(&self) -> Role {
        self.role
    }

    /// Returns the text content.
    #[inline]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Returns the tool calls requested in this message.
    #[inline]
    pub fn tool_calls(&self) -> &[ToolCall] {
        &self.tool_calls
    }

    /// Returns the call this message answers, for tool messages.
    #[inline]
    pub fn tool_call_id(&self) -> Option<&str> {
        self.tool_call_id.as_deref()
    }

    pub(crate) fn to_model_message(&self) -> ModelMessage {
        match self.role {
            Role::User => ModelMessage::User(self.content.clone()),
            Role::Agent => ModelMessage::Assistant {
                content: self.content.clone(),
                tool_calls: self.tool_calls.iter().map(Into::into).collect(),
            },
            Role::Tool => ModelMessage::Tool(ToolCallResult {
                id: self.tool_call_id.clone().unwrap_or_default(),
                content: self.content.clone(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_ids() {
        let a = Message::user("Hello");
        let b = Message::user("Hello");
        assert_ne!(a.id(), b.id());
        assert_eq!(a.with_id("m1").id(), "m1");
    }

    #[test]
    fn test_to_model_message() {
        let call = ToolCall {
            id: "call_1".to_owned(),
            name: "search".to_owned(),
            arguments: r#"{"query":"x"}"#.to_owned(),
        };
        let agent = Message::agent("run-1", "", vec![call.clone()]);
        assert_eq!(
            agent.to_model_message(),
            ModelMessage::Assistant {
                content: String::new(),
                tool_calls: vec![ToolCallRequest::from(&call)],
            }
        );

        let tool = Message::tool("call_1", "[]");
        assert_eq!(tool.role(), Role::Tool);
        assert_eq!(
            tool.to_model_message(),
            ModelMessage::Tool(ToolCallResult {
                id: "call_1".to_owned(),
                content: "[]".to_owned(),
            })
        );
    }
}
