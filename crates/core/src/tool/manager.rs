use std::collections::BTreeMap;
use std::pin::Pin;
use std::sync::Arc;

use scout_model::ModelTool;

use crate::message::ToolCall;
use crate::tool::object::{ToolObject, ToolObjectImpl};
use crate::tool::{Error, Tool, ToolResult};

/// An object that manages the toolset and runs calls from the model.
#[derive(Default)]
pub struct Manager {
    // Ordered, so that tool definitions are sent in a stable order.
    tools: BTreeMap<String, Arc<dyn ToolObject>>,
}

impl Manager {
    pub fn add_tool<T: Tool>(&mut self, tool: T) {
        let name = tool.name().to_owned();
        if self.tools.contains_key(&name) {
            warn!("tool {name} is registered twice, replacing it");
        }
        self.tools.insert(name, Arc::new(ToolObjectImpl(tool)));
    }

    #[inline]
    pub fn definitions(&self) -> Vec<ModelTool> {
        self.tools
            .values()
            .map(|tool| ModelTool {
                name: tool.name().to_owned(),
                description: tool.description().to_owned(),
                parameters: tool.parameter_schema().clone(),
            })
            .collect()
    }

    pub fn execute(
        &self,
        call: &ToolCall,
    ) -> Pin<Box<dyn Future<Output = ToolResult> + Send>> {
        let Some(tool) = self.tools.get(&call.name) else {
            warn!("tool not found: {}", call.name);
            let err = Error::not_found()
                .with_reason(format!("there is no tool named `{}`", call.name));
            return Box::pin(std::future::ready(Err(err)));
        };
        trace!(
            "running tool {} ({}) with args: {}",
            call.name, call.id, call.arguments
        );
        Arc::clone(tool).execute(&call.arguments)
    }
}

#[cfg(test)]
mod tests {
    use std::future::ready;

    use serde::Deserialize;
    use serde_json::{Value, json};

    use super::*;
    use crate::tool::ErrorKind;

    #[derive(Deserialize)]
    struct EchoInput {
        query: String,
    }

    struct EchoTool {
        schema: Value,
    }

    impl Tool for EchoTool {
        type Input = EchoInput;

        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echoes the query"
        }

        fn parameter_schema(&self) -> &Value {
            &self.schema
        }

        fn execute(
            &self,
            input: Self::Input,
        ) -> impl Future<Output = ToolResult> + Send + 'static {
            ready(Ok(input.query))
        }
    }

    fn manager() -> Manager {
        let mut manager = Manager::default();
        manager.add_tool(EchoTool {
            schema: json!({ "type": "object" }),
        });
        manager
    }

    fn call(name: &str, arguments: &str) -> ToolCall {
        ToolCall {
            id: "call:1".to_owned(),
            name: name.to_owned(),
            arguments: arguments.to_owned(),
        }
    }

    #[test]
    fn test_definitions() {
        let definitions = manager().definitions();
        assert_eq!(definitions.len(), 1);
        assert_eq!(definitions[0].name, "echo");
        assert_eq!(definitions[0].parameters, json!({ "type": "object" }));
    }

    #[tokio::test]
    async fn test_execute() {
        let manager = manager();

        let result = manager.execute(&call("echo", r#"{"query":"hi"}"#)).await;
        assert_eq!(result, Ok("hi".to_owned()));

        let err = manager.execute(&call("echo", "{'query': 'hi'}")).await;
        assert_eq!(err.unwrap_err().kind(), ErrorKind::InvalidInput);

        let err = manager.execute(&call("echo", "")).await;
        assert_eq!(err.unwrap_err().kind(), ErrorKind::InvalidInput);

        let err = manager.execute(&call("read_file", "{}")).await;
        assert_eq!(err.unwrap_err().kind(), ErrorKind::NotFound);
    }
}
