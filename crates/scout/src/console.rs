use std::io::Write;
use std::pin::pin;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use scout_core::{Invocation, StreamChunk};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::select;
use tokio::time::sleep;

use crate::error::Error;
use crate::render::Renderer;
use crate::session::Session;

/// Returns whether the input line asks to end the conversation.
#[inline]
pub fn is_quit_command(input: &str) -> bool {
    input.trim().eq_ignore_ascii_case("quit")
}

/// An interactive loop that reads questions and prints the agent's work.
///
/// After every step of the agent the whole checkpoint history of the
/// session's thread is printed again.
pub struct Console<R, W> {
    input: R,
    output: W,
    renderer: Renderer,
    progress: Option<ProgressStyle>,
}

impl<R, W> Console<R, W>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    /// Creates a console reading lines from `input` and writing to `output`.
    pub fn new(input: R, output: W, renderer: Renderer) -> Self {
        Self {
            input,
            output,
            renderer,
            progress: None,
        }
    }

    /// Shows a spinner on stderr while the agent is working.
    pub fn with_progress(mut self, enabled: bool) -> Self {
        self.progress = enabled.then(|| {
            ProgressStyle::with_template("{spinner} {wide_msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
        });
        self
    }

    /// Consumes the console and returns its output sink.
    #[inline]
    pub fn into_output(self) -> W {
        self.output
    }

    /// Runs until the user quits or the input ends.
    ///
    /// Any failure of the agent ends the loop with an error.
    pub async fn run(&mut self, session: &Session) -> Result<(), Error> {
        loop {
            self.renderer.render_prompt(&mut self.output)?;

            let Some(line) = self.read_line().await? else {
                debug!("input closed");
                break;
            };
            let line = line.trim();
            if is_quit_command(line) {
                break;
            }
            if line.is_empty() {
                continue;
            }

            self.process(session, line).await?;
        }

        self.renderer.render_farewell(&mut self.output)?;
        Ok(())
    }

    async fn process(
        &mut self,
        session: &Session,
        input: &str,
    ) -> Result<(), Error> {
        let mut invocation = session.send_message(input);
        while let Some(chunk) =
            next_chunk(&mut invocation, self.progress.as_ref()).await?
        {
            self.renderer.render_chunk(&mut self.output, &chunk)?;
            let checkpoints = session.checkpoints()?;
            self.renderer
                .render_checkpoints(&mut self.output, &checkpoints)?;
        }
        Ok(())
    }

    async fn read_line(&mut self) -> Result<Option<String>, Error> {
        let mut line = String::new();
        let count = self.input.read_line(&mut line).await?;
        Ok((count > 0).then_some(line))
    }
}

async fn next_chunk(
    invocation: &mut Invocation,
    progress: Option<&ProgressStyle>,
) -> Result<Option<StreamChunk>, scout_core::Error> {
    let Some(style) = progress else {
        return invocation.next_chunk().await;
    };

    let progress_bar = ProgressBar::new_spinner();
    progress_bar.set_style(style.clone());
    progress_bar.set_message("🤔 Thinking...");

    let mut fut = pin!(invocation.next_chunk());
    let result = loop {
        select! {
            result = &mut fut => break result,
            _ = sleep(Duration::from_millis(100)) => progress_bar.tick(),
        }
    };

    // Clear the spinner before anything else is printed.
    progress_bar.finish_and_clear();
    result
}

#[cfg(test)]
mod tests {
    use scout_model::{ErrorKind, ModelMessage};
    use scout_test_model::{PresetResponse, TestModelProvider};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::session::SessionBuilder;
    use crate::tools::SearchTool;

    async fn run(
        model_provider: &TestModelProvider,
        input: &str,
    ) -> (Result<(), Error>, String) {
        let session =
            SessionBuilder::with_model_provider(model_provider.clone()).build();
        let mut console =
            Console::new(input.as_bytes(), Vec::new(), Renderer::plain());
        let result = console.run(&session).await;
        let output = String::from_utf8(console.into_output()).unwrap();
        (result, output)
    }

    #[test]
    fn test_quit_command() {
        assert!(is_quit_command("quit"));
        assert!(is_quit_command("QUIT"));
        assert!(is_quit_command("  Quit \n"));
        assert!(!is_quit_command("quit now"));
        assert!(!is_quit_command(""));
    }

    #[tokio::test]
    async fn test_quit_without_invoking_agent() {
        for sentinel in ["QUIT", "quit", "Quit"] {
            let model_provider = TestModelProvider::default();
            let (result, output) =
                run(&model_provider, &format!("{sentinel}\n")).await;
            result.unwrap();
            assert!(model_provider.requests().is_empty());
            assert_eq!(output, "\nUser:\n\nAgent:\nHave a nice day! 👋\n");
        }
    }

    #[tokio::test]
    async fn test_end_of_input() {
        let model_provider = TestModelProvider::default();
        let (result, output) = run(&model_provider, "").await;
        result.unwrap();
        assert!(output.ends_with("Have a nice day! 👋\n"));
    }

    #[tokio::test]
    async fn test_blank_lines_are_ignored() {
        let model_provider = TestModelProvider::default();
        let (result, output) = run(&model_provider, "\n   \nquit\n").await;
        result.unwrap();
        assert!(model_provider.requests().is_empty());
        assert_eq!(output.matches("User:").count(), 3);
    }

    #[tokio::test]
    async fn test_answer_turn() {
        let mut model_provider = TestModelProvider::default();
        model_provider.add_response(
            PresetResponse::text("Hi there!").with_message_id("m2"),
        );

        let (result, output) = run(&model_provider, "Hello\nquit\n").await;
        result.unwrap();

        assert!(output.contains("\nAgent:\nHi there!\n"));
        assert_eq!(output.matches("Checkpoint:").count(), 2);
        assert!(output.contains("Agent: Hi there! (Message ID: m2)"));
        assert_eq!(output.matches("User: Hello (Message ID: ").count(), 2);
        assert!(output.ends_with("Have a nice day! 👋\n"));
        assert_eq!(model_provider.remaining(), 0);
    }

    #[tokio::test]
    async fn test_unknown_tool_turn_renders_every_step() {
        let mut model_provider = TestModelProvider::default();
        model_provider.add_response(PresetResponse::tool_call(
            "call-1",
            "tavily_search_results_json",
            r#"{"query": "weather in Paris"}"#,
        ));
        model_provider.add_response(PresetResponse::text("Sunny."));

        let (result, output) = run(&model_provider, "Weather?\n").await;
        result.unwrap();

        assert!(output.contains(
            "The agent is calling the tool tavily_search_results_json with the query weather in Paris."
        ));
        assert!(output.contains("\nAgent:\nSunny.\n"));
        // Three steps, each followed by the full history so far.
        assert_eq!(output.matches("Checkpoint:").count(), 2 + 3 + 4);
        assert!(output.contains("Other (tool): Error: "));
    }

    #[tokio::test]
    async fn test_search_turn() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .and(body_partial_json(json!({ "query": "weather in Paris" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [{
                    "url": "https://weather.example/paris",
                    "content": "Paris: sunny, 24 degrees."
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut model_provider = TestModelProvider::default();
        model_provider.add_response(PresetResponse::tool_call(
            "call-1",
            "tavily_search_results_json",
            r#"{"query": "weather in Paris"}"#,
        ));
        model_provider.add_response(PresetResponse::text("Sunny, 24 degrees."));

        let search_tool = SearchTool::new(Some("tvly-test".to_owned()))
            .with_base_url(server.uri());
        let session =
            SessionBuilder::with_model_provider(model_provider.clone())
                .with_search_tool(search_tool)
                .build();
        let mut console =
            Console::new(&b"Weather?\n"[..], Vec::new(), Renderer::plain());
        console.run(&session).await.unwrap();
        let output = String::from_utf8(console.into_output()).unwrap();

        assert!(output.contains("with the query weather in Paris."));
        assert!(output.contains("\nAgent:\nSunny, 24 degrees.\n"));
        assert!(output.contains(
            r#"Other (tool): [{"url":"https://weather.example/paris","content":"Paris: sunny, 24 degrees."}]"#
        ));
        assert!(!output.contains("Error: "));

        // The search result is handed back to the model.
        let requests = model_provider.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].tools.len(), 1);
        assert!(matches!(
            requests[1].messages.last(),
            Some(ModelMessage::Tool(result))
                if result.id == "call-1"
                    && result.content.contains("weather.example")
        ));
    }

    #[tokio::test]
    async fn test_model_failure_ends_loop() {
        let mut model_provider = TestModelProvider::default();
        model_provider.add_response(PresetResponse::failing(
            ErrorKind::RateLimitExceeded,
        ));

        let (result, output) = run(&model_provider, "Hello\nquit\n").await;
        let err = result.unwrap_err();
        assert!(matches!(err, Error::Agent(_)));
        assert!(!output.contains("Have a nice day!"));
    }
}
