//! The `scout` command: chat with a search-enabled agent in the terminal.

#[macro_use]
extern crate tracing;

use std::io::{self, IsTerminal as _};
use std::process::ExitCode;

use scout::config::{self, Config};
use scout::tools::SearchTool;
use scout::{Console, Renderer, SessionBuilder};
use scout_openai_model::OpenAIProvider;
use tokio::io::BufReader;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    config::load_dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let config = Config::from_env();
    debug!("starting with {config:?}");

    let model_provider = OpenAIProvider::new(config.model_config());
    let search_tool = SearchTool::new(config.tavily_api_key.clone())
        .with_base_url(&config.tavily_base_url);
    let session = SessionBuilder::with_model_provider(model_provider)
        .with_search_tool(search_tool)
        .build();

    let stdout = io::stdout();
    let renderer = Renderer::new(stdout.is_terminal());
    let mut console =
        Console::new(BufReader::new(tokio::io::stdin()), stdout, renderer)
            .with_progress(io::stderr().is_terminal());

    match console.run(&session).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("session ended: {err:?}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
