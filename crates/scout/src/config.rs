//! Settings read from the environment.

use std::env;
use std::fmt::{self, Debug};

use scout_openai_model::{OpenAIConfig, OpenAIConfigBuilder};

const DEFAULT_GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
const DEFAULT_GROQ_MODEL: &str = "llama3-8b-8192";
const DEFAULT_TAVILY_BASE_URL: &str = "https://api.tavily.com";

/// Loads variables from a `.env` file in the working directory, if any.
///
/// Variables already set in the process environment win over the file.
pub fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path) => debug!("loaded environment from {}", path.display()),
        Err(err) if err.not_found() => {}
        Err(err) => warn!("failed to load .env file: {err}"),
    }
}

/// Credentials and endpoints for the model and the search backend.
///
/// Missing keys are not an error here. The model provider reports a
/// missing credential on its first request, and the search tool reports
/// it as a failed tool call.
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    /// API key for the Groq chat completions endpoint.
    pub groq_api_key: Option<String>,
    /// Base URL of the OpenAI-compatible endpoint.
    pub groq_base_url: String,
    /// Model name sent with every request.
    pub groq_model: String,
    /// API key for the Tavily search API.
    pub tavily_api_key: Option<String>,
    /// Base URL of the Tavily search API.
    pub tavily_base_url: String,
}

impl Config {
    /// Reads the configuration from the process environment.
    #[inline]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Reads the configuration through a variable lookup function.
    ///
    /// Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|value| !value.is_empty());
        Self {
            groq_api_key: get("GROQ_API_KEY"),
            groq_base_url: get("GROQ_BASE_URL")
                .unwrap_or_else(|| DEFAULT_GROQ_BASE_URL.to_owned()),
            groq_model: get("GROQ_MODEL")
                .unwrap_or_else(|| DEFAULT_GROQ_MODEL.to_owned()),
            tavily_api_key: get("TAVILY_API_KEY"),
            tavily_base_url: get("TAVILY_BASE_URL")
                .unwrap_or_else(|| DEFAULT_TAVILY_BASE_URL.to_owned()),
        }
    }

    /// Returns the model provider configuration.
    pub fn model_config(&self) -> OpenAIConfig {
        let mut builder = OpenAIConfigBuilder::new()
            .with_base_url(&self.groq_base_url)
            .with_model(&self.groq_model);
        if let Some(api_key) = &self.groq_api_key {
            builder = builder.api_key(api_key);
        }
        builder.build()
    }
}

impl Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |key: &Option<String>| key.as_ref().map(|_| "<redacted>");
        f.debug_struct("Config")
            .field("groq_api_key", &redact(&self.groq_api_key))
            .field("groq_base_url", &self.groq_base_url)
            .field("groq_model", &self.groq_model)
            .field("tavily_api_key", &redact(&self.tavily_api_key))
            .field("tavily_base_url", &self.tavily_base_url)
            .finish()
    }
}
