//! A model provider for OpenAI-compatible chat completion APIs.
//!
//! Groq, OpenAI and most self-hosted servers speak the same streaming
//! protocol, so pointing [`OpenAIConfigBuilder::with_base_url`] at any of
//! them is enough.

#[macro_use]
extern crate tracing;

mod config;
mod io;
mod proto;
mod response;

use std::error::Error as StdError;
use std::fmt::{self, Display};
use std::sync::Arc;

use mime::Mime;
use reqwest::{Client, StatusCode, header};
use scout_model::{
    ErrorKind, ModelProvider, ModelProviderError, ModelRequest,
};

pub use config::{OpenAIConfig, OpenAIConfigBuilder};
use io::{Chunks, Sse};
pub use response::OpenAIResponse;

/// Error type for [`OpenAIProvider`].
#[derive(Debug)]
pub struct Error {
    message: String,
    kind: ErrorKind,
}

impl Error {
    fn new(message: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }

    /// Returns the error message.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl StdError for Error {}

impl ModelProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

/// OpenAI-compatible model provider.
#[derive(Clone, Debug)]
pub struct OpenAIProvider {
    client: Client,
    config: Arc<OpenAIConfig>,
}

impl OpenAIProvider {
    /// Creates a new `OpenAIProvider` with the given configuration.
    #[inline]
    pub fn new(config: OpenAIConfig) -> Self {
        Self {
            client: Client::new(),
            config: Arc::new(config),
        }
    }
}

impl ModelProvider for OpenAIProvider {
    type Error = Error;
    type Response = OpenAIResponse;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        let openai_req = proto::create_request(req, &self.config);
        let api_key = self.config.api_key.clone();
        let req_builder = self
            .client
            .post(format!("{}{}", self.config.base_url, "/chat/completions"))
            .header(header::ACCEPT, "text/event-stream")
            .json(&openai_req);

        async move {
            // Checked lazily, so a missing key only hurts once the model is
            // actually needed.
            let Some(api_key) = api_key else {
                return Err(Error::new(
                    "no API key configured for the model provider",
                    ErrorKind::MissingCredential,
                ));
            };

            let resp = req_builder
                .bearer_auth(api_key)
                .send()
                .await
                .map_err(|err| Error::new(format!("{err}"), ErrorKind::Other))?;

            let status = resp.status();
            if !status.is_success() {
                let kind = match status {
                    StatusCode::TOO_MANY_REQUESTS => {
                        ErrorKind::RateLimitExceeded
                    }
                    StatusCode::UNAUTHORIZED => ErrorKind::MissingCredential,
                    _ => ErrorKind::Other,
                };
                let body = resp.text().await.unwrap_or_default();
                error!("request failed with {status}: {body}");
                return Err(Error::new(
                    format!("server responded with {status}: {body}"),
                    kind,
                ));
            }

            let content_type = resp
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok());
            let is_event_stream = content_type
                .and_then(|v| v.parse().ok())
                .map(|m: Mime| m.subtype().as_str() == "event-stream")
                .unwrap_or(false);
            if !is_event_stream {
                return Err(Error::new(
                    format!("Unexpected content type: {content_type:?}"),
                    ErrorKind::Other,
                ));
            }

            // Here we got a successful response.
            let chunks = Chunks::from_response(resp);
            let sse = Sse::new(chunks);
            Ok(OpenAIResponse::from_sse(sse))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::future::poll_fn;
    use std::pin::pin;

    use scout_model::{ModelMessage, ModelResponse, ModelResponseEvent};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn hello_request() -> ModelRequest {
        ModelRequest {
            messages: vec![ModelMessage::User("Hello".to_owned())],
            tools: vec![],
        }
    }

    #[tokio::test]
    async fn test_missing_api_key() {
        let provider = OpenAIProvider::new(
            OpenAIConfigBuilder::new()
                .with_base_url("http://127.0.0.1:9")
                .build(),
        );
        let err = provider.send_request(&hello_request()).await.err().unwrap();
        assert_eq!(err.kind(), ErrorKind::MissingCredential);
    }

    #[tokio::test]
    async fn test_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(429).set_body_string("slow down"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let provider = OpenAIProvider::new(
            OpenAIConfigBuilder::with_api_key("test-key")
                .with_base_url(server.uri())
                .build(),
        );
        let err = provider.send_request(&hello_request()).await.err().unwrap();
        assert_eq!(err.kind(), ErrorKind::RateLimitExceeded);
        assert!(err.message().contains("slow down"));
    }

    #[tokio::test]
    async fn test_rejects_non_stream_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(r#"{"id":"x"}"#, "application/json"),
            )
            .mount(&server)
            .await;

        let provider = OpenAIProvider::new(
            OpenAIConfigBuilder::with_api_key("test-key")
                .with_base_url(server.uri())
                .build(),
        );
        let err = provider.send_request(&hello_request()).await.err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Other);
    }

    #[tokio::test]
    async fn test_streamed_completion() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                include_str!("../fixtures/text_response.txt"),
                "text/event-stream",
            ))
            .expect(1)
            .mount(&server)
            .await;

        let provider = OpenAIProvider::new(
            OpenAIConfigBuilder::with_api_key("test-key")
                .with_model("llama3-8b-8192")
                .with_base_url(server.uri())
                .build(),
        );
        let resp = provider.send_request(&hello_request()).await.unwrap();
        let mut resp = pin!(resp);

        let mut text = String::new();
        while let Some(event) = poll_fn(|cx| resp.as_mut().poll_next_event(cx))
            .await
            .unwrap()
        {
            if let ModelResponseEvent::MessageDelta(delta) = event {
                text.push_str(&delta);
            }
        }
        assert_eq!(text, "It is sunny.");
        assert_eq!(resp.message_id(), Some("chatcmpl-9c1d"));
    }
}
