use reqwest::Client;
use schemars::{JsonSchema, schema_for};
use scout_core::tool::{Error as ToolError, Tool, ToolResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const DEFAULT_BASE_URL: &str = "https://api.tavily.com";
const DEFAULT_MAX_RESULTS: u32 = 3;

/// Input of [`SearchTool`].
#[derive(Deserialize, JsonSchema)]
pub struct SearchToolParameters {
    #[schemars(description = "search query to look up")]
    query: String,
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    max_results: u32,
    search_depth: &'static str,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Serialize, Deserialize)]
struct SearchResult {
    url: String,
    content: String,
}

/// A web search tool backed by the Tavily search API.
///
/// Results are handed to the model as a JSON array of `url` and
/// `content` pairs.
pub struct SearchTool {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    max_results: u32,
    parameter_schema: Value,
}

impl SearchTool {
    /// Creates a search tool.
    ///
    /// Without an API key the tool is still offered to the model, but
    /// every search fails.
    pub fn new(api_key: Option<String>) -> Self {
        SearchTool {
            client: Client::new(),
            api_key,
            base_url: DEFAULT_BASE_URL.to_owned(),
            max_results: DEFAULT_MAX_RESULTS,
            parameter_schema: schema_for!(SearchToolParameters).to_value(),
        }
    }

    /// Sets a custom base URL for the search API.
    #[inline]
    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    /// Sets how many results one search returns at most.
    #[inline]
    pub fn with_max_results(mut self, max_results: u32) -> Self {
        self.max_results = max_results;
        self
    }
}

impl Tool for SearchTool {
    type Input = SearchToolParameters;

    fn name(&self) -> &str {
        "tavily_search_results_json"
    }

    fn description(&self) -> &str {
        r#"
A search engine optimized for comprehensive, accurate, and trusted results.
Useful for when you need to answer questions about current events.
Input should be a search query."#
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: SearchToolParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let client = self.client.clone();
        let api_key = self.api_key.clone();
        let url = format!("{}/search", self.base_url);
        let max_results = self.max_results;

        async move {
            let Some(api_key) = api_key else {
                return Err(ToolError::execution_error()
                    .with_reason("no API key configured for web search"));
            };
            debug!("searching the web for {:?}", input.query);

            let resp = client
                .post(url)
                .bearer_auth(api_key)
                .json(&SearchRequest {
                    query: &input.query,
                    max_results,
                    search_depth: "advanced",
                })
                .send()
                .await
                .map_err(|err| {
                    ToolError::execution_error().with_reason(err.to_string())
                })?;

            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(ToolError::execution_error().with_reason(format!(
                    "search API responded with {status}: {body}"
                )));
            }

            let resp: SearchResponse = resp.json().await.map_err(|err| {
                ToolError::execution_error().with_reason(err.to_string())
            })?;
            let mut results = resp.results;
            results.truncate(max_results as usize);
            trace!("search returned {} results", results.len());

            serde_json::to_string(&results).map_err(|err| {
                ToolError::execution_error().with_reason(err.to_string())
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use scout_core::tool::ErrorKind;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn params(query: &str) -> SearchToolParameters {
        SearchToolParameters {
            query: query.to_owned(),
        }
    }

    #[test]
    fn test_parameter_schema() {
        let tool = SearchTool::new(None);
        let schema = tool.parameter_schema();
        assert_eq!(schema["properties"]["query"]["type"], "string");
        assert_eq!(schema["required"], json!(["query"]));
    }

    #[tokio::test]
    async fn test_search() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .and(header("authorization", "Bearer tvly-test"))
            .and(body_partial_json(json!({
                "query": "rust 2024 edition",
                "max_results": 3
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "query": "rust 2024 edition",
                "results": [
                    {
                        "title": "Rust 2024",
                        "url": "https://blog.rust-lang.org/",
                        "content": "Rust 2024 is stable.",
                        "score": 0.98
                    },
                    {
                        "title": "Edition guide",
                        "url": "https://doc.rust-lang.org/edition-guide/",
                        "content": "The edition guide.",
                        "score": 0.91
                    }
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let tool = SearchTool::new(Some("tvly-test".to_owned()))
            .with_base_url(server.uri());
        let output = tool.execute(params("rust 2024 edition")).await.unwrap();
        let output: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(
            output,
            json!([
                {
                    "url": "https://blog.rust-lang.org/",
                    "content": "Rust 2024 is stable."
                },
                {
                    "url": "https://doc.rust-lang.org/edition-guide/",
                    "content": "The edition guide."
                }
            ])
        );
    }

    fn results(count: usize) -> Value {
        let results: Vec<_> = (1..=count)
            .map(|n| {
                json!({
                    "title": format!("Result {n}"),
                    "url": format!("https://example.com/{n}"),
                    "content": format!("Content {n}."),
                    "score": 1.0 - n as f64 / 10.0
                })
            })
            .collect();
        json!({ "query": "anything", "results": results })
    }

    #[tokio::test]
    async fn test_result_limit() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .and(body_partial_json(json!({ "max_results": 3 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(results(5)))
            .expect(1)
            .mount(&server)
            .await;

        let tool = SearchTool::new(Some("tvly-test".to_owned()))
            .with_base_url(server.uri());
        let output = tool.execute(params("anything")).await.unwrap();
        let output: Vec<Value> = serde_json::from_str(&output).unwrap();
        assert_eq!(output.len(), 3);
        assert_eq!(output[2]["url"], "https://example.com/3");
    }

    #[tokio::test]
    async fn test_custom_result_limit() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .and(body_partial_json(json!({
                "max_results": 1,
                "search_depth": "advanced"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(results(5)))
            .expect(1)
            .mount(&server)
            .await;

        let tool = SearchTool::new(Some("tvly-test".to_owned()))
            .with_base_url(server.uri())
            .with_max_results(1);
        let output = tool.execute(params("anything")).await.unwrap();
        let output: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(
            output,
            json!([{ "url": "https://example.com/1", "content": "Content 1." }])
        );
    }

    #[tokio::test]
    async fn test_backend_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let tool = SearchTool::new(Some("tvly-wrong".to_owned()))
            .with_base_url(server.uri());
        let err = tool.execute(params("anything")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExecutionError);
        assert!(err.reason().contains("401"));
    }

    #[tokio::test]
    async fn test_missing_api_key() {
        let tool = SearchTool::new(None).with_base_url("http://127.0.0.1:9");
        let err = tool.execute(params("anything")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExecutionError);
    }
}
