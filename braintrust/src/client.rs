//! Function invocation client.

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::http::stream_from_response;
use braintrust_streaming::BraintrustStream;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use tracing::{debug, warn};

/// Which function to invoke.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FunctionRef {
    /// A function by id.
    Id {
        /// Function id.
        function_id: String,
    },
    /// A function by project name and slug.
    Slug {
        /// Project name.
        project_name: String,
        /// Function slug.
        slug: String,
    },
    /// A global function by name.
    Global {
        /// Global function name.
        global_function: String,
    },
}

impl FunctionRef {
    /// Reference a function by id.
    pub fn id(function_id: impl Into<String>) -> Self {
        Self::Id {
            function_id: function_id.into(),
        }
    }

    /// Reference a function by project name and slug.
    pub fn slug(project_name: impl Into<String>, slug: impl Into<String>) -> Self {
        Self::Slug {
            project_name: project_name.into(),
            slug: slug.into(),
        }
    }

    /// Reference a global function.
    pub fn global(name: impl Into<String>) -> Self {
        Self::Global {
            global_function: name.into(),
        }
    }
}

/// How a function's output is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvokeMode {
    /// Let the server decide.
    Auto,
    /// Run tool calls in parallel.
    Parallel,
}

/// Body of a `function/invoke` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvokeRequest {
    /// The function to invoke.
    #[serde(flatten)]
    pub function: FunctionRef,
    /// Pinned function version.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Function input.
    pub input: JsonValue,
    /// Extra chat messages appended to a prompt function.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<JsonValue>>,
    /// Metadata attached to the invocation span.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, JsonValue>>,
    /// Tags attached to the invocation span.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    /// Output mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<InvokeMode>,
    /// Fail instead of coercing when the input does not match the schema.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strict: Option<bool>,
    /// Whether the response is an SSE stream. Set by the client.
    #[serde(default)]
    pub stream: bool,
}

impl InvokeRequest {
    /// Create a request for `function` with `input`.
    pub fn new(function: FunctionRef, input: impl Into<JsonValue>) -> Self {
        Self {
            function,
            version: None,
            input: input.into(),
            messages: None,
            metadata: None,
            tags: None,
            mode: None,
            strict: None,
            stream: false,
        }
    }

    /// Pin the function version.
    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Append chat messages.
    #[must_use]
    pub fn messages(mut self, messages: Vec<JsonValue>) -> Self {
        self.messages = Some(messages);
        self
    }

    /// Add a metadata entry.
    #[must_use]
    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.metadata
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }

    /// Add a tag.
    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.get_or_insert_with(Vec::new).push(tag.into());
        self
    }

    /// Set the output mode.
    #[must_use]
    pub fn mode(mut self, mode: InvokeMode) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Set strict input validation.
    #[must_use]
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = Some(strict);
        self
    }
}

/// Client for invoking Braintrust functions.
#[derive(Debug, Clone)]
pub struct BraintrustClient {
    client: Client,
    config: ClientConfig,
    api_key: String,
}

impl BraintrustClient {
    /// Create a client from a configuration.
    ///
    /// Fails if the configuration has no API key.
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| ClientError::configuration("API key not set"))?;

        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            config,
            api_key,
        })
    }

    /// Create a client from the `BRAINTRUST_*` environment variables.
    pub fn from_env() -> ClientResult<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    /// Use a custom HTTP client.
    #[must_use]
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// The client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Invoke a function and return its JSON result.
    pub async fn invoke(&self, mut request: InvokeRequest) -> ClientResult<JsonValue> {
        request.stream = false;
        let response = self.send(&request).await?;
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Invoke a function and stream its output.
    ///
    /// Non-success statuses are reported before any chunk is read.
    pub async fn invoke_stream(
        &self,
        mut request: InvokeRequest,
    ) -> ClientResult<BraintrustStream> {
        request.stream = true;
        let response = self.send(&request).await?;
        Ok(stream_from_response(response, &self.config.stream))
    }

    async fn send(&self, request: &InvokeRequest) -> ClientResult<Response> {
        let url = self.config.endpoint("function/invoke");
        debug!(
            url = %url,
            function = ?request.function,
            stream = request.stream,
            "invoking function"
        );

        let mut builder = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(request);
        if let Some(org) = &self.config.org_name {
            builder = builder.header("x-bt-org-name", org);
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "function invocation failed");
            return Err(ClientError::api(status.as_u16(), body));
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use braintrust_streaming::{FinalValue, StreamChunk, StreamError};
    use futures::StreamExt;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use url::Url;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> BraintrustClient {
        let config = ClientConfig::with_api_key("sk-test")
            .api_url(Url::parse(&server.uri()).unwrap())
            .org_name("acme");
        BraintrustClient::new(config).unwrap()
    }

    fn sse(events: &[(&str, &str)]) -> String {
        events
            .iter()
            .map(|(name, data)| format!("event: {name}\ndata: {data}\n\n"))
            .collect()
    }

    #[test]
    fn test_function_ref_serialization() {
        let request = InvokeRequest::new(FunctionRef::slug("proj", "greet"), json!({"name": "x"}))
            .version("v1")
            .tag("smoke");
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(
            body,
            json!({
                "project_name": "proj",
                "slug": "greet",
                "version": "v1",
                "input": {"name": "x"},
                "tags": ["smoke"],
                "stream": false
            })
        );

        let body =
            serde_json::to_value(InvokeRequest::new(FunctionRef::global("echo"), 1)).unwrap();
        assert_eq!(body["global_function"], "echo");
    }

    #[test]
    fn test_function_ref_deserialization() {
        let request: InvokeRequest =
            serde_json::from_value(json!({"function_id": "f-1", "input": null})).unwrap();
        assert_eq!(request.function, FunctionRef::id("f-1"));
        assert!(!request.stream);
    }

    #[test]
    fn test_new_requires_api_key() {
        let err = BraintrustClient::new(ClientConfig::default()).unwrap_err();
        assert!(matches!(err, ClientError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_invoke_returns_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/function/invoke"))
            .and(header("authorization", "Bearer sk-test"))
            .and(header("x-bt-org-name", "acme"))
            .and(body_partial_json(json!({"function_id": "f-1", "stream": false})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"answer": 42})))
            .expect(1)
            .mount(&server)
            .await;

        let value = client_for(&server)
            .invoke(InvokeRequest::new(FunctionRef::id("f-1"), json!({"q": "?"})))
            .await
            .unwrap();

        assert_eq!(value, json!({"answer": 42}));
    }

    #[tokio::test]
    async fn test_invoke_stream_text() {
        let server = MockServer::start().await;
        let body = sse(&[
            ("text_delta", "\"x\""),
            ("text_delta", "\"y\""),
            ("done", ""),
        ]);
        Mock::given(method("POST"))
            .and(path("/function/invoke"))
            .and(body_partial_json(json!({"stream": true})))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_raw(body, "text/event-stream"),
            )
            .mount(&server)
            .await;

        let mut stream = client_for(&server)
            .invoke_stream(InvokeRequest::new(FunctionRef::id("f-1"), json!({})))
            .await
            .unwrap();
        let mut live = stream.copy();

        let mut chunks = Vec::new();
        while let Some(chunk) = live.next().await {
            chunks.push(chunk.unwrap());
        }

        assert_eq!(chunks, vec![StreamChunk::text("x"), StreamChunk::text("y")]);
        assert_eq!(stream.final_value().await.unwrap(), FinalValue::Text("xy".into()));
        assert_eq!(live.final_value().await.unwrap(), FinalValue::Text("xy".into()));
    }

    #[tokio::test]
    async fn test_invoke_stream_json() {
        let server = MockServer::start().await;
        let body = sse(&[
            ("json_delta", "{\"a\":"),
            ("json_delta", "1}"),
            ("done", ""),
        ]);
        Mock::given(method("POST"))
            .and(path("/function/invoke"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .mount(&server)
            .await;

        let mut stream = client_for(&server)
            .invoke_stream(InvokeRequest::new(FunctionRef::global("echo"), json!({})))
            .await
            .unwrap();

        assert_eq!(
            stream.final_value().await.unwrap(),
            FinalValue::Json(json!({"a": 1}))
        );
    }

    #[tokio::test]
    async fn test_invoke_stream_decode_error() {
        let server = MockServer::start().await;
        let body = sse(&[("text_delta", "abc")]);
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .mount(&server)
            .await;

        let mut stream = client_for(&server)
            .invoke_stream(InvokeRequest::new(FunctionRef::id("f-1"), json!({})))
            .await
            .unwrap();

        let err = stream.final_value().await.unwrap_err();
        assert!(matches!(err, StreamError::InvalidTextDelta { .. }));
    }

    #[tokio::test]
    async fn test_api_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/function/invoke"))
            .respond_with(ResponseTemplate::new(404).set_body_string("function not found"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .invoke(InvokeRequest::new(FunctionRef::id("missing"), json!({})))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ClientError::Api { status: 404, ref body } if body == "function not found"
        ));

        let err = client
            .invoke_stream(InvokeRequest::new(FunctionRef::id("missing"), json!({})))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(404));
    }

    #[tokio::test]
    async fn test_invoke_invalid_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .invoke(InvokeRequest::new(FunctionRef::id("f-1"), json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Serialization(_)));
    }
}
