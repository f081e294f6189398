//! Switchyard - a dynamic model-switching gateway
//!
//! This library routes two request types to externally hosted language
//! models: free-form text generation (`POST /generate`) goes to a remote
//! OpenAI-compatible chat service, and text summarization
//! (`POST /summarize`) goes to a hub-hosted summarization model chosen per
//! request by an ordered fallback policy. There is no state shared between
//! requests; each one resolves and invokes its model independently.

use axum::Router;
use axum::routing::post;
use axum_prometheus::{
    GenericMetricLayer, Handle, PrometheusMetricLayerBuilder,
    metrics_exporter_prometheus::PrometheusHandle,
};
use std::borrow::Cow;
use tracing::{info, instrument};

pub mod chat;
pub mod client;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod summarizer;

use chat::ChatBackend;
use client::{HttpClient, HyperClient};
use handlers::{generate, summarize};
use summarizer::SummarizerHub;

/// The main application state: the HTTP client plus the two upstream
/// backend handles. Read-only for the life of the process.
#[derive(Clone, Debug)]
pub struct AppState<T: HttpClient> {
    pub http_client: T,
    pub chat: ChatBackend,
    pub summarizer: SummarizerHub,
}

impl AppState<HyperClient> {
    /// Create a new AppState with the default Hyper client
    pub fn new(chat: ChatBackend, summarizer: SummarizerHub) -> Self {
        let http_client = client::create_hyper_client();
        Self {
            http_client,
            chat,
            summarizer,
        }
    }
}

impl<T: HttpClient> AppState<T> {
    /// Create a new AppState with a custom HTTP client (useful for testing)
    pub fn with_client(chat: ChatBackend, summarizer: SummarizerHub, http_client: T) -> Self {
        Self {
            http_client,
            chat,
            summarizer,
        }
    }
}

/// Build the main router for the gateway
/// This creates routes for:
/// - `POST /generate` - Forwards a prompt to a named chat model
/// - `POST /summarize` - Summarizes text with a resolved summarization model
#[instrument(skip(state))]
pub fn build_router<T: HttpClient + Clone + Send + Sync + 'static>(state: AppState<T>) -> Router {
    info!("Building router");
    Router::new()
        .route("/generate", post(generate))
        .route("/summarize", post(summarize))
        .with_state(state)
}

/// Builds a router for the metrics endpoint.
#[instrument(skip(handle))]
pub fn build_metrics_router(handle: PrometheusHandle) -> Router {
    info!("Building metrics router");
    Router::new().route(
        "/metrics",
        axum::routing::get(move || async move { handle.render() }),
    )
}

type MetricsLayerAndHandle = (
    GenericMetricLayer<'static, PrometheusHandle, Handle>,
    PrometheusHandle,
);

/// Builds a layer and handle for prometheus metrics collection.
///
/// # Parameters
/// - `prefix`: A string prefix for the metrics, which can be either a string literal or an owned string.
///   This parameter uses `impl Into<Cow<'static, str>>` to allow flexibility in passing either borrowed
///   or owned strings. The `'static` lifetime ensures that the prefix is valid for the entire duration
///   of the program, as required by the Prometheus metrics layer.
pub fn build_metrics_layer_and_handle(
    prefix: impl Into<Cow<'static, str>>,
) -> MetricsLayerAndHandle {
    info!("Building metrics layer");
    PrometheusMetricLayerBuilder::new()
        .with_prefix(prefix)
        .enable_response_body_size(true)
        .with_endpoint_label_type(axum_prometheus::EndpointLabel::Exact)
        .with_default_metrics()
        .build_pair()
}

/// Mock HTTP client for exercising the router without a network. Public so
/// the integration tests can drive the same state type the binary uses.
#[doc(hidden)]
pub mod test_utils {
    use super::*;
    use async_trait::async_trait;
    use axum::http::StatusCode;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Records every request it receives and answers from a queue of canned
    /// responses. The queue is drained in order; the final entry repeats
    /// forever, so a single-response mock answers every call the same way.
    pub struct MockHttpClient {
        pub requests: Arc<Mutex<Vec<MockRequest>>>,
        responses: Arc<Mutex<VecDeque<(StatusCode, String)>>>,
    }

    #[derive(Debug, Clone)]
    pub struct MockRequest {
        pub method: String,
        pub uri: String,
        pub headers: Vec<(String, String)>,
        pub body: Vec<u8>,
    }

    impl MockHttpClient {
        pub fn new(status: StatusCode, body: &str) -> Self {
            Self::with_responses(vec![(status, body)])
        }

        pub fn with_responses(responses: Vec<(StatusCode, &str)>) -> Self {
            Self {
                requests: Arc::new(Mutex::new(Vec::new())),
                responses: Arc::new(Mutex::new(
                    responses
                        .into_iter()
                        .map(|(status, body)| (status, body.to_string()))
                        .collect(),
                )),
            }
        }

        pub fn get_requests(&self) -> Vec<MockRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl std::fmt::Debug for MockHttpClient {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("MockHttpClient")
                .field("requests", &self.requests)
                .finish()
        }
    }

    impl Clone for MockHttpClient {
        fn clone(&self) -> Self {
            Self {
                requests: Arc::clone(&self.requests),
                responses: Arc::clone(&self.responses),
            }
        }
    }

    #[async_trait]
    impl HttpClient for MockHttpClient {
        async fn request(
            &self,
            req: axum::extract::Request,
        ) -> Result<axum::response::Response, Box<dyn std::error::Error + Send + Sync>> {
            let method = req.method().to_string();
            let uri = req.uri().to_string();
            let headers = req
                .headers()
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").to_string()))
                .collect();

            let body = axum::body::to_bytes(req.into_body(), usize::MAX)
                .await
                .map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>)?
                .to_vec();

            self.requests.lock().unwrap().push(MockRequest {
                method,
                uri,
                headers,
                body,
            });

            let (status, body) = {
                let mut queue = self.responses.lock().unwrap();
                if queue.len() > 1 {
                    queue.pop_front().unwrap()
                } else {
                    queue
                        .front()
                        .cloned()
                        .unwrap_or((StatusCode::OK, String::new()))
                }
            };

            Ok(axum::response::Response::builder()
                .status(status)
                .body(axum::body::Body::from(body))
                .unwrap())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use serde_json::json;
    use test_utils::MockHttpClient;

    fn test_state(mock_client: MockHttpClient) -> AppState<MockHttpClient> {
        let chat = ChatBackend::builder()
            .base_url("https://chat.example.com/v1/".parse().unwrap())
            .api_key("test-key".to_string())
            .build();
        let summarizer = SummarizerHub::builder()
            .base_url("https://hub.example.com/".parse().unwrap())
            .build();
        AppState::with_client(chat, summarizer, mock_client)
    }

    #[tokio::test]
    async fn test_generate_forwards_prompt_and_returns_output() {
        let mock_client = MockHttpClient::new(
            StatusCode::OK,
            r#"{"choices": [{"message": {"content": "Hello back!"}}]}"#,
        );
        let server = TestServer::new(build_router(test_state(mock_client.clone()))).unwrap();

        let response = server
            .post("/generate")
            .json(&json!({
                "prompt": "Hello",
                "model_name": "llama-3.3-70b-versatile"
            }))
            .await;

        assert_eq!(response.status_code(), 200);
        let body: serde_json::Value = response.json();
        assert_eq!(body["output"], "Hello back!");

        // Exactly one upstream call, addressed by the caller's model id
        let requests = mock_client.get_requests();
        assert_eq!(requests.len(), 1);
        let forwarded: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(forwarded["model"], "llama-3.3-70b-versatile");
    }

    #[tokio::test]
    async fn test_generate_upstream_failure_returns_500_with_detail() {
        let mock_client = MockHttpClient::new(StatusCode::NOT_FOUND, "model not found");
        let server = TestServer::new(build_router(test_state(mock_client))).unwrap();

        let response = server
            .post("/generate")
            .json(&json!({
                "prompt": "Hello",
                "model_name": "nonexistent-model"
            }))
            .await;

        assert_eq!(response.status_code(), 500);
        let body: serde_json::Value = response.json();
        assert!(!body["detail"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_generate_empty_prompt_makes_no_upstream_call() {
        let mock_client = MockHttpClient::new(StatusCode::OK, "{}");
        let server = TestServer::new(build_router(test_state(mock_client.clone()))).unwrap();

        let response = server
            .post("/generate")
            .json(&json!({
                "prompt": "",
                "model_name": "llama-3.3-70b-versatile"
            }))
            .await;

        assert_eq!(response.status_code(), 500);
        assert_eq!(mock_client.get_requests().len(), 0);
    }

    #[tokio::test]
    async fn test_summarize_empty_model_name_uses_first_fallback() {
        let mock_client = MockHttpClient::with_responses(vec![
            (StatusCode::OK, "{}"),
            (StatusCode::OK, r#"[{"summary_text": "the short version"}]"#),
        ]);
        let server = TestServer::new(build_router(test_state(mock_client.clone()))).unwrap();

        let response = server
            .post("/summarize")
            .json(&json!({
                "text": "a long article about model gateways",
                "model_name": ""
            }))
            .await;

        assert_eq!(response.status_code(), 200);
        let body: serde_json::Value = response.json();
        assert_eq!(body["summary"], "the short version");

        let requests = mock_client.get_requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(
            requests[0].uri,
            "https://hub.example.com/status/facebook/bart-large-cnn"
        );
        assert_eq!(
            requests[1].uri,
            "https://hub.example.com/models/facebook/bart-large-cnn"
        );
    }

    #[tokio::test]
    async fn test_summarize_invalid_user_model_falls_back() {
        let mock_client = MockHttpClient::with_responses(vec![
            (StatusCode::NOT_FOUND, "unknown model"),
            (StatusCode::OK, "{}"),
            (StatusCode::OK, r#"[{"summary_text": "fell back fine"}]"#),
        ]);
        let server = TestServer::new(build_router(test_state(mock_client.clone()))).unwrap();

        let response = server
            .post("/summarize")
            .json(&json!({
                "text": "a long article",
                "model_name": "not-a-real-model"
            }))
            .await;

        assert_eq!(response.status_code(), 200);
        let body: serde_json::Value = response.json();
        assert_eq!(body["summary"], "fell back fine");

        let requests = mock_client.get_requests();
        assert_eq!(
            requests[0].uri,
            "https://hub.example.com/status/not-a-real-model"
        );
        assert_eq!(
            requests[1].uri,
            "https://hub.example.com/status/facebook/bart-large-cnn"
        );
    }

    #[tokio::test]
    async fn test_summarize_exhausted_fallback_returns_fixed_message() {
        let mock_client = MockHttpClient::new(StatusCode::SERVICE_UNAVAILABLE, "loading");
        let server = TestServer::new(build_router(test_state(mock_client))).unwrap();

        let response = server
            .post("/summarize")
            .json(&json!({
                "text": "a long article",
                "model_name": "not-a-real-model"
            }))
            .await;

        assert_eq!(response.status_code(), 500);
        let body: serde_json::Value = response.json();
        assert_eq!(body["detail"], "No summarization model available");
    }

    #[tokio::test]
    async fn test_summarize_accepts_absent_model_name() {
        let mock_client = MockHttpClient::with_responses(vec![
            (StatusCode::OK, "{}"),
            (StatusCode::OK, r#"[{"summary_text": "ok"}]"#),
        ]);
        let server = TestServer::new(build_router(test_state(mock_client))).unwrap();

        let response = server
            .post("/summarize")
            .json(&json!({"text": "a long article"}))
            .await;

        assert_eq!(response.status_code(), 200);
    }

    mod metrics {
        use super::*;
        use rstest::*;

        /// Fixture to create a shared metrics server and main server.
        /// axum-prometheus uses a global Prometheus registry that maintains
        /// state across test executions within the same process, so all
        /// metrics tests share one pair of servers.
        #[fixture]
        #[once]
        fn get_shared_metrics_servers() -> (TestServer, TestServer) {
            let (prometheus_layer, handle) = build_metrics_layer_and_handle("switchyard");

            let metrics_router = build_metrics_router(handle);
            let metrics_server = TestServer::new(metrics_router).unwrap();

            let mock_client = MockHttpClient::new(
                StatusCode::OK,
                r#"{"choices": [{"message": {"content": "counted"}}]}"#,
            );
            let router = build_router(test_state(mock_client)).layer(prometheus_layer);
            let server = TestServer::new(router).unwrap();

            (server, metrics_server)
        }

        #[rstest]
        #[tokio::test]
        async fn test_requests_are_counted(get_shared_metrics_servers: &(TestServer, TestServer)) {
            let (server, metrics_server) = get_shared_metrics_servers;

            let count_generate_200 = |metrics: &str| {
                metrics
                    .lines()
                    .find(|line| line.contains("switchyard_http_requests_total{method=\"POST\",status=\"200\",endpoint=\"/generate\"}"))
                    .and_then(|line| line.split_whitespace().last())
                    .and_then(|s| s.parse::<i32>().ok())
                    .unwrap_or(0)
            };

            let initial_response = metrics_server.get("/metrics").await;
            let initial_count = count_generate_200(&initial_response.text());

            let response = server
                .post("/generate")
                .json(&json!({"prompt": "Hello", "model_name": "llama-3.3-70b-versatile"}))
                .await;
            assert_eq!(response.status_code(), 200);

            let response = metrics_server.get("/metrics").await;
            assert_eq!(response.status_code(), 200);
            let final_count = count_generate_200(&response.text());

            assert_eq!(final_count, initial_count + 1, "Metrics should increment by 1");
        }
    }
}
