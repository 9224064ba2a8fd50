// crates/ntropy-mcp-client/tests/common/mod.rs
// ============================================================================
// Module: Client Test Helpers
// Description: Local mock of the remote enrichment API.
// Purpose: Record outbound requests and serve scripted replies.
// Dependencies: ntropy-mcp-client, tiny_http
// ============================================================================

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    dead_code,
    reason = "Shared test helpers; not every test binary uses every helper."
)]

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

use ntropy_mcp_client::ClientConfig;
use ntropy_mcp_client::NtropyClient;
use ntropy_mcp_client::RetryPolicy;
use tiny_http::Header;
use tiny_http::Response;
use tiny_http::Server;

/// API key every test client sends.
pub const TEST_API_KEY: &str = "test-key-123";

/// One request as seen by the mock.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// HTTP method, uppercase.
    pub method: String,
    /// Path and query string.
    pub url: String,
    /// `X-API-Key` header value.
    pub api_key: Option<String>,
    /// `Content-Type` header value.
    pub content_type: Option<String>,
    /// Raw request body.
    pub body: String,
}

impl RecordedRequest {
    /// Parses the body as JSON.
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

/// Scripted reply.
#[derive(Debug, Clone)]
pub struct Reply {
    /// Status code.
    pub status: u16,
    /// Response body.
    pub body: String,
    /// Extra headers.
    pub headers: Vec<(String, String)>,
    /// Delay before responding.
    pub delay: Option<Duration>,
}

impl Reply {
    /// JSON reply with the given status.
    pub fn json(status: u16, body: &serde_json::Value) -> Self {
        Self { status, body: body.to_string(), headers: Vec::new(), delay: None }
    }

    /// Raw text reply with the given status.
    pub fn text(status: u16, body: &str) -> Self {
        Self { status, body: body.to_string(), headers: Vec::new(), delay: None }
    }

    /// Adds a response header.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Delays the reply.
    pub const fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

/// Local HTTP server standing in for the remote API.
pub struct MockRemote {
    /// Shared server handle, unblocked on drop.
    server: Arc<Server>,
    /// Base URL clients should target.
    pub base_url: String,
    /// Requests received so far.
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockRemote {
    /// Starts a mock whose replies are computed from each request.
    pub fn start<F>(handler: F) -> Self
    where
        F: Fn(&RecordedRequest) -> Reply + Send + 'static,
    {
        let server = Arc::new(Server::http("127.0.0.1:0").unwrap());
        let addr = server.server_addr().to_ip().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let worker_server = Arc::clone(&server);
        let worker_requests = Arc::clone(&requests);
        thread::spawn(move || {
            for mut request in worker_server.incoming_requests() {
                let mut body = String::new();
                let _ = request.as_reader().read_to_string(&mut body);
                let header = |name: &'static str| {
                    request
                        .headers()
                        .iter()
                        .find(|header| header.field.equiv(name))
                        .map(|header| header.value.as_str().to_string())
                };
                let recorded = RecordedRequest {
                    method: request.method().as_str().to_uppercase(),
                    url: request.url().to_string(),
                    api_key: header("X-API-Key"),
                    content_type: header("Content-Type"),
                    body,
                };
                let reply = handler(&recorded);
                worker_requests.lock().unwrap().push(recorded);
                if let Some(delay) = reply.delay {
                    thread::sleep(delay);
                }
                let mut response = Response::from_string(reply.body).with_status_code(reply.status);
                for (name, value) in &reply.headers {
                    response.add_header(
                        Header::from_bytes(name.as_bytes(), value.as_bytes()).unwrap(),
                    );
                }
                let _ = request.respond(response);
            }
        });
        Self { server, base_url: format!("http://{addr}"), requests }
    }

    /// Starts a mock that serves `replies` in order, repeating the last one.
    pub fn scripted(replies: Vec<Reply>) -> Self {
        let next = AtomicUsize::new(0);
        Self::start(move |_| {
            let index = next.fetch_add(1, Ordering::SeqCst).min(replies.len() - 1);
            replies[index].clone()
        })
    }

    /// Returns a copy of the recorded requests.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of requests received.
    pub fn hits(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl Drop for MockRemote {
    fn drop(&mut self) {
        self.server.unblock();
    }
}

/// Retry policy with short delays for tests.
pub const fn fast_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        initial_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(5),
    }
}

/// Client config targeting `base_url` with fast retries.
pub fn test_config(base_url: &str) -> ClientConfig {
    ClientConfig::new(base_url, TEST_API_KEY)
        .unwrap()
        .with_timeout(Duration::from_secs(5))
        .with_retry(fast_retry(3))
}

/// Client targeting the mock with fast retries.
pub fn client_for(remote: &MockRemote) -> NtropyClient {
    NtropyClient::new(test_config(&remote.base_url)).unwrap()
}
