//! Scripted HTTP client
//!
//! [`MockHttpClient`] answers requests from a table of routes keyed by
//! method and path, and records every request it receives.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Panics only on poisoned locks

use rest_store_core::context::BoxFuture;
use rest_store_core::error::HttpError;
use rest_store_core::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// What a route answers with
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Resolve with this response
    Respond(HttpResponse),
    /// Fail with this transport error
    Fail(HttpError),
    /// Never settle
    Hang,
}

#[derive(Debug)]
struct Route {
    method: HttpMethod,
    url: String,
    replies: VecDeque<MockReply>,
}

#[derive(Debug, Default)]
struct MockState {
    routes: Vec<Route>,
    requests: Vec<HttpRequest>,
}

/// HTTP client answering from scripted routes
///
/// Routes match on method and the request's `url` (the path as resolved by
/// the resource, without the base URL). Scripting the same route several
/// times queues the replies; the last one repeats.
///
/// # Example
///
/// ```
/// use rest_store_testing::MockHttpClient;
/// use rest_store_core::http::HttpMethod;
/// use serde_json::json;
///
/// let client = MockHttpClient::new()
///     .respond(HttpMethod::Get, "/users", 200, json!([{"id": 1}]))
///     .fail(HttpMethod::Post, "/users", "connection reset");
/// assert_eq!(client.request_count(), 0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockHttpClient {
    state: Arc<Mutex<MockState>>,
    base_url: Option<String>,
}

impl MockHttpClient {
    /// Create a client with no routes
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the client default base URL
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Script a reply for `method url`
    #[must_use]
    pub fn on(self, method: HttpMethod, url: impl Into<String>, reply: MockReply) -> Self {
        let url = url.into();
        {
            let mut state = self.state.lock().unwrap();
            match state
                .routes
                .iter_mut()
                .find(|route| route.method == method && route.url == url)
            {
                Some(route) => route.replies.push_back(reply),
                None => state.routes.push(Route {
                    method,
                    url,
                    replies: VecDeque::from([reply]),
                }),
            }
        }
        self
    }

    /// Script a response
    #[must_use]
    pub fn respond(self, method: HttpMethod, url: impl Into<String>, status: u16, data: Value) -> Self {
        self.on(method, url, MockReply::Respond(HttpResponse::new(status, data)))
    }

    /// Script a transport failure
    #[must_use]
    pub fn fail(self, method: HttpMethod, url: impl Into<String>, message: impl Into<String>) -> Self {
        self.on(
            method,
            url,
            MockReply::Fail(HttpError::RequestFailed(message.into())),
        )
    }

    /// Script a request that never settles
    #[must_use]
    pub fn hang(self, method: HttpMethod, url: impl Into<String>) -> Self {
        self.on(method, url, MockReply::Hang)
    }

    /// Every request received so far
    #[must_use]
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    /// Number of requests received so far
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.state.lock().unwrap().requests.len()
    }

    /// The most recent request
    #[must_use]
    pub fn last_request(&self) -> Option<HttpRequest> {
        self.state.lock().unwrap().requests.last().cloned()
    }

    fn reply_for(&self, request: HttpRequest) -> MockReply {
        let mut state = self.state.lock().unwrap();
        let reply = state
            .routes
            .iter_mut()
            .find(|route| route.method == request.method && route.url == request.url)
            .and_then(|route| {
                if route.replies.len() > 1 {
                    route.replies.pop_front()
                } else {
                    route.replies.front().cloned()
                }
            })
            .unwrap_or_else(|| {
                MockReply::Fail(HttpError::RequestFailed(format!(
                    "no mock response for {} {}",
                    request.method, request.url
                )))
            });
        state.requests.push(request);
        reply
    }
}

impl HttpClient for MockHttpClient {
    fn default_base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    fn request(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse, HttpError>> {
        let reply = self.reply_for(request);
        Box::pin(async move {
            match reply {
                MockReply::Respond(response) => Ok(response),
                MockReply::Fail(error) => Err(error),
                MockReply::Hang => futures::future::pending().await,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn replies_queue_then_repeat() {
        let client = MockHttpClient::new()
            .respond(HttpMethod::Get, "/n", 200, json!(1))
            .respond(HttpMethod::Get, "/n", 200, json!(2));

        let mut seen = Vec::new();
        for _ in 0..3 {
            let response = client
                .request(HttpRequest::new(HttpMethod::Get, "/n"))
                .await
                .unwrap();
            seen.push(response.data);
        }
        assert_eq!(seen, vec![json!(1), json!(2), json!(2)]);
        assert_eq!(client.request_count(), 3);
    }

    #[tokio::test]
    async fn unknown_route_fails() {
        let client = MockHttpClient::new();
        let result = client
            .request(HttpRequest::new(HttpMethod::Delete, "/missing"))
            .await;
        assert!(matches!(result, Err(HttpError::RequestFailed(_))));
        assert_eq!(
            client.last_request().map(|r| r.url),
            Some("/missing".to_string())
        );
    }
}
