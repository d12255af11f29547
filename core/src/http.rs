//! HTTP client abstraction
//!
//! Resources never talk to the network directly. They build an
//! [`HttpRequest`] and hand it to an [`HttpClient`]; [`ReqwestClient`] is the
//! default implementation. Tests substitute a mock client.

use crate::context::BoxFuture;
use crate::error::HttpError;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Maximum response size (50MB)
const MAX_RESPONSE_SIZE: usize = 50 * 1024 * 1024;

/// Header name → value
pub type HeaderMap = BTreeMap<String, String>;

/// Supported HTTP methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    /// GET
    #[default]
    Get,
    /// DELETE
    Delete,
    /// HEAD
    Head,
    /// OPTIONS
    Options,
    /// POST
    Post,
    /// PUT
    Put,
    /// PATCH
    Patch,
}

impl HttpMethod {
    /// Every supported method
    pub const ALL: [Self; 7] = [
        Self::Get,
        Self::Delete,
        Self::Head,
        Self::Options,
        Self::Post,
        Self::Put,
        Self::Patch,
    ];

    /// Lower-case method name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Delete => "delete",
            Self::Head => "head",
            Self::Options => "options",
            Self::Post => "post",
            Self::Put => "put",
            Self::Patch => "patch",
        }
    }

    /// Comma separated list of supported methods
    #[must_use]
    pub fn allowed() -> String {
        Self::ALL
            .iter()
            .map(|method| method.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn to_reqwest(self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Delete => reqwest::Method::DELETE,
            Self::Head => reqwest::Method::HEAD,
            Self::Options => reqwest::Method::OPTIONS,
            Self::Post => reqwest::Method::POST,
            Self::Put => reqwest::Method::PUT,
            Self::Patch => reqwest::Method::PATCH,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unsupported method name
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unsupported HTTP method: {0}")]
pub struct ParseMethodError(pub String);

impl FromStr for HttpMethod {
    type Err = ParseMethodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|method| method.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseMethodError(s.to_string()))
    }
}

impl From<HttpMethod> for String {
    fn from(method: HttpMethod) -> Self {
        method.as_str().to_string()
    }
}

/// A fully resolved request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HttpRequest {
    /// HTTP method
    pub method: HttpMethod,
    /// Base URL prepended to `url` unless `url` is absolute
    pub base_url: Option<String>,
    /// Request path or absolute URL
    pub url: String,
    /// Query parameters
    pub params: Option<Map<String, Value>>,
    /// JSON body
    pub data: Option<Value>,
    /// Request headers
    pub headers: HeaderMap,
    /// Per-request timeout
    #[serde(skip)]
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    /// Create a request for `url` with no parameters, body or headers
    #[must_use]
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            base_url: None,
            url: url.into(),
            params: None,
            data: None,
            headers: HeaderMap::new(),
            timeout: None,
        }
    }

    /// The URL the request is sent to
    ///
    /// Absolute URLs (`scheme://` or protocol relative `//`) are used as is,
    /// otherwise the base URL and the path are joined with a single slash.
    #[must_use]
    pub fn full_url(&self) -> String {
        match self.base_url.as_deref() {
            Some(base) if !base.is_empty() && !is_absolute_url(&self.url) => {
                if self.url.is_empty() {
                    base.to_string()
                } else {
                    format!(
                        "{}/{}",
                        base.trim_end_matches('/'),
                        self.url.trim_start_matches('/')
                    )
                }
            },
            _ => self.url.clone(),
        }
    }

    /// Query parameters flattened into string pairs
    ///
    /// Null values are skipped, arrays repeat the key as `key[]`.
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        for (key, value) in self.params.iter().flatten() {
            match value {
                Value::Null => {},
                Value::Array(items) => {
                    let key = format!("{key}[]");
                    pairs.extend(
                        items
                            .iter()
                            .filter(|item| !item.is_null())
                            .map(|item| (key.clone(), query_value(item))),
                    );
                },
                other => pairs.push((key.clone(), query_value(other))),
            }
        }
        pairs
    }
}

fn is_absolute_url(url: &str) -> bool {
    if url.starts_with("//") {
        return true;
    }
    url.split_once("://").is_some_and(|(scheme, _)| {
        let mut chars = scheme.chars();
        chars.next().is_some_and(|c| c.is_ascii_alphabetic())
            && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    })
}

fn query_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// A received response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers
    #[serde(default)]
    pub headers: HeaderMap,
    /// Response body (parsed JSON, or the raw text if it is not JSON)
    pub data: Value,
}

impl HttpResponse {
    /// Create a response with no headers
    #[must_use]
    pub const fn new(status: u16, data: Value) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            data,
        }
    }

    /// Add a header
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// Promise-style HTTP client used by resources
///
/// This trait uses explicit `Pin<Box<dyn Future>>` returns so it can be held
/// as `Arc<dyn HttpClient>`.
pub trait HttpClient: Send + Sync {
    /// Base URL used when neither the request config nor the resource set one
    fn default_base_url(&self) -> Option<&str> {
        None
    }

    /// Send the request
    ///
    /// Non-success status codes are *not* errors: the response is returned
    /// and the resource's validator decides.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError`] when the request could not be built, sent or
    /// read.
    fn request(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse, HttpError>>;
}

/// [`HttpClient`] backed by `reqwest`
#[derive(Debug, Clone, Default)]
pub struct ReqwestClient {
    client: reqwest::Client,
    base_url: Option<String>,
}

impl ReqwestClient {
    /// Create a client with no default base URL
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing `reqwest::Client`
    #[must_use]
    pub const fn from_client(client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: None,
        }
    }

    /// Set the client-wide default base URL
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        let url = request.full_url();
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(HttpError::InvalidRequest(format!(
                "URL must start with http:// or https://, got \"{url}\""
            )));
        }

        let mut builder = self.client.request(request.method.to_reqwest(), &url);
        let query = request.query_pairs();
        if !query.is_empty() {
            builder = builder.query(&query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(data) = &request.data {
            builder = builder.json(data);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| HttpError::RequestFailed(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(k, v)| {
                (
                    k.as_str().to_string(),
                    v.to_str().unwrap_or("<invalid>").to_string(),
                )
            })
            .collect();

        let mut body = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| HttpError::ResponseReadFailed(e.to_string()))?;
            if body.len() + chunk.len() > MAX_RESPONSE_SIZE {
                return Err(HttpError::ResponseReadFailed(format!(
                    "response too large (>{MAX_RESPONSE_SIZE} bytes)"
                )));
            }
            body.extend_from_slice(&chunk);
        }

        Ok(HttpResponse {
            status,
            headers,
            data: parse_body(&body),
        })
    }
}

impl HttpClient for ReqwestClient {
    fn default_base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    fn request(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse, HttpError>> {
        Box::pin(self.send(request))
    }
}

/// Empty bodies become null, JSON is parsed, anything else is kept as text
fn parse_body(body: &[u8]) -> Value {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Value::Null;
    }
    serde_json::from_slice(body)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(body).into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn method_parsing_is_case_insensitive() {
        assert_eq!("POST".parse::<HttpMethod>(), Ok(HttpMethod::Post));
        assert_eq!("patch".parse::<HttpMethod>(), Ok(HttpMethod::Patch));
        assert_eq!(
            "trace".parse::<HttpMethod>(),
            Err(ParseMethodError("trace".to_string()))
        );
    }

    #[test]
    fn full_url_joins_base_and_path() {
        let mut request = HttpRequest::new(HttpMethod::Get, "/users/1");
        request.base_url = Some("https://api.example.com/v1/".to_string());
        assert_eq!(request.full_url(), "https://api.example.com/v1/users/1");
    }

    #[test]
    fn full_url_keeps_absolute_urls() {
        let mut request = HttpRequest::new(HttpMethod::Get, "https://other.example.com/x");
        request.base_url = Some("https://api.example.com".to_string());
        assert_eq!(request.full_url(), "https://other.example.com/x");
    }

    #[test]
    fn query_pairs_skip_null_and_expand_arrays() {
        let mut request = HttpRequest::new(HttpMethod::Get, "/search");
        request.params = json!({"q": "rust", "page": 2, "tag": ["a", "b"], "skip": null})
            .as_object()
            .cloned();
        assert_eq!(
            request.query_pairs(),
            vec![
                ("page".to_string(), "2".to_string()),
                ("q".to_string(), "rust".to_string()),
                ("tag[]".to_string(), "a".to_string()),
                ("tag[]".to_string(), "b".to_string()),
            ]
        );
    }

    #[test]
    fn body_parsing() {
        assert_eq!(parse_body(b""), Value::Null);
        assert_eq!(parse_body(br#"{"a":1}"#), json!({"a": 1}));
        assert_eq!(parse_body(b"plain text"), json!("plain text"));
    }

    #[tokio::test]
    async fn reqwest_client_rejects_relative_urls() {
        let client = ReqwestClient::new();
        let result = client
            .request(HttpRequest::new(HttpMethod::Get, "/relative"))
            .await;
        assert!(matches!(result, Err(HttpError::InvalidRequest(_))));
    }
}
