//! HTTP transport seam.
//!
//! `ReqwestTransport` talks to the real backend; `MockTransport` replays
//! scripted responses so the client, boards and CLI can be exercised
//! without a server.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use super::error::ApiError;
use crate::config::ApiConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

/// A request relative to the API base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    pub fn with_query(mut self, pairs: Vec<(String, String)>) -> Self {
        self.query = pairs;
        self
    }

    pub fn with_json<T: Serialize>(mut self, body: &T) -> Result<Self, ApiError> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends one request. Implementations must not log the bearer token.
pub trait HttpTransport: Send + Sync {
    fn send(&self, request: &ApiRequest, bearer: Option<&str>) -> Result<ApiResponse, ApiError>;
}

impl<T: HttpTransport + ?Sized> HttpTransport for std::sync::Arc<T> {
    fn send(&self, request: &ApiRequest, bearer: Option<&str>) -> Result<ApiResponse, ApiError> {
        (**self).send(request, bearer)
    }
}

// ═══════════════════════════════════════════
// reqwest
// ═══════════════════════════════════════════

pub struct ReqwestTransport {
    base_url: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl ReqwestTransport {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ApiError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: config.base_url.clone(),
            client,
            timeout_secs: config.timeout_secs,
        })
    }

    fn classify(&self, e: reqwest::Error) -> ApiError {
        if e.is_connect() {
            ApiError::Connection(self.base_url.clone())
        } else if e.is_timeout() {
            ApiError::Timeout(self.timeout_secs)
        } else {
            ApiError::HttpClient(e.to_string())
        }
    }
}

impl HttpTransport for ReqwestTransport {
    fn send(&self, request: &ApiRequest, bearer: Option<&str>) -> Result<ApiResponse, ApiError> {
        let url = format!("{}{}", self.base_url, request.path);
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, &url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        tracing::debug!(method = request.method.as_str(), path = %request.path, "Sending request");
        let response = builder.send().map_err(|e| self.classify(e))?;

        let status = response.status().as_u16();
        let body = response.text().map_err(|e| self.classify(e))?;
        Ok(ApiResponse { status, body })
    }
}

// ═══════════════════════════════════════════
// Mock
// ═══════════════════════════════════════════

enum Scripted {
    Reply(ApiResponse),
    Unreachable,
}

/// A request as the mock saw it.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub request: ApiRequest,
    pub had_bearer: bool,
}

/// Scripted transport for tests. Replies are queued per method + path and
/// consumed in order; an unscripted request gets a 404.
#[derive(Default)]
pub struct MockTransport {
    replies: Mutex<HashMap<(Method, String), VecDeque<Scripted>>>,
    seen: Mutex<Vec<RecordedRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, method: Method, path: &str, status: u16, body: Value) -> Self {
        self.push(
            method,
            path,
            Scripted::Reply(ApiResponse {
                status,
                body: body.to_string(),
            }),
        );
        self
    }

    /// Reply with a raw body, for malformed-payload cases.
    pub fn respond_raw(self, method: Method, path: &str, status: u16, body: &str) -> Self {
        self.push(
            method,
            path,
            Scripted::Reply(ApiResponse {
                status,
                body: body.to_string(),
            }),
        );
        self
    }

    /// Simulate a connection failure.
    pub fn unreachable(self, method: Method, path: &str) -> Self {
        self.push(method, path, Scripted::Unreachable);
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.seen.lock().map(|seen| seen.clone()).unwrap_or_default()
    }

    fn push(&self, method: Method, path: &str, reply: Scripted) {
        if let Ok(mut replies) = self.replies.lock() {
            replies
                .entry((method, path.to_string()))
                .or_default()
                .push_back(reply);
        }
    }
}

impl HttpTransport for MockTransport {
    fn send(&self, request: &ApiRequest, bearer: Option<&str>) -> Result<ApiResponse, ApiError> {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(RecordedRequest {
                request: request.clone(),
                had_bearer: bearer.is_some(),
            });
        }

        let next = self
            .replies
            .lock()
            .map_err(|_| ApiError::HttpClient("mock lock poisoned".into()))?
            .get_mut(&(request.method, request.path.clone()))
            .and_then(VecDeque::pop_front);

        match next {
            Some(Scripted::Reply(response)) => Ok(response),
            Some(Scripted::Unreachable) => Err(ApiError::Connection("mock".into())),
            None => Ok(ApiResponse {
                status: 404,
                body: serde_json::json!({
                    "success": false,
                    "message": format!("No mock for {} {}", request.method.as_str(), request.path),
                })
                .to_string(),
            }),
        }
    }
}
