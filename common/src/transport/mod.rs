// Transport module: the HTTP seam between clients and the remote APIs

pub mod http;

pub use http::HttpTransport;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// HTTP methods used against Vertex AI and Cloud Storage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Delete,
}

impl HttpMethod {
    /// GET is idempotent; everything else is decided by the caller
    pub fn is_safe(&self) -> bool {
        matches!(self, HttpMethod::Get)
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(Value),
    Bytes { data: Vec<u8>, content_type: String },
}

/// A fully described outbound request
#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
    pub method: HttpMethod,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
}

impl TransportRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, url)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    pub fn headers(mut self, headers: impl IntoIterator<Item = (String, String)>) -> Self {
        self.headers.extend(headers);
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    pub fn bytes(mut self, data: Vec<u8>, content_type: impl Into<String>) -> Self {
        self.body = RequestBody::Bytes {
            data,
            content_type: content_type.into(),
        };
        self
    }
}

/// Status line and raw body of a completed exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub reason: String,
    pub text: String,
}

impl TransportResponse {
    pub fn new(status: u16, reason: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            status,
            reason: reason.into(),
            text: text.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parsed JSON body; an empty body reads as `{}`
    pub fn json(&self) -> Result<Value, serde_json::Error> {
        if self.text.trim().is_empty() {
            return Ok(Value::Object(Default::default()));
        }
        serde_json::from_str(&self.text)
    }
}

/// Failures below the HTTP status level
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out after {0} seconds")]
    Timeout(u64),

    #[error("request failed: {0}")]
    Request(String),
}

/// HTTP client capable of GET/POST/DELETE with headers and JSON bodies
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_builder() {
        let request = TransportRequest::get("https://example.test/v1/schedules")
            .query("orderBy", "createTime desc")
            .header("Authorization", "Bearer t")
            .json(json!({"a": 1}));
        assert_eq!(request.method, HttpMethod::Get);
        assert_eq!(request.query.len(), 1);
        assert_eq!(request.headers[0].1, "Bearer t");
        assert_eq!(request.body, RequestBody::Json(json!({"a": 1})));
    }

    #[test]
    fn test_empty_response_body_reads_as_object() {
        let response = TransportResponse::new(200, "OK", "  ");
        assert_eq!(response.json().unwrap(), json!({}));
        assert!(response.is_success());
        assert!(!TransportResponse::new(404, "Not Found", "").is_success());
    }

    #[test]
    fn test_method_display() {
        assert_eq!(HttpMethod::Delete.to_string(), "DELETE");
        assert!(HttpMethod::Get.is_safe());
        assert!(!HttpMethod::Post.is_safe());
    }
}
