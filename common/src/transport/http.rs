// reqwest-backed transport with a per-call timeout

use async_trait::async_trait;
use reqwest::{Client, Method};
use std::time::Duration;

use super::{HttpMethod, RequestBody, Transport, TransportError, TransportRequest, TransportResponse};

/// HttpTransport sends requests through a shared reqwest connection pool
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    timeout_seconds: u64,
}

impl HttpTransport {
    /// Create a new HttpTransport with the specified timeout
    pub fn new(timeout_seconds: u64) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| {
                TransportError::Request(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            timeout_seconds,
        })
    }

    /// Reuse an existing client; the timeout is applied per request
    pub fn with_client(client: Client, timeout_seconds: u64) -> Self {
        Self {
            client,
            timeout_seconds,
        }
    }

    fn convert_method(method: HttpMethod) -> Method {
        match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Delete => Method::DELETE,
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[tracing::instrument(skip(self, request), fields(method = %request.method, url = %request.url))]
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let mut builder = self
            .client
            .request(Self::convert_method(request.method), &request.url)
            .timeout(Duration::from_secs(self.timeout_seconds));

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }

        for (key, value) in &request.headers {
            builder = builder.header(key, value);
        }

        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(body) => builder.json(&body),
            RequestBody::Bytes { data, content_type } => {
                tracing::debug!("Adding request body ({} bytes)", data.len());
                builder
                    .header(reqwest::header::CONTENT_TYPE, content_type)
                    .body(data)
            }
        };

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout(self.timeout_seconds)
            } else {
                TransportError::Request(e.to_string())
            }
        })?;

        let status = response.status();
        tracing::debug!("HTTP response status: {}", status);

        let text = response.text().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout(self.timeout_seconds)
            } else {
                TransportError::Request(format!("Failed to read response body: {}", e))
            }
        })?;

        Ok(TransportResponse {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            text,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_convert_method() {
        assert_eq!(HttpTransport::convert_method(HttpMethod::Get), Method::GET);
        assert_eq!(HttpTransport::convert_method(HttpMethod::Post), Method::POST);
        assert_eq!(
            HttpTransport::convert_method(HttpMethod::Delete),
            Method::DELETE
        );
    }

    #[tokio::test]
    async fn test_sends_query_headers_and_json() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/things"))
            .and(query_param("orderBy", "createTime desc"))
            .and(header("Authorization", "Bearer abc"))
            .and(body_json(json!({"name": "x"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&mock_server)
            .await;

        let transport = HttpTransport::new(5).unwrap();
        let response = transport
            .send(
                TransportRequest::post(format!("{}/v1/things", mock_server.uri()))
                    .query("orderBy", "createTime desc")
                    .header("Authorization", "Bearer abc")
                    .json(json!({"name": "x"})),
            )
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.reason, "OK");
        assert_eq!(response.json().unwrap(), json!({"ok": true}));
    }

    #[tokio::test]
    async fn test_non_success_status_is_not_a_transport_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(404).set_body_string("missing"))
            .mount(&mock_server)
            .await;

        let transport = HttpTransport::new(5).unwrap();
        let response = transport
            .send(TransportRequest::delete(format!("{}/gone", mock_server.uri())))
            .await
            .unwrap();

        assert_eq!(response.status, 404);
        assert_eq!(response.reason, "Not Found");
        assert_eq!(response.text, "missing");
    }

    #[tokio::test]
    async fn test_slow_response_times_out() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&mock_server)
            .await;

        let transport = HttpTransport::new(1).unwrap();
        let err = transport
            .send(TransportRequest::get(format!("{}/slow", mock_server.uri())))
            .await
            .unwrap_err();

        assert_eq!(err, TransportError::Timeout(1));
    }
}
