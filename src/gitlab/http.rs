//! HTTP utilities for GitLab REST API calls

use super::error::{ApiError, Result};
use reqwest::header::HeaderMap;
use reqwest::{Client, Request, StatusCode};
use serde_json::Value;
use std::time::Duration;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// User agent for API requests
const USER_AGENT: &str = concat!("glclusters/", env!("CARGO_PKG_VERSION"));

/// Sanitize response body for logging
/// Truncates long responses and strips control characters
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let mut end = MAX_LOG_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... [truncated, {} bytes total]", &body[..end], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// Status, headers and raw body of a completed round trip.
///
/// Returned alongside every decoded value and carried by every HTTP error so
/// callers can always inspect what the server answered.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl ApiResponse {
    fn header_number(&self, name: &str) -> Option<u32> {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok())
    }

    /// Page number announced in `X-Next-Page`, if there is one
    pub fn next_page(&self) -> Option<u32> {
        self.header_number("x-next-page")
    }

    /// Total item count from `X-Total`
    pub fn total(&self) -> Option<u32> {
        self.header_number("x-total")
    }

    /// Total page count from `X-Total-Pages`
    pub fn total_pages(&self) -> Option<u32> {
        self.header_number("x-total-pages")
    }

    /// Decode the body as JSON into `T`
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.body).map_err(|source| ApiError::Decode {
            response: Box::new(self.clone()),
            source,
        })
    }
}

/// Extract a human readable message from a GitLab error body.
///
/// GitLab answers with `{"message": ...}` or `{"error": ...}` where `message`
/// may be a string, a list, or a map of field name to a list of problems.
pub fn error_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return body.trim().to_string();
    };

    let field = value.get("message").or_else(|| value.get("error"));
    match field {
        Some(v) => flatten_message(v),
        None => body.trim().to_string(),
    }
}

fn flatten_message(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(flatten_message)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(map) => {
            let mut parts: Vec<String> = map
                .iter()
                .map(|(key, v)| format!("{}: {}", key, flatten_message(v)))
                .collect();
            parts.sort();
            parts.join("; ")
        }
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// HTTP client wrapper for GitLab API calls
#[derive(Clone, Debug)]
pub struct GitlabHttpClient {
    client: Client,
}

impl GitlabHttpClient {
    /// Create a new HTTP client with the given request timeout
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(ApiError::Transport)?;

        Ok(Self { client })
    }

    /// Underlying reqwest client, used to build requests
    pub(crate) fn inner(&self) -> &Client {
        &self.client
    }

    /// Execute a request and classify the outcome by status code.
    ///
    /// Success statuses yield the response; anything else becomes the matching
    /// [`ApiError`] variant with the response attached.
    pub async fn send(&self, request: Request) -> Result<ApiResponse> {
        tracing::debug!("{} {}", request.method(), request.url());

        let response = self.client.execute(request).await?;

        let status = response.status();
        let mut captured = ApiResponse {
            status,
            headers: response.headers().clone(),
            body: String::new(),
        };

        captured.body = match response.text().await {
            Ok(body) => body,
            Err(source) => {
                tracing::error!("Reading {} response body failed: {}", status, source);
                return Err(ApiError::Body {
                    response: Box::new(captured),
                    source,
                });
            }
        };
        let response = captured;

        if !status.is_success() {
            // Only log sanitized/truncated error body
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&response.body));
            return Err(ApiError::from_response(response));
        }

        tracing::debug!("{} ({} bytes)", status, response.body.len());
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn response_with_headers(pairs: &[(&'static str, &'static str)]) -> ApiResponse {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            headers.insert(*name, HeaderValue::from_static(value));
        }
        ApiResponse {
            status: StatusCode::OK,
            headers,
            body: String::new(),
        }
    }

    #[test]
    fn test_pagination_headers() {
        let response = response_with_headers(&[
            ("x-next-page", "3"),
            ("x-total", "42"),
            ("x-total-pages", "5"),
        ]);
        assert_eq!(response.next_page(), Some(3));
        assert_eq!(response.total(), Some(42));
        assert_eq!(response.total_pages(), Some(5));
    }

    #[test]
    fn test_empty_next_page_header_means_last_page() {
        let response = response_with_headers(&[("x-next-page", "")]);
        assert_eq!(response.next_page(), None);
    }

    #[test]
    fn test_error_message_string() {
        assert_eq!(error_message(r#"{"message":"404 Not found"}"#), "404 Not found");
        assert_eq!(error_message(r#"{"error":"invalid_token"}"#), "invalid_token");
    }

    #[test]
    fn test_error_message_validation_map() {
        let body = r#"{"message":{"platform_kubernetes.api_url":["is blocked"],"name":["can't be blank"]}}"#;
        assert_eq!(
            error_message(body),
            "name: can't be blank; platform_kubernetes.api_url: is blocked"
        );
    }

    #[test]
    fn test_error_message_plain_text() {
        assert_eq!(error_message("Bad Gateway\n"), "Bad Gateway");
    }

    #[test]
    fn test_sanitize_truncates() {
        let long = "a".repeat(500);
        let sanitized = sanitize_for_log(&long);
        assert!(sanitized.contains("[truncated, 500 bytes total]"));
        assert!(sanitized.len() < 300);
    }

    #[test]
    fn test_user_agent() {
        assert!(USER_AGENT.starts_with("glclusters/"));
    }
}
