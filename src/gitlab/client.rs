//! GitLab Client
//!
//! Main client for interacting with the GitLab API, combining credentials,
//! the base URL and HTTP functionality.

use super::auth::Credentials;
use super::error::Result;
use super::group_clusters::GroupClusters;
use super::http::{ApiResponse, GitlabHttpClient};
use reqwest::{Method, Request};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use url::Url;

/// API prefix appended to the configured instance URL
const API_VERSION_PATH: &str = "api/v4/";

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Main GitLab client
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Clone, Debug)]
pub struct GitlabClient {
    base_url: Url,
    credentials: Credentials,
    http: GitlabHttpClient,
}

impl GitlabClient {
    /// Create a new client for the given instance URL
    pub fn new(base_url: &str, credentials: Credentials) -> Result<Self> {
        Self::with_timeout(base_url, credentials, DEFAULT_TIMEOUT)
    }

    /// Create a new client with a custom request timeout
    pub fn with_timeout(base_url: &str, credentials: Credentials, timeout: Duration) -> Result<Self> {
        let base_url = normalize_base_url(base_url)?;
        let http = GitlabHttpClient::new(timeout)?;

        tracing::debug!("GitLab API base URL: {}", base_url);

        Ok(Self {
            base_url,
            credentials,
            http,
        })
    }

    /// The API base URL, always ending in `api/v4/`
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build the absolute URL of an API path such as `groups/26/clusters`
    pub fn api_url(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    /// Cluster endpoints of groups
    pub fn group_clusters(&self) -> GroupClusters {
        GroupClusters::new(self.clone())
    }

    /// Build a request against the API.
    ///
    /// `query` is encoded as URL parameters and `body` as a JSON payload; either
    /// may be `None`.
    pub fn new_request<Q, B>(
        &self,
        method: Method,
        path: &str,
        query: Option<&Q>,
        body: Option<&B>,
    ) -> Result<Request>
    where
        Q: Serialize + ?Sized,
        B: Serialize + ?Sized,
    {
        let url = self.api_url(path)?;

        let mut request = self.http.inner().request(method, url);
        request = self.credentials.apply(request);

        if let Some(query) = query {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        Ok(request.build()?)
    }

    /// Execute a request and decode the JSON body into `T`
    pub async fn execute<T: DeserializeOwned>(&self, request: Request) -> Result<(T, ApiResponse)> {
        let response = self.http.send(request).await?;
        let value = response.json()?;
        Ok((value, response))
    }

    /// Execute a request whose body carries nothing of interest
    pub async fn execute_empty(&self, request: Request) -> Result<ApiResponse> {
        self.http.send(request).await
    }
}

/// Turn an instance URL into the API base URL.
///
/// `https://gitlab.example.com` and `https://gitlab.example.com/api/v4` both
/// become `https://gitlab.example.com/api/v4/`.
fn normalize_base_url(base_url: &str) -> Result<Url> {
    let trimmed = base_url.trim().trim_end_matches('/');
    let raw = if trimmed.ends_with(API_VERSION_PATH.trim_end_matches('/')) {
        format!("{}/", trimmed)
    } else {
        format!("{}/{}", trimmed, API_VERSION_PATH)
    };
    Ok(Url::parse(&raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> GitlabClient {
        GitlabClient::new(base, Credentials::Anonymous).unwrap()
    }

    #[test]
    fn test_base_url_gets_api_suffix() {
        assert_eq!(
            client("https://gitlab.example.com").base_url().as_str(),
            "https://gitlab.example.com/api/v4/"
        );
        assert_eq!(
            client("https://gitlab.example.com/").base_url().as_str(),
            "https://gitlab.example.com/api/v4/"
        );
    }

    #[test]
    fn test_base_url_keeps_existing_suffix() {
        assert_eq!(
            client("https://gitlab.example.com/api/v4").base_url().as_str(),
            "https://gitlab.example.com/api/v4/"
        );
        assert_eq!(
            client("https://example.com/gitlab/api/v4/").base_url().as_str(),
            "https://example.com/gitlab/api/v4/"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(GitlabClient::new("not a url", Credentials::Anonymous).is_err());
    }

    #[test]
    fn test_api_url_keeps_escaped_segments() {
        let c = client("https://gitlab.example.com");
        assert_eq!(
            c.api_url("groups/my-org%2Finfra/clusters").unwrap().as_str(),
            "https://gitlab.example.com/api/v4/groups/my-org%2Finfra/clusters"
        );
        assert_eq!(
            c.api_url("/groups/1/clusters").unwrap().path(),
            "/api/v4/groups/1/clusters"
        );
    }

    #[test]
    fn test_new_request_with_query_and_body() {
        let c = client("https://gitlab.example.com");
        let request = c
            .new_request(
                Method::PUT,
                "groups/1/clusters/2",
                Some(&[("page", "2")]),
                Some(&serde_json::json!({"name": "x"})),
            )
            .unwrap();
        assert_eq!(request.method(), &Method::PUT);
        assert_eq!(request.url().query(), Some("page=2"));
        assert_eq!(request.headers()["content-type"], "application/json");
        let body = request.body().and_then(|b| b.as_bytes()).unwrap();
        assert_eq!(body, br#"{"name":"x"}"#);
    }
}
