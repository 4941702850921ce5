//! GitLab Authentication
//!
//! Handles the token types GitLab accepts: personal/project/group access
//! tokens sent as `PRIVATE-TOKEN`, and OAuth tokens sent as a bearer token.

use reqwest::RequestBuilder;
use std::fmt;

/// Environment variables checked for a token, in order
const TOKEN_ENV_VARS: &[&str] = &["GITLAB_TOKEN", "GITLAB_PRIVATE_TOKEN"];

/// Environment variable for an OAuth token
const OAUTH_TOKEN_ENV_VAR: &str = "GITLAB_OAUTH_TOKEN";

/// How requests are authenticated
#[derive(Clone, Default, PartialEq, Eq)]
pub enum Credentials {
    /// Personal, project or group access token
    PrivateToken(String),
    /// OAuth2 access token
    OAuthToken(String),
    #[default]
    Anonymous,
}

impl Credentials {
    /// Build credentials from an explicit token, falling back to the environment
    pub fn resolve(token: Option<&str>, oauth: bool) -> Self {
        if let Some(token) = token.map(str::trim).filter(|t| !t.is_empty()) {
            return if oauth {
                Credentials::OAuthToken(token.to_string())
            } else {
                Credentials::PrivateToken(token.to_string())
            };
        }
        Self::from_env()
    }

    /// Read credentials from `GITLAB_TOKEN`, `GITLAB_PRIVATE_TOKEN` or `GITLAB_OAUTH_TOKEN`
    pub fn from_env() -> Self {
        for var in TOKEN_ENV_VARS {
            if let Some(token) = read_token_var(var) {
                tracing::debug!("Using access token from {}", var);
                return Credentials::PrivateToken(token);
            }
        }
        if let Some(token) = read_token_var(OAUTH_TOKEN_ENV_VAR) {
            tracing::debug!("Using OAuth token from {}", OAUTH_TOKEN_ENV_VAR);
            return Credentials::OAuthToken(token);
        }
        tracing::warn!("No GitLab token found, requests will be anonymous");
        Credentials::Anonymous
    }

    /// Attach the matching auth header to a request
    pub fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Credentials::PrivateToken(token) => request.header("PRIVATE-TOKEN", token),
            Credentials::OAuthToken(token) => request.bearer_auth(token),
            Credentials::Anonymous => request,
        }
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Credentials::Anonymous)
    }
}

fn read_token_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Tokens are never printed
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::PrivateToken(_) => f.write_str("PrivateToken(***)"),
            Credentials::OAuthToken(_) => f.write_str("OAuthToken(***)"),
            Credentials::Anonymous => f.write_str("Anonymous"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_token_wins() {
        assert_eq!(
            Credentials::resolve(Some("glpat-abc"), false),
            Credentials::PrivateToken("glpat-abc".to_string())
        );
        assert_eq!(
            Credentials::resolve(Some(" oauth "), true),
            Credentials::OAuthToken("oauth".to_string())
        );
    }

    #[test]
    fn test_debug_redacts_token() {
        let creds = Credentials::PrivateToken("glpat-secret".to_string());
        let printed = format!("{:?}", creds);
        assert!(!printed.contains("secret"));
        assert_eq!(printed, "PrivateToken(***)");
    }

    #[test]
    fn test_apply_private_token_header() {
        let client = reqwest::Client::new();
        let request = Credentials::PrivateToken("glpat-abc".to_string())
            .apply(client.get("http://localhost/api/v4/groups"))
            .build()
            .unwrap();
        assert_eq!(request.headers()["PRIVATE-TOKEN"], "glpat-abc");
        assert!(request.headers().get("authorization").is_none());
    }

    #[test]
    fn test_apply_oauth_header() {
        let client = reqwest::Client::new();
        let request = Credentials::OAuthToken("tok".to_string())
            .apply(client.get("http://localhost/api/v4/groups"))
            .build()
            .unwrap();
        assert_eq!(request.headers()["authorization"], "Bearer tok");
    }

    #[test]
    fn test_anonymous_adds_nothing() {
        let client = reqwest::Client::new();
        let request = Credentials::Anonymous
            .apply(client.get("http://localhost/api/v4/groups"))
            .build()
            .unwrap();
        assert!(request.headers().get("private-token").is_none());
        assert!(request.headers().get("authorization").is_none());
        assert!(Credentials::default().is_anonymous());
    }
}
