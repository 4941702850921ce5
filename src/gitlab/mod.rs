//! GitLab API interaction module
//!
//! This module provides the core functionality for talking to the GitLab
//! REST API (`api/v4`): authentication, request building and dispatch, and
//! the group cluster endpoints.
//!
//! # Module Structure
//!
//! - [`auth`] - Access token handling
//! - [`client`] - Main GitLab client: base URL, request builder, dispatcher
//! - [`error`] - Error taxonomy shared by all endpoints
//! - [`group_clusters`] - Clusters attached to a group
//! - [`http`] - HTTP transport and response capture
//! - [`id`] - Numeric or path group identifiers
//!
//! # Example
//!
//! ```ignore
//! use glclusters::gitlab::{Credentials, GitlabClient, ListOptions};
//!
//! async fn example() -> glclusters::gitlab::Result<()> {
//!     let client = GitlabClient::new("https://gitlab.example.com", Credentials::from_env())?;
//!     let (clusters, _response) = client
//!         .group_clusters()
//!         .list_clusters("my-org/platform", &ListOptions::default())
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod error;
pub mod group_clusters;
pub mod http;
pub mod id;

pub use auth::Credentials;
pub use client::GitlabClient;
pub use error::{format_api_error, ApiError, Result};
pub use group_clusters::{
    AddGroupClusterOptions, AddPlatformKubernetesOptions, AuthorizationType, ClusterType,
    EditGroupClusterOptions, EditPlatformKubernetesOptions, GroupCluster, GroupClusters, GroupRef,
    ListOptions, PlatformKubernetes, PlatformType, ProviderType, User,
};
pub use http::ApiResponse;
pub use id::GroupId;
