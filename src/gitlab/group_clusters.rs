//! Group Clusters
//!
//! Kubernetes clusters attached to a group: list, inspect, attach, edit and
//! detach.
//!
//! GitLab API docs: <https://docs.gitlab.com/ee/api/group_clusters.html>

use super::client::GitlabClient;
use super::error::{ApiError, Result};
use super::http::ApiResponse;
use super::id::GroupId;
use chrono::{DateTime, Utc};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};

/// Upper bound GitLab accepts for `per_page`
const MAX_PER_PAGE: u32 = 100;

/// Who provisioned the cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderType {
    /// Existing cluster attached by a user
    User,
    Gcp,
    Aws,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformType {
    Kubernetes,
    #[serde(other)]
    Unknown,
}

/// Level the cluster is attached at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterType {
    GroupType,
    ProjectType,
    InstanceType,
    #[serde(other)]
    Unknown,
}

/// Kubernetes authorization mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationType {
    Rbac,
    Abac,
    UnknownAuthorization,
    #[serde(other)]
    Unrecognized,
}

impl std::str::FromStr for AuthorizationType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "rbac" => Ok(AuthorizationType::Rbac),
            "abac" => Ok(AuthorizationType::Abac),
            "unknown_authorization" => Ok(AuthorizationType::UnknownAuthorization),
            other => Err(format!("unknown authorization type: {}", other)),
        }
    }
}

/// User who attached the cluster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub name: String,
    pub username: String,
    pub state: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    pub web_url: String,
}

/// Group owning the cluster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupRef {
    pub id: u64,
    pub name: String,
    pub web_url: String,
}

/// Connection details of the Kubernetes API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformKubernetes {
    pub api_url: String,
    /// Write-only, the server does not echo it back
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// PEM encoded certificate, `None` when not configured
    #[serde(default)]
    pub ca_cert: Option<String>,
    #[serde(default)]
    pub authorization_type: Option<AuthorizationType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

/// A cluster attached to a group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupCluster {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    pub provider_type: ProviderType,
    pub platform_type: PlatformType,
    pub environment_scope: String,
    pub cluster_type: ClusterType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub managed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub platform_kubernetes: Option<PlatformKubernetes>,
    /// Only present on single-cluster responses
    #[serde(default)]
    pub group: Option<GroupRef>,
}

impl GroupCluster {
    /// CA certificate of the Kubernetes connection, if one is configured
    pub fn ca_cert(&self) -> Option<&str> {
        self.platform_kubernetes
            .as_ref()
            .and_then(|p| p.ca_cert.as_deref())
            .filter(|c| !c.is_empty())
    }
}

/// Pagination parameters for listing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ListOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u32>,
}

impl ListOptions {
    pub fn page(page: u32) -> Self {
        Self {
            page: Some(page),
            ..Self::default()
        }
    }

    pub fn per_page(mut self, per_page: u32) -> Self {
        self.per_page = Some(per_page.clamp(1, MAX_PER_PAGE));
        self
    }
}

/// Kubernetes connection settings when attaching a cluster
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AddPlatformKubernetesOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorization_type: Option<AuthorizationType>,
}

/// Payload for [`GroupClusters::add_cluster`]. Unset fields are not sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AddGroupClusterOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub managed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment_scope: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform_kubernetes_attributes: Option<AddPlatformKubernetesOptions>,
}

impl AddGroupClusterOptions {
    /// Minimum settings to attach an existing cluster
    pub fn new(name: impl Into<String>, api_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            platform_kubernetes_attributes: Some(AddPlatformKubernetesOptions {
                api_url: Some(api_url.into()),
                token: Some(token.into()),
                ..AddPlatformKubernetesOptions::default()
            }),
            ..Self::default()
        }
    }

    fn platform(&mut self) -> &mut AddPlatformKubernetesOptions {
        self.platform_kubernetes_attributes
            .get_or_insert_with(AddPlatformKubernetesOptions::default)
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn environment_scope(mut self, scope: impl Into<String>) -> Self {
        self.environment_scope = Some(scope.into());
        self
    }

    pub fn ca_cert(mut self, pem: impl Into<String>) -> Self {
        self.platform().ca_cert = Some(pem.into());
        self
    }

    pub fn authorization_type(mut self, authorization: AuthorizationType) -> Self {
        self.platform().authorization_type = Some(authorization);
        self
    }
}

/// Kubernetes connection settings when editing a cluster.
///
/// The access token cannot be changed after attachment.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EditPlatformKubernetesOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
    /// `None` leaves the certificate alone, `Some(None)` sends `null` and clears it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<Option<String>>,
}

/// Payload for [`GroupClusters::edit_cluster`]. Unset fields keep their server-side value.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EditGroupClusterOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment_scope: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform_kubernetes_attributes: Option<EditPlatformKubernetesOptions>,
}

impl EditGroupClusterOptions {
    fn platform(&mut self) -> &mut EditPlatformKubernetesOptions {
        self.platform_kubernetes_attributes
            .get_or_insert_with(EditPlatformKubernetesOptions::default)
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn environment_scope(mut self, scope: impl Into<String>) -> Self {
        self.environment_scope = Some(scope.into());
        self
    }

    pub fn api_url(mut self, api_url: impl Into<String>) -> Self {
        self.platform().api_url = Some(api_url.into());
        self
    }

    pub fn ca_cert(mut self, pem: impl Into<String>) -> Self {
        self.platform().ca_cert = Some(Some(pem.into()));
        self
    }

    pub fn clear_ca_cert(mut self) -> Self {
        self.platform().ca_cert = Some(None);
        self
    }

    /// Whether anything would be sent
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Cluster endpoints of groups
#[derive(Clone, Debug)]
pub struct GroupClusters {
    client: GitlabClient,
}

impl GroupClusters {
    pub fn new(client: GitlabClient) -> Self {
        Self { client }
    }

    fn clusters_path(group: &GroupId) -> Result<String> {
        Ok(format!("groups/{}/clusters", group.to_path_segment()?))
    }

    fn cluster_path(group: &GroupId, cluster: u64) -> Result<String> {
        Ok(format!("{}/{}", Self::clusters_path(group)?, cluster))
    }

    /// List clusters of a group, in server order
    ///
    /// Endpoint: GET /groups/:id/clusters
    pub async fn list_clusters(
        &self,
        group: impl Into<GroupId>,
        options: &ListOptions,
    ) -> Result<(Vec<GroupCluster>, ApiResponse)> {
        let path = Self::clusters_path(&group.into())?;
        let request = self
            .client
            .new_request::<_, ()>(Method::GET, &path, Some(options), None)?;
        self.client.execute(request).await
    }

    /// List every cluster of a group, following `X-Next-Page`
    pub async fn list_all_clusters(&self, group: impl Into<GroupId>) -> Result<Vec<GroupCluster>> {
        let group = group.into();
        let mut all_clusters = Vec::new();
        let mut options = ListOptions::page(1).per_page(MAX_PER_PAGE);

        loop {
            let (clusters, response) = self.list_clusters(&group, &options).await?;
            all_clusters.extend(clusters);

            match response.next_page() {
                Some(next) if Some(next) > options.page => options.page = Some(next),
                _ => break,
            }
        }

        tracing::debug!("Listed {} clusters of group {}", all_clusters.len(), group);
        Ok(all_clusters)
    }

    /// Get a single cluster
    ///
    /// Endpoint: GET /groups/:id/clusters/:cluster_id
    pub async fn get_cluster(
        &self,
        group: impl Into<GroupId>,
        cluster: u64,
    ) -> Result<(GroupCluster, ApiResponse)> {
        let path = Self::cluster_path(&group.into(), cluster)?;
        let request = self
            .client
            .new_request::<(), ()>(Method::GET, &path, None, None)?;
        self.client.execute(request).await
    }

    /// Attach an existing Kubernetes cluster to a group
    ///
    /// Endpoint: POST /groups/:id/clusters/user
    pub async fn add_cluster(
        &self,
        group: impl Into<GroupId>,
        options: &AddGroupClusterOptions,
    ) -> Result<(GroupCluster, ApiResponse)> {
        let path = format!("{}/user", Self::clusters_path(&group.into())?);
        let request = self
            .client
            .new_request::<(), _>(Method::POST, &path, None, Some(options))?;
        self.client.execute(request).await
    }

    /// Update a cluster; only the fields set in `options` change
    ///
    /// Endpoint: PUT /groups/:id/clusters/:cluster_id
    pub async fn edit_cluster(
        &self,
        group: impl Into<GroupId>,
        cluster: u64,
        options: &EditGroupClusterOptions,
    ) -> Result<(GroupCluster, ApiResponse)> {
        let path = Self::cluster_path(&group.into(), cluster)?;
        let request = self
            .client
            .new_request::<(), _>(Method::PUT, &path, None, Some(options))?;
        self.client.execute(request).await
    }

    /// Detach a cluster from a group
    ///
    /// Endpoint: DELETE /groups/:id/clusters/:cluster_id
    ///
    /// GitLab answers `202 Accepted` once the cluster is removed; that is the
    /// only status treated as success.
    pub async fn delete_cluster(&self, group: impl Into<GroupId>, cluster: u64) -> Result<ApiResponse> {
        let path = Self::cluster_path(&group.into(), cluster)?;
        let request = self
            .client
            .new_request::<(), ()>(Method::DELETE, &path, None, None)?;
        let response = self.client.execute_empty(request).await?;

        if response.status != StatusCode::ACCEPTED {
            tracing::warn!(
                "Unexpected status {} when deleting cluster {}",
                response.status,
                cluster
            );
            return Err(ApiError::UnexpectedStatus {
                response: Box::new(response),
            });
        }

        Ok(response)
    }
}
