//! HTTP client for Kubernetes-style `rbac.authorization.k8s.io/v1` APIs.
//!
//! Enable the `kube` feature to use [`KubeRbacApi`] and [`KubeConnector`].
//!
//! # Example
//!
//! ```rust,ignore
//! use std::collections::HashMap;
//! use clusteraccess::rbac::kube::{KubeConnector, KubeEndpoint};
//! use clusteraccess::{RemoteConfig, SecretString};
//!
//! let mut endpoints = HashMap::new();
//! endpoints.insert(
//!     "prod".to_owned(),
//!     KubeEndpoint {
//!         server: "https://10.0.0.1:6443".to_owned(),
//!         token: SecretString::new(std::env::var("PROD_TOKEN")?),
//!         ca_certificate_pem: None,
//!         insecure_skip_tls_verify: false,
//!     },
//! );
//! let connector = KubeConnector::new(endpoints, RemoteConfig::default());
//! ```

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};

use super::api::{ClusterConnector, RbacApi};
use super::error::RemoteError;
use super::labels::OwnershipLabels;
use super::object::{BindingScope, RoleBindingObject, RoleRef, Subject};
use crate::config::RemoteConfig;
use crate::members::Cluster;
use crate::{AccessError, SecretString};

const RBAC_GROUP: &str = "rbac.authorization.k8s.io";
const RBAC_VERSION: &str = "v1";

/// Connection settings for one cluster's API server.
#[derive(Debug, Clone, Deserialize)]
pub struct KubeEndpoint {
    /// API server base URL, e.g. `https://10.0.0.1:6443`.
    pub server: String,
    /// Bearer token of an account allowed to manage RBAC objects.
    pub token: SecretString,
    /// PEM bundle trusted in addition to the system roots.
    #[serde(default)]
    pub ca_certificate_pem: Option<String>,
    #[serde(default)]
    pub insecure_skip_tls_verify: bool,
}

/// [`RbacApi`] over HTTP.
#[derive(Clone)]
pub struct KubeRbacApi {
    base: Url,
    client: Client,
    token: SecretString,
}

impl KubeRbacApi {
    pub fn new(endpoint: &KubeEndpoint, remote: &RemoteConfig) -> Result<Self, RemoteError> {
        let base = Url::parse(&endpoint.server)
            .map_err(|e| RemoteError::Unreachable(format!("invalid server url: {e}")))?;

        let mut builder = Client::builder()
            .timeout(remote.timeout)
            .danger_accept_invalid_certs(endpoint.insecure_skip_tls_verify);

        if let Some(pem) = &endpoint.ca_certificate_pem {
            let certificate = reqwest::Certificate::from_pem(pem.as_bytes())
                .map_err(|e| RemoteError::Unreachable(format!("invalid CA certificate: {e}")))?;
            builder = builder.add_root_certificate(certificate);
        }

        let client = builder.build().map_err(send_error)?;

        Ok(Self {
            base,
            client,
            token: endpoint.token.clone(),
        })
    }

    /// `.../clusterrolebindings`, `.../rolebindings` (all namespaces) or
    /// `.../namespaces/{ns}/rolebindings`.
    fn collection_url(&self, scope: Option<&BindingScope>) -> Result<Url, RemoteError> {
        let mut url = self.base.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| RemoteError::Unreachable("server url cannot be a base".into()))?;
            segments.pop_if_empty().extend(["apis", RBAC_GROUP, RBAC_VERSION]);
            match scope {
                Some(BindingScope::Cluster) => {
                    segments.push("clusterrolebindings");
                }
                Some(BindingScope::Namespace(ns)) => {
                    segments.extend(["namespaces", ns.as_str(), "rolebindings"]);
                }
                None => {
                    segments.push("rolebindings");
                }
            }
        }
        Ok(url)
    }

    fn item_url(&self, scope: &BindingScope, name: &str) -> Result<Url, RemoteError> {
        let mut url = self.collection_url(Some(scope))?;
        url.path_segments_mut()
            .map_err(|()| RemoteError::Unreachable("server url cannot be a base".into()))?
            .push(name);
        Ok(url)
    }

    async fn list(&self, url: Url, owner: &OwnershipLabels) -> Result<Vec<RoleBindingObject>, RemoteError> {
        let response = self
            .client
            .get(url)
            .bearer_auth(self.token.expose_secret())
            .query(&[("labelSelector", owner.selector())])
            .send()
            .await
            .map_err(send_error)?;

        if !response.status().is_success() {
            return Err(status_error(response, "").await);
        }

        let list: WireList = response.json().await.map_err(send_error)?;
        Ok(list.items.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl RbacApi for KubeRbacApi {
    async fn list_cluster_role_bindings(
        &self,
        owner: &OwnershipLabels,
    ) -> Result<Vec<RoleBindingObject>, RemoteError> {
        let url = self.collection_url(Some(&BindingScope::Cluster))?;
        self.list(url, owner).await
    }

    async fn list_role_bindings(
        &self,
        owner: &OwnershipLabels,
    ) -> Result<Vec<RoleBindingObject>, RemoteError> {
        let url = self.collection_url(None)?;
        self.list(url, owner).await
    }

    async fn create(&self, binding: &RoleBindingObject) -> Result<(), RemoteError> {
        let url = self.collection_url(Some(&binding.scope))?;
        let response = self
            .client
            .post(url)
            .bearer_auth(self.token.expose_secret())
            .json(&WireBinding::from(binding))
            .send()
            .await
            .map_err(send_error)?;

        if !response.status().is_success() {
            return Err(status_error(response, &binding.name).await);
        }
        Ok(())
    }

    async fn replace(&self, binding: &RoleBindingObject) -> Result<(), RemoteError> {
        let url = self.item_url(&binding.scope, &binding.name)?;
        let response = self
            .client
            .put(url)
            .bearer_auth(self.token.expose_secret())
            .json(&WireBinding::from(binding))
            .send()
            .await
            .map_err(send_error)?;

        if !response.status().is_success() {
            return Err(status_error(response, &binding.name).await);
        }
        Ok(())
    }

    /// Issued as a collection delete with both a label and a field selector,
    /// so the API server itself refuses to remove an object that is not owned.
    async fn delete(
        &self,
        scope: &BindingScope,
        name: &str,
        owner: &OwnershipLabels,
    ) -> Result<(), RemoteError> {
        let url = self.collection_url(Some(scope))?;
        let response = self
            .client
            .delete(url)
            .bearer_auth(self.token.expose_secret())
            .query(&[
                ("labelSelector", owner.selector()),
                ("fieldSelector", format!("metadata.name={name}")),
            ])
            .send()
            .await
            .map_err(send_error)?;

        if !response.status().is_success() {
            return Err(status_error(response, name).await);
        }

        let deleted: WireList = response.json().await.map_err(send_error)?;
        if deleted.items.is_empty() {
            return Err(RemoteError::NotFound(name.to_owned()));
        }
        Ok(())
    }
}

/// Resolves cluster handles to API endpoints by cluster name.
pub struct KubeConnector {
    endpoints: HashMap<String, KubeEndpoint>,
    remote: RemoteConfig,
}

impl KubeConnector {
    pub fn new(endpoints: HashMap<String, KubeEndpoint>, remote: RemoteConfig) -> Self {
        Self { endpoints, remote }
    }
}

impl ClusterConnector for KubeConnector {
    type Api = KubeRbacApi;

    fn connect(&self, cluster: &Cluster) -> Result<Self::Api, AccessError> {
        let endpoint = self.endpoints.get(&cluster.name).ok_or_else(|| {
            log::warn!(target: "clusteraccess", "msg=\"no endpoint configured\", cluster=\"{}\"", cluster.name);
            AccessError::NotFound
        })?;
        Ok(KubeRbacApi::new(endpoint, &self.remote)?)
    }
}

fn send_error(e: reqwest::Error) -> RemoteError {
    if e.is_timeout() {
        RemoteError::Timeout
    } else {
        RemoteError::Unreachable(e.to_string())
    }
}

async fn status_error(response: Response, name: &str) -> RemoteError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    // API servers answer with a `Status` object; fall back to the raw body
    let message = serde_json::from_str::<WireStatus>(&body)
        .ok()
        .and_then(|s| s.message)
        .unwrap_or(body);

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RemoteError::PermissionDenied(message),
        StatusCode::NOT_FOUND => RemoteError::NotFound(name.to_owned()),
        StatusCode::CONFLICT => RemoteError::AlreadyExists(name.to_owned()),
        StatusCode::GATEWAY_TIMEOUT => RemoteError::Timeout,
        _ => RemoteError::Api {
            status: status.as_u16(),
            message,
        },
    }
}

#[derive(Debug, Deserialize)]
struct WireStatus {
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireList {
    #[serde(default)]
    items: Vec<WireBinding>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireBinding {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    api_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
    metadata: WireMetadata,
    #[serde(default)]
    subjects: Vec<WireSubject>,
    role_ref: WireRoleRef,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireMetadata {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    namespace: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    annotations: BTreeMap<String, String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireSubject {
    kind: String,
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    api_group: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireRoleRef {
    #[serde(default)]
    api_group: String,
    kind: String,
    name: String,
}

impl From<&RoleBindingObject> for WireBinding {
    fn from(object: &RoleBindingObject) -> Self {
        let kind = match object.scope {
            BindingScope::Cluster => "ClusterRoleBinding",
            BindingScope::Namespace(_) => "RoleBinding",
        };

        WireBinding {
            api_version: Some(format!("{RBAC_GROUP}/{RBAC_VERSION}")),
            kind: Some(kind.to_owned()),
            metadata: WireMetadata {
                name: object.name.clone(),
                namespace: object.namespace().map(ToOwned::to_owned),
                labels: object.labels.clone(),
                annotations: object.annotations.clone(),
            },
            subjects: object
                .subjects
                .iter()
                .map(|s| WireSubject {
                    kind: s.kind.clone(),
                    name: s.name.clone(),
                    api_group: Some(RBAC_GROUP.to_owned()),
                })
                .collect(),
            role_ref: WireRoleRef {
                api_group: RBAC_GROUP.to_owned(),
                kind: object.role_ref.kind.clone(),
                name: object.role_ref.name.clone(),
            },
        }
    }
}

impl From<WireBinding> for RoleBindingObject {
    fn from(wire: WireBinding) -> Self {
        RoleBindingObject {
            name: wire.metadata.name,
            scope: match wire.metadata.namespace {
                Some(ns) => BindingScope::Namespace(ns),
                None => BindingScope::Cluster,
            },
            labels: wire.metadata.labels,
            annotations: wire.metadata.annotations,
            role_ref: RoleRef {
                kind: wire.role_ref.kind,
                name: wire.role_ref.name,
            },
            subjects: wire
                .subjects
                .into_iter()
                .map(|s| Subject {
                    kind: s.kind,
                    name: s.name,
                })
                .collect(),
        }
    }
}
