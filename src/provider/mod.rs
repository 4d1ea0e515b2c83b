//! Cloud provider abstraction layer
//!
//! Every supported backend implements the [`CloudProvider`] trait; the
//! controller's orchestration logic (ordering, defaulting, partial-failure
//! policy) is written once against this contract and tested with fakes.
//! Implementations are selected at runtime by name through a
//! [`ProviderRegistry`], an explicit mapping built at startup and passed by
//! reference rather than reached through ambient globals.
//!
//! # Contract notes
//!
//! - Creation calls must be safe to retry: providers tag and name every
//!   resource deterministically from the cluster and pool names (see
//!   [`naming`]) and check existence before creating, so a retry after a
//!   partial failure never duplicates networks, DNS records or instances.
//! - A provider handle is shared by concurrent pool-creation tasks within
//!   one create operation and must be safe for concurrent use.
//! - Observed state is a snapshot. Two queries may disagree; callers never
//!   cache it beyond a single describe.

pub mod naming;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};

use crate::spec::{ClusterSpec, PoolRole, PoolSpec};
use crate::Result;

/// Provider and system defaults used to fill unset spec fields
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct ProviderDefaults {
    /// Default node operating system version or release channel
    pub os_version: String,
    /// Default node boot disk size in GB
    pub disk_size_gb: u32,
    /// Default Kubernetes version
    pub kube_version: String,
    /// Default number of nodes in a compute pool
    pub compute_pool_size: u32,
}

impl Default for ProviderDefaults {
    fn default() -> Self {
        Self {
            os_version: crate::DEFAULT_OS_VERSION.to_string(),
            disk_size_gb: crate::DEFAULT_DISK_SIZE_GB,
            kube_version: crate::DEFAULT_KUBE_VERSION.to_string(),
            compute_pool_size: crate::DEFAULT_COMPUTE_POOL_SIZE,
        }
    }
}

/// Observed state of a single pool, as reported by the provider
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PoolState {
    /// Pool name
    pub name: String,
    /// Node role
    pub role: PoolRole,
    /// Actual instance count
    pub size: u32,
    /// Instances currently passing the provider's health checks
    pub healthy: u32,
    /// Kubernetes version the pool's nodes report, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kube_version: Option<String>,
    /// Node addresses
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub addresses: Vec<String>,
}

/// Point-in-time snapshot of a cluster's actual cloud resources.
///
/// Never cached beyond a single describe call; clouds are eventually
/// consistent and two queries may return different results.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ObservedClusterState {
    /// Cluster name
    pub cluster_name: String,
    /// Name of the provider that owns the cluster's resources
    pub cloud_provider: String,
    /// Whether the control plane endpoint is internal-only
    pub internal: bool,
    /// Reachable API server endpoint of the master pool, once it exists
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Observed master pool state
    pub master_pool: PoolState,
    /// Observed compute pool states, keyed by pool name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub compute_pools: BTreeMap<String, PoolState>,
}

/// One line of `ListClusters` output
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSummary {
    /// Cluster name
    pub name: String,
    /// Owning cloud provider name
    pub cloud_provider: String,
    /// Kubernetes version the master pool reports, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kube_version: Option<String>,
    /// Observed master pool size
    pub master_size: u32,
    /// Number of compute pools
    pub compute_pools: u32,
}

/// Capability contract every cloud backend implements.
///
/// All mutation calls may fail transiently (network, API errors) or
/// semantically (not found, already exists, quota). The controller treats
/// transient failures as retryable by the caller and semantic failures as
/// terminal for that sub-operation.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CloudProvider: Send + Sync {
    /// Registry name of this provider (e.g. "aws")
    fn name(&self) -> &str;

    /// Defaults used to fill unset spec fields before provisioning
    async fn resolve_defaults(&self) -> Result<ProviderDefaults>;

    /// Provision control plane infrastructure: networking when the spec
    /// supplies none, DNS records when a zone is set, and master instances
    /// running the given userdata.
    ///
    /// Retry-safe: resources are named deterministically from the cluster
    /// name and checked for existence before creation. Fails with
    /// `AlreadyExists` when the cluster name collides with a live cluster.
    async fn create_master_pool(
        &self,
        spec: &ClusterSpec,
        user_data: &[u8],
    ) -> Result<ObservedClusterState>;

    /// Provision a named compute pool's instances running the given
    /// userdata. Fails with `NotFound` when the referenced cluster or its
    /// master pool does not exist.
    async fn create_compute_pool(
        &self,
        cluster_name: &str,
        pool: &PoolSpec,
        user_data: &[u8],
    ) -> Result<ObservedClusterState>;

    /// Adjust size, labels, taints or extra-args of an existing pool.
    ///
    /// Pool identity (name, role) is immutable; only node-level parameters
    /// change.
    async fn update_pool(&self, cluster_name: &str, pool: &PoolSpec)
        -> Result<ObservedClusterState>;

    /// Remove a compute pool's instances. Reports `NotFound` for an absent
    /// pool rather than succeeding silently.
    async fn delete_compute_pool(&self, cluster_name: &str, pool_name: &str) -> Result<()>;

    /// Remove the master pool, all compute pools and every cluster-owned
    /// network or DNS resource the provider created. Tolerates resources
    /// already partially deleted; retrying a failed delete is safe.
    async fn delete_cluster(&self, cluster_name: &str) -> Result<()>;

    /// Snapshot the cluster's actual cloud resources
    async fn describe_cluster(&self, cluster_name: &str) -> Result<ObservedClusterState>;

    /// Summaries of every cluster this provider knows about
    async fn list_clusters(&self) -> Result<Vec<ClusterSummary>>;
}

impl std::fmt::Debug for dyn CloudProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudProvider")
            .field("name", &self.name())
            .finish()
    }
}

/// Named lookup of cloud provider implementations.
///
/// Built once at startup with [`register`](Self::register) and read-only
/// afterwards; shells resolve a provider by name and hand the resolved
/// handle to the controller. Keeping the registry explicit (no process
/// global) is what lets tests inject fakes.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: BTreeMap<String, Arc<dyn CloudProvider>>,
}

impl ProviderRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider under its own name and return self for chaining
    pub fn register(mut self, provider: Arc<dyn CloudProvider>) -> Self {
        self.providers.insert(provider.name().to_string(), provider);
        self
    }

    /// Resolve a provider by name
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn CloudProvider>> {
        self.providers.get(name).cloned().ok_or_else(|| {
            crate::Error::provider(format!(
                "unsupported cloud provider: {name}, supported: {}",
                self.names().join(", ")
            ))
        })
    }

    /// Names of all registered providers, sorted
    pub fn names(&self) -> Vec<&str> {
        self.providers.keys().map(String::as_str).collect()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.names())
            .finish()
    }
}
