//! Cluster and pool spec model
//!
//! Specs are the validated, normalized in-memory representation of desired
//! state. They are constructed transiently per invocation from request
//! parameters and consumed by the controller and the userdata generator;
//! nothing here is persisted. The durable record of a cluster is the cloud
//! account's own resources, which the provider's query API reports on every
//! describe call.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::provider::ProviderDefaults;
use crate::Error;

/// Reserved name of the master pool.
///
/// Compute pools must not use this name; it identifies the control plane
/// pool within a cluster's role scope.
pub const MASTER_POOL_NAME: &str = "master";

/// Node role a pool provisions for
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PoolRole {
    /// Control plane nodes
    Master,
    /// Worker nodes
    #[default]
    Compute,
}

impl std::str::FromStr for PoolRole {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "master" => Ok(Self::Master),
            "compute" => Ok(Self::Compute),
            _ => Err(Error::invalid_spec(format!(
                "invalid pool role: {s}, expected one of: master, compute"
            ))),
        }
    }
}

impl std::fmt::Display for PoolRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Master => write!(f, "master"),
            Self::Compute => write!(f, "compute"),
        }
    }
}

/// Effect a taint has on scheduling
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub enum TaintEffect {
    /// New pods are not scheduled onto the node
    #[default]
    NoSchedule,
    /// The scheduler tries to avoid the node but may still use it
    PreferNoSchedule,
    /// Running pods that do not tolerate the taint are evicted
    NoExecute,
}

impl std::str::FromStr for TaintEffect {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NoSchedule" => Ok(Self::NoSchedule),
            "PreferNoSchedule" => Ok(Self::PreferNoSchedule),
            "NoExecute" => Ok(Self::NoExecute),
            _ => Err(Error::invalid_spec(format!(
                "invalid taint effect: {s}, expected one of: NoSchedule, PreferNoSchedule, NoExecute"
            ))),
        }
    }
}

impl std::fmt::Display for TaintEffect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoSchedule => write!(f, "NoSchedule"),
            Self::PreferNoSchedule => write!(f, "PreferNoSchedule"),
            Self::NoExecute => write!(f, "NoExecute"),
        }
    }
}

/// A node taint applied at bootstrap
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Taint {
    /// Taint value
    pub value: String,
    /// Scheduling effect
    pub effect: TaintEffect,
}

/// Desired state of a homogeneous node group
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PoolSpec {
    /// Pool name, unique within the owning cluster and role scope
    pub name: String,

    /// Node role this pool provisions for
    #[serde(default)]
    pub role: PoolRole,

    /// Number of nodes in the pool
    #[serde(default)]
    pub size: u32,

    /// Provider-interpreted machine type (e.g. "m4.large")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machine_type: Option<String>,

    /// Node boot disk size in GB; unset falls back to provider defaults
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_size_gb: Option<u32>,

    /// Node operating system version or release channel
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_version: Option<String>,

    /// Public SSH key or key name, dependent on the cloud provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_key: Option<String>,

    /// Node labels applied at bootstrap
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    /// Node taints applied at bootstrap
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub taints: BTreeMap<String, Taint>,

    /// Extra arguments passed through to the kubelet (both roles)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubelet_extra_args: Option<String>,

    /// Extra arguments for the API server (master pools only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_server_extra_args: Option<String>,

    /// Extra arguments for the controller manager (master pools only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller_manager_extra_args: Option<String>,

    /// Extra arguments for the scheduler (master pools only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduler_extra_args: Option<String>,
}

impl PoolSpec {
    /// Create a pool spec with the given name, role and size
    pub fn new(name: impl Into<String>, role: PoolRole, size: u32) -> Self {
        Self {
            name: name.into(),
            role,
            size,
            ..Default::default()
        }
    }

    /// Create a master pool spec with the reserved master pool name
    pub fn master(size: u32) -> Self {
        Self::new(MASTER_POOL_NAME, PoolRole::Master, size)
    }

    /// Validate the pool spec in isolation
    pub fn validate(&self) -> Result<(), Error> {
        validate_identifier("pool name", &self.name)?;

        match self.role {
            PoolRole::Master => {
                if self.name != MASTER_POOL_NAME {
                    return Err(Error::invalid_spec(format!(
                        "master pool must be named {MASTER_POOL_NAME:?}, got {:?}",
                        self.name
                    )));
                }
            }
            PoolRole::Compute => {
                if self.name == MASTER_POOL_NAME {
                    return Err(Error::invalid_spec(format!(
                        "compute pool name {MASTER_POOL_NAME:?} collides with the master pool"
                    )));
                }
                // Control plane component flags make no sense on workers
                if self.api_server_extra_args.is_some()
                    || self.controller_manager_extra_args.is_some()
                    || self.scheduler_extra_args.is_some()
                {
                    return Err(Error::invalid_spec(format!(
                        "compute pool {:?} carries control plane extra-args",
                        self.name
                    )));
                }
            }
        }

        for key in self.labels.keys() {
            validate_key("label key", key)?;
        }
        for key in self.taints.keys() {
            validate_key("taint key", key)?;
        }

        Ok(())
    }

    /// Fill unset provisioning parameters from provider defaults
    pub fn apply_defaults(&mut self, defaults: &ProviderDefaults) {
        if self.os_version.is_none() {
            self.os_version = Some(defaults.os_version.clone());
        }
        if self.disk_size_gb.is_none() {
            self.disk_size_gb = Some(defaults.disk_size_gb);
        }
        if self.role == PoolRole::Compute && self.size == 0 {
            self.size = defaults.compute_pool_size;
        }
    }
}

/// Desired state of a cluster: one master pool plus zero or more compute pools
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    /// Cluster name, unique per cloud account and region scope
    pub name: String,

    /// Name of the cloud provider backing this cluster; immutable after creation
    pub cloud_provider: String,

    /// Whether control plane endpoints are internal-only; immutable after creation
    #[serde(default)]
    pub internal: bool,

    /// Ordered cloud-specific network identifiers, provider-interpreted
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub networks: Vec<String>,

    /// Hosted zone name for cluster-internal DNS records
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns_zone: Option<String>,

    /// Kubernetes version; unset falls back to the system default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kube_version: Option<String>,

    /// The control plane pool; exactly one per cluster
    pub master_pool: PoolSpec,

    /// Compute pools keyed by pool name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub compute_pools: BTreeMap<String, PoolSpec>,
}

impl ClusterSpec {
    /// Create a cluster spec with the given name, provider and master pool
    pub fn new(
        name: impl Into<String>,
        cloud_provider: impl Into<String>,
        master_pool: PoolSpec,
    ) -> Self {
        Self {
            name: name.into(),
            cloud_provider: cloud_provider.into(),
            master_pool,
            ..Default::default()
        }
    }

    /// Add a compute pool, keyed by its name, and return self for chaining
    pub fn with_compute_pool(mut self, pool: PoolSpec) -> Self {
        self.compute_pools.insert(pool.name.clone(), pool);
        self
    }

    /// The Kubernetes version to deploy, after defaulting
    pub fn kube_version(&self) -> &str {
        self.kube_version
            .as_deref()
            .unwrap_or(crate::DEFAULT_KUBE_VERSION)
    }

    /// Validate the cluster spec against the data-model invariants.
    ///
    /// Checks run before any cloud provider call; the provider never sees a
    /// spec that fails here.
    pub fn validate(&self) -> Result<(), Error> {
        validate_identifier("cluster name", &self.name)?;

        if self.cloud_provider.is_empty() {
            return Err(Error::invalid_spec("cloud provider name must be specified"));
        }

        if self.master_pool.role != PoolRole::Master {
            return Err(Error::invalid_spec(format!(
                "master pool has role {}, expected master",
                self.master_pool.role
            )));
        }
        self.master_pool.validate()?;

        for (key, pool) in &self.compute_pools {
            if pool.role != PoolRole::Compute {
                return Err(Error::invalid_spec(format!(
                    "compute pool {key:?} has role {}, expected compute",
                    pool.role
                )));
            }
            if *key != pool.name {
                return Err(Error::invalid_spec(format!(
                    "compute pool keyed {key:?} is named {:?}",
                    pool.name
                )));
            }
            pool.validate()?;
        }

        if let Some(version) = &self.kube_version {
            validate_kube_version(version)?;
        }

        Ok(())
    }

    /// Fill unset fields on the cluster and all its pools from provider defaults
    pub fn apply_defaults(&mut self, defaults: &ProviderDefaults) {
        if self.kube_version.is_none() {
            self.kube_version = Some(defaults.kube_version.clone());
        }
        self.master_pool.apply_defaults(defaults);
        for pool in self.compute_pools.values_mut() {
            pool.apply_defaults(defaults);
        }
    }
}

/// Whether `value` is a DNS label: lowercase alphanumerics and dashes,
/// starting and ending alphanumeric.
fn is_dns_label(value: &str) -> bool {
    !value.is_empty()
        && !value.starts_with('-')
        && !value.ends_with('-')
        && value
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// Validate a DNS-label style identifier. Cluster and pool names feed
/// deterministic cloud resource names, so they carry the strict rule.
fn validate_identifier(what: &str, value: &str) -> Result<(), Error> {
    if value.is_empty() {
        return Err(Error::invalid_spec(format!("{what} must not be empty")));
    }
    if !is_dns_label(value) {
        return Err(Error::invalid_spec(format!(
            "{what} {value:?} must consist of lowercase alphanumerics and dashes"
        )));
    }
    Ok(())
}

/// Validate a Kubernetes qualified key, as used for labels and taints: an
/// optional DNS-subdomain prefix separated by `/`, then a name of
/// alphanumerics, dashes, underscores and dots, starting and ending
/// alphanumeric. Accepts keys like `node-role.kubernetes.io/worker`.
fn validate_key(what: &str, key: &str) -> Result<(), Error> {
    let (prefix, name) = match key.rsplit_once('/') {
        Some((prefix, name)) => (Some(prefix), name),
        None => (None, key),
    };
    if let Some(prefix) = prefix {
        if prefix.is_empty() || !prefix.split('.').all(is_dns_label) {
            return Err(Error::invalid_spec(format!(
                "{what} {key:?} must carry a DNS subdomain prefix before '/'"
            )));
        }
    }
    let valid_name = !name.is_empty()
        && name
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphanumeric())
        && name
            .chars()
            .last()
            .is_some_and(|c| c.is_ascii_alphanumeric())
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if !valid_name {
        return Err(Error::invalid_spec(format!(
            "{what} {key:?} must be alphanumerics, dashes, underscores and dots"
        )));
    }
    Ok(())
}

/// Validate a Kubernetes version string like "1.31.0" or "v1.31.0"
fn validate_kube_version(version: &str) -> Result<(), Error> {
    let cleaned = version.strip_prefix('v').unwrap_or(version);
    let parts: Vec<&str> = cleaned.split('.').collect();
    if parts.len() < 2 {
        return Err(Error::invalid_spec(format!(
            "invalid kubernetes version format: {version}, expected format like '1.31.0'"
        )));
    }
    for part in &parts {
        if part.parse::<u32>().is_err() {
            return Err(Error::invalid_spec(format!(
                "invalid kubernetes version format: {version}, version parts must be numbers"
            )));
        }
    }
    Ok(())
}

/// Parse a `key=value` list (original `--labels` flag format) into a label map
pub fn parse_labels(pairs: &[String]) -> Result<BTreeMap<String, String>, Error> {
    let mut labels = BTreeMap::new();
    for pair in pairs {
        let (key, value) = pair.split_once('=').ok_or_else(|| {
            Error::invalid_spec(format!("invalid label {pair:?}, expected key=value"))
        })?;
        labels.insert(key.to_string(), value.to_string());
    }
    Ok(labels)
}

/// Parse a `key=value:Effect` list (`--taints` flag format) into a taint map.
///
/// The effect defaults to `NoSchedule` when omitted.
pub fn parse_taints(pairs: &[String]) -> Result<BTreeMap<String, Taint>, Error> {
    let mut taints = BTreeMap::new();
    for pair in pairs {
        let (key, rest) = pair.split_once('=').ok_or_else(|| {
            Error::invalid_spec(format!("invalid taint {pair:?}, expected key=value:Effect"))
        })?;
        let (value, effect) = match rest.split_once(':') {
            Some((value, effect)) => (value, effect.parse()?),
            None => (rest, TaintEffect::NoSchedule),
        };
        taints.insert(
            key.to_string(),
            Taint {
                value: value.to_string(),
                effect,
            },
        );
    }
    Ok(taints)
}
