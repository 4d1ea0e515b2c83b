//! Deterministic cloud resource naming
//!
//! Resource names are a pure function of the cluster name, pool name and
//! role. Providers name and tag everything they create through these
//! helpers, so a retried create finds the resources a previous partial
//! attempt left behind instead of duplicating them. The controller never
//! derives names itself; the convention lives at the provider boundary.

use crate::spec::{PoolRole, PoolSpec, MASTER_POOL_NAME};

/// Name of the instance pool backing a cluster's control plane
pub fn master_pool(cluster: &str) -> String {
    format!("{cluster}-{MASTER_POOL_NAME}")
}

/// Name of the instance pool backing a named compute pool
pub fn compute_pool(cluster: &str, pool: &str) -> String {
    format!("{cluster}-compute-{pool}")
}

/// Name of the instance pool backing the given pool spec
pub fn pool(cluster: &str, spec: &PoolSpec) -> String {
    match spec.role {
        PoolRole::Master => master_pool(cluster),
        PoolRole::Compute => compute_pool(cluster, &spec.name),
    }
}

/// Name of the network a provider creates when the spec supplies none
pub fn network(cluster: &str) -> String {
    format!("{cluster}-net")
}

/// Fully qualified DNS record for the cluster API endpoint within a zone
pub fn api_record(cluster: &str, dns_zone: &str) -> String {
    format!("{cluster}.{}", dns_zone.trim_end_matches('.'))
}

/// Tag value identifying every resource owned by a cluster
pub fn owned_tag(cluster: &str) -> String {
    format!("trellis/cluster/{cluster}")
}
