//! Per-role node bootstrap payload generation
//!
//! Userdata is the cloud-config payload delivered to a node at first boot.
//! Generation is a pure function of the cluster spec, the pool spec and the
//! asset bundle: no network or disk access, and identical inputs always
//! produce byte-identical output. Every other component treats the payload
//! as an opaque blob; only the node's init system ever parses it.
//!
//! Master payloads embed the CA and API server key pairs plus the control
//! plane component flags. Compute payloads embed the kubelet client key
//! pair and the master endpoint, which the caller supplies since it only
//! exists once the master pool does.

use base64::{engine::general_purpose::STANDARD, Engine};
use serde_json::json;
use tracing::debug;

use crate::assets::{AssetBundle, AssetKind};
use crate::spec::{ClusterSpec, PoolRole, PoolSpec, Taint};
use crate::{Error, Result};

/// Directory on the node where embedded PEM material is written
const SSL_DIR: &str = "/etc/kubernetes/ssl";

/// Environment file consumed by the node's bootstrap units
const ENV_FILE: &str = "/etc/kubernetes/trellis.env";

/// Generate the bootstrap payload for a master (control plane) node.
///
/// Fails with a missing-asset error before producing any output when the
/// bundle lacks the CA or API server material.
pub fn generate_master(
    cluster: &ClusterSpec,
    pool: &PoolSpec,
    assets: &AssetBundle,
) -> Result<Vec<u8>> {
    if pool.role != PoolRole::Master {
        return Err(Error::invalid_spec(format!(
            "master userdata requested for {} pool {:?}",
            pool.role, pool.name
        )));
    }

    // Resolve all required material up front so a missing asset never
    // yields a partial payload.
    let ca_cert = assets.require(AssetKind::CaCert)?;
    let ca_key = assets.require(AssetKind::CaKey)?;
    let apiserver_cert = assets.require(AssetKind::ApiServerCert)?;
    let apiserver_key = assets.require(AssetKind::ApiServerKey)?;

    let mut env = common_env(cluster, pool);
    env.push(format!("INTERNAL={}", cluster.internal));
    env.push(format!("NETWORKS={}", cluster.networks.join(",")));
    if let Some(zone) = &cluster.dns_zone {
        env.push(format!("DNS_ZONE={zone}"));
    }
    env.push(format!(
        "APISERVER_ARGS={}",
        pool.api_server_extra_args.as_deref().unwrap_or_default()
    ));
    env.push(format!(
        "CONTROLLER_MANAGER_ARGS={}",
        pool.controller_manager_extra_args
            .as_deref()
            .unwrap_or_default()
    ));
    env.push(format!(
        "SCHEDULER_ARGS={}",
        pool.scheduler_extra_args.as_deref().unwrap_or_default()
    ));

    let files = vec![
        pem_file("ca.pem", ca_cert, "0644"),
        pem_file("ca-key.pem", ca_key, "0600"),
        pem_file("apiserver.pem", apiserver_cert, "0644"),
        pem_file("apiserver-key.pem", apiserver_key, "0600"),
        env_file(&env),
    ];

    debug!(cluster = %cluster.name, pool = %pool.name, "generated master userdata");
    render(files)
}

/// Generate the bootstrap payload for a compute (worker) node.
///
/// `master_endpoint` is the reachable API server address of the already
/// provisioned master pool.
pub fn generate_compute(
    cluster: &ClusterSpec,
    pool: &PoolSpec,
    assets: &AssetBundle,
    master_endpoint: &str,
) -> Result<Vec<u8>> {
    if pool.role != PoolRole::Compute {
        return Err(Error::invalid_spec(format!(
            "compute userdata requested for {} pool {:?}",
            pool.role, pool.name
        )));
    }

    let ca_cert = assets.require(AssetKind::CaCert)?;
    let kubelet_cert = assets.require(AssetKind::KubeletCert)?;
    let kubelet_key = assets.require(AssetKind::KubeletKey)?;

    let mut env = common_env(cluster, pool);
    env.push(format!("MASTER_ENDPOINT={master_endpoint}"));

    let files = vec![
        pem_file("ca.pem", ca_cert, "0644"),
        pem_file("kubelet.pem", kubelet_cert, "0644"),
        pem_file("kubelet-key.pem", kubelet_key, "0600"),
        env_file(&env),
    ];

    debug!(cluster = %cluster.name, pool = %pool.name, "generated compute userdata");
    render(files)
}

/// Environment entries shared by both roles
fn common_env(cluster: &ClusterSpec, pool: &PoolSpec) -> Vec<String> {
    vec![
        format!("CLUSTER_NAME={}", cluster.name),
        format!("POOL_NAME={}", pool.name),
        format!("NODE_ROLE={}", pool.role),
        format!("KUBE_VERSION={}", cluster.kube_version()),
        format!("NODE_LABELS={}", render_labels(pool)),
        format!("NODE_TAINTS={}", render_taints(pool)),
        format!(
            "KUBELET_ARGS={}",
            pool.kubelet_extra_args.as_deref().unwrap_or_default()
        ),
    ]
}

/// Labels as a comma separated `key=value` list, in key order
fn render_labels(pool: &PoolSpec) -> String {
    pool.labels
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Taints as a comma separated `key=value:Effect` list, in key order
fn render_taints(pool: &PoolSpec) -> String {
    pool.taints
        .iter()
        .map(|(k, Taint { value, effect })| format!("{k}={value}:{effect}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// A base64-embedded PEM file under the node's SSL directory
fn pem_file(name: &str, material: &[u8], mode: &str) -> serde_json::Value {
    json!({
        "path": format!("{SSL_DIR}/{name}"),
        "permissions": mode,
        "encoding": "b64",
        "content": STANDARD.encode(material),
    })
}

/// The bootstrap environment file, one `KEY=value` entry per line
fn env_file(entries: &[String]) -> serde_json::Value {
    json!({
        "path": ENV_FILE,
        "permissions": "0644",
        "content": format!("{}\n", entries.join("\n")),
    })
}

/// Render the final cloud-config document
fn render(write_files: Vec<serde_json::Value>) -> Result<Vec<u8>> {
    let doc = json!({ "write_files": write_files });
    let yaml = serde_yaml::to_string(&doc)
        .map_err(|e| Error::provider(format!("failed to render userdata: {e}")))?;
    Ok(format!("#cloud-config\n{yaml}").into_bytes())
}
