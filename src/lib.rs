//! Trellis - Kubernetes cluster lifecycle core with pluggable cloud backends
//!
//! Trellis manages clusters made of exactly one master pool (control plane)
//! and zero or more named compute pools (worker groups). User intents are
//! translated into cloud-specific resource operations through a provider
//! abstraction, and each node receives a deterministic bootstrap payload
//! embedding its certificates and component flags.
//!
//! # Architecture
//!
//! - A shell (CLI or service) builds a [`spec::ClusterSpec`] from request
//!   parameters, resolves a named [`provider::CloudProvider`] and invokes
//!   one [`controller::Controller`] operation.
//! - The controller validates the spec, fills unset fields from provider
//!   defaults, generates per-role userdata, and drives provisioning with
//!   master-before-compute ordering and per-pool failure aggregation.
//! - Operations are imperative and single-shot; the cloud account itself is
//!   the durable record of cluster existence.
//!
//! # Modules
//!
//! - [`spec`] - Validated cluster and pool spec model
//! - [`assets`] - Certificate/key material for node bootstrap
//! - [`provider`] - Cloud provider abstraction and registry
//! - [`userdata`] - Per-role bootstrap payload generation
//! - [`controller`] - Lifecycle workflows (create, update, delete, describe, list)
//! - [`retry`] - Injectable retry policy for transient provider failures
//! - [`error`] - Error types

#![deny(missing_docs)]

pub mod assets;
pub mod controller;
pub mod error;
pub mod provider;
pub mod retry;
pub mod spec;
pub mod userdata;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

// =============================================================================
// Default Configuration Constants
// =============================================================================
// System-wide defaults applied to unset spec fields when a provider does not
// override them. Centralizing them here keeps spec defaulting, provider
// defaults, and test fixtures consistent.

/// Default Kubernetes version deployed when the spec leaves it unset
pub const DEFAULT_KUBE_VERSION: &str = "1.31.0";

/// Default node operating system release channel
pub const DEFAULT_OS_VERSION: &str = "stable";

/// Default node boot disk size in gigabytes
pub const DEFAULT_DISK_SIZE_GB: u32 = 10;

/// Default number of nodes in a compute pool
pub const DEFAULT_COMPUTE_POOL_SIZE: u32 = 1;

/// Default number of control plane nodes.
///
/// Odd for etcd quorum; the model itself only enforces non-negativity.
pub const DEFAULT_MASTER_POOL_SIZE: u32 = 3;
