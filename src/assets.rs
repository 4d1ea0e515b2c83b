//! Certificate and key material for node bootstrap
//!
//! An [`AssetBundle`] is supplied once at cluster creation and read-only
//! thereafter. Trellis never generates or rotates this material implicitly;
//! regeneration is an explicit, out-of-band operation. The userdata
//! generator is the only consumer and fails with a missing-asset error when
//! material required for a role is absent.

use std::collections::BTreeMap;
use std::path::Path;

use crate::{Error, Result};

/// A single kind of certificate or key material in the bundle
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum AssetKind {
    /// Cluster CA certificate
    CaCert,
    /// Cluster CA private key
    CaKey,
    /// API server certificate
    ApiServerCert,
    /// API server private key
    ApiServerKey,
    /// Kubelet client certificate
    KubeletCert,
    /// Kubelet client private key
    KubeletKey,
}

impl AssetKind {
    /// Conventional file name for this asset in an assets directory
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::CaCert => "ca.pem",
            Self::CaKey => "ca-key.pem",
            Self::ApiServerCert => "apiserver.pem",
            Self::ApiServerKey => "apiserver-key.pem",
            Self::KubeletCert => "kubelet.pem",
            Self::KubeletKey => "kubelet-key.pem",
        }
    }

    /// All asset kinds, in bundle order
    pub fn all() -> [AssetKind; 6] {
        [
            Self::CaCert,
            Self::CaKey,
            Self::ApiServerCert,
            Self::ApiServerKey,
            Self::KubeletCert,
            Self::KubeletKey,
        ]
    }
}

impl std::fmt::Display for AssetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.file_name())
    }
}

/// PEM certificate/key material required to bootstrap a cluster's nodes
#[derive(Clone, Debug, Default)]
pub struct AssetBundle {
    assets: BTreeMap<AssetKind, Vec<u8>>,
}

impl AssetBundle {
    /// Create an empty bundle
    pub fn new() -> Self {
        Self::default()
    }

    /// Add material for the given kind and return self for chaining
    pub fn with(mut self, kind: AssetKind, material: impl Into<Vec<u8>>) -> Self {
        self.assets.insert(kind, material.into());
        self
    }

    /// Material for the given kind, if present
    pub fn get(&self, kind: AssetKind) -> Option<&[u8]> {
        self.assets.get(&kind).map(Vec::as_slice)
    }

    /// Material for the given kind, or a missing-asset error naming it
    pub fn require(&self, kind: AssetKind) -> Result<&[u8]> {
        self.get(kind)
            .ok_or_else(|| Error::missing_asset(kind.file_name()))
    }

    /// Whether the bundle holds no material at all
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Load a bundle from a directory of conventionally named PEM files.
    ///
    /// Absent files are simply left out of the bundle; generation fails
    /// later with a missing-asset error only if a role actually needs them.
    /// This is a convenience for shells; the controller always receives a
    /// ready bundle.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let mut bundle = Self::new();
        for kind in AssetKind::all() {
            let path = dir.join(kind.file_name());
            if path.is_file() {
                bundle.assets.insert(kind, std::fs::read(&path)?);
            }
        }
        Ok(bundle)
    }
}
