//! Error types for cluster lifecycle operations

use thiserror::Error;

/// Main error type for Trellis operations
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A cluster or pool spec violates a data-model invariant.
    ///
    /// Detected before any cloud provider call; the request is never
    /// partially applied.
    #[error("invalid spec: {0}")]
    InvalidSpec(String),

    /// The referenced cluster or pool does not exist in the provider's view
    #[error("not found: {0}")]
    NotFound(String),

    /// The creation target already exists (cluster name collision)
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// The asset bundle lacks required certificate or key material
    #[error("missing asset: {0}")]
    MissingAsset(String),

    /// A transient or semantic failure surfaced by the cloud provider
    #[error("provider error: {0}")]
    Provider(String),

    /// A bounded operation exceeded its deadline.
    ///
    /// The cloud-side effect is unknown; callers must re-query via
    /// Describe rather than assume a rollback occurred.
    #[error("timed out waiting for {0}")]
    Timeout(String),

    /// IO error reading asset material
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create an invalid-spec error with the given message
    pub fn invalid_spec(msg: impl Into<String>) -> Self {
        Self::InvalidSpec(msg.into())
    }

    /// Create a not-found error with the given message
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an already-exists error with the given message
    pub fn already_exists(msg: impl Into<String>) -> Self {
        Self::AlreadyExists(msg.into())
    }

    /// Create a missing-asset error naming the absent material
    pub fn missing_asset(msg: impl Into<String>) -> Self {
        Self::MissingAsset(msg.into())
    }

    /// Create a provider error with the given message
    pub fn provider(msg: impl Into<String>) -> Self {
        Self::Provider(msg.into())
    }

    /// Create a timeout error naming the resource that was being waited on
    pub fn timeout(resource: impl Into<String>) -> Self {
        Self::Timeout(resource.into())
    }

    /// Whether the failure is transient and worth retrying.
    ///
    /// Semantic failures (`InvalidSpec`, `NotFound`, `AlreadyExists`,
    /// `MissingAsset`) are terminal for the sub-operation that produced
    /// them; retrying cannot change the outcome.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Provider(_) | Self::Timeout(_) | Self::Io(_))
    }
}
