//! Control-plane trait and error taxonomy

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{DistributionConfig, OriginRequestPolicySpec};

/// Error taxonomy for remote control-plane operations
///
/// Each kind warrants a different caller response: conflicts are retried
/// after a fresh fetch, transient failures are retried with backoff, and
/// validation failures are never retried.
#[derive(Error, Debug)]
pub enum ControlPlaneError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Version conflict: {0}")]
    Conflict(String),

    #[error("Validation rejected: {0}")]
    Validation(String),

    #[error("Transient failure: {0}")]
    Transient(String),

    #[error("Remote error: {0}")]
    Remote(String),
}

/// Identity of an existing origin-request policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicySummary {
    pub id: String,
    pub name: String,
}

/// Remote control-plane operations consumed by the reconciler
///
/// Implementations own pagination: listing operations must walk the
/// complete result set before returning, since a partial scan risks a
/// false "not found" that triggers a duplicate creation.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Fetch the live configuration and its concurrency token.
    ///
    /// A write must present the token returned by the immediately
    /// preceding fetch; the snapshot is never cached across runs.
    async fn get_distribution_config(
        &self,
        distribution_id: &str,
    ) -> Result<(DistributionConfig, String), ControlPlaneError>;

    /// Publish the full modified configuration under the given token.
    ///
    /// Fails with [`ControlPlaneError::Conflict`] when the token no
    /// longer matches the live version; the live configuration is left
    /// unchanged in that case.
    async fn update_distribution(
        &self,
        distribution_id: &str,
        token: &str,
        config: &DistributionConfig,
    ) -> Result<String, ControlPlaneError>;

    /// List all custom origin-request policies (complete result set).
    async fn list_origin_request_policies(&self)
    -> Result<Vec<PolicySummary>, ControlPlaneError>;

    /// Create an origin-request policy and return its id.
    async fn create_origin_request_policy(
        &self,
        spec: &OriginRequestPolicySpec,
    ) -> Result<String, ControlPlaneError>;

    /// Request a cache purge for the given path globs.
    ///
    /// The caller reference must be unique per call; reuse collapses
    /// into an idempotent no-op on the remote system.
    async fn create_invalidation(
        &self,
        distribution_id: &str,
        paths: &[String],
        caller_reference: &str,
    ) -> Result<String, ControlPlaneError>;
}
