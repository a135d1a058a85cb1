//! Reconciliation pipeline
//!
//! One run is a single logical transaction against the remote store:
//! resolve policy, fetch, mutate in memory, validate, publish under the
//! fetch token, then request a cache purge. A stale token at publish
//! time triggers a bounded refetch-and-reapply retry.

use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use crate::behavior::{UpsertOutcome, upsert_behavior};
use crate::control::{ControlPlane, ControlPlaneError};
use crate::error::ReconcileError;
use crate::migrate::migrate_to_policies;
use crate::model::{
    CacheBehavior, DistributionConfig, HttpMethod, OriginRequestPolicySpec, ViewerProtocolPolicy,
};
use crate::policy::resolve_policy;

/// Bounds for the publish retry loop
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(200),
        }
    }
}

/// Desired path-scoped rule, applied to the first available origin
#[derive(Debug, Clone)]
pub struct BehaviorSpec {
    pub path_pattern: String,
    pub viewer_protocol_policy: ViewerProtocolPolicy,
    pub allowed_methods: Vec<HttpMethod>,
    pub cached_methods: Vec<HttpMethod>,
    pub compress: bool,
    /// Managed or custom cache policy attached to the rule
    pub cache_policy_id: String,
    /// Attach the resolved origin-request policy to this rule
    pub attach_origin_request_policy: bool,
}

/// Default-behavior migration to the policy-referencing caching model
#[derive(Debug, Clone)]
pub struct MigrationSpec {
    pub cache_policy_id: String,
}

/// Everything one reconciliation run needs, passed in at construction
/// time rather than read from module-level constants
#[derive(Debug, Clone)]
pub struct ReconcileSpec {
    pub distribution_id: String,
    pub behavior: Option<BehaviorSpec>,
    pub policy: Option<OriginRequestPolicySpec>,
    pub migrate_default: Option<MigrationSpec>,
    pub invalidation_paths: Vec<String>,
    pub retry: RetryPolicy,
}

/// Terminal state of the cache purge step
#[derive(Debug)]
pub enum InvalidationStatus {
    Invalidated(String),
    /// The configuration is live but stale content may be served until
    /// cached entries expire naturally.
    Failed(ControlPlaneError),
    Skipped,
}

/// Result of a successful publish
#[derive(Debug)]
pub struct ReconcileOutcome {
    /// Token identifying the newly live configuration version
    pub token: String,
    pub invalidation: InvalidationStatus,
}

impl ReconcileOutcome {
    /// Whether the run published but failed to purge the cache
    pub fn is_partial(&self) -> bool {
        matches!(self.invalidation, InvalidationStatus::Failed(_))
    }
}

/// Reusable fetch-mutate-publish-invalidate workflow over any control
/// plane implementation
pub struct Reconciler {
    control: Arc<dyn ControlPlane>,
    spec: ReconcileSpec,
}

impl Reconciler {
    pub fn new(control: Arc<dyn ControlPlane>, spec: ReconcileSpec) -> Self {
        Self { control, spec }
    }

    /// Execute one reconciliation run.
    ///
    /// Policy resolution and fetch failures are terminal: no remote
    /// mutation has happened yet, so aborting is safe. An invalidation
    /// failure after a successful publish is reported as a partial
    /// outcome, never hidden as full success and never rolled back.
    pub async fn run(&self) -> Result<ReconcileOutcome, ReconcileError> {
        let dist_id = &self.spec.distribution_id;

        let policy_id = match &self.spec.policy {
            Some(policy_spec) => Some(resolve_policy(self.control.as_ref(), policy_spec).await?),
            None => None,
        };

        let token = self.publish_with_retry(policy_id.as_deref()).await?;
        info!(distribution = %dist_id, %token, "Distribution configuration published");

        let invalidation = if self.spec.invalidation_paths.is_empty() {
            InvalidationStatus::Skipped
        } else {
            // Unique per call; reuse would collapse into a no-op remotely.
            let caller_reference = Uuid::new_v4().to_string();
            match self
                .control
                .create_invalidation(dist_id, &self.spec.invalidation_paths, &caller_reference)
                .await
            {
                Ok(id) => {
                    info!(distribution = %dist_id, invalidation = %id, "Invalidation started");
                    InvalidationStatus::Invalidated(id)
                }
                Err(err) => {
                    warn!(
                        distribution = %dist_id,
                        error = %err,
                        "Configuration is live but cache purge failed; stale content may be served until cached entries expire"
                    );
                    InvalidationStatus::Failed(err)
                }
            }
        };

        Ok(ReconcileOutcome { token, invalidation })
    }

    /// Fetch fresh, reapply the mutation, and publish; repeat on
    /// conflict or transient failure up to the configured bound.
    async fn publish_with_retry(
        &self,
        policy_id: Option<&str>,
    ) -> Result<String, ReconcileError> {
        let dist_id = &self.spec.distribution_id;
        let mut backoff = self.spec.retry.initial_backoff;
        let mut attempt = 0;

        loop {
            attempt += 1;

            // Always mutate a snapshot taken immediately before the write;
            // a cached snapshot would carry a stale token.
            let (mut config, token) = self.control.get_distribution_config(dist_id).await?;
            self.apply(&mut config, policy_id)?;
            config
                .validate()
                .map_err(|e| ReconcileError::Validation(e.to_string()))?;

            match self
                .control
                .update_distribution(dist_id, &token, &config)
                .await
            {
                Ok(new_token) => return Ok(new_token),
                Err(err @ (ControlPlaneError::Conflict(_) | ControlPlaneError::Transient(_))) => {
                    if attempt >= self.spec.retry.max_attempts {
                        return Err(ReconcileError::RetriesExhausted {
                            operation: "update_distribution",
                            resource: dist_id.clone(),
                            attempts: attempt,
                            source: err,
                        });
                    }
                    warn!(
                        distribution = %dist_id,
                        attempt,
                        error = %err,
                        "Publish failed; refetching and retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Apply the desired mutations to a freshly fetched configuration.
    fn apply(
        &self,
        config: &mut DistributionConfig,
        policy_id: Option<&str>,
    ) -> Result<(), ReconcileError> {
        if let Some(spec) = &self.spec.behavior {
            let origin = config.origins.first().ok_or_else(|| {
                ReconcileError::Validation(format!(
                    "distribution {} has no origins to target",
                    self.spec.distribution_id
                ))
            })?;

            let mut behavior = CacheBehavior::new(&spec.path_pattern, &origin.id);
            behavior.viewer_protocol_policy = spec.viewer_protocol_policy;
            behavior.allowed_methods = spec.allowed_methods.clone();
            behavior.cached_methods = spec.cached_methods.clone();
            behavior.compress = spec.compress;
            behavior.cache_policy_id = Some(spec.cache_policy_id.clone());
            if spec.attach_origin_request_policy {
                let id = policy_id.ok_or_else(|| {
                    ReconcileError::Validation(format!(
                        "behavior {} requires an origin request policy but none was resolved",
                        spec.path_pattern
                    ))
                })?;
                behavior.origin_request_policy_id = Some(id.to_string());
            }

            match upsert_behavior(&mut config.behaviors, behavior) {
                UpsertOutcome::Replaced(idx) => {
                    info!(pattern = %spec.path_pattern, index = idx, "Updating existing behavior")
                }
                UpsertOutcome::Appended => {
                    info!(pattern = %spec.path_pattern, "Adding new behavior")
                }
            }
        }

        if let Some(migration) = &self.spec.migrate_default {
            let origin_request_policy_id = policy_id.ok_or_else(|| {
                ReconcileError::Validation(
                    "default-behavior migration requires an origin request policy".to_string(),
                )
            })?;
            migrate_to_policies(
                &mut config.default_behavior,
                &migration.cache_policy_id,
                origin_request_policy_id,
            );
            info!(
                cache_policy = %migration.cache_policy_id,
                "Migrated default behavior to policy references"
            );
        }

        Ok(())
    }
}
