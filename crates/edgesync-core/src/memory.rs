//! In-memory control plane
//!
//! A self-contained implementation of [`ControlPlane`] backed by process
//! memory. It enforces the same optimistic-concurrency contract as the
//! real store and records calls so reconciler tests can assert on them.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

use crate::control::{ControlPlane, ControlPlaneError, PolicySummary};
use crate::model::{DistributionConfig, OriginRequestPolicySpec};

#[derive(Debug, Clone)]
struct StoredDistribution {
    config: DistributionConfig,
    token: String,
}

/// A recorded cache-purge request
#[derive(Debug, Clone)]
pub struct RecordedInvalidation {
    pub distribution_id: String,
    pub paths: Vec<String>,
    pub caller_reference: String,
}

#[derive(Default)]
struct Inner {
    distributions: HashMap<String, StoredDistribution>,
    policies: Vec<(PolicySummary, OriginRequestPolicySpec)>,
    invalidations: Vec<RecordedInvalidation>,
    create_policy_calls: usize,
    update_calls: usize,
    token_seq: u64,
    policy_seq: u64,
    invalidation_seq: u64,
    update_faults: VecDeque<ControlPlaneError>,
    invalidation_faults: VecDeque<ControlPlaneError>,
}

/// In-memory control plane for tests and offline exercising of the
/// reconciliation pipeline
#[derive(Default)]
pub struct InMemoryControlPlane {
    inner: Mutex<Inner>,
}

impl InMemoryControlPlane {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a distribution and return its initial token.
    pub fn insert_distribution(&self, id: &str, config: DistributionConfig) -> String {
        let mut inner = self.inner.lock();
        inner.token_seq += 1;
        let token = format!("etag-{}", inner.token_seq);
        inner.distributions.insert(
            id.to_string(),
            StoredDistribution {
                config,
                token: token.clone(),
            },
        );
        token
    }

    /// Seed an existing policy without counting a create call.
    pub fn insert_policy(&self, name: &str, spec: OriginRequestPolicySpec) -> String {
        let mut inner = self.inner.lock();
        inner.policy_seq += 1;
        let id = format!("orp-{}", inner.policy_seq);
        inner.policies.push((
            PolicySummary {
                id: id.clone(),
                name: name.to_string(),
            },
            spec,
        ));
        id
    }

    /// Queue an error returned by the next `update_distribution` call
    /// (before the write is applied).
    pub fn fail_next_update(&self, err: ControlPlaneError) {
        self.inner.lock().update_faults.push_back(err);
    }

    /// Queue an error returned by the next `create_invalidation` call.
    pub fn fail_next_invalidation(&self, err: ControlPlaneError) {
        self.inner.lock().invalidation_faults.push_back(err);
    }

    pub fn live_config(&self, id: &str) -> Option<DistributionConfig> {
        self.inner
            .lock()
            .distributions
            .get(id)
            .map(|d| d.config.clone())
    }

    pub fn live_token(&self, id: &str) -> Option<String> {
        self.inner
            .lock()
            .distributions
            .get(id)
            .map(|d| d.token.clone())
    }

    pub fn invalidations(&self) -> Vec<RecordedInvalidation> {
        self.inner.lock().invalidations.clone()
    }

    pub fn create_policy_calls(&self) -> usize {
        self.inner.lock().create_policy_calls
    }

    pub fn update_calls(&self) -> usize {
        self.inner.lock().update_calls
    }
}

#[async_trait]
impl ControlPlane for InMemoryControlPlane {
    async fn get_distribution_config(
        &self,
        distribution_id: &str,
    ) -> Result<(DistributionConfig, String), ControlPlaneError> {
        let inner = self.inner.lock();
        let stored = inner
            .distributions
            .get(distribution_id)
            .ok_or_else(|| ControlPlaneError::NotFound(format!("distribution {distribution_id}")))?;
        Ok((stored.config.clone(), stored.token.clone()))
    }

    async fn update_distribution(
        &self,
        distribution_id: &str,
        token: &str,
        config: &DistributionConfig,
    ) -> Result<String, ControlPlaneError> {
        let mut inner = self.inner.lock();
        inner.update_calls += 1;

        if let Some(fault) = inner.update_faults.pop_front() {
            return Err(fault);
        }

        let live_token = match inner.distributions.get(distribution_id) {
            Some(stored) => stored.token.clone(),
            None => {
                return Err(ControlPlaneError::NotFound(format!(
                    "distribution {distribution_id}"
                )));
            }
        };
        if live_token != token {
            return Err(ControlPlaneError::Conflict(format!(
                "token {token} does not match live version {live_token}"
            )));
        }

        // The remote store enforces the same invariants we validate locally.
        config
            .validate()
            .map_err(|e| ControlPlaneError::Validation(e.to_string()))?;

        inner.token_seq += 1;
        let new_token = format!("etag-{}", inner.token_seq);
        if let Some(stored) = inner.distributions.get_mut(distribution_id) {
            stored.config = config.clone();
            stored.token = new_token.clone();
        }
        Ok(new_token)
    }

    async fn list_origin_request_policies(
        &self,
    ) -> Result<Vec<PolicySummary>, ControlPlaneError> {
        let inner = self.inner.lock();
        Ok(inner.policies.iter().map(|(s, _)| s.clone()).collect())
    }

    async fn create_origin_request_policy(
        &self,
        spec: &OriginRequestPolicySpec,
    ) -> Result<String, ControlPlaneError> {
        let mut inner = self.inner.lock();
        inner.create_policy_calls += 1;
        if inner.policies.iter().any(|(s, _)| s.name == spec.name) {
            return Err(ControlPlaneError::Validation(format!(
                "policy {} already exists",
                spec.name
            )));
        }
        inner.policy_seq += 1;
        let id = format!("orp-{}", inner.policy_seq);
        inner.policies.push((
            PolicySummary {
                id: id.clone(),
                name: spec.name.clone(),
            },
            spec.clone(),
        ));
        Ok(id)
    }

    async fn create_invalidation(
        &self,
        distribution_id: &str,
        paths: &[String],
        caller_reference: &str,
    ) -> Result<String, ControlPlaneError> {
        let mut inner = self.inner.lock();

        if let Some(fault) = inner.invalidation_faults.pop_front() {
            return Err(fault);
        }

        if !inner.distributions.contains_key(distribution_id) {
            return Err(ControlPlaneError::NotFound(format!(
                "distribution {distribution_id}"
            )));
        }
        inner.invalidations.push(RecordedInvalidation {
            distribution_id: distribution_id.to_string(),
            paths: paths.to_vec(),
            caller_reference: caller_reference.to_string(),
        });
        inner.invalidation_seq += 1;
        Ok(format!("inv-{}", inner.invalidation_seq))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CacheBehavior, Origin};

    fn sample_config() -> DistributionConfig {
        let mut default_behavior = CacheBehavior::new("", "origin-1");
        default_behavior.cache_policy_id = Some("cp-managed".to_string());
        DistributionConfig {
            default_behavior,
            behaviors: vec![],
            origins: vec![Origin {
                id: "origin-1".to_string(),
                domain_name: "origin.example.com".to_string(),
            }],
        }
    }

    #[tokio::test]
    async fn stale_token_is_rejected_and_config_unchanged() {
        let control = InMemoryControlPlane::new();
        let stale = control.insert_distribution("dist-1", sample_config());

        // A concurrent writer commits first.
        let (config, token) = control.get_distribution_config("dist-1").await.unwrap();
        let mut changed = config.clone();
        changed.behaviors.push({
            let mut b = CacheBehavior::new("/stats", "origin-1");
            b.cache_policy_id = Some("cp-1".to_string());
            b
        });
        control
            .update_distribution("dist-1", &token, &changed)
            .await
            .unwrap();

        let mut late = config;
        late.behaviors.push({
            let mut b = CacheBehavior::new("/track", "origin-1");
            b.cache_policy_id = Some("cp-1".to_string());
            b
        });
        let err = control
            .update_distribution("dist-1", &stale, &late)
            .await
            .unwrap_err();
        assert!(matches!(err, ControlPlaneError::Conflict(_)));

        let live = control.live_config("dist-1").unwrap();
        assert_eq!(live, changed);
    }

    #[tokio::test]
    async fn update_validates_like_the_remote() {
        let control = InMemoryControlPlane::new();
        control.insert_distribution("dist-1", sample_config());

        let (mut config, token) = control.get_distribution_config("dist-1").await.unwrap();
        let mut behavior = CacheBehavior::new("/track", "origin-1");
        behavior.cache_policy_id = Some("cp-1".to_string());
        config.behaviors.push(behavior.clone());
        config.behaviors.push(behavior);

        let err = control
            .update_distribution("dist-1", &token, &config)
            .await
            .unwrap_err();
        assert!(matches!(err, ControlPlaneError::Validation(_)));
    }

    #[tokio::test]
    async fn unknown_distribution_is_not_found() {
        let control = InMemoryControlPlane::new();
        let err = control
            .get_distribution_config("dist-missing")
            .await
            .unwrap_err();
        assert!(matches!(err, ControlPlaneError::NotFound(_)));
    }
}
