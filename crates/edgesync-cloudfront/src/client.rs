//! CloudFront control-plane client

use async_trait::async_trait;
use aws_sdk_cloudfront::Client;
use aws_sdk_cloudfront::types::{self as cf, OriginRequestPolicyType};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info};

use edgesync_core::{
    ControlPlane, ControlPlaneError, DistributionConfig, OriginRequestPolicySpec, PolicySummary,
};

use crate::convert;
use crate::error::map_sdk_error;

/// CloudFront-backed control plane
///
/// Each fetch stashes the raw configuration under its concurrency token.
/// A publish overlays the modeled fields onto that stashed document and
/// submits the whole thing, so distribution settings this tool does not
/// model survive the round trip. Publishing under a token this client
/// never fetched is refused: a write must follow an immediately
/// preceding fetch.
pub struct CloudFrontControlPlane {
    client: Client,
    fetched: RwLock<HashMap<String, (String, cf::DistributionConfig)>>,
}

impl CloudFrontControlPlane {
    pub fn new(client: Client) -> Self {
        info!("Created CloudFront control plane client");
        Self {
            client,
            fetched: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl ControlPlane for CloudFrontControlPlane {
    async fn get_distribution_config(
        &self,
        distribution_id: &str,
    ) -> Result<(DistributionConfig, String), ControlPlaneError> {
        debug!(distribution = %distribution_id, "Fetching distribution config");
        let output = self
            .client
            .get_distribution_config()
            .id(distribution_id)
            .send()
            .await
            .map_err(|e| map_sdk_error("GetDistributionConfig", e))?;

        let token = output.e_tag.ok_or_else(|| {
            ControlPlaneError::Remote("GetDistributionConfig: response carried no ETag".to_string())
        })?;
        let raw = output.distribution_config.ok_or_else(|| {
            ControlPlaneError::Remote(
                "GetDistributionConfig: response carried no configuration".to_string(),
            )
        })?;

        let config = convert::config_from_sdk(&raw);
        self.fetched
            .write()
            .await
            .insert(distribution_id.to_string(), (token.clone(), raw));
        Ok((config, token))
    }

    async fn update_distribution(
        &self,
        distribution_id: &str,
        token: &str,
        config: &DistributionConfig,
    ) -> Result<String, ControlPlaneError> {
        let mut raw = {
            let fetched = self.fetched.read().await;
            match fetched.get(distribution_id) {
                Some((stashed_token, raw)) if stashed_token == token => raw.clone(),
                _ => {
                    return Err(ControlPlaneError::Validation(format!(
                        "update of {distribution_id} must present the token from the immediately preceding fetch"
                    )));
                }
            }
        };
        convert::overlay_config(&mut raw, config)?;

        debug!(distribution = %distribution_id, "Publishing distribution config");
        let output = self
            .client
            .update_distribution()
            .id(distribution_id)
            .if_match(token)
            .distribution_config(raw)
            .send()
            .await
            .map_err(|e| map_sdk_error("UpdateDistribution", e))?;

        self.fetched.write().await.remove(distribution_id);
        output.e_tag.ok_or_else(|| {
            ControlPlaneError::Remote("UpdateDistribution: response carried no ETag".to_string())
        })
    }

    async fn list_origin_request_policies(
        &self,
    ) -> Result<Vec<PolicySummary>, ControlPlaneError> {
        let mut summaries = Vec::new();
        let mut marker: Option<String> = None;

        // Walk every page; a partial scan risks a false "not found" that
        // would trigger a duplicate creation.
        loop {
            let mut req = self
                .client
                .list_origin_request_policies()
                .r#type(OriginRequestPolicyType::Custom);
            if let Some(ref m) = marker {
                req = req.marker(m);
            }
            let output = req
                .send()
                .await
                .map_err(|e| map_sdk_error("ListOriginRequestPolicies", e))?;

            let Some(list) = output.origin_request_policy_list else {
                break;
            };
            for summary in list.items.unwrap_or_default() {
                let Some(policy) = summary.origin_request_policy else {
                    continue;
                };
                let name = policy
                    .origin_request_policy_config
                    .map(|c| c.name)
                    .unwrap_or_default();
                summaries.push(PolicySummary {
                    id: policy.id,
                    name,
                });
            }
            match list.next_marker {
                Some(next) if !next.is_empty() => marker = Some(next),
                _ => break,
            }
        }

        debug!(count = summaries.len(), "Listed custom origin request policies");
        Ok(summaries)
    }

    async fn create_origin_request_policy(
        &self,
        spec: &OriginRequestPolicySpec,
    ) -> Result<String, ControlPlaneError> {
        let config = convert::policy_spec_to_sdk(spec)?;
        let output = self
            .client
            .create_origin_request_policy()
            .origin_request_policy_config(config)
            .send()
            .await
            .map_err(|e| map_sdk_error("CreateOriginRequestPolicy", e))?;

        output
            .origin_request_policy
            .map(|p| p.id)
            .ok_or_else(|| {
                ControlPlaneError::Remote(
                    "CreateOriginRequestPolicy: response carried no policy".to_string(),
                )
            })
    }

    async fn create_invalidation(
        &self,
        distribution_id: &str,
        paths: &[String],
        caller_reference: &str,
    ) -> Result<String, ControlPlaneError> {
        let batch = convert::invalidation_batch_to_sdk(paths, caller_reference)?;
        let output = self
            .client
            .create_invalidation()
            .distribution_id(distribution_id)
            .invalidation_batch(batch)
            .send()
            .await
            .map_err(|e| map_sdk_error("CreateInvalidation", e))?;

        output.invalidation.map(|i| i.id).ok_or_else(|| {
            ControlPlaneError::Remote(
                "CreateInvalidation: response carried no invalidation".to_string(),
            )
        })
    }
}
