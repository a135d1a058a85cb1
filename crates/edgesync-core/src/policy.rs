//! Origin-request policy resolution

use tracing::{debug, info};

use crate::control::{ControlPlane, ControlPlaneError};
use crate::model::OriginRequestPolicySpec;

/// Find or create the policy named in the spec and return its id.
///
/// An existing policy with a matching name wins unconditionally; its
/// actual configuration is not reconciled against the spec (create-once
/// semantics). Listing covers the complete result set, so an absent name
/// really means absent and a create cannot duplicate.
pub async fn resolve_policy(
    control: &dyn ControlPlane,
    spec: &OriginRequestPolicySpec,
) -> Result<String, ControlPlaneError> {
    let policies = control.list_origin_request_policies().await?;
    if let Some(existing) = policies.iter().find(|p| p.name == spec.name) {
        debug!(
            policy = %spec.name,
            id = %existing.id,
            "Reusing existing origin request policy"
        );
        return Ok(existing.id.clone());
    }

    info!(policy = %spec.name, "Creating origin request policy");
    let id = control.create_origin_request_policy(spec).await?;
    info!(policy = %spec.name, %id, "Origin request policy created");
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryControlPlane;
    use crate::model::ForwardBehavior;

    fn geo_spec() -> OriginRequestPolicySpec {
        OriginRequestPolicySpec {
            name: "GeoForwardPolicy".to_string(),
            comment: "Forward viewer geo headers".to_string(),
            header_behavior: ForwardBehavior::Whitelist,
            headers: vec![
                "CloudFront-Viewer-Country".to_string(),
                "Referer".to_string(),
            ],
            cookie_behavior: ForwardBehavior::None,
            cookies: vec![],
            query_string_behavior: ForwardBehavior::None,
            query_strings: vec![],
        }
    }

    #[tokio::test]
    async fn resolve_creates_once_and_returns_same_id() {
        let control = InMemoryControlPlane::new();
        let spec = geo_spec();

        let first = resolve_policy(&control, &spec).await.unwrap();
        let second = resolve_policy(&control, &spec).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(control.create_policy_calls(), 1);
    }

    #[tokio::test]
    async fn resolve_reuses_policy_without_reconciling_drift() {
        let control = InMemoryControlPlane::new();
        let existing_id = control.insert_policy("GeoForwardPolicy", geo_spec());

        // A spec edited after first creation is silently ignored.
        let mut drifted = geo_spec();
        drifted.headers.push("CloudFront-Viewer-City".to_string());

        let resolved = resolve_policy(&control, &drifted).await.unwrap();
        assert_eq!(resolved, existing_id);
        assert_eq!(control.create_policy_calls(), 0);
    }

    #[tokio::test]
    async fn resolve_finds_name_among_many_policies() {
        let control = InMemoryControlPlane::new();
        for i in 0..25 {
            let mut spec = geo_spec();
            spec.name = format!("OtherPolicy{i}");
            control.insert_policy(&spec.name.clone(), spec);
        }
        let wanted = control.insert_policy("GeoForwardPolicy", geo_spec());

        let resolved = resolve_policy(&control, &geo_spec()).await.unwrap();
        assert_eq!(resolved, wanted);
        assert_eq!(control.create_policy_calls(), 0);
    }
}
