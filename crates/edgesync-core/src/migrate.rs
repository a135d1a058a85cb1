//! Migration from legacy direct-TTL caching to policy references

use crate::model::CacheBehavior;

/// Switch a behavior to the policy-referencing caching model.
///
/// Sets both policy references, then removes the legacy direct-caching
/// fields if present. A behavior must use exactly one of the two models;
/// leaving both in place is rejected by the remote store. Calling this
/// again once the legacy fields are gone is a no-op that still yields
/// the correct references.
pub fn migrate_to_policies(
    behavior: &mut CacheBehavior,
    cache_policy_id: &str,
    origin_request_policy_id: &str,
) {
    behavior.cache_policy_id = Some(cache_policy_id.to_string());
    behavior.origin_request_policy_id = Some(origin_request_policy_id.to_string());
    behavior.forwarded_values = None;
    behavior.min_ttl = None;
    behavior.default_ttl = None;
    behavior.max_ttl = None;
}
