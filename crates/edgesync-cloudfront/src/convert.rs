//! Conversions between the domain model and SDK types
//!
//! Reads are lenient (missing or unrecognized remote values fall back to
//! defaults); writes overlay the modeled fields onto the raw fetched
//! document so unmapped settings survive the round trip.

use std::str::FromStr;

use aws_sdk_cloudfront::error::BuildError;
use aws_sdk_cloudfront::types as cf;
use tracing::warn;

use edgesync_core::{
    CacheBehavior, ControlPlaneError, DistributionConfig, ForwardBehavior, ForwardedValues,
    HttpMethod, Origin, OriginRequestPolicySpec, ViewerProtocolPolicy,
};

pub(crate) fn build_err(err: BuildError) -> ControlPlaneError {
    ControlPlaneError::Validation(err.to_string())
}

// ---------------------------------------------------------------------------
// SDK -> domain
// ---------------------------------------------------------------------------

pub(crate) fn config_from_sdk(raw: &cf::DistributionConfig) -> DistributionConfig {
    let origins = raw
        .origins()
        .map(|o| o.items())
        .unwrap_or_default()
        .iter()
        .map(|o| Origin {
            id: o.id().to_string(),
            domain_name: o.domain_name().to_string(),
        })
        .collect();

    let behaviors = raw
        .cache_behaviors()
        .map(|cb| cb.items())
        .unwrap_or_default()
        .iter()
        .map(behavior_from_sdk)
        .collect();

    let default_behavior = raw
        .default_cache_behavior()
        .map(default_behavior_from_sdk)
        .unwrap_or_else(|| CacheBehavior::new("", ""));

    DistributionConfig {
        default_behavior,
        behaviors,
        origins,
    }
}

fn methods_from_sdk(items: &[cf::Method]) -> Vec<HttpMethod> {
    items
        .iter()
        .filter_map(|m| match HttpMethod::from_str(m.as_str()) {
            Ok(method) => Some(method),
            Err(_) => {
                warn!(method = %m.as_str(), "Skipping unrecognized HTTP method");
                None
            }
        })
        .collect()
}

fn vpp_from_sdk(policy: &cf::ViewerProtocolPolicy) -> ViewerProtocolPolicy {
    match ViewerProtocolPolicy::from_str(policy.as_str()) {
        Ok(policy) => policy,
        Err(_) => {
            warn!(policy = %policy.as_str(), "Unrecognized viewer protocol policy, assuming default");
            ViewerProtocolPolicy::default()
        }
    }
}

fn forwarded_values_from_sdk(fv: &cf::ForwardedValues) -> ForwardedValues {
    ForwardedValues {
        query_string: fv.query_string(),
        headers: fv
            .headers()
            .map(|h| h.items().to_vec())
            .unwrap_or_default(),
        cookies: fv
            .cookies()
            .and_then(|c| ForwardBehavior::from_str(c.forward().as_str()).ok())
            .unwrap_or_default(),
        cookie_whitelist: fv
            .cookies()
            .and_then(|c| c.whitelisted_names())
            .map(|n| n.items().to_vec())
            .unwrap_or_default(),
    }
}

fn behavior_from_sdk(b: &cf::CacheBehavior) -> CacheBehavior {
    CacheBehavior {
        path_pattern: b.path_pattern().to_string(),
        target_origin_id: b.target_origin_id().to_string(),
        viewer_protocol_policy: vpp_from_sdk(b.viewer_protocol_policy()),
        allowed_methods: b
            .allowed_methods()
            .map(|m| methods_from_sdk(m.items()))
            .unwrap_or_else(|| vec![HttpMethod::Get, HttpMethod::Head]),
        cached_methods: b
            .allowed_methods()
            .and_then(|m| m.cached_methods())
            .map(|c| methods_from_sdk(c.items()))
            .unwrap_or_else(|| vec![HttpMethod::Get, HttpMethod::Head]),
        compress: b.compress().unwrap_or(false),
        cache_policy_id: b.cache_policy_id().map(String::from),
        origin_request_policy_id: b.origin_request_policy_id().map(String::from),
        forwarded_values: b.forwarded_values().map(forwarded_values_from_sdk),
        min_ttl: b.min_ttl(),
        default_ttl: b.default_ttl(),
        max_ttl: b.max_ttl(),
    }
}

fn default_behavior_from_sdk(b: &cf::DefaultCacheBehavior) -> CacheBehavior {
    CacheBehavior {
        path_pattern: String::new(),
        target_origin_id: b.target_origin_id().to_string(),
        viewer_protocol_policy: vpp_from_sdk(b.viewer_protocol_policy()),
        allowed_methods: b
            .allowed_methods()
            .map(|m| methods_from_sdk(m.items()))
            .unwrap_or_else(|| vec![HttpMethod::Get, HttpMethod::Head]),
        cached_methods: b
            .allowed_methods()
            .and_then(|m| m.cached_methods())
            .map(|c| methods_from_sdk(c.items()))
            .unwrap_or_else(|| vec![HttpMethod::Get, HttpMethod::Head]),
        compress: b.compress().unwrap_or(false),
        cache_policy_id: b.cache_policy_id().map(String::from),
        origin_request_policy_id: b.origin_request_policy_id().map(String::from),
        forwarded_values: b.forwarded_values().map(forwarded_values_from_sdk),
        min_ttl: b.min_ttl(),
        default_ttl: b.default_ttl(),
        max_ttl: b.max_ttl(),
    }
}

// ---------------------------------------------------------------------------
// Domain -> SDK
// ---------------------------------------------------------------------------

/// Overlay the modeled behaviors onto a raw fetched configuration.
///
/// Behaviors that keep their path pattern start from their raw
/// counterpart, so unmapped per-behavior settings (function
/// associations, trusted signers, ...) are preserved; brand-new
/// behaviors are built from scratch.
pub(crate) fn overlay_config(
    raw: &mut cf::DistributionConfig,
    config: &DistributionConfig,
) -> Result<(), ControlPlaneError> {
    let existing_default = raw.default_cache_behavior.take();
    raw.default_cache_behavior = Some(overlay_default_behavior(
        existing_default,
        &config.default_behavior,
    )?);

    let existing: Vec<cf::CacheBehavior> = raw
        .cache_behaviors
        .take()
        .and_then(|cb| cb.items)
        .unwrap_or_default();

    let mut items = Vec::with_capacity(config.behaviors.len());
    for behavior in &config.behaviors {
        let base = existing
            .iter()
            .find(|e| e.path_pattern == behavior.path_pattern)
            .cloned();
        items.push(overlay_behavior(base, behavior)?);
    }

    let quantity = items.len() as i32;
    raw.cache_behaviors = Some(
        cf::CacheBehaviors::builder()
            .quantity(quantity)
            .set_items(Some(items))
            .build()
            .map_err(build_err)?,
    );
    Ok(())
}

fn vpp_to_sdk(policy: ViewerProtocolPolicy) -> cf::ViewerProtocolPolicy {
    cf::ViewerProtocolPolicy::from(policy.as_str())
}

fn allowed_methods_to_sdk(
    allowed: &[HttpMethod],
    cached: &[HttpMethod],
) -> Result<cf::AllowedMethods, ControlPlaneError> {
    let items: Vec<cf::Method> = allowed
        .iter()
        .map(|m| cf::Method::from(m.as_str()))
        .collect();
    let cached_items: Vec<cf::Method> = cached
        .iter()
        .map(|m| cf::Method::from(m.as_str()))
        .collect();

    let cached_methods = cf::CachedMethods::builder()
        .quantity(cached_items.len() as i32)
        .set_items(Some(cached_items))
        .build()
        .map_err(build_err)?;

    cf::AllowedMethods::builder()
        .quantity(items.len() as i32)
        .set_items(Some(items))
        .cached_methods(cached_methods)
        .build()
        .map_err(build_err)
}

fn forwarded_values_to_sdk(fv: &ForwardedValues) -> Result<cf::ForwardedValues, ControlPlaneError> {
    let mut cookies = cf::CookiePreference::builder()
        .forward(cf::ItemSelection::from(fv.cookies.as_str()));
    if !fv.cookie_whitelist.is_empty() {
        cookies = cookies.whitelisted_names(
            cf::CookieNames::builder()
                .quantity(fv.cookie_whitelist.len() as i32)
                .set_items(Some(fv.cookie_whitelist.clone()))
                .build()
                .map_err(build_err)?,
        );
    }

    let mut builder = cf::ForwardedValues::builder()
        .query_string(fv.query_string)
        .cookies(cookies.build().map_err(build_err)?);
    if !fv.headers.is_empty() {
        builder = builder.headers(
            cf::Headers::builder()
                .quantity(fv.headers.len() as i32)
                .set_items(Some(fv.headers.clone()))
                .build()
                .map_err(build_err)?,
        );
    }
    builder.build().map_err(build_err)
}

fn overlay_behavior(
    base: Option<cf::CacheBehavior>,
    behavior: &CacheBehavior,
) -> Result<cf::CacheBehavior, ControlPlaneError> {
    let mut sdk = match base {
        Some(existing) => existing,
        None => cf::CacheBehavior::builder()
            .path_pattern(&behavior.path_pattern)
            .target_origin_id(&behavior.target_origin_id)
            .viewer_protocol_policy(vpp_to_sdk(behavior.viewer_protocol_policy))
            .build()
            .map_err(build_err)?,
    };

    sdk.path_pattern = behavior.path_pattern.clone();
    sdk.target_origin_id = behavior.target_origin_id.clone();
    sdk.viewer_protocol_policy = vpp_to_sdk(behavior.viewer_protocol_policy);
    sdk.allowed_methods = Some(allowed_methods_to_sdk(
        &behavior.allowed_methods,
        &behavior.cached_methods,
    )?);
    sdk.compress = Some(behavior.compress);
    sdk.cache_policy_id = behavior.cache_policy_id.clone();
    sdk.origin_request_policy_id = behavior.origin_request_policy_id.clone();
    sdk.forwarded_values = behavior
        .forwarded_values
        .as_ref()
        .map(forwarded_values_to_sdk)
        .transpose()?;
    sdk.min_ttl = behavior.min_ttl;
    sdk.default_ttl = behavior.default_ttl;
    sdk.max_ttl = behavior.max_ttl;
    Ok(sdk)
}

fn overlay_default_behavior(
    base: Option<cf::DefaultCacheBehavior>,
    behavior: &CacheBehavior,
) -> Result<cf::DefaultCacheBehavior, ControlPlaneError> {
    let mut sdk = match base {
        Some(existing) => existing,
        None => cf::DefaultCacheBehavior::builder()
            .target_origin_id(&behavior.target_origin_id)
            .viewer_protocol_policy(vpp_to_sdk(behavior.viewer_protocol_policy))
            .build()
            .map_err(build_err)?,
    };

    sdk.target_origin_id = behavior.target_origin_id.clone();
    sdk.viewer_protocol_policy = vpp_to_sdk(behavior.viewer_protocol_policy);
    sdk.allowed_methods = Some(allowed_methods_to_sdk(
        &behavior.allowed_methods,
        &behavior.cached_methods,
    )?);
    sdk.compress = Some(behavior.compress);
    sdk.cache_policy_id = behavior.cache_policy_id.clone();
    sdk.origin_request_policy_id = behavior.origin_request_policy_id.clone();
    sdk.forwarded_values = behavior
        .forwarded_values
        .as_ref()
        .map(forwarded_values_to_sdk)
        .transpose()?;
    sdk.min_ttl = behavior.min_ttl;
    sdk.default_ttl = behavior.default_ttl;
    sdk.max_ttl = behavior.max_ttl;
    Ok(sdk)
}

fn forward_names<T: Clone>(names: &[T]) -> Option<Vec<T>> {
    if names.is_empty() {
        None
    } else {
        Some(names.to_vec())
    }
}

pub(crate) fn policy_spec_to_sdk(
    spec: &OriginRequestPolicySpec,
) -> Result<cf::OriginRequestPolicyConfig, ControlPlaneError> {
    let header_behavior = match spec.header_behavior {
        ForwardBehavior::None => cf::OriginRequestPolicyHeaderBehavior::None,
        ForwardBehavior::Whitelist => cf::OriginRequestPolicyHeaderBehavior::Whitelist,
        ForwardBehavior::All => cf::OriginRequestPolicyHeaderBehavior::AllViewer,
    };
    let mut headers_config = cf::OriginRequestPolicyHeadersConfig::builder()
        .header_behavior(header_behavior);
    if let Some(headers) = forward_names(&spec.headers) {
        headers_config = headers_config.headers(
            cf::Headers::builder()
                .quantity(headers.len() as i32)
                .set_items(Some(headers))
                .build()
                .map_err(build_err)?,
        );
    }

    let cookie_behavior = match spec.cookie_behavior {
        ForwardBehavior::None => cf::OriginRequestPolicyCookieBehavior::None,
        ForwardBehavior::Whitelist => cf::OriginRequestPolicyCookieBehavior::Whitelist,
        ForwardBehavior::All => cf::OriginRequestPolicyCookieBehavior::All,
    };
    let mut cookies_config = cf::OriginRequestPolicyCookiesConfig::builder()
        .cookie_behavior(cookie_behavior);
    if let Some(cookies) = forward_names(&spec.cookies) {
        cookies_config = cookies_config.cookies(
            cf::CookieNames::builder()
                .quantity(cookies.len() as i32)
                .set_items(Some(cookies))
                .build()
                .map_err(build_err)?,
        );
    }

    let query_string_behavior = match spec.query_string_behavior {
        ForwardBehavior::None => cf::OriginRequestPolicyQueryStringBehavior::None,
        ForwardBehavior::Whitelist => cf::OriginRequestPolicyQueryStringBehavior::Whitelist,
        ForwardBehavior::All => cf::OriginRequestPolicyQueryStringBehavior::All,
    };
    let mut query_strings_config = cf::OriginRequestPolicyQueryStringsConfig::builder()
        .query_string_behavior(query_string_behavior);
    if let Some(query_strings) = forward_names(&spec.query_strings) {
        query_strings_config = query_strings_config.query_strings(
            cf::QueryStringNames::builder()
                .quantity(query_strings.len() as i32)
                .set_items(Some(query_strings))
                .build()
                .map_err(build_err)?,
        );
    }

    cf::OriginRequestPolicyConfig::builder()
        .name(&spec.name)
        .comment(&spec.comment)
        .headers_config(headers_config.build().map_err(build_err)?)
        .cookies_config(cookies_config.build().map_err(build_err)?)
        .query_strings_config(query_strings_config.build().map_err(build_err)?)
        .build()
        .map_err(build_err)
}

pub(crate) fn invalidation_batch_to_sdk(
    paths: &[String],
    caller_reference: &str,
) -> Result<cf::InvalidationBatch, ControlPlaneError> {
    let path_set = cf::Paths::builder()
        .quantity(paths.len() as i32)
        .set_items(Some(paths.to_vec()))
        .build()
        .map_err(build_err)?;
    cf::InvalidationBatch::builder()
        .paths(path_set)
        .caller_reference(caller_reference)
        .build()
        .map_err(build_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use edgesync_core::migrate_to_policies;

    fn raw_behavior(pattern: &str) -> cf::CacheBehavior {
        let mut b = cf::CacheBehavior::builder()
            .path_pattern(pattern)
            .target_origin_id("origin-1")
            .viewer_protocol_policy(cf::ViewerProtocolPolicy::RedirectToHttps)
            .build()
            .unwrap();
        b.cache_policy_id = Some("cp-1".to_string());
        b.smooth_streaming = Some(true);
        b
    }

    fn raw_config() -> cf::DistributionConfig {
        let origin = cf::Origin::builder()
            .id("origin-1")
            .domain_name("origin.example.com")
            .build()
            .unwrap();
        let origins = cf::Origins::builder()
            .quantity(1)
            .items(origin)
            .build()
            .unwrap();
        let mut default_behavior = cf::DefaultCacheBehavior::builder()
            .target_origin_id("origin-1")
            .viewer_protocol_policy(cf::ViewerProtocolPolicy::RedirectToHttps)
            .build()
            .unwrap();
        default_behavior.min_ttl = Some(0);
        default_behavior.default_ttl = Some(0);
        default_behavior.max_ttl = Some(0);
        default_behavior.forwarded_values = Some(
            cf::ForwardedValues::builder()
                .query_string(false)
                .cookies(
                    cf::CookiePreference::builder()
                        .forward(cf::ItemSelection::None)
                        .build()
                        .unwrap(),
                )
                .build()
                .unwrap(),
        );

        cf::DistributionConfig::builder()
            .caller_reference("seed")
            .comment("test distribution")
            .enabled(true)
            .origins(origins)
            .default_cache_behavior(default_behavior)
            .cache_behaviors(
                cf::CacheBehaviors::builder()
                    .quantity(1)
                    .items(raw_behavior("/stats"))
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn domain_view_of_raw_config() {
        let raw = raw_config();
        let config = config_from_sdk(&raw);

        assert_eq!(config.origins.len(), 1);
        assert_eq!(config.origins[0].id, "origin-1");
        assert_eq!(config.behaviors.len(), 1);
        assert_eq!(config.behaviors[0].path_pattern, "/stats");
        assert!(config.default_behavior.has_legacy_fields());
        assert_eq!(config.default_behavior.min_ttl, Some(0));
    }

    #[test]
    fn overlay_preserves_unmapped_behavior_fields() {
        let mut raw = raw_config();
        let mut config = config_from_sdk(&raw);
        config.behaviors[0].compress = true;

        overlay_config(&mut raw, &config).unwrap();

        let items = raw.cache_behaviors.unwrap().items.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].smooth_streaming, Some(true));
        assert_eq!(items[0].compress, Some(true));
    }

    #[test]
    fn overlay_clears_legacy_fields_after_migration() {
        let mut raw = raw_config();
        let mut config = config_from_sdk(&raw);
        migrate_to_policies(&mut config.default_behavior, "X", "Y");

        overlay_config(&mut raw, &config).unwrap();

        let default_behavior = raw.default_cache_behavior.unwrap();
        assert_eq!(default_behavior.cache_policy_id.as_deref(), Some("X"));
        assert_eq!(
            default_behavior.origin_request_policy_id.as_deref(),
            Some("Y")
        );
        assert!(default_behavior.forwarded_values.is_none());
        assert!(default_behavior.min_ttl.is_none());
        assert!(default_behavior.default_ttl.is_none());
        assert!(default_behavior.max_ttl.is_none());
    }

    #[test]
    fn overlay_appends_new_behavior_with_quantity_in_sync() {
        let mut raw = raw_config();
        let mut config = config_from_sdk(&raw);
        let mut track = CacheBehavior::new("/track", "origin-1");
        track.allowed_methods = HttpMethod::all();
        track.cache_policy_id = Some("cp-1".to_string());
        config.behaviors.push(track);

        overlay_config(&mut raw, &config).unwrap();

        let behaviors = raw.cache_behaviors.unwrap();
        assert_eq!(behaviors.quantity, 2);
        let items = behaviors.items.unwrap();
        assert_eq!(items[0].path_pattern, "/stats");
        assert_eq!(items[1].path_pattern, "/track");
        let allowed = items[1].allowed_methods.as_ref().unwrap();
        assert_eq!(allowed.quantity, 7);
        assert_eq!(allowed.items.len(), 7);
    }

    #[test]
    fn policy_spec_maps_whitelisted_headers() {
        let spec = OriginRequestPolicySpec {
            name: "GeoForwardPolicy".to_string(),
            comment: "Forward viewer geo headers".to_string(),
            header_behavior: ForwardBehavior::Whitelist,
            headers: vec!["CloudFront-Viewer-Country".to_string()],
            cookie_behavior: ForwardBehavior::None,
            cookies: vec![],
            query_string_behavior: ForwardBehavior::None,
            query_strings: vec![],
        };

        let config = policy_spec_to_sdk(&spec).unwrap();
        assert_eq!(config.name, "GeoForwardPolicy");
        let headers_config = config.headers_config.unwrap();
        assert_eq!(
            headers_config.header_behavior,
            cf::OriginRequestPolicyHeaderBehavior::Whitelist
        );
        assert_eq!(headers_config.headers.unwrap().quantity, 1);
    }
}
