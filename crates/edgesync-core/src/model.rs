//! Domain model for the distribution configuration

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error type for parsing model enums from strings
#[derive(Debug, Clone)]
pub struct ParseModelError(String);

impl fmt::Display for ParseModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid value: {}", self.0)
    }
}

impl std::error::Error for ParseModelError {}

/// HTTP method allowed on a behavior
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Head,
    Options,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// The full method set accepted by write-capable behaviors
    pub fn all() -> Vec<HttpMethod> {
        vec![
            HttpMethod::Get,
            HttpMethod::Head,
            HttpMethod::Post,
            HttpMethod::Put,
            HttpMethod::Patch,
            HttpMethod::Options,
            HttpMethod::Delete,
        ]
    }
}

impl FromStr for HttpMethod {
    type Err = ParseModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "HEAD" => Ok(HttpMethod::Head),
            "OPTIONS" => Ok(HttpMethod::Options),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "PATCH" => Ok(HttpMethod::Patch),
            "DELETE" => Ok(HttpMethod::Delete),
            _ => Err(ParseModelError(s.to_string())),
        }
    }
}

/// Viewer protocol policy for a behavior
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ViewerProtocolPolicy {
    AllowAll,
    #[default]
    RedirectToHttps,
    HttpsOnly,
}

impl ViewerProtocolPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewerProtocolPolicy::AllowAll => "allow-all",
            ViewerProtocolPolicy::RedirectToHttps => "redirect-to-https",
            ViewerProtocolPolicy::HttpsOnly => "https-only",
        }
    }
}

impl FromStr for ViewerProtocolPolicy {
    type Err = ParseModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "allow-all" => Ok(ViewerProtocolPolicy::AllowAll),
            "redirect-to-https" => Ok(ViewerProtocolPolicy::RedirectToHttps),
            "https-only" => Ok(ViewerProtocolPolicy::HttpsOnly),
            _ => Err(ParseModelError(s.to_string())),
        }
    }
}

/// Forwarding selection for headers, cookies, and query strings
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ForwardBehavior {
    #[default]
    None,
    Whitelist,
    All,
}

impl ForwardBehavior {
    pub fn as_str(&self) -> &'static str {
        match self {
            ForwardBehavior::None => "none",
            ForwardBehavior::Whitelist => "whitelist",
            ForwardBehavior::All => "all",
        }
    }
}

impl FromStr for ForwardBehavior {
    type Err = ParseModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(ForwardBehavior::None),
            "whitelist" => Ok(ForwardBehavior::Whitelist),
            "all" => Ok(ForwardBehavior::All),
            _ => Err(ParseModelError(s.to_string())),
        }
    }
}

/// Legacy request-forwarding descriptor, mutually exclusive with policy
/// references on the same behavior
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ForwardedValues {
    pub query_string: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<String>,
    #[serde(default)]
    pub cookies: ForwardBehavior,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cookie_whitelist: Vec<String>,
}

/// A path-pattern-scoped routing/caching rule
///
/// The same type is used for the default behavior slot, where the path
/// pattern is empty and ignored (the default behavior matches everything
/// no other pattern claims first).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheBehavior {
    pub path_pattern: String,
    pub target_origin_id: String,
    pub viewer_protocol_policy: ViewerProtocolPolicy,
    pub allowed_methods: Vec<HttpMethod>,
    pub cached_methods: Vec<HttpMethod>,
    pub compress: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_policy_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_request_policy_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forwarded_values: Option<ForwardedValues>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_ttl: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_ttl: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_ttl: Option<i64>,
}

impl CacheBehavior {
    /// Create a behavior with the common defaults: GET/HEAD only,
    /// HTTPS redirect, compression on, no caching model attached yet.
    pub fn new(path_pattern: impl Into<String>, target_origin_id: impl Into<String>) -> Self {
        Self {
            path_pattern: path_pattern.into(),
            target_origin_id: target_origin_id.into(),
            viewer_protocol_policy: ViewerProtocolPolicy::RedirectToHttps,
            allowed_methods: vec![HttpMethod::Get, HttpMethod::Head],
            cached_methods: vec![HttpMethod::Get, HttpMethod::Head],
            compress: true,
            cache_policy_id: None,
            origin_request_policy_id: None,
            forwarded_values: None,
            min_ttl: None,
            default_ttl: None,
            max_ttl: None,
        }
    }

    /// Whether any legacy direct-caching field is still present
    pub fn has_legacy_fields(&self) -> bool {
        self.forwarded_values.is_some()
            || self.min_ttl.is_some()
            || self.default_ttl.is_some()
            || self.max_ttl.is_some()
    }
}

/// An origin referenced by behaviors; never created by this system
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Origin {
    pub id: String,
    pub domain_name: String,
}

/// Versioned routing/caching configuration of a distribution
///
/// The concurrency token is not part of this structure; it travels
/// alongside as an opaque string returned by the fetch that produced
/// this snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DistributionConfig {
    pub default_behavior: CacheBehavior,
    #[serde(default)]
    pub behaviors: Vec<CacheBehavior>,
    #[serde(default)]
    pub origins: Vec<Origin>,
}

/// A local validation failure that must never be submitted to the remote
#[derive(Debug, Clone)]
pub struct InvalidConfig(pub String);

impl fmt::Display for InvalidConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for InvalidConfig {}

impl DistributionConfig {
    /// Check the invariants the remote store enforces: unique path
    /// patterns and exactly one caching model per behavior.
    pub fn validate(&self) -> Result<(), InvalidConfig> {
        let mut seen = Vec::with_capacity(self.behaviors.len());
        for behavior in &self.behaviors {
            if seen.contains(&behavior.path_pattern.as_str()) {
                return Err(InvalidConfig(format!(
                    "duplicate path pattern: {}",
                    behavior.path_pattern
                )));
            }
            seen.push(behavior.path_pattern.as_str());
        }

        for behavior in std::iter::once(&self.default_behavior).chain(self.behaviors.iter()) {
            let label = if behavior.path_pattern.is_empty() {
                "default behavior"
            } else {
                behavior.path_pattern.as_str()
            };
            let has_policy_refs =
                behavior.cache_policy_id.is_some() || behavior.origin_request_policy_id.is_some();
            if has_policy_refs && behavior.has_legacy_fields() {
                return Err(InvalidConfig(format!(
                    "{}: policy references and legacy caching fields are mutually exclusive",
                    label
                )));
            }
            if behavior.cache_policy_id.is_none() && !behavior.has_legacy_fields() {
                return Err(InvalidConfig(format!(
                    "{}: behavior declares neither a cache policy nor legacy caching fields",
                    label
                )));
            }
        }
        Ok(())
    }
}

/// Desired origin-request policy; immutable once referenced, uniqueness
/// key is the name
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OriginRequestPolicySpec {
    pub name: String,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub header_behavior: ForwardBehavior,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<String>,
    #[serde(default)]
    pub cookie_behavior: ForwardBehavior,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cookies: Vec<String>,
    #[serde(default)]
    pub query_string_behavior: ForwardBehavior,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub query_strings: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy_behavior(pattern: &str) -> CacheBehavior {
        let mut b = CacheBehavior::new(pattern, "origin-1");
        b.cache_policy_id = Some("cp-1".to_string());
        b
    }

    fn config_with(behaviors: Vec<CacheBehavior>) -> DistributionConfig {
        DistributionConfig {
            default_behavior: policy_behavior(""),
            behaviors,
            origins: vec![Origin {
                id: "origin-1".to_string(),
                domain_name: "origin.example.com".to_string(),
            }],
        }
    }

    #[test]
    fn method_round_trip() {
        for m in HttpMethod::all() {
            assert_eq!(m.as_str().parse::<HttpMethod>().unwrap(), m);
        }
        assert!("TRACE".parse::<HttpMethod>().is_err());
    }

    #[test]
    fn validate_accepts_unique_patterns() {
        let config = config_with(vec![policy_behavior("/stats"), policy_behavior("/track")]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_duplicate_patterns() {
        let config = config_with(vec![policy_behavior("/track"), policy_behavior("/track")]);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("/track"));
    }

    #[test]
    fn validate_rejects_mixed_caching_models() {
        let mut behavior = policy_behavior("/track");
        behavior.min_ttl = Some(0);
        let config = config_with(vec![behavior]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_origin_request_policy_with_legacy_fields() {
        let mut behavior = CacheBehavior::new("/track", "origin-1");
        behavior.origin_request_policy_id = Some("orp-1".to_string());
        behavior.forwarded_values = Some(ForwardedValues::default());
        let config = config_with(vec![behavior]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_behavior_without_caching_model() {
        let config = config_with(vec![CacheBehavior::new("/track", "origin-1")]);
        assert!(config.validate().is_err());
    }
}
