//! Configuration loading and validation

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use edgesync_core::{ForwardBehavior, HttpMethod, ViewerProtocolPolicy};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub distribution: DistributionConfig,
    #[serde(default)]
    pub behavior: Option<BehaviorConfig>,
    #[serde(default)]
    pub policy: Option<PolicyConfig>,
    #[serde(default)]
    pub migration: MigrationConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub notifications: Option<NotificationsConfig>,
    #[serde(default)]
    pub logs: Option<LogsConfig>,
    #[serde(default)]
    pub package: Option<PackageConfig>,
    #[serde(default)]
    pub aws: AwsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DistributionConfig {
    pub id: String,
    #[serde(default = "default_invalidation_paths")]
    pub invalidation_paths: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BehaviorConfig {
    pub path_pattern: String,
    #[serde(default = "default_allowed_methods")]
    pub allowed_methods: Vec<HttpMethod>,
    #[serde(default = "default_cached_methods")]
    pub cached_methods: Vec<HttpMethod>,
    #[serde(default)]
    pub viewer_protocol_policy: ViewerProtocolPolicy,
    #[serde(default = "default_true")]
    pub compress: bool,
    pub cache_policy_id: String,
    #[serde(default = "default_true")]
    pub attach_origin_request_policy: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PolicyConfig {
    pub name: String,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub header_behavior: ForwardBehavior,
    #[serde(default)]
    pub headers: Vec<String>,
    #[serde(default)]
    pub cookie_behavior: ForwardBehavior,
    #[serde(default)]
    pub cookies: Vec<String>,
    #[serde(default)]
    pub query_string_behavior: ForwardBehavior,
    #[serde(default)]
    pub query_strings: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MigrationConfig {
    #[serde(default)]
    pub migrate_default_behavior: bool,
    #[serde(default = "default_migration_cache_policy")]
    pub cache_policy_id: String,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            migrate_default_behavior: false,
            cache_policy_id: default_migration_cache_policy(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationsConfig {
    pub topic_arn: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogsConfig {
    pub group: String,
    #[serde(default = "default_log_limit")]
    pub limit: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PackageConfig {
    pub source_dir: PathBuf,
    pub output: PathBuf,
    #[serde(default = "default_exclude_extensions")]
    pub exclude_extensions: Vec<String>,
    #[serde(default)]
    pub exclude_files: Vec<String>,
    #[serde(default = "default_exclude_dirs")]
    pub exclude_dirs: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AwsConfig {
    #[serde(default)]
    pub region: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_invalidation_paths() -> Vec<String> {
    vec!["/*".to_string()]
}

fn default_allowed_methods() -> Vec<HttpMethod> {
    HttpMethod::all()
}

fn default_cached_methods() -> Vec<HttpMethod> {
    vec![HttpMethod::Get, HttpMethod::Head]
}

fn default_true() -> bool {
    true
}

// Managed "CachingOptimized" policy.
fn default_migration_cache_policy() -> String {
    "658327ea-f89d-4fab-a63d-7e88639e58f6".to_string()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    200
}

fn default_log_limit() -> i32 {
    200
}

fn default_exclude_extensions() -> Vec<String> {
    vec![".py".to_string(), ".zip".to_string()]
}

fn default_exclude_dirs() -> Vec<String> {
    vec!["temp".to_string(), "__pycache__".to_string()]
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_config_with_defaults() {
        let config: Config = toml::from_str(
            r#"
            [distribution]
            id = "E2EXAMPLE"
            "#,
        )
        .unwrap();

        assert_eq!(config.distribution.id, "E2EXAMPLE");
        assert_eq!(config.distribution.invalidation_paths, vec!["/*"]);
        assert!(config.behavior.is_none());
        assert!(config.policy.is_none());
        assert!(!config.migration.migrate_default_behavior);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.initial_backoff_ms, 200);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn parses_full_reconcile_config() {
        let config: Config = toml::from_str(
            r#"
            [distribution]
            id = "E2EXAMPLE"
            invalidation_paths = ["/track", "/stats"]

            [behavior]
            path_pattern = "/track"
            cache_policy_id = "4135ea2d-6df8-44a3-9df3-4b5a84be39ad"
            viewer_protocol_policy = "https-only"
            allowed_methods = ["GET", "HEAD", "POST"]

            [policy]
            name = "GeoForwardPolicy"
            header_behavior = "whitelist"
            headers = ["CloudFront-Viewer-Country"]

            [migration]
            migrate_default_behavior = true
            "#,
        )
        .unwrap();

        let behavior = config.behavior.unwrap();
        assert_eq!(behavior.path_pattern, "/track");
        assert_eq!(
            behavior.viewer_protocol_policy,
            ViewerProtocolPolicy::HttpsOnly
        );
        assert_eq!(
            behavior.allowed_methods,
            vec![HttpMethod::Get, HttpMethod::Head, HttpMethod::Post]
        );
        assert_eq!(behavior.cached_methods, vec![HttpMethod::Get, HttpMethod::Head]);
        assert!(behavior.compress);
        assert!(behavior.attach_origin_request_policy);

        let policy = config.policy.unwrap();
        assert_eq!(policy.header_behavior, ForwardBehavior::Whitelist);
        assert_eq!(policy.cookie_behavior, ForwardBehavior::None);

        assert!(config.migration.migrate_default_behavior);
        assert_eq!(
            config.migration.cache_policy_id,
            "658327ea-f89d-4fab-a63d-7e88639e58f6"
        );
    }

    #[test]
    fn parses_ops_sections() {
        let config: Config = toml::from_str(
            r#"
            [distribution]
            id = "E2EXAMPLE"

            [notifications]
            topic_arn = "arn:aws:sns:us-east-1:123456789012:alerts"

            [logs]
            group = "/aws/lambda/tracker"

            [package]
            source_dir = "lambda"
            output = "build/function.zip"
            exclude_files = ["handler_backup.js"]
            "#,
        )
        .unwrap();

        assert_eq!(config.logs.unwrap().limit, 200);
        let package = config.package.unwrap();
        assert_eq!(package.exclude_extensions, vec![".py", ".zip"]);
        assert_eq!(package.exclude_dirs, vec!["temp", "__pycache__"]);
        assert_eq!(package.exclude_files, vec!["handler_backup.js"]);
    }

    #[test]
    fn rejects_unknown_http_method() {
        let result = toml::from_str::<Config>(
            r#"
            [distribution]
            id = "E2EXAMPLE"

            [behavior]
            path_pattern = "/track"
            cache_policy_id = "cp-1"
            allowed_methods = ["TRACE"]
            "#,
        );
        assert!(result.is_err());
    }
}
