//! EdgeSync command-line interface
//!
//! Reconciles a CDN distribution's routing and caching configuration,
//! plus the small operational chores around a deployment: listing
//! origin-request policies, tailing the latest function logs, managing
//! notification subscriptions, and packaging deployable artifacts.

use anyhow::{Context, Result};
use aws_config::BehaviorVersion;
use clap::{Parser, Subcommand};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod config;

use config::Config;
use edgesync_cloudfront::CloudFrontControlPlane;
use edgesync_core::{
    BehaviorSpec, ControlPlane, InvalidationStatus, MigrationSpec, OriginRequestPolicySpec,
    ReconcileSpec, Reconciler, RetryPolicy,
};
use edgesync_ops::{
    LogTailer, PackageSpec, RemovalOutcome, SubscriptionManager, SubscriptionState,
    package_directory,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(
        short,
        long,
        default_value = "config/default.toml",
        env = "EDGESYNC_CONFIG"
    )]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Publish the configured behaviors and purge the edge cache
    Reconcile,
    /// List the account's custom origin request policies
    ListPolicies,
    /// Print the latest events of the configured log group
    TailLogs,
    /// Manage notification subscriptions on the configured topic
    Subscriptions {
        #[command(subcommand)]
        action: SubscriptionAction,
    },
    /// Package deployable files into a zip archive
    Package,
}

#[derive(Subcommand, Debug)]
enum SubscriptionAction {
    /// List all subscriptions
    List,
    /// Remove every confirmed subscription for an endpoint
    Remove { endpoint: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = match Config::load(&args.config) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err:#}");
            return ExitCode::FAILURE;
        }
    };

    init_logging(&config.logging.level);
    info!("Starting EdgeSync v{}", env!("CARGO_PKG_VERSION"));

    match run(args.command, &config).await {
        Ok(code) => code,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();
}

async fn run(command: Command, config: &Config) -> Result<ExitCode> {
    match command {
        Command::Reconcile => reconcile(config).await,
        Command::ListPolicies => {
            list_policies(config).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::TailLogs => {
            tail_logs(config).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Subscriptions { action } => {
            subscriptions(config, action).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Package => {
            package(config)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn load_aws_config(config: &Config) -> aws_config::SdkConfig {
    let region = config
        .aws
        .region
        .clone()
        .unwrap_or_else(|| "us-east-1".to_string());
    aws_config::defaults(BehaviorVersion::latest())
        .region(aws_config::Region::new(region))
        .load()
        .await
}

/// Exit code 2 marks the partial outcome: configuration published but
/// cache purge failed, so stale content may linger until entries expire.
async fn reconcile(config: &Config) -> Result<ExitCode> {
    let spec = reconcile_spec(config)?;
    let shared = load_aws_config(config).await;
    let control: Arc<dyn ControlPlane> = Arc::new(CloudFrontControlPlane::new(
        aws_sdk_cloudfront::Client::new(&shared),
    ));

    let outcome = Reconciler::new(control, spec).run().await?;

    match outcome.invalidation {
        InvalidationStatus::Invalidated(id) => {
            info!(invalidation = %id, token = %outcome.token, "Reconciliation complete");
            Ok(ExitCode::SUCCESS)
        }
        InvalidationStatus::Skipped => {
            info!(token = %outcome.token, "Reconciliation complete, no invalidation requested");
            Ok(ExitCode::SUCCESS)
        }
        InvalidationStatus::Failed(err) => {
            warn!(
                token = %outcome.token,
                error = %err,
                "Configuration is live but the cache purge failed"
            );
            Ok(ExitCode::from(2))
        }
    }
}

fn reconcile_spec(config: &Config) -> Result<ReconcileSpec> {
    let behavior = config.behavior.as_ref().map(|b| BehaviorSpec {
        path_pattern: b.path_pattern.clone(),
        viewer_protocol_policy: b.viewer_protocol_policy,
        allowed_methods: b.allowed_methods.clone(),
        cached_methods: b.cached_methods.clone(),
        compress: b.compress,
        cache_policy_id: b.cache_policy_id.clone(),
        attach_origin_request_policy: b.attach_origin_request_policy,
    });

    let policy = config.policy.as_ref().map(|p| OriginRequestPolicySpec {
        name: p.name.clone(),
        comment: p.comment.clone(),
        header_behavior: p.header_behavior,
        headers: p.headers.clone(),
        cookie_behavior: p.cookie_behavior,
        cookies: p.cookies.clone(),
        query_string_behavior: p.query_string_behavior,
        query_strings: p.query_strings.clone(),
    });

    let migrate_default = config
        .migration
        .migrate_default_behavior
        .then(|| MigrationSpec {
            cache_policy_id: config.migration.cache_policy_id.clone(),
        });

    if behavior.is_none() && migrate_default.is_none() {
        anyhow::bail!(
            "config declares neither a [behavior] section nor a default-behavior migration; nothing to reconcile"
        );
    }

    Ok(ReconcileSpec {
        distribution_id: config.distribution.id.clone(),
        behavior,
        policy,
        migrate_default,
        invalidation_paths: config.distribution.invalidation_paths.clone(),
        retry: RetryPolicy {
            max_attempts: config.retry.max_attempts,
            initial_backoff: Duration::from_millis(config.retry.initial_backoff_ms),
        },
    })
}

async fn list_policies(config: &Config) -> Result<()> {
    let shared = load_aws_config(config).await;
    let control = CloudFrontControlPlane::new(aws_sdk_cloudfront::Client::new(&shared));

    let policies = control.list_origin_request_policies().await?;
    if policies.is_empty() {
        println!("No custom origin request policies found");
        return Ok(());
    }
    println!("Custom origin request policies:");
    for policy in policies {
        println!("  {}  {}", policy.id, policy.name);
    }
    Ok(())
}

async fn tail_logs(config: &Config) -> Result<()> {
    let logs = config
        .logs
        .as_ref()
        .context("config has no [logs] section")?;
    let shared = load_aws_config(config).await;
    let tailer = LogTailer::new(aws_sdk_cloudwatchlogs::Client::new(&shared));

    let events = tailer.latest_events(&logs.group, logs.limit).await?;
    for event in events {
        match event.timestamp {
            Some(ts) => println!(
                "{} {}",
                ts.format("%Y-%m-%dT%H:%M:%S%.3fZ"),
                event.message.trim_end()
            ),
            None => println!("{}", event.message.trim_end()),
        }
    }
    Ok(())
}

async fn subscriptions(config: &Config, action: SubscriptionAction) -> Result<()> {
    let topic_arn = &config
        .notifications
        .as_ref()
        .context("config has no [notifications] section")?
        .topic_arn;
    let shared = load_aws_config(config).await;
    let manager = SubscriptionManager::new(aws_sdk_sns::Client::new(&shared));

    match action {
        SubscriptionAction::List => {
            let subscriptions = manager.list_subscriptions(topic_arn).await?;
            if subscriptions.is_empty() {
                println!("No subscriptions on {topic_arn}");
                return Ok(());
            }
            for subscription in subscriptions {
                match &subscription.state {
                    SubscriptionState::Confirmed(arn) => println!(
                        "  {} ({})  {}",
                        subscription.endpoint, subscription.protocol, arn
                    ),
                    SubscriptionState::PendingConfirmation => println!(
                        "  {} ({})  pending confirmation",
                        subscription.endpoint, subscription.protocol
                    ),
                }
            }
        }
        SubscriptionAction::Remove { endpoint } => {
            match manager.remove_endpoint(topic_arn, &endpoint).await? {
                RemovalOutcome::Removed { count } => {
                    info!(%endpoint, count, "Removed subscriptions");
                }
                RemovalOutcome::Pending => {
                    warn!(
                        %endpoint,
                        "Subscription is pending confirmation; it cannot be removed and expires on its own"
                    );
                }
                RemovalOutcome::NotFound => {
                    info!(%endpoint, "No subscription found for endpoint");
                }
            }
        }
    }
    Ok(())
}

fn package(config: &Config) -> Result<()> {
    let package = config
        .package
        .as_ref()
        .context("config has no [package] section")?;

    let spec = PackageSpec {
        source_dir: package.source_dir.clone(),
        output: package.output.clone(),
        exclude_extensions: package.exclude_extensions.clone(),
        exclude_files: package.exclude_files.clone(),
        exclude_dirs: package.exclude_dirs.clone(),
    };
    let entries = package_directory(&spec)?;

    println!(
        "Packaged {} files into {}",
        entries.len(),
        package.output.display()
    );
    for entry in &entries {
        println!("  {entry}");
    }
    Ok(())
}
