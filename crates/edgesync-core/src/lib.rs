//! EdgeSync Core Reconciliation Logic
//!
//! This crate provides the domain model and reconciliation pipeline for
//! distribution configurations: behavior upserts, legacy caching-field
//! migration, origin-request-policy resolution, and the publish loop with
//! optimistic-concurrency conflict handling.

pub mod behavior;
pub mod control;
pub mod error;
pub mod memory;
pub mod migrate;
pub mod model;
pub mod policy;
pub mod reconcile;

pub use behavior::{UpsertOutcome, upsert_behavior};
pub use control::{ControlPlane, ControlPlaneError, PolicySummary};
pub use error::ReconcileError;
pub use memory::InMemoryControlPlane;
pub use migrate::migrate_to_policies;
pub use model::{
    CacheBehavior, DistributionConfig, ForwardBehavior, ForwardedValues, HttpMethod, Origin,
    OriginRequestPolicySpec, ViewerProtocolPolicy,
};
pub use policy::resolve_policy;
pub use reconcile::{
    BehaviorSpec, InvalidationStatus, MigrationSpec, ReconcileOutcome, ReconcileSpec, Reconciler,
    RetryPolicy,
};
