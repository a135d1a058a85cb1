//! EdgeSync Operational Workflows
//!
//! Simple stateless I/O around the reconciler: tailing recent log
//! events, managing notification subscriptions, and packaging
//! deployable files into an archive.

pub mod archive;
pub mod error;
pub mod logs;
pub mod notify;

pub use archive::{PackageSpec, package_directory};
pub use error::OpsError;
pub use logs::{LogEvent, LogTailer};
pub use notify::{RemovalOutcome, SubscriptionInfo, SubscriptionManager, SubscriptionState};
