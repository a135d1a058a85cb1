//! Core error types

use thiserror::Error;

use crate::control::ControlPlaneError;

#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("Control plane error: {0}")]
    ControlPlane(#[from] ControlPlaneError),

    #[error("Invalid configuration: {0}")]
    Validation(String),

    #[error("{operation} on {resource} failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        operation: &'static str,
        resource: String,
        attempts: u32,
        source: ControlPlaneError,
    },
}
