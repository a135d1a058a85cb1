//! EdgeSync CloudFront Control Plane
//!
//! This crate implements the control-plane trait against CloudFront,
//! including SDK type conversion and error-kind mapping.

pub mod client;
mod convert;
mod error;

pub use client::CloudFrontControlPlane;
