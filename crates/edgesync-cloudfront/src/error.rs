//! SDK error mapping

use aws_sdk_cloudfront::error::{ProvideErrorMetadata, SdkError};
use edgesync_core::ControlPlaneError;

/// Map an SDK failure onto the control-plane error taxonomy.
///
/// A stale concurrency token surfaces as `Conflict`, a missing resource
/// as `NotFound`, throttling and connection failures as `Transient`, and
/// request-shape rejections as `Validation`; each kind warrants a
/// different caller response.
pub(crate) fn map_sdk_error<E, R>(operation: &'static str, err: SdkError<E, R>) -> ControlPlaneError
where
    E: ProvideErrorMetadata,
{
    if matches!(err, SdkError::TimeoutError(_) | SdkError::DispatchFailure(_)) {
        return ControlPlaneError::Transient(format!("{operation}: connection failure"));
    }

    let code = err.code().unwrap_or("Unknown");
    let message = err.message().unwrap_or("no error message");
    let detail = format!("{operation}: {code}: {message}");

    match code {
        "PreconditionFailed" | "InvalidIfMatchVersion" => ControlPlaneError::Conflict(detail),
        "NoSuchDistribution" | "NoSuchOrigin" | "NoSuchOriginRequestPolicy" => {
            ControlPlaneError::NotFound(detail)
        }
        "Throttling" | "ThrottlingException" | "TooManyRequests" | "ServiceUnavailable"
        | "RequestTimeout" => ControlPlaneError::Transient(detail),
        c if c.starts_with("Invalid") || c == "InconsistentQuantities" || c == "MissingBody" => {
            ControlPlaneError::Validation(detail)
        }
        _ => ControlPlaneError::Remote(detail),
    }
}
