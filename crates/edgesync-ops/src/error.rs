//! Ops error types

use aws_sdk_cloudwatchlogs::error::{ProvideErrorMetadata, SdkError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OpsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Transient failure: {0}")]
    Transient(String),

    #[error("Remote error: {0}")]
    Remote(String),
}

pub(crate) fn map_sdk_error<E, R>(operation: &'static str, err: SdkError<E, R>) -> OpsError
where
    E: ProvideErrorMetadata,
{
    if matches!(err, SdkError::TimeoutError(_) | SdkError::DispatchFailure(_)) {
        return OpsError::Transient(format!("{operation}: connection failure"));
    }

    let code = err.code().unwrap_or("Unknown");
    let message = err.message().unwrap_or("no error message");
    let detail = format!("{operation}: {code}: {message}");

    match code {
        "ResourceNotFoundException" | "NotFound" | "NotFoundException" => {
            OpsError::NotFound(detail)
        }
        "Throttling" | "ThrottlingException" | "TooManyRequests" | "ServiceUnavailable" => {
            OpsError::Transient(detail)
        }
        "InvalidParameter" | "InvalidParameterException" | "InvalidParameterValue" => {
            OpsError::InvalidInput(detail)
        }
        _ => OpsError::Remote(detail),
    }
}
