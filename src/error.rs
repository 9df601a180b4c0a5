use thiserror::Error;

pub use crate::remote::RemoteError;

/// A field or payload failed a local check before any remote call was made.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct ValidationFailed(pub &'static str);

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Permission denied")]
    NoPermission,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("Validation failed: {0}")]
    ValidationFail(String),
    #[error("A network or storage error occurred")]
    Remote(#[from] RemoteError),
    #[error("An unexpected error occurred")]
    Unexpected(anyhow::Error),
}

impl AppError {
    pub fn error_code(&self) -> &'static str {
        use AppError::*;
        match self {
            NoPermission => "NO_PERMISSION",
            NotFound(_) => "NOT_FOUND",
            ValidationFail(_) => "VALIDATION_FAIL",
            Remote(_) => "REMOTE",
            Unexpected(_) => "UNEXPECTED",
        }
    }

    /// Whether re-triggering the same action can reasonably succeed.
    /// Permission and validation failures never retry.
    pub fn retryable(&self) -> bool {
        matches!(self, AppError::Remote(_) | AppError::Unexpected(_))
    }

    pub fn unexpected<E: std::error::Error + Send + Sync + 'static>(e: E) -> AppError {
        AppError::Unexpected(e.into())
    }
}

impl From<ValidationFailed> for AppError {
    fn from(e: ValidationFailed) -> AppError {
        AppError::ValidationFail(e.0.to_string())
    }
}

macro_rules! unexpected {
    ($msg: expr) => {{
        let msg = $msg.to_string();
        ::log::error!("Unexpected error: [{}][{}]{}", file!(), line!(), msg);
        crate::error::AppError::Unexpected(::anyhow::anyhow!(msg))
    }};
}

#[test]
fn error_code_test() {
    assert_eq!(AppError::NoPermission.error_code(), "NO_PERMISSION");
    assert!(!AppError::NoPermission.retryable());
    let e: AppError = ValidationFailed("blank body").into();
    assert_eq!(e.error_code(), "VALIDATION_FAIL");
    assert!(!e.retryable());
    let e: AppError = RemoteError::Transport("connection reset".to_string()).into();
    assert!(e.retryable());
}
