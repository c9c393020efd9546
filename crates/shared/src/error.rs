//! Application-wide error types.

use thiserror::Error;

/// Result type alias using `AppError`.
pub type AppResult<T> = Result<T, AppError>;

/// Message shown for failures the user cannot act on.
pub const GENERIC_ERROR_MESSAGE: &str = "An error occurred";

/// Application error types, grouped by how the caller should react.
#[derive(Debug, Error)]
pub enum AppError {
    /// User input is missing or malformed.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Input is well-formed but the requested plan cannot work.
    #[error("Infeasible: {0}")]
    Infeasible(String),

    /// A trigger was used before the step it depends on.
    #[error("Out of sequence: {0}")]
    OutOfSequence(String),

    /// The store or expense query failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::InvalidInput(_) => 400,
            Self::Infeasible(_) => 422,
            Self::OutOfSequence(_) => 409,
            Self::Storage(_) | Self::Configuration(_) | Self::Internal(_) => 500,
        }
    }

    /// Returns true if the caller can fix the problem by changing input or
    /// completing a prior step.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        self.status_code() < 500
    }

    /// Text safe to show the user. Server-side failures collapse to
    /// [`GENERIC_ERROR_MESSAGE`].
    #[must_use]
    pub fn user_message(&self) -> &str {
        match self {
            Self::InvalidInput(m) | Self::Infeasible(m) | Self::OutOfSequence(m) => m,
            Self::Storage(_) | Self::Configuration(_) | Self::Internal(_) => GENERIC_ERROR_MESSAGE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(AppError::InvalidInput(String::new()), 400)]
    #[case(AppError::Infeasible(String::new()), 422)]
    #[case(AppError::OutOfSequence(String::new()), 409)]
    #[case(AppError::Storage(String::new()), 500)]
    #[case(AppError::Configuration(String::new()), 500)]
    #[case(AppError::Internal(String::new()), 500)]
    fn test_status_codes(#[case] err: AppError, #[case] expected: u16) {
        assert_eq!(err.status_code(), expected);
        assert_eq!(err.is_client_error(), expected < 500);
    }

    #[test]
    fn test_user_message_hides_server_failures() {
        assert_eq!(
            AppError::InvalidInput("amount is required".into()).user_message(),
            "amount is required"
        );
        assert_eq!(
            AppError::Storage("connection reset".into()).user_message(),
            GENERIC_ERROR_MESSAGE
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(
            AppError::OutOfSequence("start first".into()).to_string(),
            "Out of sequence: start first"
        );
        assert_eq!(
            AppError::Configuration("bad zone".into()).to_string(),
            "Configuration error: bad zone"
        );
    }
}
