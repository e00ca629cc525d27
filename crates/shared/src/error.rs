use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidCredentials,
    Unauthorized,
    Forbidden,
    Validation,
    NotFound,
    Unavailable,
    Internal,
}

impl ErrorCode {
    /// Process exit status used by the command line front end.
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorCode::Validation => 2,
            ErrorCode::InvalidCredentials | ErrorCode::Unauthorized => 3,
            ErrorCode::Forbidden => 4,
            ErrorCode::NotFound => 5,
            ErrorCode::Unavailable => 6,
            ErrorCode::Internal => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{code:?}: {message}")]
pub struct PortalError {
    pub code: ErrorCode,
    pub message: String,
}

impl PortalError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Validation, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unavailable, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_code_and_message() {
        let err = PortalError::validation("Start date cannot be after end date");
        assert_eq!(
            err.to_string(),
            "Validation: Start date cannot be after end date"
        );
        assert_eq!(err.code.exit_code(), 2);
    }

    #[test]
    fn codes_serialize_in_snake_case() {
        let raw = serde_json::to_string(&ErrorCode::InvalidCredentials).expect("serialize");
        assert_eq!(raw, "\"invalid_credentials\"");
    }
}
