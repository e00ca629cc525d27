use shared::error::{ErrorCode, PortalError};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContributionError {
    #[error("Contribution amount must be a non-negative number")]
    InvalidAmount,
    #[error("Contribution date cannot be in the future")]
    FutureDate,
    #[error("A mandatory contribution already exists for this month")]
    MandatoryExistsForMonth { year: i32, month: u32 },
    #[error("This appears to be a duplicate contribution")]
    Duplicate,
    #[error("Failed to add contribution: {0}")]
    Backend(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatementError {
    #[error("End date cannot be in the future")]
    EndInFuture,
    #[error("Start date cannot be after end date")]
    StartAfterEnd,
    #[error("No contributions found within selected date range")]
    NoContributions,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("Email is required")]
    EmailRequired,
    #[error("Please enter a valid email address")]
    InvalidEmail,
    #[error("Password is required")]
    PasswordRequired,
    #[error("Password must be at least {min} characters")]
    PasswordTooShort { min: usize },
}

impl From<ContributionError> for PortalError {
    fn from(value: ContributionError) -> Self {
        let code = match value {
            ContributionError::Backend(_) => ErrorCode::Unavailable,
            _ => ErrorCode::Validation,
        };
        PortalError::new(code, value.to_string())
    }
}

impl From<StatementError> for PortalError {
    fn from(value: StatementError) -> Self {
        let code = match value {
            StatementError::NoContributions => ErrorCode::NotFound,
            StatementError::EndInFuture | StatementError::StartAfterEnd => ErrorCode::Validation,
        };
        PortalError::new(code, value.to_string())
    }
}

impl From<FieldError> for PortalError {
    fn from(value: FieldError) -> Self {
        PortalError::validation(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_codes() {
        let err: PortalError = StatementError::NoContributions.into();
        assert_eq!(err.code, ErrorCode::NotFound);
        assert_eq!(
            err.message,
            "No contributions found within selected date range"
        );

        let err: PortalError = ContributionError::Backend("offline".into()).into();
        assert_eq!(err.code, ErrorCode::Unavailable);

        let err: PortalError = FieldError::PasswordTooShort { min: 6 }.into();
        assert_eq!(err.message, "Password must be at least 6 characters");
    }
}
