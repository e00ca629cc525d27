//! Inline field checks run by the sign-in and password-reset forms before
//! they call into the auth store.

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::FieldError;

pub const MIN_PASSWORD_LEN: usize = 6;

lazy_static! {
    static ref EMAIL_RE: Regex =
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern compiles");
}

pub fn validate_email(email: &str) -> Result<(), FieldError> {
    if email.is_empty() {
        return Err(FieldError::EmailRequired);
    }
    if !EMAIL_RE.is_match(email) {
        return Err(FieldError::InvalidEmail);
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), FieldError> {
    if password.is_empty() {
        return Err(FieldError::PasswordRequired);
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(FieldError::PasswordTooShort {
            min: MIN_PASSWORD_LEN,
        });
    }
    Ok(())
}

/// Field errors for the sign-in form; both fields are always checked.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LoginFormErrors {
    pub email: Option<FieldError>,
    pub password: Option<FieldError>,
}

impl LoginFormErrors {
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.password.is_none()
    }

    pub fn first(&self) -> Option<&FieldError> {
        self.email.as_ref().or(self.password.as_ref())
    }
}

pub fn validate_login_form(email: &str, password: &str) -> Result<(), LoginFormErrors> {
    let errors = LoginFormErrors {
        email: validate_email(email).err(),
        password: validate_password(password).err(),
    };
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
