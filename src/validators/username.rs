use regex::Regex;
use std::sync::LazyLock;

use super::ValidationError;

// usernames are written verbatim as a label value
static USERNAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9]([-A-Za-z0-9_.]*[A-Za-z0-9])?$").unwrap());

pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username.trim().is_empty() {
        return Err(ValidationError::UsernameEmpty);
    }

    if username.len() > 63 {
        return Err(ValidationError::UsernameTooLong);
    }

    if !USERNAME_REGEX.is_match(username) {
        return Err(ValidationError::UsernameInvalidFormat);
    }

    Ok(())
}
