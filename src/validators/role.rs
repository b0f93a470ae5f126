use super::ValidationError;

pub fn validate_role_name(role: &str) -> Result<(), ValidationError> {
    if role.is_empty() {
        return Err(ValidationError::RoleNameEmpty);
    }

    if role.len() > 253 {
        return Err(ValidationError::RoleNameTooLong);
    }

    if role.chars().any(|c| c.is_whitespace() || c == '/') {
        return Err(ValidationError::RoleNameInvalidFormat);
    }

    Ok(())
}
