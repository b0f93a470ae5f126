use regex::Regex;
use std::sync::LazyLock;

use super::ValidationError;

// DNS-1123 label
static NAMESPACE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").unwrap());

pub fn validate_namespace(namespace: &str) -> Result<(), ValidationError> {
    if namespace.is_empty() {
        return Err(ValidationError::NamespaceEmpty);
    }

    if namespace.len() > 63 {
        return Err(ValidationError::NamespaceTooLong);
    }

    if !NAMESPACE_REGEX.is_match(namespace) {
        return Err(ValidationError::NamespaceInvalidFormat);
    }

    Ok(())
}
