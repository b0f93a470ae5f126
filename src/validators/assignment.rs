use super::{ValidationError, validate_namespace, validate_role_name};
use crate::members::AccessAssignment;

/// Checks every role and namespace name in `assignment`.
///
/// Emptiness is not checked here: an empty assignment is valid for updates.
pub fn validate_assignment(assignment: &AccessAssignment) -> Result<(), ValidationError> {
    for role in &assignment.cluster_roles {
        validate_role_name(role)?;
    }

    for (namespace, roles) in &assignment.namespace_roles {
        validate_namespace(namespace)?;
        for role in roles {
            validate_role_name(role)?;
        }
    }

    Ok(())
}
