pub mod assignment;
pub mod namespace;
pub mod role;
pub mod username;

pub use assignment::validate_assignment;
pub use namespace::validate_namespace;
pub use role::validate_role_name;
pub use username::validate_username;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ValidationError {
    UsernameEmpty,
    UsernameTooLong,
    UsernameInvalidFormat,
    RoleNameEmpty,
    RoleNameTooLong,
    RoleNameInvalidFormat,
    NamespaceEmpty,
    NamespaceTooLong,
    NamespaceInvalidFormat,
    NoRolesSelected,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UsernameEmpty => write!(f, "Username cannot be empty"),
            Self::UsernameTooLong => write!(f, "Username is too long (max 63 characters)"),
            Self::UsernameInvalidFormat => write!(
                f,
                "Username must be alphanumeric, '-', '_' or '.', and start and end alphanumeric"
            ),
            Self::RoleNameEmpty => write!(f, "Role name cannot be empty"),
            Self::RoleNameTooLong => write!(f, "Role name is too long (max 253 characters)"),
            Self::RoleNameInvalidFormat => {
                write!(f, "Role name cannot contain whitespace or '/'")
            }
            Self::NamespaceEmpty => write!(f, "Namespace cannot be empty"),
            Self::NamespaceTooLong => write!(f, "Namespace is too long (max 63 characters)"),
            Self::NamespaceInvalidFormat => write!(f, "Invalid namespace format"),
            Self::NoRolesSelected => write!(f, "At least one role must be selected"),
        }
    }
}

impl std::error::Error for ValidationError {}
