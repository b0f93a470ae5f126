use std::fmt;

/// Failure talking to a remote cluster's role binding API.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteError {
    Unreachable(String),
    Timeout,
    PermissionDenied(String),
    NotFound(String),
    AlreadyExists(String),
    /// An object with the requested name exists but is not owned by us.
    Conflict(String),
    Api {
        status: u16,
        message: String,
    },
    /// A sweep finished with some objects left behind.
    Incomplete(Vec<RemoteError>),
}

impl std::error::Error for RemoteError {}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteError::Unreachable(msg) => write!(f, "cluster API unreachable: {msg}"),
            RemoteError::Timeout => write!(f, "cluster API request timed out"),
            RemoteError::PermissionDenied(msg) => write!(f, "permission denied: {msg}"),
            RemoteError::NotFound(name) => write!(f, "binding {name} not found"),
            RemoteError::AlreadyExists(name) => write!(f, "binding {name} already exists"),
            RemoteError::Conflict(name) => {
                write!(f, "binding {name} exists and is not managed by this system")
            }
            RemoteError::Api { status, message } => {
                write!(f, "cluster API returned {status}: {message}")
            }
            RemoteError::Incomplete(errors) => {
                write!(f, "{} binding operation(s) failed", errors.len())?;
                for err in errors {
                    write!(f, "; {err}")?;
                }
                Ok(())
            }
        }
    }
}
