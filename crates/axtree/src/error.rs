use thiserror::Error;

use crate::protocol::exit;

/// Failures raised while reading or mutating the host's accessibility tree.
#[derive(Debug, Error)]
pub enum AxError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Parameter '{0}' not found among the writable controls of any open window")]
    ParameterNotFound(String),

    #[error("Accessibility permission has not been granted to this process")]
    PermissionDenied,

    #[error("{0} is not running")]
    HostNotRunning(String),

    #[error("Value '{value}' cannot be applied to a {role} control")]
    TypeMismatch { role: String, value: String },

    #[error("{role} controls do not accept value assignment")]
    ControlNotWritable { role: String },

    #[error("Accessibility API error {code}: {message}")]
    Api { code: i32, message: String },

    #[error("{0}")]
    Unsupported(String),
}

impl AxError {
    /// Process exit code the privileged walker reports for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            AxError::PermissionDenied => exit::PERMISSION_DENIED,
            AxError::NotFound(_) | AxError::ParameterNotFound(_) => exit::NOT_FOUND,
            AxError::TypeMismatch { .. } | AxError::ControlNotWritable { .. } => exit::REJECTED,
            AxError::HostNotRunning(_) => exit::HOST_NOT_RUNNING,
            AxError::Api { .. } | AxError::Unsupported(_) => exit::FAILURE,
        }
    }
}
