use thiserror::Error;

/// User-facing text for a rejected session.
pub const SESSION_EXPIRED_MESSAGE: &str = "Session expired. Please log in again.";

/// Failure of a single REST call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// No response was received.
    #[error("Network error: {0}")]
    Network(String),

    /// The server answered 401 to an authenticated request. The session has
    /// already been torn down when this is returned.
    #[error("{}", SESSION_EXPIRED_MESSAGE)]
    Unauthorized,

    #[error("Server returned status {status}")]
    Status {
        status: u16,
        /// Message extracted from the response body, if any.
        message: Option<String>,
    },

    /// The body could not be decoded into the expected shape.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ApiError {
    /// Text to show the user: the server-reported message when there is one,
    /// the session-expired text for 401, else `fallback`.
    pub fn message_or(&self, fallback: &str) -> String {
        match self {
            ApiError::Unauthorized => SESSION_EXPIRED_MESSAGE.to_string(),
            ApiError::Status {
                message: Some(message),
                ..
            } => message.clone(),
            _ => fallback.to_string(),
        }
    }

    /// HTTP status, when a response was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized => Some(401),
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }
}

#[derive(Error, Debug)]
pub enum AuthError {
    /// Login or registration was refused; `message` is ready for display.
    #[error("{message}")]
    Rejected { message: String },

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("{message}")]
    InvalidInput { field: String, message: String },

    #[error("Secure storage unavailable: {0}")]
    SecureStorageUnavailable(String),

    #[error("Serialization failed: {0}")]
    Serialization(String),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl AuthError {
    pub(crate) fn invalid(field: &str, message: impl Into<String>) -> Self {
        AuthError::InvalidInput {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_or_prefers_server_message() {
        let err = ApiError::Status {
            status: 400,
            message: Some("Username already taken".to_string()),
        };
        assert_eq!(err.message_or("Registration failed"), "Username already taken");

        let err = ApiError::Status {
            status: 500,
            message: None,
        };
        assert_eq!(err.message_or("Login failed"), "Login failed");
    }

    #[test]
    fn test_unauthorized_message() {
        assert_eq!(
            ApiError::Unauthorized.message_or("Login failed"),
            SESSION_EXPIRED_MESSAGE
        );
        assert_eq!(ApiError::Unauthorized.to_string(), SESSION_EXPIRED_MESSAGE);
        assert_eq!(ApiError::Unauthorized.status(), Some(401));
    }

    #[test]
    fn test_network_error_uses_fallback() {
        let err = ApiError::Network("connection refused".to_string());
        assert_eq!(err.message_or("Login failed"), "Login failed");
        assert_eq!(err.status(), None);
    }
}
