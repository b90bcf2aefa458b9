use core_auth::ApiError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LibraryError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },

    #[error("{message}")]
    InvalidInput { field: String, message: String },

    #[error("{0}")]
    Forbidden(String),
}

impl LibraryError {
    pub(crate) fn invalid(field: &str, message: impl Into<String>) -> Self {
        LibraryError::InvalidInput {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// Display text, preferring the server's own message for API failures.
    pub fn user_message(&self) -> String {
        match self {
            LibraryError::Api(e) => e.message_or(&e.to_string()),
            other => other.to_string(),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, LibraryError::Api(e) if e.is_unauthorized())
    }
}

pub type Result<T> = std::result::Result<T, LibraryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message() {
        let err = LibraryError::from(ApiError::Status {
            status: 500,
            message: Some("Storage full".to_string()),
        });
        assert_eq!(err.user_message(), "Storage full");

        let err = LibraryError::from(ApiError::Status {
            status: 404,
            message: None,
        });
        assert_eq!(err.user_message(), "Server returned status 404");

        let err = LibraryError::from(ApiError::Unauthorized);
        assert!(err.is_unauthorized());
        assert_eq!(err.user_message(), core_auth::SESSION_EXPIRED_MESSAGE);
    }
}
