//! API client errors and the four failure classes dashboards react to.

use crate::models::RelativeRequestError;
use crate::session::SessionError;

/// How a dashboard should react to a failed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Session missing or rejected: clear it and go back to login.
    Authentication,
    /// Inline "access denied", no redirect.
    AccessDenied,
    /// Feature-specific empty state.
    NotFound,
    /// Logged and shown once as a dismissible banner.
    Failure,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Not signed in")]
    NotAuthenticated,
    #[error("Session rejected by server")]
    Unauthorized,
    #[error("Access denied: {0}")]
    Forbidden(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },
    #[error("Request rejected: {0}")]
    Rejected(String),
    #[error("Cannot reach server at {0}")]
    Connection(String),
    #[error("Request timed out after {0}s")]
    Timeout(u64),
    #[error("HTTP client error: {0}")]
    HttpClient(String),
    #[error("Unexpected response from {endpoint}: {detail}")]
    Contract { endpoint: &'static str, detail: String },
    #[error("Request encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("{0}")]
    Invalid(#[from] RelativeRequestError),
    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

impl ApiError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::NotAuthenticated | Self::Unauthorized => FailureKind::Authentication,
            Self::Forbidden(_) => FailureKind::AccessDenied,
            Self::NotFound(_) => FailureKind::NotFound,
            _ => FailureKind::Failure,
        }
    }

    /// Text for the inline message or banner.
    pub fn user_message(&self) -> String {
        match self {
            Self::NotAuthenticated | Self::Unauthorized => {
                "Your session has expired. Please log in again.".to_string()
            }
            Self::Forbidden(msg) | Self::NotFound(msg) | Self::Rejected(msg) if !msg.is_empty() => {
                msg.clone()
            }
            Self::Forbidden(_) => "Access denied".to_string(),
            Self::NotFound(_) => "Nothing found".to_string(),
            Self::Invalid(e) => e.to_string(),
            Self::Connection(_) | Self::Timeout(_) => {
                "Unable to reach the server. Check your connection and try again.".to_string()
            }
            _ => "Something went wrong. Please try again.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_status_taxonomy() {
        assert_eq!(ApiError::Unauthorized.kind(), FailureKind::Authentication);
        assert_eq!(ApiError::NotAuthenticated.kind(), FailureKind::Authentication);
        assert_eq!(ApiError::Forbidden(String::new()).kind(), FailureKind::AccessDenied);
        assert_eq!(ApiError::NotFound("x".into()).kind(), FailureKind::NotFound);
        assert_eq!(ApiError::Timeout(30).kind(), FailureKind::Failure);
        assert_eq!(
            ApiError::Contract {
                endpoint: "today",
                detail: "missing data".into()
            }
            .kind(),
            FailureKind::Failure
        );
    }

    #[test]
    fn server_messages_are_shown_verbatim() {
        let err = ApiError::Forbidden("You can only update medications you prescribed".into());
        assert_eq!(err.user_message(), "You can only update medications you prescribed");
        assert_eq!(ApiError::Forbidden(String::new()).user_message(), "Access denied");
        assert!(ApiError::Server {
            status: 500,
            message: "stack trace".into()
        }
        .user_message()
        .starts_with("Something went wrong"));
    }
}
