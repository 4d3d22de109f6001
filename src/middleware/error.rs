use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use serde_json::json;

/// Errors surfaced by the route layer.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// API request without a usable token.
    #[error("Authentication required")]
    Unauthenticated,

    /// Page request without a usable token; the user is sent to sign in.
    #[error("Login required")]
    LoginRequired { login_path: String },

    /// Malformed request input.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An upstream API call failed after authentication succeeded.
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Session store operation failed.
    #[error("Session store error: {0}")]
    Store(String),

    /// Missing or invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "Authentication required" })),
            )
                .into_response(),
            Self::LoginRequired { ref login_path } => Redirect::to(login_path).into_response(),
            Self::BadRequest(ref msg) => (StatusCode::BAD_REQUEST, msg.clone()).into_response(),
            Self::Upstream(ref msg) => {
                tracing::warn!(error = %msg, "Upstream call failed");
                (
                    StatusCode::BAD_GATEWAY,
                    Json(json!({ "status": "error", "message": "API call failed" })),
                )
                    .into_response()
            }
            Self::Store(_) | Self::Config(_) => {
                tracing::error!(error = %self, "Internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response()
            }
        }
    }
}

impl From<crate::error::Error> for AuthError {
    fn from(e: crate::error::Error) -> Self {
        match e {
            crate::error::Error::Session(msg) => Self::Store(msg),
            crate::error::Error::Config(msg) => Self::Config(msg),
            other => Self::Upstream(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AuthError::Unauthenticated.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::BadRequest("year".into()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AuthError::Upstream("boom".into()).into_response().status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AuthError::Store("poisoned".into()).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_login_required_redirects() {
        let response = AuthError::LoginRequired {
            login_path: "/auth/login".into(),
        }
        .into_response();
        assert!(response.status().is_redirection());
        assert_eq!(response.headers()["location"], "/auth/login");
    }

    #[test]
    fn test_from_crate_error() {
        let err: AuthError = crate::error::Error::Session("lock".into()).into();
        assert!(matches!(err, AuthError::Store(_)));

        let err: AuthError = crate::error::Error::Omdb("down".into()).into();
        assert!(matches!(err, AuthError::Upstream(_)));
    }
}
