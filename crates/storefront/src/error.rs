//! Unified error handling with Sentry integration.
//!
//! Route handlers convert [`ApiError`] into [`AppError`] before building a
//! response. Server-side failures are captured to Sentry first; expected
//! conditions (expired session, validation messages) are not.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use thiserror::Error;

use crate::api::ApiError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Marketplace API operation failed.
    #[error("API error: {0}")]
    Api(#[from] ApiError),
}

impl AppError {
    /// Whether this error should be captured to Sentry.
    ///
    /// Expired tokens and server-side validation messages are normal
    /// operation; transport failures and malformed responses are not.
    fn is_reportable(&self) -> bool {
        match self {
            Self::Api(api) => matches!(api, ApiError::Http(_) | ApiError::Decode { .. }),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.is_reportable() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let Self::Api(api) = &self;

        // An expired token anywhere means the visitor has to log in again.
        if api.is_unauthorized() {
            return Redirect::to("/auth/login").into_response();
        }

        let (status, message) = match api {
            ApiError::Unavailable(_) => (StatusCode::NOT_FOUND, api.user_message()),
            ApiError::Api { status, .. } => (
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_REQUEST),
                api.user_message(),
            ),
            _ => (StatusCode::BAD_GATEWAY, api.user_message()),
        };

        (status, message).into_response()
    }
}

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::Api(ApiError::Unavailable(404));
        assert_eq!(err.to_string(), "API error: endpoint not available (HTTP 404)");
    }

    #[test]
    fn test_unauthorized_redirects_to_login() {
        let response = AppError::Api(ApiError::Unauthorized).into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            status_of(AppError::Api(ApiError::Unavailable(404))),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(AppError::Api(ApiError::Api {
                status: 400,
                message: "No stock.".to_string()
            })),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(AppError::Api(ApiError::Decode {
                detail: "missing field".to_string()
            })),
            StatusCode::BAD_GATEWAY
        );
    }
}
