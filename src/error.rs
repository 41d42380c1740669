//! Request-level auth error taxonomy and its HTTP contract.
//!
//! The JSON shapes here are a compatibility surface for existing clients:
//! every rejection is `{success: false, message, code}` plus the documented
//! extras (`retryAfter` in minutes, `nextValidRequest` as a timestamp).

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde_json::json;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("missing access token")]
    MissingToken,
    #[error("invalid or revoked token")]
    InvalidToken,
    #[error("access token expired")]
    TokenExpired,
    #[error("missing refresh token")]
    MissingRefreshToken,
    #[error("invalid or revoked refresh token")]
    InvalidRefreshToken,
    #[error("refresh token expired")]
    RefreshTokenExpired,
    #[error("wrong token kind")]
    InvalidTokenType,
    #[error("user not found")]
    UserNotFound,
    #[error("account disabled")]
    AccountDisabled,
    #[error("rate limit exceeded")]
    RateLimited { retry_after_minutes: u64 },
    #[error("auth rate limit exceeded")]
    AuthRateLimited { retry_after_minutes: u64 },
    #[error("brute force lockout")]
    Locked { next_valid_request: DateTime<Utc> },
    #[error("internal server error")]
    Internal,
}

impl AuthError {
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::MissingToken => "MISSING_TOKEN",
            Self::InvalidToken => "INVALID_TOKEN",
            Self::TokenExpired => "TOKEN_EXPIRED",
            Self::MissingRefreshToken => "MISSING_REFRESH_TOKEN",
            Self::InvalidRefreshToken => "INVALID_REFRESH_TOKEN",
            Self::RefreshTokenExpired => "REFRESH_TOKEN_EXPIRED",
            Self::InvalidTokenType => "INVALID_TOKEN_TYPE",
            Self::UserNotFound => "USER_NOT_FOUND",
            Self::AccountDisabled => "ACCOUNT_DISABLED",
            Self::RateLimited { .. } => "RATE_LIMIT_EXCEEDED",
            Self::AuthRateLimited { .. } => "AUTH_RATE_LIMIT_EXCEEDED",
            Self::Locked { .. } => "BRUTE_FORCE_DETECTED",
            Self::Internal => "INTERNAL_ERROR",
        }
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::RateLimited { .. } | Self::AuthRateLimited { .. } | Self::Locked { .. } => {
                StatusCode::TOO_MANY_REQUESTS
            }
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    fn message(&self) -> &'static str {
        match self {
            Self::MissingToken => "Access token is missing",
            Self::InvalidToken => "Token is invalid or expired",
            Self::TokenExpired => "Token expired",
            Self::MissingRefreshToken => "Refresh token is missing",
            Self::InvalidRefreshToken => "Refresh token is invalid",
            Self::RefreshTokenExpired => "Refresh token expired",
            Self::InvalidTokenType => "Token is not a refresh token",
            Self::UserNotFound => "User was not found",
            Self::AccountDisabled => "Account is disabled",
            Self::RateLimited { .. } => {
                "Too many requests from this IP address, please try again later"
            }
            Self::AuthRateLimited { .. } => {
                "Too many authentication attempts, please try again later"
            }
            Self::Locked { .. } => "Too many failed attempts, please try again later",
            Self::Internal => "Internal server error",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let mut body = json!({
            "success": false,
            "message": self.message(),
            "code": self.code(),
        });

        match &self {
            Self::RateLimited {
                retry_after_minutes,
            }
            | Self::AuthRateLimited {
                retry_after_minutes,
            } => {
                body["retryAfter"] = json!(retry_after_minutes);
            }
            Self::Locked { next_valid_request } => {
                body["nextValidRequest"] = json!(next_valid_request.to_rfc3339());
            }
            _ => {}
        }

        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn codes_match_contract() {
        assert_eq!(AuthError::MissingToken.code(), "MISSING_TOKEN");
        assert_eq!(AuthError::InvalidTokenType.code(), "INVALID_TOKEN_TYPE");
        assert_eq!(
            AuthError::Locked {
                next_valid_request: Utc::now()
            }
            .code(),
            "BRUTE_FORCE_DETECTED"
        );
    }

    #[test]
    fn statuses_match_contract() {
        assert_eq!(AuthError::MissingToken.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AuthError::RateLimited {
                retry_after_minutes: 15
            }
            .status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            AuthError::Internal.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
