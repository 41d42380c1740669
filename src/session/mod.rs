//! Session middleware: bearer extraction, revocation check, verification,
//! and principal resolution.
//!
//! The check order is fixed: blacklist before signature verification, so a
//! revoked token is rejected even when it would otherwise verify, and the
//! store lookup happens before any CPU is spent on crypto.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Extension,
    extract::Request,
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use tracing::error;

use crate::{
    admission::{client_ip, peer_addr, user_agent},
    audit::{SecurityEvent, SecurityEventKind},
    directory::{DirectoryError, Principal},
    error::AuthError,
    state::AuthState,
    token::{Claims, TokenError, TokenKind},
};

/// Authenticated request identity, attached to request extensions by
/// `require_session` and read by handlers via `Extension<CurrentUser>`.
#[derive(Clone, Debug)]
pub struct CurrentUser {
    pub principal: Principal,
    pub claims: Claims,
    pub token: String,
}

/// Bearer token from the `Authorization` header, if present.
#[must_use]
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .filter(|token| !token.is_empty())
}

/// Reject unauthenticated requests and attach `CurrentUser` otherwise.
///
/// # Errors
/// The full access-token taxonomy: `MISSING_TOKEN`, `INVALID_TOKEN`,
/// `TOKEN_EXPIRED`, `USER_NOT_FOUND`, `ACCOUNT_DISABLED`.
pub async fn require_session(
    Extension(state): Extension<Arc<AuthState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = bearer_token(request.headers())
        .ok_or(AuthError::MissingToken)?
        .to_string();

    let peer = peer_addr(&request);
    let current = resolve_access(&state, &token, request.headers(), peer).await?;
    request.extensions_mut().insert(current);
    Ok(next.run(request).await)
}

/// Like `require_session` but every failure is a silent pass-through; the
/// handler sees an anonymous request.
pub async fn optional_session(
    Extension(state): Extension<Arc<AuthState>>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(token) = bearer_token(request.headers()).map(ToString::to_string) {
        let peer = peer_addr(&request);
        if let Ok(current) = resolve_access(&state, &token, request.headers(), peer).await {
            request.extensions_mut().insert(current);
        }
    }
    next.run(request).await
}

async fn resolve_access(
    state: &AuthState,
    token: &str,
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
) -> Result<CurrentUser, AuthError> {
    if state.store().is_blacklisted(token).await {
        state.audit().record(
            SecurityEvent::new(
                SecurityEventKind::BlacklistedTokenAccess,
                &client_ip(headers, peer),
            )
            .with_user_agent(user_agent(headers))
            .with_token(token),
        );
        return Err(AuthError::InvalidToken);
    }

    let claims = state
        .tokens()
        .verify(token, TokenKind::Access)
        .map_err(|err| {
            if err != TokenError::Expired {
                state.audit().record(
                    SecurityEvent::new(
                        SecurityEventKind::InvalidTokenAccess,
                        &client_ip(headers, peer),
                    )
                    .with_user_agent(user_agent(headers))
                    .with_token(token),
                );
            }
            match err {
                TokenError::Expired => AuthError::TokenExpired,
                _ => AuthError::InvalidToken,
            }
        })?;

    let principal = load_principal(state, &claims).await?;

    Ok(CurrentUser {
        principal,
        claims,
        token: token.to_string(),
    })
}

/// Authenticate a refresh token for the `/auth/refresh` and `/auth/logout`
/// handlers. Strict about kind: an access token presented here is rejected
/// with `INVALID_TOKEN_TYPE` even though its signature would verify under the
/// access key.
///
/// # Errors
/// `INVALID_REFRESH_TOKEN`, `REFRESH_TOKEN_EXPIRED`, `INVALID_TOKEN_TYPE`,
/// `USER_NOT_FOUND`, `ACCOUNT_DISABLED`.
pub async fn authenticate_refresh(
    state: &AuthState,
    token: &str,
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
) -> Result<(Principal, Claims), AuthError> {
    if state.store().is_blacklisted(token).await {
        state.audit().record(
            SecurityEvent::new(
                SecurityEventKind::BlacklistedRefreshToken,
                &client_ip(headers, peer),
            )
            .with_user_agent(user_agent(headers))
            .with_token(token),
        );
        return Err(AuthError::InvalidRefreshToken);
    }

    let claims = state
        .tokens()
        .verify(token, TokenKind::Refresh)
        .map_err(|err| match err {
            TokenError::WrongKind => AuthError::InvalidTokenType,
            TokenError::Expired => AuthError::RefreshTokenExpired,
            _ => AuthError::InvalidRefreshToken,
        })?;

    let principal = load_principal(state, &claims).await?;
    Ok((principal, claims))
}

async fn load_principal(state: &AuthState, claims: &Claims) -> Result<Principal, AuthError> {
    let principal_id = claims.principal_id().map_err(|_| AuthError::InvalidToken)?;

    let principal = state
        .directory()
        .find_by_id(principal_id)
        .await
        .map_err(|err| match err {
            DirectoryError::Unavailable(reason) => {
                error!("user directory unavailable: {reason}");
                AuthError::Internal
            }
            DirectoryError::AlreadyExists => AuthError::Internal,
        })?
        .ok_or(AuthError::UserNotFound)?;

    if !principal.is_active {
        return Err(AuthError::AccountDisabled);
    }

    Ok(principal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_extraction() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_static("Bearer abc.def.ghi"),
        );
        assert_eq!(bearer_token(&headers), Some("abc.def.ghi"));
    }

    #[test]
    fn non_bearer_schemes_are_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_static("Basic dXNlcjpwYXNz"),
        );
        assert_eq!(bearer_token(&headers), None);

        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_static("Bearer "),
        );
        assert_eq!(bearer_token(&headers), None);

        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }
}
