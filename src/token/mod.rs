//! Token issuance and verification.
//!
//! Access and refresh tokens are stateless JWTs signed with distinct secrets.
//! Refresh tokens carry an explicit `type: "refresh"` claim so a refresh token
//! can never be honored as an access token, even with a valid signature.
//! No server-side record exists for a token until it is revoked.

use anyhow::{Result, anyhow};
use chrono::Utc;
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const DEFAULT_ACCESS_TTL_SECONDS: i64 = 15 * 60;
const DEFAULT_REFRESH_TTL_SECONDS: i64 = 7 * 24 * 60 * 60;
const DEFAULT_ISSUER: &str = "tasca";
const DEFAULT_AUDIENCE: &str = "tasca-users";

/// Which lifecycle role a token plays.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Closed error taxonomy for token verification.
///
/// Replaces dispatching on a signing library's error-name strings: `verify`
/// and `decode_unsafe` return these variants directly.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    /// Covers bad signatures and issuer/audience mismatches; all surface as an
    /// invalid token to the client.
    #[error("invalid signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
    #[error("wrong token kind")]
    WrongKind,
}

/// Claim set carried by every signed token.
///
/// Access tokens omit the kind marker; refresh tokens set `type: "refresh"`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
    pub aud: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub token_type: Option<TokenKind>,
}

impl Claims {
    /// Kind of this claim set; a missing marker means access.
    #[must_use]
    pub fn kind(&self) -> TokenKind {
        self.token_type.unwrap_or(TokenKind::Access)
    }

    /// Subject parsed as a principal id.
    ///
    /// # Errors
    /// Returns `TokenError::Malformed` if the subject is not a UUID.
    pub fn principal_id(&self) -> Result<Uuid, TokenError> {
        Uuid::parse_str(&self.sub).map_err(|_| TokenError::Malformed)
    }

    /// Seconds of validity left, clamped to zero for already-expired tokens.
    #[must_use]
    pub fn remaining_ttl_seconds(&self, now_unix: i64) -> i64 {
        (self.exp - now_unix).max(0)
    }
}

/// Expiry and signing policy for the token service.
#[derive(Clone)]
pub struct TokenConfig {
    access_secret: SecretString,
    refresh_secret: SecretString,
    access_ttl_seconds: i64,
    refresh_ttl_seconds: i64,
    issuer: String,
    audience: String,
}

impl TokenConfig {
    #[must_use]
    pub fn new(access_secret: SecretString, refresh_secret: SecretString) -> Self {
        Self {
            access_secret,
            refresh_secret,
            access_ttl_seconds: DEFAULT_ACCESS_TTL_SECONDS,
            refresh_ttl_seconds: DEFAULT_REFRESH_TTL_SECONDS,
            issuer: DEFAULT_ISSUER.to_string(),
            audience: DEFAULT_AUDIENCE.to_string(),
        }
    }

    #[must_use]
    pub fn with_access_ttl_seconds(mut self, seconds: i64) -> Self {
        self.access_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_refresh_ttl_seconds(mut self, seconds: i64) -> Self {
        self.refresh_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_issuer(mut self, issuer: String) -> Self {
        self.issuer = issuer;
        self
    }

    #[must_use]
    pub fn with_audience(mut self, audience: String) -> Self {
        self.audience = audience;
        self
    }
}

impl std::fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenConfig")
            .field("access_secret", &"***")
            .field("refresh_secret", &"***")
            .field("access_ttl_seconds", &self.access_ttl_seconds)
            .field("refresh_ttl_seconds", &self.refresh_ttl_seconds)
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .finish()
    }
}

/// Issues, verifies, and decodes signed tokens.
///
/// Pure over the configured secrets and the system clock; all lifecycle state
/// (revocation, counters) lives in the revocation store.
pub struct TokenService {
    config: TokenConfig,
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
}

impl TokenService {
    /// Build the service from its signing policy.
    ///
    /// Identical access and refresh secrets would collapse the kind separation
    /// down to a single claim field, so they are rejected outright instead of
    /// silently accepted.
    ///
    /// # Errors
    /// Returns an error if the secrets are empty or not distinct.
    pub fn new(config: TokenConfig) -> Result<Self> {
        let access = config.access_secret.expose_secret();
        let refresh = config.refresh_secret.expose_secret();

        if access.is_empty() || refresh.is_empty() {
            return Err(anyhow!("token secrets must not be empty"));
        }
        if access == refresh {
            return Err(anyhow!(
                "access and refresh secrets must be distinct; refusing to fall back"
            ));
        }

        let access_encoding = EncodingKey::from_secret(access.as_bytes());
        let access_decoding = DecodingKey::from_secret(access.as_bytes());
        let refresh_encoding = EncodingKey::from_secret(refresh.as_bytes());
        let refresh_decoding = DecodingKey::from_secret(refresh.as_bytes());

        Ok(Self {
            config,
            access_encoding,
            access_decoding,
            refresh_encoding,
            refresh_decoding,
        })
    }

    /// Sign a short-lived access token for the principal.
    ///
    /// # Errors
    /// Returns an error if JWT encoding fails.
    pub fn issue_access(&self, principal_id: Uuid) -> Result<String> {
        self.issue(principal_id, TokenKind::Access)
    }

    /// Sign a long-lived refresh token carrying the refresh kind marker.
    ///
    /// # Errors
    /// Returns an error if JWT encoding fails.
    pub fn issue_refresh(&self, principal_id: Uuid) -> Result<String> {
        self.issue(principal_id, TokenKind::Refresh)
    }

    fn issue(&self, principal_id: Uuid, kind: TokenKind) -> Result<String> {
        let now = Utc::now().timestamp();
        let (ttl, encoding_key, token_type) = match kind {
            TokenKind::Access => (self.config.access_ttl_seconds, &self.access_encoding, None),
            TokenKind::Refresh => (
                self.config.refresh_ttl_seconds,
                &self.refresh_encoding,
                Some(TokenKind::Refresh),
            ),
        };

        let claims = Claims {
            sub: principal_id.to_string(),
            iat: now,
            exp: now + ttl,
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
            token_type,
        };

        encode(&Header::new(Algorithm::HS256), &claims, encoding_key)
            .map_err(|e| anyhow!("failed to sign {kind:?} token: {e}"))
    }

    /// Verify signature, issuer, audience, expiry, and kind, in that order;
    /// the first failure wins.
    ///
    /// # Errors
    /// Returns the matching `TokenError` variant on any check failure.
    pub fn verify(&self, token: &str, expected: TokenKind) -> Result<Claims, TokenError> {
        let decoding_key = match expected {
            TokenKind::Access => &self.access_decoding,
            TokenKind::Refresh => &self.refresh_decoding,
        };

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_issuer(&[&self.config.issuer]);
        validation.set_audience(&[&self.config.audience]);

        let data =
            decode::<Claims>(token, decoding_key, &validation).map_err(map_jwt_error)?;

        if data.claims.kind() != expected {
            return Err(TokenError::WrongKind);
        }

        Ok(data.claims)
    }

    /// Parse claims without verifying the signature.
    ///
    /// Only used to read expiries for revocation bookkeeping during logout;
    /// never an input to authorization decisions.
    ///
    /// # Errors
    /// Returns `TokenError::Malformed` if the token cannot be parsed.
    pub fn decode_unsafe(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation)
            .map(|data| data.claims)
            .map_err(|_| TokenError::Malformed)
    }

    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.config.issuer
    }

    #[must_use]
    pub fn audience(&self) -> &str {
        &self.config.audience
    }
}

fn map_jwt_error(err: jsonwebtoken::errors::Error) -> TokenError {
    match err.kind() {
        ErrorKind::ExpiredSignature => TokenError::Expired,
        ErrorKind::InvalidSignature
        | ErrorKind::InvalidIssuer
        | ErrorKind::InvalidAudience
        | ErrorKind::ImmatureSignature => TokenError::InvalidSignature,
        _ => TokenError::Malformed,
    }
}
