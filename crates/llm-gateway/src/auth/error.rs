//! Authentication failure types

use std::time::Duration;

use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

/// Why the key publishing endpoint could not provide a usable key set
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KeyFetchError {
    #[error("key set request failed: {0}")]
    Request(String),

    #[error("key set request timed out after {0:?}")]
    Timeout(Duration),

    #[error("key set endpoint returned HTTP {0}")]
    Status(u16),

    #[error("malformed key set: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for KeyFetchError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return Self::Status(status.as_u16());
        }
        if err.is_decode() {
            return Self::Malformed(err.to_string());
        }
        Self::Request(err.to_string())
    }
}

/// Key lookup failure reported by the key set cache
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("no signing key with kid {0}")]
    NotFound(String),

    #[error(transparent)]
    FetchFailure(#[from] KeyFetchError),
}

/// Stable identifier for each authentication failure, used in logs and metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthFailureKind {
    MissingHeader,
    InvalidScheme,
    MalformedToken,
    UnknownKey,
    KeyFetchError,
    ConfigMissing,
    Expired,
    InvalidToken,
}

impl AuthFailureKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MissingHeader => "missing_header",
            Self::InvalidScheme => "invalid_scheme",
            Self::MalformedToken => "malformed_token",
            Self::UnknownKey => "unknown_key",
            Self::KeyFetchError => "key_fetch_error",
            Self::ConfigMissing => "config_missing",
            Self::Expired => "expired",
            Self::InvalidToken => "invalid_token",
        }
    }
}

impl std::fmt::Display for AuthFailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal authentication failure for a single request.
///
/// Every variant becomes an HTTP 401 at the gate boundary. The `Display`
/// output is the client-facing `detail` and never includes key material,
/// raw token bytes, endpoint addresses, or cache state.
#[derive(Debug, Error)]
pub enum AuthFailure {
    #[error("Authorization header is missing")]
    MissingHeader,

    #[error("Invalid authentication scheme")]
    InvalidScheme,

    #[error("Malformed token: {0}")]
    MalformedToken(String),

    #[error("Unable to find appropriate key")]
    UnknownKey(String),

    #[error("Unable to retrieve signing keys")]
    KeyFetchError(KeyFetchError),

    #[error("Symmetric token verification is not configured")]
    ConfigMissing,

    #[error("Token has expired")]
    Expired,

    #[error("Invalid token: {0}")]
    InvalidToken(String),
}

impl AuthFailure {
    #[must_use]
    pub const fn kind(&self) -> AuthFailureKind {
        match self {
            Self::MissingHeader => AuthFailureKind::MissingHeader,
            Self::InvalidScheme => AuthFailureKind::InvalidScheme,
            Self::MalformedToken(_) => AuthFailureKind::MalformedToken,
            Self::UnknownKey(_) => AuthFailureKind::UnknownKey,
            Self::KeyFetchError(_) => AuthFailureKind::KeyFetchError,
            Self::ConfigMissing => AuthFailureKind::ConfigMissing,
            Self::Expired => AuthFailureKind::Expired,
            Self::InvalidToken(_) => AuthFailureKind::InvalidToken,
        }
    }

    /// Client-facing description of the failure
    #[must_use]
    pub fn detail(&self) -> String {
        self.to_string()
    }
}

impl From<ResolveError> for AuthFailure {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::NotFound(kid) => Self::UnknownKey(kid),
            ResolveError::FetchFailure(e) => Self::KeyFetchError(e),
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AuthFailure {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;
        match err.kind() {
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::InvalidSignature => Self::InvalidToken("invalid signature".into()),
            ErrorKind::InvalidIssuer => Self::InvalidToken("invalid issuer".into()),
            ErrorKind::InvalidAudience => Self::InvalidToken("invalid audience".into()),
            ErrorKind::InvalidAlgorithm => Self::InvalidToken("unsupported algorithm".into()),
            ErrorKind::ImmatureSignature => Self::InvalidToken("token not yet valid".into()),
            ErrorKind::MissingRequiredClaim(claim) => {
                Self::InvalidToken(format!("missing required claim '{claim}'"))
            }
            ErrorKind::InvalidToken
            | ErrorKind::Base64(_)
            | ErrorKind::Json(_)
            | ErrorKind::Utf8(_) => Self::InvalidToken("token could not be decoded".into()),
            _ => Self::InvalidToken("verification failed".into()),
        }
    }
}

/// JSON body of every authentication failure response
#[derive(Debug, Serialize)]
struct FailureBody {
    detail: String,
}

impl IntoResponse for AuthFailure {
    fn into_response(self) -> Response {
        let body = FailureBody {
            detail: self.detail(),
        };
        let mut response = (StatusCode::UNAUTHORIZED, Json(body)).into_response();
        response.headers_mut().insert(
            header::WWW_AUTHENTICATE,
            HeaderValue::from_static("Bearer"),
        );
        response
    }
}

pub type Result<T> = std::result::Result<T, AuthFailure>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_failure_display() {
        assert_eq!(
            AuthFailure::MissingHeader.to_string(),
            "Authorization header is missing"
        );
        assert_eq!(
            AuthFailure::InvalidScheme.to_string(),
            "Invalid authentication scheme"
        );
        assert_eq!(AuthFailure::Expired.to_string(), "Token has expired");
    }

    #[test]
    fn test_unknown_key_detail_omits_kid() {
        let failure = AuthFailure::UnknownKey("internal-kid-42".to_string());
        assert_eq!(failure.detail(), "Unable to find appropriate key");
        assert_eq!(failure.kind(), AuthFailureKind::UnknownKey);
    }

    #[test]
    fn test_key_fetch_detail_hides_cause() {
        let failure = AuthFailure::KeyFetchError(KeyFetchError::Request(
            "connection refused to https://idp.internal/jwks".to_string(),
        ));
        assert!(!failure.detail().contains("idp.internal"));
        assert_eq!(failure.kind(), AuthFailureKind::KeyFetchError);
    }

    #[test]
    fn test_resolve_error_conversion() {
        let failure: AuthFailure = ResolveError::NotFound("k1".into()).into();
        assert!(matches!(failure, AuthFailure::UnknownKey(ref kid) if kid == "k1"));

        let failure: AuthFailure =
            ResolveError::FetchFailure(KeyFetchError::Status(503)).into();
        assert!(matches!(
            failure,
            AuthFailure::KeyFetchError(KeyFetchError::Status(503))
        ));
    }

    #[test]
    fn test_jsonwebtoken_error_mapping() {
        use jsonwebtoken::errors::{Error, ErrorKind};

        let failure: AuthFailure = Error::from(ErrorKind::ExpiredSignature).into();
        assert!(matches!(failure, AuthFailure::Expired));

        let failure: AuthFailure = Error::from(ErrorKind::InvalidAudience).into();
        assert_eq!(failure.to_string(), "Invalid token: invalid audience");

        let failure: AuthFailure = Error::from(ErrorKind::InvalidSignature).into();
        assert_eq!(failure.kind(), AuthFailureKind::InvalidToken);
    }

    #[test]
    fn test_failure_kind_labels() {
        assert_eq!(AuthFailureKind::MissingHeader.as_str(), "missing_header");
        assert_eq!(AuthFailureKind::KeyFetchError.to_string(), "key_fetch_error");
    }

    #[tokio::test]
    async fn test_into_response_is_401_with_detail() {
        let response = AuthFailure::MissingHeader.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            "Bearer"
        );

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json, serde_json::json!({"detail": "Authorization header is missing"}));
    }
}
