//! Request authentication gate

use std::sync::Arc;

use axum::extract::Request;
use axum::http::{HeaderValue, header};

use super::claims::Claims;
use super::error::{AuthFailure, Result};
use super::jwt::TokenVerifier;
use crate::constants::{PUBLIC_EXACT_PATHS, PUBLIC_PATH_PREFIXES};

/// Path exclusion rule, matched against the normalized request path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathRule {
    Exact(String),
    Prefix(String),
}

impl PathRule {
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        match self {
            Self::Exact(p) => path == p,
            Self::Prefix(p) => path.starts_with(p.as_str()),
        }
    }

    /// Built-in public paths: the root, API docs, token issuance and health
    #[must_use]
    pub fn defaults() -> Vec<Self> {
        PUBLIC_EXACT_PATHS
            .iter()
            .map(|p| Self::Exact((*p).to_string()))
            .chain(
                PUBLIC_PATH_PREFIXES
                    .iter()
                    .map(|p| Self::Prefix((*p).to_string())),
            )
            .collect()
    }
}

/// Admits a request when its path is public or it carries a valid bearer token
pub struct AuthGate {
    verifier: Arc<TokenVerifier>,
    public: Vec<PathRule>,
}

impl std::fmt::Debug for AuthGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthGate")
            .field("verifier", &self.verifier)
            .field("public", &self.public)
            .finish()
    }
}

impl AuthGate {
    #[must_use]
    pub fn new(verifier: Arc<TokenVerifier>) -> Self {
        Self {
            verifier,
            public: PathRule::defaults(),
        }
    }

    #[must_use]
    pub fn with_public_rules(mut self, rules: Vec<PathRule>) -> Self {
        self.public = rules;
        self
    }

    pub fn verifier(&self) -> &Arc<TokenVerifier> {
        &self.verifier
    }

    pub fn is_public(&self, path: &str) -> bool {
        self.public.iter().any(|rule| rule.matches(path))
    }

    /// Authenticate a request, attaching its [`Claims`] on success
    pub async fn authenticate(&self, request: &mut Request) -> Result<()> {
        let path = request.uri().path();
        if self.is_public(path) {
            tracing::trace!(path, "Public path, skipping authentication");
            return Ok(());
        }

        // Owned so the verification future does not borrow the request.
        let authorization = request.headers().get(header::AUTHORIZATION).cloned();
        let outcome = self.verify_header(authorization.as_ref()).await;

        #[cfg(feature = "metrics")]
        crate::observability::record_auth_outcome(
            outcome.as_ref().err().map(AuthFailure::kind),
        );

        match outcome {
            Ok(claims) => {
                tracing::debug!(sub = claims.subject().unwrap_or("-"), "Request authenticated");
                request.extensions_mut().insert(claims);
                Ok(())
            }
            Err(failure) => {
                tracing::warn!(
                    path = %request.uri().path(),
                    kind = %failure.kind(),
                    "Authentication failed"
                );
                Err(failure)
            }
        }
    }

    async fn verify_header(&self, value: Option<&HeaderValue>) -> Result<Claims> {
        let value = value.ok_or(AuthFailure::MissingHeader)?;
        let token = bearer_token(value)?;
        self.verifier.verify(token).await
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value
pub fn bearer_token(value: &HeaderValue) -> Result<&str> {
    let text = value.to_str().map_err(|_| AuthFailure::InvalidScheme)?;
    let mut parts = text.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("bearer") => Ok(token),
        _ => Err(AuthFailure::InvalidScheme),
    }
}
