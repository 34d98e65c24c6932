//! Bearer token verification

use std::sync::Arc;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode_header};

use super::claims::Claims;
use super::config::AuthConfig;
use super::error::{AuthFailure, Result};
use super::jwks::KeySetCache;

/// Verifies tokens issued by the identity provider.
///
/// RS256 against the published key set is the primary path. Tokens whose
/// header declares another algorithm fall back to HS256 with the configured
/// shared secret, checked against the same issuer and audience.
pub struct TokenVerifier {
    config: AuthConfig,
    cache: Arc<KeySetCache>,
    hs_key: Option<DecodingKey>,
    rs_validation: Validation,
    hs_validation: Validation,
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("issuer", &self.config.issuer)
            .field("audience", &self.config.audience)
            .field("has_hs_key", &self.hs_key.is_some())
            .finish_non_exhaustive()
    }
}

impl TokenVerifier {
    #[must_use]
    pub fn new(config: AuthConfig, cache: Arc<KeySetCache>) -> Self {
        let hs_key = config
            .shared_secret
            .as_ref()
            .map(|s| DecodingKey::from_secret(s.as_bytes()));
        let rs_validation = validation_for(Algorithm::RS256, &config);
        let hs_validation = validation_for(Algorithm::HS256, &config);
        Self {
            config,
            cache,
            hs_key,
            rs_validation,
            hs_validation,
        }
    }

    pub const fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn key_cache(&self) -> &Arc<KeySetCache> {
        &self.cache
    }

    pub async fn verify(&self, token: &str) -> Result<Claims> {
        let header = decode_header(token)
            .map_err(|_| AuthFailure::MalformedToken("unreadable token header".into()))?;
        let kid = header
            .kid
            .as_deref()
            .ok_or_else(|| AuthFailure::MalformedToken("token header has no key id".into()))?;

        let key = self.cache.resolve(kid).await?;

        match jsonwebtoken::decode::<Claims>(token, key.decoding_key(), &self.rs_validation) {
            Ok(data) => Ok(data.claims),
            Err(e) if matches!(e.kind(), ErrorKind::InvalidAlgorithm) => {
                tracing::debug!(kid, alg = ?header.alg, "Falling back to symmetric verification");
                self.verify_symmetric(token)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn verify_symmetric(&self, token: &str) -> Result<Claims> {
        let key = self.hs_key.as_ref().ok_or(AuthFailure::ConfigMissing)?;
        let data = jsonwebtoken::decode::<Claims>(token, key, &self.hs_validation)?;
        Ok(data.claims)
    }
}

fn validation_for(alg: Algorithm, config: &AuthConfig) -> Validation {
    let mut validation = Validation::new(alg);
    validation.set_issuer(&[config.issuer.as_str()]);
    validation.set_audience(&[config.audience.as_str()]);
    validation.set_required_spec_claims(&["exp", "iss", "aud"]);
    validation.leeway = config.leeway.as_secs();
    validation
}
