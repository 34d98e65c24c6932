//! Token verification configuration

use std::time::Duration;

use url::Url;

use crate::Error;

/// Identity provider and token verification settings.
///
/// The issuer and the key set endpoint are derived from the provider domain;
/// the audience defaults to the provider's management API identifier.
#[derive(Clone)]
pub struct AuthConfig {
    /// Identity provider domain, e.g. `tenant.eu.auth0.com`
    pub domain: String,
    /// Expected `aud` claim
    pub audience: String,
    /// Expected `iss` claim
    pub issuer: String,
    /// Key publishing endpoint
    pub jwks_uri: Url,
    /// HS256 secret for internally minted tokens
    pub shared_secret: Option<String>,
    /// Tolerance applied to `exp`/`nbf`
    pub leeway: Duration,
    /// Upper bound for a single key set fetch
    pub jwks_fetch_timeout: Duration,
    /// Maximum age of a cached key set (None = refresh on `kid` miss only)
    pub jwks_max_age: Option<Duration>,
    /// Interval of the background key set refresh (None = disabled)
    pub jwks_refresh_interval: Option<Duration>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("domain", &self.domain)
            .field("audience", &self.audience)
            .field("issuer", &self.issuer)
            .field("jwks_uri", &self.jwks_uri)
            .field("has_shared_secret", &self.shared_secret.is_some())
            .field("leeway", &self.leeway)
            .field("jwks_fetch_timeout", &self.jwks_fetch_timeout)
            .field("jwks_max_age", &self.jwks_max_age)
            .field("jwks_refresh_interval", &self.jwks_refresh_interval)
            .finish()
    }
}

impl AuthConfig {
    pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

    /// Derive issuer, audience and key endpoint from the provider domain
    pub fn for_domain(domain: &str) -> crate::Result<Self> {
        let domain = normalize_domain(domain)?;
        let jwks_uri = Url::parse(&format!("https://{domain}/.well-known/jwks.json"))
            .map_err(|e| Error::Config(format!("Invalid identity provider domain: {e}")))?;

        Ok(Self {
            audience: format!("https://{domain}/api/v2/"),
            issuer: format!("https://{domain}/"),
            jwks_uri,
            shared_secret: None,
            leeway: Duration::ZERO,
            jwks_fetch_timeout: Self::DEFAULT_FETCH_TIMEOUT,
            jwks_max_age: None,
            jwks_refresh_interval: None,
            domain,
        })
    }

    #[must_use]
    pub fn with_audience(mut self, audience: String) -> Self {
        self.audience = audience;
        self
    }

    #[must_use]
    pub fn with_jwks_uri(mut self, uri: Url) -> Self {
        self.jwks_uri = uri;
        self
    }

    #[must_use]
    pub fn with_shared_secret(mut self, secret: String) -> Self {
        self.shared_secret = Some(secret);
        self
    }

    #[must_use]
    pub const fn with_leeway(mut self, leeway: Duration) -> Self {
        self.leeway = leeway;
        self
    }

    #[must_use]
    pub const fn with_jwks_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.jwks_fetch_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn with_jwks_max_age(mut self, max_age: Option<Duration>) -> Self {
        self.jwks_max_age = max_age;
        self
    }

    #[must_use]
    pub const fn with_jwks_refresh_interval(mut self, interval: Option<Duration>) -> Self {
        self.jwks_refresh_interval = interval;
        self
    }
}

/// Accept `tenant.auth0.com`, `https://tenant.auth0.com` or `tenant.auth0.com/`
fn normalize_domain(raw: &str) -> crate::Result<String> {
    let trimmed = raw.trim();
    let without_scheme = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or(trimmed);
    let domain = without_scheme.trim_end_matches('/');

    if domain.is_empty() {
        return Err(Error::Config("identity provider domain is empty".into()));
    }
    if domain.contains(['/', '?', '#', ' ']) {
        return Err(Error::Config(format!(
            "identity provider domain must be a host name, got '{domain}'"
        )));
    }
    Ok(domain.to_string())
}
