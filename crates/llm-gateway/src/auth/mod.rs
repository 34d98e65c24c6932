//! Bearer token authentication
//!
//! Tokens are issued by an external identity provider and verified against
//! the provider's published JWKS.
//!
//! # Components
//!
//! - [`KeySetCache`] fetches and caches signing keys, refetching once on an
//!   unknown `kid`; concurrent misses share one fetch
//! - [`TokenVerifier`] checks RS256 signatures with an HS256 fallback for
//!   internally minted tokens
//! - [`AuthGate`] exempts public paths, parses the `Authorization` header and
//!   attaches verified [`Claims`] to the request

mod claims;
mod config;
mod error;
mod gate;
mod jwks;
mod jwt;
#[cfg(test)]
pub(crate) mod testing;

pub use claims::{Claims, OneOrMany};
pub use config::AuthConfig;
pub use error::{AuthFailure, AuthFailureKind, KeyFetchError, ResolveError, Result};
pub use gate::{AuthGate, PathRule, bearer_token};
pub use jwks::{
    HttpKeySetSource, Jwk, JwkSet, JwksRefreshTask, KeySetCache, KeySetSource, SigningKey,
};
pub use jwt::TokenVerifier;
