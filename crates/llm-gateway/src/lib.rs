//! Authenticating proxy gateway for LLM completion providers
//!
//! Inbound requests pass through a fixed [`Pipeline`]: the request target is
//! repaired by the URL normalizer, then the bearer token is verified against
//! the identity provider's published key set before any route runs.

pub mod auth;
pub mod config;
mod constants;
pub mod dispatch;
mod error;
pub mod normalize;
pub mod observability;
pub mod pipeline;
pub mod transport;

pub use auth::{
    AuthConfig, AuthFailure, AuthGate, Claims, HttpKeySetSource, JwksRefreshTask, KeySetCache,
    KeySetSource, TokenVerifier,
};
pub use config::{Config, ConfigBuilder, ServerConfig, TelemetryConfig};
pub use dispatch::{ChatCompletionRequest, CompletionDispatcher, DispatchError};
pub use error::{Error, Result};
pub use normalize::{NormalizedTarget, QueryParams, UrlNormalizer, normalize_target};
pub use pipeline::Pipeline;
pub use transport::{AppState, build_router, run_http};
