//! Transport layer
//!
//! HTTP routing and serving for the gateway

mod http;

pub use http::{AppState, build_router, run_http};
