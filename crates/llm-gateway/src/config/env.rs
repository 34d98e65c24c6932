//! Environment variable loading for configuration

use std::env;
use std::net::IpAddr;
use std::time::Duration;

use url::Url;

use super::builder::ConfigBuilder;
use crate::Result;

/// Environment variable names
mod vars {
    pub const AUTH0_DOMAIN: &str = "AUTH0_DOMAIN";
    pub const AUTH0_AUDIENCE: &str = "AUTH0_AUDIENCE";
    pub const JWT_SECRET_KEY: &str = "JWT_SECRET_KEY";
    pub const JWKS_URI: &str = "JWKS_URI";
    pub const JWKS_FETCH_TIMEOUT_SECS: &str = "JWKS_FETCH_TIMEOUT_SECS";
    pub const JWKS_MAX_AGE_SECS: &str = "JWKS_MAX_AGE_SECS";
    pub const JWKS_REFRESH_INTERVAL_SECS: &str = "JWKS_REFRESH_INTERVAL_SECS";
    pub const JWT_LEEWAY_SECS: &str = "JWT_LEEWAY_SECS";
    pub const GATEWAY_HOST: &str = "GATEWAY_HOST";
    pub const GATEWAY_PORT: &str = "GATEWAY_PORT";
    pub const GATEWAY_REQUEST_TIMEOUT_SECS: &str = "GATEWAY_REQUEST_TIMEOUT_SECS";
    pub const GATEWAY_JSON_LOGS: &str = "GATEWAY_JSON_LOGS";
    pub const OTEL_EXPORTER_OTLP_ENDPOINT: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";
    pub const OTEL_SERVICE_NAME: &str = "OTEL_SERVICE_NAME";
    pub const RUST_LOG: &str = "RUST_LOG";
}

/// Load configuration from environment variables
pub fn load_from_env(mut builder: ConfigBuilder) -> Result<ConfigBuilder> {
    // Identity provider
    if let Ok(domain) = env::var(vars::AUTH0_DOMAIN)
        && !domain.trim().is_empty()
    {
        builder = builder.auth_domain(domain);
    }

    if let Ok(audience) = env::var(vars::AUTH0_AUDIENCE) {
        builder = builder.audience(audience);
    }

    if let Ok(secret) = env::var(vars::JWT_SECRET_KEY) {
        builder = builder.shared_secret(secret);
    }

    if let Ok(uri_str) = env::var(vars::JWKS_URI) {
        let uri = Url::parse(&uri_str)
            .map_err(|e| crate::Error::Config(format!("Invalid {}: {}", vars::JWKS_URI, e)))?;
        builder = builder.jwks_uri(uri);
    }

    // Key set cache
    if let Some(timeout) = secs_var(vars::JWKS_FETCH_TIMEOUT_SECS) {
        builder = builder.jwks_fetch_timeout(timeout);
    }

    if let Some(max_age) = secs_var(vars::JWKS_MAX_AGE_SECS) {
        builder = builder.jwks_max_age(non_zero(max_age));
    }

    if let Some(interval) = secs_var(vars::JWKS_REFRESH_INTERVAL_SECS) {
        builder = builder.jwks_refresh_interval(non_zero(interval));
    }

    if let Some(leeway) = secs_var(vars::JWT_LEEWAY_SECS) {
        builder = builder.leeway(leeway);
    }

    // Server
    if let Ok(host_str) = env::var(vars::GATEWAY_HOST)
        && let Ok(host) = host_str.parse::<IpAddr>()
    {
        builder = builder.http_host(host);
    }

    if let Ok(port_str) = env::var(vars::GATEWAY_PORT)
        && let Ok(port) = port_str.parse::<u16>()
    {
        builder = builder.http_port(port);
    }

    if let Some(timeout) = secs_var(vars::GATEWAY_REQUEST_TIMEOUT_SECS) {
        builder = builder.request_timeout(timeout);
    }

    // Telemetry
    if let Ok(endpoint) = env::var(vars::OTEL_EXPORTER_OTLP_ENDPOINT) {
        builder = builder.otlp_endpoint(Some(endpoint));
    }

    if let Ok(name) = env::var(vars::OTEL_SERVICE_NAME) {
        builder = builder.service_name(name);
    }

    if let Ok(level) = env::var(vars::RUST_LOG) {
        builder = builder.log_level(level);
    }

    if let Ok(val) = env::var(vars::GATEWAY_JSON_LOGS) {
        builder = builder.json_logs(parse_bool(&val));
    }

    Ok(builder)
}

/// Whole seconds; unparseable values are ignored
fn secs_var(name: &str) -> Option<Duration> {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// `0` disables an optional interval
fn non_zero(duration: Duration) -> Option<Duration> {
    (!duration.is_zero()).then_some(duration)
}

fn parse_bool(s: &str) -> bool {
    matches!(s.to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}
