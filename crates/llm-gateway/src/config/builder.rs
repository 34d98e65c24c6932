//! Configuration builder

use std::net::IpAddr;
use std::time::Duration;

use url::Url;

use crate::Error;
use crate::auth::AuthConfig;
use crate::constants::{
    DEFAULT_LOG_LEVEL, DEFAULT_PORT, DEFAULT_REQUEST_TIMEOUT_SECS, SERVICE_NAME,
};

/// Gateway configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub auth: AuthConfig,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
}

impl Config {
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    #[must_use]
    pub const fn auth(&self) -> &AuthConfig {
        &self.auth
    }
}

/// HTTP listener settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    pub request_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
            port: DEFAULT_PORT,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Default)]
pub struct TelemetryConfig {
    pub otlp_endpoint: Option<String>,
    pub service_name: String,
    pub log_level: String,
    pub json_logs: bool,
}

/// Configuration builder with fluent API
pub struct ConfigBuilder {
    auth_domain: Option<String>,
    audience: Option<String>,
    shared_secret: Option<String>,
    jwks_uri: Option<Url>,
    jwks_fetch_timeout: Duration,
    jwks_max_age: Option<Duration>,
    jwks_refresh_interval: Option<Duration>,
    leeway: Duration,
    server: ServerConfig,
    telemetry: TelemetryConfig,
}

impl std::fmt::Debug for ConfigBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigBuilder")
            .field("auth_domain", &self.auth_domain)
            .field("audience", &self.audience)
            .field("has_shared_secret", &self.shared_secret.is_some())
            .field("jwks_uri", &self.jwks_uri)
            .field("jwks_fetch_timeout", &self.jwks_fetch_timeout)
            .field("jwks_max_age", &self.jwks_max_age)
            .field("jwks_refresh_interval", &self.jwks_refresh_interval)
            .field("leeway", &self.leeway)
            .field("server", &self.server)
            .field("telemetry", &self.telemetry)
            .finish()
    }
}

impl ConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            auth_domain: None,
            audience: None,
            shared_secret: None,
            jwks_uri: None,
            jwks_fetch_timeout: AuthConfig::DEFAULT_FETCH_TIMEOUT,
            jwks_max_age: None,
            jwks_refresh_interval: None,
            leeway: Duration::ZERO,
            server: ServerConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }

    /// Identity provider domain; issuer and JWKS endpoint derive from it
    #[must_use]
    pub fn auth_domain(mut self, domain: String) -> Self {
        self.auth_domain = Some(domain);
        self
    }

    #[must_use]
    pub fn audience(mut self, audience: String) -> Self {
        self.audience = Some(audience);
        self
    }

    #[must_use]
    pub fn shared_secret(mut self, secret: String) -> Self {
        self.shared_secret = Some(secret);
        self
    }

    #[must_use]
    pub fn jwks_uri(mut self, uri: Url) -> Self {
        self.jwks_uri = Some(uri);
        self
    }

    #[must_use]
    pub const fn jwks_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.jwks_fetch_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn jwks_max_age(mut self, max_age: Option<Duration>) -> Self {
        self.jwks_max_age = max_age;
        self
    }

    #[must_use]
    pub const fn jwks_refresh_interval(mut self, interval: Option<Duration>) -> Self {
        self.jwks_refresh_interval = interval;
        self
    }

    #[must_use]
    pub const fn leeway(mut self, leeway: Duration) -> Self {
        self.leeway = leeway;
        self
    }

    #[must_use]
    pub const fn http_host(mut self, host: IpAddr) -> Self {
        self.server.host = host;
        self
    }

    #[must_use]
    pub const fn http_port(mut self, port: u16) -> Self {
        self.server.port = port;
        self
    }

    #[must_use]
    pub const fn request_timeout(mut self, timeout: Duration) -> Self {
        self.server.request_timeout = timeout;
        self
    }

    #[must_use]
    pub fn otlp_endpoint(mut self, endpoint: Option<String>) -> Self {
        self.telemetry.otlp_endpoint = endpoint;
        self
    }

    #[must_use]
    pub fn service_name(mut self, name: String) -> Self {
        self.telemetry.service_name = name;
        self
    }

    #[must_use]
    pub fn log_level(mut self, level: String) -> Self {
        self.telemetry.log_level = level;
        self
    }

    #[must_use]
    pub const fn json_logs(mut self, enabled: bool) -> Self {
        self.telemetry.json_logs = enabled;
        self
    }

    /// Build the configuration
    pub fn build(self) -> crate::Result<Config> {
        let domain = self
            .auth_domain
            .ok_or_else(|| Error::Config("AUTH0_DOMAIN is required".into()))?;

        if self.jwks_fetch_timeout.is_zero() {
            return Err(Error::Config("JWKS fetch timeout must be positive".into()));
        }
        if self.server.request_timeout.is_zero() {
            return Err(Error::Config("request timeout must be positive".into()));
        }
        if self.jwks_refresh_interval.is_some_and(|i| i.is_zero()) {
            return Err(Error::Config("JWKS refresh interval must be positive".into()));
        }

        let mut auth = AuthConfig::for_domain(&domain)?
            .with_jwks_fetch_timeout(self.jwks_fetch_timeout)
            .with_jwks_max_age(self.jwks_max_age)
            .with_jwks_refresh_interval(self.jwks_refresh_interval)
            .with_leeway(self.leeway);
        if let Some(audience) = self.audience.filter(|a| !a.is_empty()) {
            auth = auth.with_audience(audience);
        }
        if let Some(secret) = self.shared_secret.filter(|s| !s.is_empty()) {
            auth = auth.with_shared_secret(secret);
        }
        if let Some(uri) = self.jwks_uri {
            auth = auth.with_jwks_uri(uri);
        }

        // Apply defaults for telemetry
        let service_name = if self.telemetry.service_name.is_empty() {
            SERVICE_NAME.to_string()
        } else {
            self.telemetry.service_name
        };

        let log_level = if self.telemetry.log_level.is_empty() {
            DEFAULT_LOG_LEVEL.to_string()
        } else {
            self.telemetry.log_level
        };

        Ok(Config {
            auth,
            server: self.server,
            telemetry: TelemetryConfig {
                otlp_endpoint: self.telemetry.otlp_endpoint,
                service_name,
                log_level,
                json_logs: self.telemetry.json_logs,
            },
        })
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
