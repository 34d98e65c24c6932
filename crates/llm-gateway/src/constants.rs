//! Constants for the gateway

/// Paths served without authentication, matched exactly
pub const PUBLIC_EXACT_PATHS: &[&str] = &["/"];

/// Path prefixes served without authentication
pub const PUBLIC_PATH_PREFIXES: &[&str] = &[
    "/docs",
    "/redoc",
    "/openapi.json",
    "/generate-token",
    "/health",
    "/swagger",
];

/// Health check status: success
pub const STATUS_HEALTHY: &str = "healthy";

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 8000;

/// Default per-request timeout in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

/// Default log level when `RUST_LOG` is unset
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Service name reported to tracing backends
pub const SERVICE_NAME: &str = "llm-gateway";
