//! TOML configuration file loading

use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use url::Url;

use super::builder::ConfigBuilder;
use crate::Result;

/// Configuration file locations checked in order
const CONFIG_PATHS: &[&str] = &[
    "./llm-gateway.toml",
    "~/.config/llm-gateway/config.toml",
    "/etc/llm-gateway/config.toml",
];

/// Find the first existing configuration file
pub fn find_config_file() -> Option<PathBuf> {
    for path_str in CONFIG_PATHS {
        let path = if path_str.starts_with('~') {
            if let Ok(home) = std::env::var("HOME") {
                PathBuf::from(path_str.replacen('~', &home, 1))
            } else {
                continue;
            }
        } else {
            PathBuf::from(path_str)
        };

        if path.exists() {
            return Some(path);
        }
    }
    None
}

/// Load configuration from a TOML file
pub fn load_from_file(path: &Path, builder: ConfigBuilder) -> Result<ConfigBuilder> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        crate::Error::Config(format!(
            "Failed to read config file {}: {}",
            path.display(),
            e
        ))
    })?;

    let file_config: FileConfig = toml::from_str(&content).map_err(|e| {
        crate::Error::Config(format!(
            "Failed to parse config file {}: {}",
            path.display(),
            e
        ))
    })?;

    apply_file_config(builder, file_config)
}

fn apply_file_config(mut builder: ConfigBuilder, config: FileConfig) -> Result<ConfigBuilder> {
    // Server settings
    if let Some(server) = config.server {
        if let Some(host_str) = server.host
            && let Ok(host) = host_str.parse::<IpAddr>()
        {
            builder = builder.http_host(host);
        }

        if let Some(port) = server.port {
            builder = builder.http_port(port);
        }

        if let Some(timeout) = server.request_timeout_secs {
            builder = builder.request_timeout(Duration::from_secs(timeout));
        }
    }

    // Identity provider settings
    if let Some(auth) = config.auth {
        if let Some(domain) = auth.domain {
            builder = builder.auth_domain(domain);
        }

        if let Some(audience) = auth.audience {
            builder = builder.audience(audience);
        }

        if let Some(uri_str) = auth.jwks_uri {
            let uri = Url::parse(&uri_str)
                .map_err(|e| crate::Error::Config(format!("Invalid jwks_uri: {e}")))?;
            builder = builder.jwks_uri(uri);
        }

        if let Some(timeout) = auth.jwks_fetch_timeout_secs {
            builder = builder.jwks_fetch_timeout(Duration::from_secs(timeout));
        }

        if let Some(max_age) = auth.jwks_max_age_secs {
            builder = builder.jwks_max_age((max_age > 0).then(|| Duration::from_secs(max_age)));
        }

        if let Some(interval) = auth.jwks_refresh_interval_secs {
            builder = builder
                .jwks_refresh_interval((interval > 0).then(|| Duration::from_secs(interval)));
        }

        if let Some(leeway) = auth.leeway_secs {
            builder = builder.leeway(Duration::from_secs(leeway));
        }
    }

    // Observability settings
    if let Some(obs) = config.observability {
        if let Some(endpoint) = obs.otlp_endpoint {
            builder = builder.otlp_endpoint(Some(endpoint));
        }

        if let Some(name) = obs.service_name {
            builder = builder.service_name(name);
        }

        if let Some(level) = obs.log_level {
            builder = builder.log_level(level);
        }

        if let Some(json) = obs.json_logs {
            builder = builder.json_logs(json);
        }
    }

    Ok(builder)
}

/// Root configuration file structure.
///
/// The HS256 shared secret is deliberately absent: it is only read from the
/// environment.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    server: Option<ServerFileConfig>,
    auth: Option<AuthFileConfig>,
    observability: Option<ObservabilityConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ServerFileConfig {
    host: Option<String>,
    port: Option<u16>,
    request_timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct AuthFileConfig {
    domain: Option<String>,
    audience: Option<String>,
    jwks_uri: Option<String>,
    jwks_fetch_timeout_secs: Option<u64>,
    jwks_max_age_secs: Option<u64>,
    jwks_refresh_interval_secs: Option<u64>,
    leeway_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ObservabilityConfig {
    otlp_endpoint: Option<String>,
    service_name: Option<String>,
    log_level: Option<String>,
    json_logs: Option<bool>,
}
