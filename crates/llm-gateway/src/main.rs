use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use llm_gateway::config::{self, ConfigBuilder};
use llm_gateway::dispatch::UnconfiguredDispatcher;
use llm_gateway::observability::{init_observability, shutdown_observability};
use llm_gateway::{
    AppState, AuthGate, JwksRefreshTask, KeySetCache, Pipeline, TokenVerifier, build_router,
    run_http,
};
use tokio_util::sync::CancellationToken;

#[derive(Parser, Debug)]
#[command(name = "llm-gateway")]
#[command(about = "Authenticating proxy gateway for LLM completion providers", long_about = None)]
#[command(version)]
struct Args {
    /// Identity provider domain (issuer and JWKS endpoint derive from it)
    #[arg(long, env = "AUTH0_DOMAIN")]
    auth_domain: Option<String>,

    /// HTTP bind host
    #[arg(long, default_value = "127.0.0.1")]
    host: IpAddr,

    /// HTTP bind port
    #[arg(short, long, default_value = "8000")]
    port: u16,

    /// Per-request timeout in seconds
    #[arg(long, default_value = "120")]
    request_timeout: u64,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Enable JSON logging output
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // CLI values are the base layer; file and environment override them
    let mut builder = ConfigBuilder::new()
        .http_host(args.host)
        .http_port(args.port)
        .request_timeout(Duration::from_secs(args.request_timeout))
        .json_logs(args.json_logs);

    if let Some(domain) = args.auth_domain {
        builder = builder.auth_domain(domain);
    }
    if args.verbose {
        builder = builder.log_level("debug".to_string());
    }

    let builder = match args.config {
        Some(ref path) => config::load_config_from_path(path, builder)?,
        None => config::load_config(builder)?,
    };
    let config = builder.build()?;

    init_observability(&config.telemetry)?;

    tracing::info!("Starting LLM gateway");
    tracing::info!("Issuer: {}", config.auth.issuer);
    tracing::info!("JWKS endpoint: {}", config.auth.jwks_uri);
    tracing::info!("Request timeout: {:?}", config.server.request_timeout);
    if config.auth.shared_secret.is_some() {
        tracing::info!("HS256 shared-secret tokens accepted");
    }

    let cache = Arc::new(KeySetCache::from_config(&config.auth)?);
    if !cache.warm().await {
        tracing::warn!("JWKS unavailable at startup; keys will be fetched on first request");
    }

    let shutdown_token = CancellationToken::new();
    let refresh = config.auth.jwks_refresh_interval.map(|interval| {
        tracing::info!("JWKS refresh interval: {interval:?}");
        JwksRefreshTask::new(Arc::clone(&cache), interval).spawn(shutdown_token.clone())
    });

    let verifier = Arc::new(TokenVerifier::new(config.auth.clone(), cache));
    let pipeline = Pipeline::new(Arc::new(AuthGate::new(verifier)));
    let state = AppState::new(Arc::new(UnconfiguredDispatcher));
    let router = build_router(state, pipeline, config.server.request_timeout);

    let shutdown = {
        let token = shutdown_token.clone();
        async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl+C: {e}");
            }
            tracing::info!("Shutdown signal received");
            token.cancel();
        }
    };

    let result = run_http(&config.server, router, shutdown).await;

    shutdown_token.cancel();
    if let Some(handle) = refresh {
        let _ = handle.await;
    }

    shutdown_observability();

    result.map_err(Into::into)
}
