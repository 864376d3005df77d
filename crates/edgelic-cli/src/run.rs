//! # Run Subcommand
//!
//! Starts license enforcement for the IoT Edge module this process runs in.
//! Identity and license key come from the module environment
//! (`IOTEDGE_MODULEID`, `IOTEDGE_DEVICEID`, `IOTEDGE_IOTHUBHOSTNAME`,
//! `MODULE_LICENSE_KEY`); everything else from flags or their variables.
//!
//! The process stays up until it is asked to stop (exit 0) or the license is
//! lost (exit 2).

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use edgelic_client::{LicenseClient, LicenseSource, LicensingServerConfig, StaticLicenseSource};
use edgelic_core::{cancel_pair, TokenValidator};
use edgelic_enforcer::{EnforcementConfig, LicenseEnforcer, LicensingMetrics};
use prometheus::Registry;

use crate::key::{load_issuer_key, KeyFormat};
use crate::metrics_server::{self, DEFAULT_METRICS_PORT};
use crate::EXIT_LICENSE_INVALID;

/// Arguments for `edgelic run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Licensing server endpoint the license request is POSTed to.
    #[arg(long, env = "LICENSING_SERVER_URL")]
    pub server_url: Option<String>,

    /// Per-request timeout for the licensing server, in seconds.
    #[arg(
        long,
        env = "LICENSING_TIMEOUT_SECS",
        default_value_t = 60,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub timeout_secs: u64,

    /// Validate a pre-provisioned token instead of fetching one online.
    /// Takes precedence over `--server-url`.
    #[arg(long, env = "LICENSE_TOKEN_FILE")]
    pub token_file: Option<PathBuf>,

    /// Issuer verification key.
    #[arg(long, env = "LICENSE_ISSUER_KEY_FILE")]
    pub issuer_key: PathBuf,

    #[arg(long, value_enum, env = "LICENSE_ISSUER_KEY_FORMAT", default_value = "rsa-pem")]
    pub key_format: KeyFormat,

    /// Audience licenses must be issued for, usually the module's product name.
    #[arg(long, env = "LICENSE_AUDIENCE")]
    pub audience: String,

    /// Expected token issuer. Defaults to the licensing server URL.
    #[arg(long, env = "LICENSE_ISSUER")]
    pub issuer: Option<String>,

    /// Port for the Prometheus `/metrics` endpoint.
    #[arg(long, env = "METRICS_PORT", default_value_t = DEFAULT_METRICS_PORT)]
    pub metrics_port: u16,

    /// Do not serve `/metrics`.
    #[arg(long)]
    pub no_metrics: bool,
}

/// Build the license source and the issuer it implies.
fn license_source(args: &RunArgs) -> Result<(Arc<dyn LicenseSource>, Option<String>)> {
    if let Some(path) = &args.token_file {
        let token = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read license token {}", path.display()))?;
        tracing::info!(path = %path.display(), "using pre-provisioned license token");
        return Ok((Arc::new(StaticLicenseSource::new(token)), None));
    }

    let url = args
        .server_url
        .as_deref()
        .context("either --server-url (LICENSING_SERVER_URL) or --token-file is required")?;
    let config = LicensingServerConfig::new(url)?.with_timeout_secs(args.timeout_secs);
    let client = LicenseClient::new(config)?;
    tracing::info!(server = %client.server_url(), "using online licensing server");
    Ok((Arc::new(client), Some(url.trim().to_string())))
}

/// Resolve the issuer a token must carry.
fn resolve_issuer(explicit: Option<&str>, from_source: Option<String>) -> Result<String> {
    explicit
        .map(str::to_string)
        .or(from_source)
        .context("--issuer (LICENSE_ISSUER) is required with --token-file")
}

/// Execute the run subcommand.
pub async fn run_enforcer(args: &RunArgs) -> Result<u8> {
    let key = load_issuer_key(&args.issuer_key, args.key_format)?;
    let (source, source_issuer) = license_source(args)?;
    let issuer = resolve_issuer(args.issuer.as_deref(), source_issuer)?;
    let config = EnforcementConfig::from_env(&args.audience, issuer)
        .context("invalid enforcement configuration")?;

    let registry = Registry::new();
    let metrics = LicensingMetrics::register(&registry, &config.identity)?;

    let (server_stop, server_signal) = cancel_pair();
    let server = if args.no_metrics {
        None
    } else {
        let addr = SocketAddr::from(([0, 0, 0, 0], args.metrics_port));
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind metrics listener on {addr}"))?;
        Some(tokio::spawn(metrics_server::serve(
            listener,
            registry.clone(),
            server_signal,
        )))
    };

    let handle = LicenseEnforcer::new(source, TokenValidator::new(key), config, metrics).start();
    let canceller = handle.canceller();
    let mut join = std::pin::pin!(handle.join());

    let result = tokio::select! {
        result = &mut join => result,
        _ = shutdown_signal() => {
            tracing::info!("shutdown requested, stopping license checks");
            canceller.cancel();
            join.await
        }
    };

    server_stop.cancel();
    if let Some(server) = server {
        match server.await {
            Ok(Err(e)) => tracing::warn!("metrics server failed: {e}"),
            Err(e) => tracing::warn!("metrics server task failed: {e}"),
            Ok(Ok(())) => {}
        }
    }

    match result {
        Ok(()) => Ok(0),
        Err(e) => {
            tracing::error!("{:#}", anyhow::Error::new(e));
            Ok(EXIT_LICENSE_INVALID)
        }
    }
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!("failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
