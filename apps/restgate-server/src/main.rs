//! Restgate Server - a standalone REST gateway.
//!
//! This binary registers the in-memory `widgets` resource and serves its
//! versioned CRUD routes (`/api/v{version}/widgets[/{resource_id}]`) over
//! HTTP/1.1 and HTTP/2.
//!
//! # Usage
//!
//! ```text
//! GATEWAY_LISTEN=0.0.0.0:8080 restgate-server
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `GATEWAY_LISTEN` | `0.0.0.0:8080` | Bind address |
//! | `RESTGATE_DEFAULT_LIMIT` | `100` | Page size when `limit` is missing or invalid |
//! | `RESTGATE_DEFAULT_FORMAT` | `json` | Format when `format` is missing |
//! | `RESTGATE_MAX_BODY_SIZE` | `1048576` | Largest accepted request body, in bytes |
//! | `RESTGATE_API_KEY` | *(unset)* | When set, requests must send it in `x-api-key` |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |
//! | `LOG_FORMAT` | `text` | `json` switches logs to JSON lines |

mod gateway;
mod widgets;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use restgate_http::{RestApi, RestHttpConfig, RestHttpService};

use crate::gateway::GatewayService;
use crate::widgets::WidgetHandler;

/// Server version reported in health check responses.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// How long in-flight requests may take to finish after a shutdown signal.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Build the log filter. `RUST_LOG` directives win over `LOG_LEVEL`.
fn build_filter(rust_log: Option<&str>, log_level: &str) -> Result<EnvFilter> {
    match rust_log {
        Some(directives) => EnvFilter::try_new(directives)
            .with_context(|| format!("invalid RUST_LOG filter: {directives}")),
        None => EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}")),
    }
}

/// Initialize the tracing subscriber, as JSON lines when `json` is set.
fn init_tracing(log_level: &str, json: bool) -> Result<()> {
    let rust_log = std::env::var("RUST_LOG").ok();
    let filter = build_filter(rust_log.as_deref(), log_level)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

/// Build the API with every resource this binary serves.
fn build_api(config: RestHttpConfig, api_key: Option<String>) -> Result<RestApi> {
    let mut api = RestApi::new(config);
    api.register(WidgetHandler::new(api_key))
        .context("failed to register widgets resource")?;
    Ok(api)
}

/// Resolve on Ctrl-C, or on SIGTERM where available.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.ok();
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
    info!("received shutdown signal, draining connections");
}

/// Accept connections until `shutdown` resolves, then drain in-flight
/// requests for at most [`DRAIN_TIMEOUT`].
async fn serve<F>(listener: TcpListener, service: GatewayService, shutdown: F) -> Result<()>
where
    F: Future<Output = ()>,
{
    let graceful = hyper_util::server::graceful::GracefulShutdown::new();
    let http = HttpConnBuilder::new(TokioExecutor::new());
    let mut accepted: u64 = 0;

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = listener.accept() => {
                let (stream, peer_addr) = match result {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(error = %e, "failed to accept connection");
                        continue;
                    }
                };
                accepted += 1;
                debug!(%peer_addr, connection = accepted, "accepted connection");

                let conn = http.serve_connection(TokioIo::new(stream), service.clone());
                let conn = graceful.watch(conn.into_owned());

                tokio::spawn(async move {
                    if let Err(e) = conn.await {
                        error!(%peer_addr, error = %e, "connection error");
                    }
                });
            }

            () = &mut shutdown => break,
        }
    }

    info!(connections = accepted, "stopped accepting connections");
    if tokio::time::timeout(DRAIN_TIMEOUT, graceful.shutdown())
        .await
        .is_err()
    {
        warn!(timeout = ?DRAIN_TIMEOUT, "connections still open after drain timeout");
    }
    info!("server stopped");

    Ok(())
}

/// Check a raw `/health` HTTP response: status 200 and a `"running"` status.
fn check_health_response(raw: &str) -> Result<()> {
    let (head, body) = raw
        .split_once("\r\n\r\n")
        .context("malformed HTTP response")?;
    let status = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .context("missing HTTP status line")?;
    anyhow::ensure!(status == "200", "health endpoint answered {status}");

    let health: serde_json::Value =
        serde_json::from_str(body.trim()).context("health body is not JSON")?;
    anyhow::ensure!(
        health["status"] == "running",
        "server reports status {}",
        health["status"]
    );
    Ok(())
}

/// Query `/health` on `addr` over a plain HTTP/1.1 connection.
async fn run_health_check(addr: &str) -> Result<()> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    let mut stream = TcpStream::connect(addr)
        .await
        .with_context(|| format!("cannot connect to {addr}"))?;

    let request = format!("GET /health HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await?;

    let mut response = String::new();
    stream.read_to_string(&mut response).await?;

    check_health_response(&response).with_context(|| format!("unhealthy server at {addr}"))
}

/// Read the gateway listen address from the environment.
fn gateway_listen_addr() -> String {
    std::env::var("GATEWAY_LISTEN").unwrap_or_else(|_| "0.0.0.0:8080".to_string())
}

/// Read the log level from the environment.
fn log_level() -> String {
    std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string())
}

/// Whether `LOG_FORMAT` asks for JSON log lines.
fn json_logs() -> bool {
    std::env::var("LOG_FORMAT").is_ok_and(|v| v.trim().eq_ignore_ascii_case("json"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let listen_addr = gateway_listen_addr();

    // Handle --health-check flag for Docker HEALTHCHECK.
    if std::env::args().any(|a| a == "--health-check") {
        let addr = listen_addr.replace("0.0.0.0", "127.0.0.1");
        let healthy = run_health_check(&addr).await.is_ok();
        std::process::exit(i32::from(!healthy));
    }

    let log = log_level();
    init_tracing(&log, json_logs())?;

    let config = RestHttpConfig::from_env();
    let api_key = std::env::var("RESTGATE_API_KEY").ok();
    info!(
        default_limit = config.default_limit,
        default_format = %config.default_format,
        max_body_size = config.max_body_size,
        api_key_required = api_key.is_some(),
        "initializing REST gateway",
    );

    let api = build_api(config, api_key)?;
    let gateway = GatewayService::new(RestHttpService::new(Arc::new(api)));

    let addr: SocketAddr = listen_addr
        .parse()
        .with_context(|| format!("invalid bind address: {listen_addr}"))?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    info!(
        %addr,
        resources = ?gateway.resource_names(),
        version = VERSION,
        "starting Restgate Server",
    );

    serve(listener, gateway, shutdown_signal()).await
}
