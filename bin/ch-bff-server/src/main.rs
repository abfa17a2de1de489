//! ClubHub BFF Server
//!
//! Serves the aggregated club APIs:
//! - `GET /api/bff/dashboard/overview`
//! - `GET|POST /api/bff/reservations/availability`
//! - `GET /health/live`, `GET /health/ready`, `GET /api-docs/openapi.json`
//!
//! Prometheus metrics are exposed on a separate port (`/metrics`).
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `CLUBHUB_CONFIG` | - | Path to the TOML config file |
//! | `CLUBHUB_HTTP_PORT` | `8080` | HTTP API port |
//! | `CLUBHUB_METRICS_PORT` | `9090` | Metrics port |
//! | `CLUBHUB_JWT_SECRET` | - | HS256 secret for bearer tokens (required) |
//! | `LOG_FORMAT` | `text` | `json` for structured logs |
//! | `RUST_LOG` | `info` | Log level |

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{http::HeaderValue, routing::get, Router};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tokio::{net::TcpListener, signal};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use ch_bff::{bff_router, BffState, HttpCollaborators};
use ch_config::{AppConfig, ConfigLoader};

#[tokio::main]
async fn main() -> Result<()> {
    ch_common::logging::init_logging("ch-bff-server");
    info!("Starting ClubHub BFF Server");

    let config = ConfigLoader::new().load().context("Failed to load configuration")?;

    let collaborators = HttpCollaborators::new(&config.upstream)
        .context("Failed to build upstream collaborators")?;
    let state = BffState::from_config(&config, Arc::new(collaborators))
        .context("Failed to build BFF state")?;

    let app = bff_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config));

    let api_addr = format!("{}:{}", config.http.host, config.http.port);
    let api_listener = TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("Failed to bind {}", api_addr))?;
    info!("API server listening on http://{}", api_addr);

    let api_task = tokio::spawn(async move {
        if let Err(e) = axum::serve(api_listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
        {
            warn!(error = %e, "API server error");
        }
    });

    let metrics_task = if config.metrics.enabled {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("Failed to install metrics recorder")?;
        let metrics_addr = SocketAddr::from(([0, 0, 0, 0], config.metrics.port));
        let metrics_listener = TcpListener::bind(metrics_addr)
            .await
            .with_context(|| format!("Failed to bind {}", metrics_addr))?;
        info!("Metrics server listening on http://{}/metrics", metrics_addr);

        Some(tokio::spawn(async move {
            if let Err(e) = axum::serve(metrics_listener, metrics_router(handle)).await {
                warn!(error = %e, "Metrics server error");
            }
        }))
    } else {
        None
    };

    info!("ClubHub BFF Server started");

    // the API server drains in-flight requests on shutdown
    let _ = api_task.await;
    if let Some(task) = metrics_task {
        task.abort();
    }

    info!("ClubHub BFF Server shutdown complete");
    Ok(())
}

fn metrics_router(handle: PrometheusHandle) -> Router {
    Router::new().route("/metrics", get(move || async move { handle.render() }))
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .http
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers(Any)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received...");
}
