// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::{Context as _, Result};
use axum::{http::StatusCode, routing::get, Router};
use clap::Parser;
use futures::StreamExt;
use hetzner_operator::{
    config::OperatorArgs,
    constants::{ERROR_REQUEUE_DURATION_SECS, TOKIO_WORKER_THREADS},
    context::Context,
    credentials::KubeSecretSource,
    crd::HetznerCluster,
    hcloud::HttpClientFactory,
    metrics::gather_metrics,
    reconcilers::{reconcile_hetznercluster, Reconciler},
};
use kube::{
    runtime::{controller::Action, watcher::Config, Controller},
    Api, Client, ResourceExt,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
struct ReconcileError(#[from] anyhow::Error);

fn main() -> Result<()> {
    let args = OperatorArgs::parse();

    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(TOKIO_WORKER_THREADS)
        .thread_name("hetzner-operator")
        .enable_all()
        .build()?;

    runtime.block_on(async_main(args))
}

async fn async_main(args: OperatorArgs) -> Result<()> {
    // Respects RUST_LOG (default INFO) and RUST_LOG_FORMAT=json|text
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }

    info!("Starting Hetzner cluster operator");
    debug!(?args, "Parsed operator arguments");

    debug!("Initializing Kubernetes client");
    let client = Client::try_default().await?;
    debug!("Kubernetes client initialized successfully");

    let factory = HttpClientFactory::new(args.hcloud_endpoint.clone(), args.http_timeout())
        .context("building Hetzner Cloud HTTP client")?;
    let reconciler = Reconciler::new(
        Arc::new(KubeSecretSource::new(client.clone())),
        Arc::new(factory),
        args.reconciler_config(),
    );
    let ctx = Arc::new(Context::new(client.clone(), reconciler));

    tokio::select! {
        result = run_hetznercluster_controller(client, ctx) => {
            error!("CRITICAL: HetznerCluster controller exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("HetznerCluster controller exited unexpectedly without error")
        }
        result = run_metrics_server(args.metrics_addr) => {
            error!("CRITICAL: metrics server exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("metrics server exited unexpectedly without error")
        }
        result = shutdown_signal() => {
            result?;
            info!("Graceful shutdown completed successfully");
            Ok(())
        }
    }
}

/// Wait for SIGTERM (pod termination) or SIGINT.
async fn shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate())?;
        tokio::select! {
            _ = sigterm.recv() => info!("Received SIGTERM (pod termination), initiating graceful shutdown..."),
            result = tokio::signal::ctrl_c() => {
                result?;
                info!("Received SIGINT, initiating graceful shutdown...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Received SIGINT, initiating graceful shutdown...");
    }
    Ok(())
}

/// Run the `HetznerCluster` controller
async fn run_hetznercluster_controller(client: Client, ctx: Arc<Context>) -> Result<()> {
    info!("Starting HetznerCluster controller");

    let api = Api::<HetznerCluster>::all(client);

    Controller::new(api, Config::default())
        .run(reconcile_hetznercluster_wrapper, error_policy, ctx)
        .for_each(|_| futures::future::ready(()))
        .await;

    Ok(())
}

/// Reconcile wrapper for `HetznerCluster`
async fn reconcile_hetznercluster_wrapper(
    cluster: Arc<HetznerCluster>,
    ctx: Arc<Context>,
) -> Result<Action, ReconcileError> {
    debug!(
        cluster_name = %cluster.name_any(),
        namespace = ?cluster.namespace(),
        "Reconcile wrapper called for HetznerCluster"
    );

    match reconcile_hetznercluster(ctx, cluster.clone()).await {
        Ok(action) => {
            info!("Successfully reconciled HetznerCluster: {}", cluster.name_any());
            Ok(action)
        }
        Err(e) => {
            error!("Failed to reconcile HetznerCluster: {}", e);
            Err(e.into())
        }
    }
}

/// Error policy for the `HetznerCluster` controller
fn error_policy(
    resource: Arc<HetznerCluster>,
    err: &ReconcileError,
    _ctx: Arc<Context>,
) -> Action {
    warn!(
        cluster_name = %resource.name_any(),
        error = %err,
        "Requeueing HetznerCluster after error"
    );
    Action::requeue(Duration::from_secs(ERROR_REQUEUE_DURATION_SECS))
}

/// Serve `/metrics` and `/healthz`
async fn run_metrics_server(addr: SocketAddr) -> Result<()> {
    let app = Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/healthz", get(healthz_handler));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding metrics server to {addr}"))?;
    info!("Metrics server listening on {}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}

async fn metrics_handler() -> Result<String, (StatusCode, String)> {
    gather_metrics().map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

async fn healthz_handler() -> &'static str {
    "ok"
}
