use std::{net::SocketAddr, sync::Arc};

use mcs_api::{ControlApiAdapter, HttpApi};
use mcs_aws::AwsCli;
use mcs_core::MetricsHandle;
use mcs_model::ServerConfig;
use mcs_prometheus::PrometheusMetrics;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::backend;

pub async fn serve(
    cfg: &ServerConfig,
    aws: &AwsCli,
    listen: Option<SocketAddr>,
) -> anyhow::Result<()> {
    let addr = listen.unwrap_or(cfg.control.listen);
    let shutdown = CancellationToken::new();

    let metrics = PrometheusMetrics::new()?;
    let handle: MetricsHandle = Arc::new(metrics.clone());
    let controller = backend::controller(cfg, aws)?.with_metrics(handle.clone());
    let runner = backend::runner_over(cfg, controller)?
        .with_metrics(handle)
        .with_shutdown(shutdown.child_token());

    let app = HttpApi::new(Arc::new(ControlApiAdapter::new(runner)))
        .with_metrics(metrics)
        .router();

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "control api listening");

    let trigger = shutdown.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        info!("shutting down...");
        trigger.cancel();
    });

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    info!("control api stopped");
    Ok(())
}

async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "ctrl-c handler failed");
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
                warn!(error = %e, "SIGTERM handler failed");
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
}
