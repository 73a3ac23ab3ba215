//! jirastat exporter
//!
//! - Polls Jira issue search on a fixed period (`poller`)
//! - Serves the last complete cycle at /metrics, plus /liveness and /readiness
//! - SIGINT/SIGTERM: stop polling, drain in-flight requests, exit

use tokio::sync::watch;
use tracing_subscriber::{fmt, EnvFilter};

use jirastat_exporter::{app_state, config, poller::Poller, router};

#[tokio::main]
async fn main() {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, class = e.class().as_str(), "jirastat-exporter failed");
        std::process::exit(1);
    }
}

async fn run() -> jirastat_core::Result<()> {
    // Config errors are the only fatal class.
    let cfg = config::load()?;
    let listen = cfg.listen_addr()?;
    tracing::info!(?cfg, "config loaded");

    let state = app_state::AppState::new(&cfg)?;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let poller = Poller::new(
        state.source(),
        state.store(),
        state.metrics(),
        cfg.poll.refresh_period,
    );
    let poll_task = tokio::spawn(poller.run(shutdown_rx));

    let app = router::build_router(state.clone());

    tracing::info!(%listen, "jirastat-exporter starting");
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| jirastat_core::JiraStatError::Config(format!("failed to bind {listen}: {e}")))?;

    let metrics = state.metrics();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            metrics.set_draining();
            let _ = shutdown_tx.send(true);
        })
        .await
        .map_err(|e| jirastat_core::JiraStatError::Internal(format!("server failed: {e}")))?;

    if let Err(e) = poll_task.await {
        tracing::warn!(error = %e, "poller task ended abnormally");
    }
    tracing::info!("jirastat-exporter stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
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
                tracing::error!(error = %e, "failed to install SIGTERM handler");
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
    tracing::info!("signal received, starting graceful shutdown");
}
