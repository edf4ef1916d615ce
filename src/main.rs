// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::process::ExitCode;
use std::sync::Arc;

use evm_balance_exporter::{
    api::router,
    blockchain::RpcClient,
    config::{init_tracing, AppConfig},
    metrics::MetricsSink,
    poller::BalancePoller,
    registry::{poll_targets, AddressRegistry, ChainRegistry},
    state::AppState,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            init_tracing(Default::default());
            error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };
    init_tracing(config.log_format);

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Exporter stopped");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = config.bind_addr()?;
    let chains = ChainRegistry::new(config.chains)?;
    let addresses = AddressRegistry::new(config.addresses, &chains)?;
    let targets = poll_targets(&addresses, &chains)?;

    info!(
        chains = chains.len(),
        addresses = addresses.len(),
        targets = targets.len(),
        interval_secs = config.update_interval.as_secs(),
        max_concurrent_requests = config.max_concurrent_requests,
        "Loaded configuration"
    );
    for chain in chains.names() {
        info!(chain = %chain, "Monitoring chain");
    }

    let metrics = Arc::new(MetricsSink::new()?);
    let client = RpcClient::new(config.rpc_timeout)?;
    let state = AppState::new(metrics.clone(), targets.len());
    let poller = BalancePoller::new(client, targets, metrics)
        .with_interval(config.update_interval)
        .with_max_concurrency(config.max_concurrent_requests);

    let shutdown = CancellationToken::new();
    tokio::spawn(watch_signals(shutdown.clone()));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Metrics server listening");

    let poller_task = tokio::spawn(poller.run(shutdown.clone()));

    let served = axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown.clone().cancelled_owned())
        .await;

    // Stop the poller if the server exited on its own.
    shutdown.cancel();
    if let Err(e) = poller_task.await {
        error!(error = %e, "Poller task failed");
    }
    served?;

    info!("Shutdown complete");
    Ok(())
}

/// Cancel `shutdown` on Ctrl-C or SIGTERM.
async fn watch_signals(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
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
    info!("Shutdown signal received");
    shutdown.cancel();
}
