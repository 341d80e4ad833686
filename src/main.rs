//! Entry point: parses CLI flags, loads and merges configuration, wires up
//! the syslog receiver, ingest task, and HTTP scrape server, and runs them
//! to cooperative shutdown on SIGTERM/SIGINT/SIGQUIT.

use clap::Parser;
use tokio::sync::oneshot;
use tracing_subscriber::EnvFilter;

use nginx_request_exporter::cli::Cli;
use nginx_request_exporter::config::Config;
use nginx_request_exporter::ingest::Ingest;
use nginx_request_exporter::{http, syslog};

fn init_tracing(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_directive()));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Resolves when SIGTERM, SIGINT, or SIGQUIT is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    let quit = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::quit())
            .expect("failed to install SIGQUIT handler")
            .recv()
            .await;
    };

    tokio::select! {
        _ = ctrl_c => tracing::info!("received SIGINT, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
        _ = quit => tracing::info!("received SIGQUIT, shutting down"),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(&cli);

    let base_config = Config::from_cli(&cli);
    let config = base_config.merge_from_file(&cli.config)?;

    tracing::info!(
        listen_address = %config.listen_address,
        syslog_address = %config.syslog_address,
        telemetry_path = %config.telemetry_path,
        "starting nginx-request-exporter"
    );

    let (syslog_rx, syslog_handle) = syslog::spawn(&config.syslog_address).await?;

    let mut ingest = Ingest::new(config.clone());
    let registry_handle = ingest.registry_handle();

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let http_shutdown = async move {
        let _ = shutdown_rx.await;
    };

    let http_task = tokio::spawn(http::serve(
        config.listen_address.clone(),
        config.telemetry_path.clone(),
        registry_handle,
        cli.gzip,
        http_shutdown,
    ));

    let ingest_task = tokio::spawn(async move {
        ingest.run(syslog_rx).await;
    });

    shutdown_signal().await;

    // (1) stop the syslog server.
    syslog_handle.abort();
    // (2) the ingest task drains whatever is already queued once the
    // sender side is dropped, then returns on its own.
    let _ = ingest_task.await;
    // (3) shut down the HTTP server within the graceful timeout.
    let _ = shutdown_tx.send(());
    match tokio::time::timeout(cli.graceful_timeout, http_task).await {
        Ok(Ok(Ok(()))) => {}
        Ok(Ok(Err(error))) => tracing::error!(%error, "HTTP server exited with an error"),
        Ok(Err(error)) => tracing::error!(%error, "HTTP server task panicked"),
        Err(_) => tracing::error!("HTTP server did not shut down within the graceful timeout"),
    }

    Ok(())
}
