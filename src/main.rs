// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{sync::Arc, time::Duration};

use axum_server::{tls_rustls::RustlsConfig, Handle};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ledgered_wallet_server::{
    api::router,
    audit::{run_backlog_flusher, AuditRecorder},
    config::{AppConfig, LogFormat},
    engine::TransactionEngine,
    state::AppState,
    storage::{LedgerDatabase, DATABASE_FILE},
};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = AppConfig::from_env()?;
    init_tracing(config.log_format);

    let db_path = config.data_dir.join(DATABASE_FILE);
    let db = Arc::new(LedgerDatabase::open(&db_path)?);
    tracing::info!(path = %db_path.display(), "Ledger database opened");

    let audit = Arc::new(AuditRecorder::new(db.clone()));
    let engine = Arc::new(TransactionEngine::new(db.clone(), audit.clone()));

    if config.auth.is_production() {
        tracing::info!(issuer = ?config.auth.issuer, "JWT verification enabled (HS256)");
    } else {
        tracing::warn!("JWT_SECRET not set; tokens are only accepted by development builds");
    }

    let state = AppState::new(engine, db, config.auth.clone());
    let app = router(state);

    let shutdown = CancellationToken::new();
    let flusher = tokio::spawn(run_backlog_flusher(
        audit,
        config.audit_flush_interval,
        shutdown.clone(),
    ));

    let handle = Handle::new();
    tokio::spawn({
        let handle = handle.clone();
        let shutdown = shutdown.clone();
        async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
            tracing::info!("Shutdown signal received");
            shutdown.cancel();
            handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
        }
    });

    let addr = config.bind_addr;
    match &config.tls {
        Some(tls) => {
            rustls::crypto::ring::default_provider()
                .install_default()
                .map_err(|_| "failed to install rustls crypto provider")?;
            let tls_config = RustlsConfig::from_pem_file(&tls.cert, &tls.key).await?;
            tracing::info!(%addr, "Ledgered wallet server listening on https (docs at /docs)");
            axum_server::bind_rustls(addr, tls_config)
                .handle(handle)
                .serve(app.into_make_service())
                .await?;
        }
        None => {
            tracing::info!(%addr, "Ledgered wallet server listening on http (docs at /docs)");
            axum_server::bind(addr)
                .handle(handle)
                .serve(app.into_make_service())
                .await?;
        }
    }

    shutdown.cancel();
    if let Err(e) = flusher.await {
        tracing::error!(error = %e, "Audit backlog flusher failed");
    }
    tracing::info!("Server stopped");
    Ok(())
}
