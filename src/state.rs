// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::engine::TransactionEngine;
use crate::storage::LedgerDatabase;

/// Token verification settings.
///
/// Without a secret the server runs in development mode: tokens are decoded
/// but their signature is not checked (test and `dev` builds only).
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    /// HS256 shared secret (`JWT_SECRET`)
    pub secret: Option<String>,
    /// Expected `iss` claim (`JWT_ISSUER`)
    pub issuer: Option<String>,
}

impl AuthConfig {
    pub fn is_production(&self) -> bool {
        self.secret.is_some()
    }
}

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<TransactionEngine>,
    pub db: Arc<LedgerDatabase>,
    pub auth_config: AuthConfig,
}

impl AppState {
    pub fn new(engine: Arc<TransactionEngine>, db: Arc<LedgerDatabase>, auth_config: AuthConfig) -> Self {
        Self {
            engine,
            db,
            auth_config,
        }
    }

    /// Run a blocking engine call on the blocking pool.
    pub async fn run<T, F>(&self, op: F) -> Result<T, crate::error::ApiError>
    where
        F: FnOnce(&TransactionEngine) -> Result<T, crate::engine::EngineError> + Send + 'static,
        T: Send + 'static,
    {
        let engine = self.engine.clone();
        tokio::task::spawn_blocking(move || op(engine.as_ref()))
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Engine task panicked");
                crate::error::ApiError::internal("Engine task failed")
            })?
            .map_err(Into::into)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::audit::AuditRecorder;
    use crate::storage::database::tests::temp_db;

    /// State over a temp database in development auth mode.
    pub(crate) fn test_state() -> (AppState, tempfile::TempDir) {
        let (db, dir) = temp_db();
        let db = Arc::new(db);
        let audit = Arc::new(AuditRecorder::new(db.clone()));
        let engine = Arc::new(TransactionEngine::new(db.clone(), audit));
        (AppState::new(engine, db, AuthConfig::default()), dir)
    }
}
