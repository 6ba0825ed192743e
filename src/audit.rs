// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Audit recorder.
//!
//! Administrative actions are audited after their financial unit commits.
//! If the audit write fails the committed change stands: the entry goes to
//! an in-memory backlog, an alert is logged and the caller is told the
//! audit was deferred. The backlog is retried by [`AuditRecorder::flush_backlog`],
//! which [`run_backlog_flusher`] calls on an interval until shutdown.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use utoipa::ToSchema;

use crate::engine::EngineError;
use crate::storage::{AuditEntry, AuditSink};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AuditStatus {
    Recorded,
    Deferred,
}

/// What happened to the audit entry of an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuditReceipt {
    pub status: AuditStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audit_log_id: Option<u64>,
}

impl AuditReceipt {
    pub fn is_recorded(&self) -> bool {
        self.status == AuditStatus::Recorded
    }
}

/// Result of a backlog flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FlushReport {
    pub flushed: usize,
    pub remaining: usize,
}

pub struct AuditRecorder {
    sink: Arc<dyn AuditSink>,
    backlog: Mutex<VecDeque<AuditEntry>>,
}

impl AuditRecorder {
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self {
            sink,
            backlog: Mutex::new(VecDeque::new()),
        }
    }

    fn backlog(&self) -> MutexGuard<'_, VecDeque<AuditEntry>> {
        self.backlog.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write an entry; on failure alert and keep it for retry.
    pub fn record(&self, entry: AuditEntry) -> AuditReceipt {
        match self.sink.append(&entry) {
            Ok(log) => {
                tracing::info!(
                    audit_id = log.id,
                    admin_id = %log.admin_id,
                    action = ?log.action,
                    entity_id = %log.entity_id,
                    "Audit entry recorded"
                );
                AuditReceipt {
                    status: AuditStatus::Recorded,
                    audit_log_id: Some(log.id),
                }
            }
            Err(e) => {
                tracing::error!(
                    alert = "audit_write_failure",
                    admin_id = %entry.admin_id,
                    action = ?entry.action,
                    entity_id = %entry.entity_id,
                    error = %e,
                    "Audit write failed after commit; entry queued for retry"
                );
                self.backlog().push_back(entry);
                AuditReceipt {
                    status: AuditStatus::Deferred,
                    audit_log_id: None,
                }
            }
        }
    }

    pub fn backlog_len(&self) -> usize {
        self.backlog().len()
    }

    /// Retry backlogged entries in order, stopping at the first failure.
    pub fn flush_backlog(&self) -> Result<FlushReport, EngineError> {
        let mut backlog = self.backlog();
        let mut flushed = 0;
        while let Some(entry) = backlog.front() {
            match self.sink.append(entry) {
                Ok(log) => {
                    tracing::info!(audit_id = log.id, action = ?log.action, "Backlogged audit entry written");
                    backlog.pop_front();
                    flushed += 1;
                }
                Err(e) => {
                    tracing::error!(
                        alert = "audit_write_failure",
                        flushed,
                        remaining = backlog.len(),
                        error = %e,
                        "Audit backlog flush failed"
                    );
                    return Err(EngineError::AuditWriteFailure {
                        message: format!("{e} ({} entries still pending)", backlog.len()),
                    });
                }
            }
        }
        Ok(FlushReport {
            flushed,
            remaining: 0,
        })
    }
}

/// Periodically flush the audit backlog until `shutdown` is cancelled.
pub async fn run_backlog_flusher(
    recorder: Arc<AuditRecorder>,
    interval: Duration,
    shutdown: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::info!(pending = recorder.backlog_len(), "Audit backlog flusher stopped");
                return;
            }
            _ = ticker.tick() => {
                if recorder.backlog_len() == 0 {
                    continue;
                }
                let recorder = recorder.clone();
                match tokio::task::spawn_blocking(move || recorder.flush_backlog()).await {
                    Ok(Ok(report)) => tracing::info!(flushed = report.flushed, "Audit backlog flushed"),
                    Ok(Err(_)) => {}
                    Err(e) => tracing::error!(error = %e, "Audit backlog flush task panicked"),
                }
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::storage::{AuditAction, AuditLog, DbError, DbResult, EntityType};
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

    /// In-memory sink that can be switched into failure mode.
    #[derive(Default)]
    pub(crate) struct FlakySink {
        pub failing: AtomicBool,
        next_id: AtomicU64,
        pub written: Mutex<Vec<AuditLog>>,
    }

    impl AuditSink for FlakySink {
        fn append(&self, entry: &AuditEntry) -> DbResult<AuditLog> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(DbError::DanglingIndex("audit sink offline".into()));
            }
            let log = AuditLog {
                id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
                admin_id: entry.admin_id.clone(),
                action: entry.action,
                entity_type: entry.entity_type,
                entity_id: entry.entity_id.clone(),
                description: entry.description.clone(),
                metadata: entry.metadata.clone(),
                created_at: entry.occurred_at,
            };
            self.written.lock().unwrap().push(log.clone());
            Ok(log)
        }
    }

    fn entry(entity: &str) -> AuditEntry {
        AuditEntry::new(AuditAction::WalletFrozen, "adm_1", entity)
    }

    #[test]
    fn successful_write_is_recorded() {
        let sink = Arc::new(FlakySink::default());
        let recorder = AuditRecorder::new(sink.clone());

        let receipt = recorder.record(entry("wal_a"));
        assert!(receipt.is_recorded());
        assert_eq!(receipt.audit_log_id, Some(1));
        assert_eq!(sink.written.lock().unwrap()[0].entity_type, EntityType::Wallet);
    }

    #[test]
    fn failed_write_is_deferred_then_flushed_in_order() {
        let sink = Arc::new(FlakySink::default());
        let recorder = AuditRecorder::new(sink.clone());

        sink.failing.store(true, Ordering::SeqCst);
        let receipt = recorder.record(entry("wal_a"));
        recorder.record(entry("wal_b"));
        assert_eq!(receipt.status, AuditStatus::Deferred);
        assert_eq!(receipt.audit_log_id, None);
        assert_eq!(recorder.backlog_len(), 2);

        let err = recorder.flush_backlog().unwrap_err();
        assert_eq!(err.error_code(), "audit_write_failure");
        assert_eq!(recorder.backlog_len(), 2);

        sink.failing.store(false, Ordering::SeqCst);
        let report = recorder.flush_backlog().unwrap();
        assert_eq!(report, FlushReport { flushed: 2, remaining: 0 });
        let written: Vec<String> = sink
            .written
            .lock()
            .unwrap()
            .iter()
            .map(|l| l.entity_id.clone())
            .collect();
        assert_eq!(written, vec!["wal_a", "wal_b"]);
    }

    #[test]
    fn receipt_serializes_lowercase_status() {
        let json = serde_json::to_value(AuditReceipt {
            status: AuditStatus::Deferred,
            audit_log_id: None,
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"status": "deferred"}));
    }

    #[tokio::test]
    async fn flusher_drains_backlog_and_stops_on_cancel() {
        let sink = Arc::new(FlakySink::default());
        let recorder = Arc::new(AuditRecorder::new(sink.clone()));
        sink.failing.store(true, Ordering::SeqCst);
        recorder.record(entry("wal_a"));
        sink.failing.store(false, Ordering::SeqCst);

        let token = CancellationToken::new();
        let task = tokio::spawn(run_backlog_flusher(
            recorder.clone(),
            Duration::from_millis(10),
            token.clone(),
        ));

        for _ in 0..100 {
            if recorder.backlog_len() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(recorder.backlog_len(), 0);

        token.cancel();
        task.await.unwrap();
    }
}
