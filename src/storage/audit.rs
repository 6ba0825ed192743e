// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Audit log for administrative actions.
//!
//! Every back-office action that changes a wallet, a user or a transaction
//! is written here with the acting admin's identity. Entries are never
//! updated or deleted.

use chrono::{DateTime, Utc};
use redb::ReadableTable;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::database::{decode, encode, DbResult, LedgerDatabase, Snapshot, AUDIT_LOGS};
use super::pagination::{Page, PageRequest};

const AUDIT_SEQUENCE: &str = "audit_log";

/// Auditable back-office actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    WalletAdjusted,
    WalletFrozen,
    WalletUnfrozen,
    UserSuspended,
    UserReactivated,
    TransactionRefunded,
    TransactionReversed,
}

impl AuditAction {
    pub fn entity_type(&self) -> EntityType {
        match self {
            AuditAction::WalletAdjusted | AuditAction::WalletFrozen | AuditAction::WalletUnfrozen => {
                EntityType::Wallet
            }
            AuditAction::UserSuspended | AuditAction::UserReactivated => EntityType::User,
            AuditAction::TransactionRefunded | AuditAction::TransactionReversed => {
                EntityType::Transaction
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    Wallet,
    User,
    Transaction,
}

/// An audit entry that has not been written yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub admin_id: String,
    pub action: AuditAction,
    pub entity_type: EntityType,
    pub entity_id: String,
    pub description: String,
    pub metadata: serde_json::Map<String, serde_json::Value>,
    pub occurred_at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(action: AuditAction, admin_id: impl Into<String>, entity_id: impl Into<String>) -> Self {
        Self {
            admin_id: admin_id.into(),
            action,
            entity_type: action.entity_type(),
            entity_id: entity_id.into(),
            description: String::new(),
            metadata: serde_json::Map::new(),
            occurred_at: Utc::now(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Add a metadata field.
    pub fn with_detail(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

/// A persisted audit log row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuditLog {
    pub id: u64,
    pub admin_id: String,
    pub action: AuditAction,
    pub entity_type: EntityType,
    pub entity_id: String,
    pub description: String,
    #[schema(value_type = Object)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// Durable destination for audit entries.
pub trait AuditSink: Send + Sync {
    fn append(&self, entry: &AuditEntry) -> DbResult<AuditLog>;
}

impl AuditSink for LedgerDatabase {
    /// Writes in a dedicated unit so an audit failure never rolls back a
    /// committed financial change.
    fn append(&self, entry: &AuditEntry) -> DbResult<AuditLog> {
        let unit = self.begin()?;
        let log = AuditLog {
            id: unit.next_id(AUDIT_SEQUENCE)?,
            admin_id: entry.admin_id.clone(),
            action: entry.action,
            entity_type: entry.entity_type,
            entity_id: entry.entity_id.clone(),
            description: entry.description.clone(),
            metadata: entry.metadata.clone(),
            created_at: entry.occurred_at,
        };
        let bytes = encode(&log)?;
        unit.txn()
            .open_table(AUDIT_LOGS)?
            .insert(log.id, bytes.as_slice())?;
        unit.commit()?;
        Ok(log)
    }
}

/// Audit query filter.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct AuditFilter {
    pub admin_id: Option<String>,
    pub action: Option<AuditAction>,
    pub entity_type: Option<EntityType>,
    pub entity_id: Option<String>,
}

impl AuditFilter {
    pub fn matches(&self, log: &AuditLog) -> bool {
        self.admin_id.as_ref().is_none_or(|a| *a == log.admin_id)
            && self.action.is_none_or(|a| a == log.action)
            && self.entity_type.is_none_or(|t| t == log.entity_type)
            && self.entity_id.as_ref().is_none_or(|e| *e == log.entity_id)
    }
}

impl Snapshot {
    /// Audit entries matching `filter`, newest first.
    pub fn audit_logs(&self, filter: &AuditFilter, page: PageRequest) -> DbResult<Page<AuditLog>> {
        let table = self.txn().open_table(AUDIT_LOGS)?;
        let mut matching = Vec::new();
        for entry in table.iter()?.rev() {
            let (_, value) = entry?;
            let log: AuditLog = decode(value.value())?;
            if filter.matches(&log) {
                matching.push(log);
            }
        }
        Ok(Page::from_vec(matching, page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::database::tests::temp_db;

    #[test]
    fn entity_type_follows_action() {
        let entry = AuditEntry::new(AuditAction::UserSuspended, "adm_1", "user_9");
        assert_eq!(entry.entity_type, EntityType::User);
        assert_eq!(
            AuditAction::TransactionReversed.entity_type(),
            EntityType::Transaction
        );
    }

    #[test]
    fn append_assigns_ids_and_keeps_details() {
        let (db, _dir) = temp_db();
        let first = db
            .append(
                &AuditEntry::new(AuditAction::WalletFrozen, "adm_1", "wal_a")
                    .with_description("Wallet frozen")
                    .with_detail("reason", "fraud review"),
            )
            .unwrap();
        let second = db
            .append(&AuditEntry::new(AuditAction::WalletUnfrozen, "adm_1", "wal_a"))
            .unwrap();

        assert_eq!(first.id + 1, second.id);
        assert_eq!(first.metadata["reason"], "fraud review");
        assert_eq!(first.entity_type, EntityType::Wallet);
    }

    #[test]
    fn query_filters_and_pages_newest_first() {
        let (db, _dir) = temp_db();
        for (action, admin) in [
            (AuditAction::WalletFrozen, "adm_1"),
            (AuditAction::UserSuspended, "adm_2"),
            (AuditAction::WalletUnfrozen, "adm_1"),
        ] {
            db.append(&AuditEntry::new(action, admin, "x")).unwrap();
        }

        let snapshot = db.snapshot().unwrap();
        let by_admin = AuditFilter {
            admin_id: Some("adm_1".into()),
            ..Default::default()
        };
        let page = snapshot.audit_logs(&by_admin, PageRequest::default()).unwrap();
        let actions: Vec<_> = page.data.iter().map(|l| l.action).collect();
        assert_eq!(actions, vec![AuditAction::WalletUnfrozen, AuditAction::WalletFrozen]);

        let users = AuditFilter {
            entity_type: Some(EntityType::User),
            ..Default::default()
        };
        assert_eq!(snapshot.audit_logs(&users, PageRequest::default()).unwrap().pagination.total, 1);

        let paged = snapshot
            .audit_logs(&AuditFilter::default(), PageRequest::new(2, 2))
            .unwrap();
        assert_eq!(paged.data.len(), 1);
        assert_eq!(paged.pagination.total_pages, 2);
    }

    #[test]
    fn audit_log_serializes_camel_case() {
        let (db, _dir) = temp_db();
        let log = db
            .append(&AuditEntry::new(AuditAction::WalletAdjusted, "adm_1", "wal_a"))
            .unwrap();
        let json = serde_json::to_value(&log).unwrap();
        assert_eq!(json["adminId"], "adm_1");
        assert_eq!(json["action"], "WALLET_ADJUSTED");
        assert_eq!(json["entityType"], "WALLET");
    }
}
