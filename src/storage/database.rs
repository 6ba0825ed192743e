// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded ledger database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `wallets`: wallet_id → serialized Wallet
//! - `wallet_public_ids`: public id → wallet_id
//! - `owner_wallets`: (owner_id, wallet_id) → ()
//! - `transactions`: transaction_id → serialized TransactionRecord
//! - `transaction_public_ids`: public id → transaction_id
//! - `wallet_transactions`: (wallet_id, transaction_id) → ()
//! - `ledger_entries`: entry_id → serialized LedgerEntry
//! - `wallet_ledger`: (wallet_id, entry_id) → ()
//! - `transaction_ledger`: (transaction_id, entry_id) → ()
//! - `compensations`: (original transaction_id, compensating transaction_id) → ()
//! - `suspended_users`: user_id → serialized UserStatusRecord
//! - `audit_logs`: audit_id → serialized AuditLog
//! - `sequences`: sequence name → last issued id
//!
//! Ids are issued from `sequences` inside the same write transaction that
//! inserts the row, so they are strictly increasing per table. Index scans
//! in reverse key order therefore yield newest-first results.
//!
//! ## Unit of Work
//!
//! redb admits one write transaction at a time and gives readers a
//! consistent snapshot. A [`UnitOfWork`] wraps one write transaction: every
//! balance change, transaction row and ledger entry of an engine operation
//! is written through it and becomes visible at `commit()` or not at all.
//! Dropping an uncommitted unit aborts it.

use std::path::Path;

use redb::{
    Database, ReadTransaction, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction,
};
use serde::{de::DeserializeOwned, Serialize};

use super::pagination::{Page, PageRequest};

// =============================================================================
// Table Definitions
// =============================================================================

pub(crate) const WALLETS: TableDefinition<u64, &[u8]> = TableDefinition::new("wallets");

pub(crate) const WALLET_PUBLIC_IDS: TableDefinition<&str, u64> =
    TableDefinition::new("wallet_public_ids");

pub(crate) const OWNER_WALLETS: TableDefinition<(&str, u64), ()> =
    TableDefinition::new("owner_wallets");

pub(crate) const TRANSACTIONS: TableDefinition<u64, &[u8]> = TableDefinition::new("transactions");

pub(crate) const TRANSACTION_PUBLIC_IDS: TableDefinition<&str, u64> =
    TableDefinition::new("transaction_public_ids");

pub(crate) const WALLET_TRANSACTIONS: TableDefinition<(u64, u64), ()> =
    TableDefinition::new("wallet_transactions");

pub(crate) const LEDGER_ENTRIES: TableDefinition<u64, &[u8]> =
    TableDefinition::new("ledger_entries");

pub(crate) const WALLET_LEDGER: TableDefinition<(u64, u64), ()> =
    TableDefinition::new("wallet_ledger");

pub(crate) const TRANSACTION_LEDGER: TableDefinition<(u64, u64), ()> =
    TableDefinition::new("transaction_ledger");

pub(crate) const COMPENSATIONS: TableDefinition<(u64, u64), ()> =
    TableDefinition::new("compensations");

pub(crate) const SUSPENDED_USERS: TableDefinition<&str, &[u8]> =
    TableDefinition::new("suspended_users");

pub(crate) const AUDIT_LOGS: TableDefinition<u64, &[u8]> = TableDefinition::new("audit_logs");

const SEQUENCES: TableDefinition<&str, u64> = TableDefinition::new("sequences");

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("dangling index entry: {0}")]
    DanglingIndex(String),
}

pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// Row Encoding
// =============================================================================

pub(crate) fn encode<T: Serialize>(value: &T) -> DbResult<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

pub(crate) fn decode<T: DeserializeOwned>(bytes: &[u8]) -> DbResult<T> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Load and decode a JSON row keyed by a numeric id.
pub(crate) fn load_row<T, R>(table: &R, id: u64) -> DbResult<Option<T>>
where
    T: DeserializeOwned,
    R: ReadableTable<u64, &'static [u8]>,
{
    match table.get(id)? {
        Some(value) => Ok(Some(decode(value.value())?)),
        None => Ok(None),
    }
}

/// Load a JSON row that an index claims exists.
pub(crate) fn load_indexed_row<T, R>(table: &R, id: u64, index: &str) -> DbResult<T>
where
    T: DeserializeOwned,
    R: ReadableTable<u64, &'static [u8]>,
{
    load_row(table, id)?.ok_or_else(|| DbError::DanglingIndex(format!("{index} → {id}")))
}

/// Second halves of every `(prefix, id)` key in a composite index, newest first.
pub(crate) fn index_ids_desc<R>(index: &R, prefix: u64) -> DbResult<Vec<u64>>
where
    R: ReadableTable<(u64, u64), ()>,
{
    let mut ids = Vec::new();
    for entry in index.range((prefix, 0u64)..=(prefix, u64::MAX))?.rev() {
        let (key, _) = entry?;
        ids.push(key.value().1);
    }
    Ok(ids)
}

/// Load one page of rows given every matching id, already in display order.
pub(crate) fn load_id_page<T, R>(
    table: &R,
    ids: &[u64],
    request: PageRequest,
    index: &str,
) -> DbResult<Page<T>>
where
    T: DeserializeOwned,
    R: ReadableTable<u64, &'static [u8]>,
{
    let data = ids[request.window(ids.len())]
        .iter()
        .map(|&id| load_indexed_row(table, id, index))
        .collect::<DbResult<Vec<T>>>()?;
    Ok(Page {
        data,
        pagination: request.pagination(ids.len()),
    })
}

/// Generate an opaque public id: `prefix_` followed by a random UUIDv4 in hex.
///
/// 122 random bits; callers still check the id index before inserting.
pub(crate) fn new_public_id(prefix: &str) -> String {
    format!("{prefix}_{}", uuid::Uuid::new_v4().simple())
}

// =============================================================================
// LedgerDatabase
// =============================================================================

/// Embedded ACID database holding wallets, transactions, ledger and audit log.
pub struct LedgerDatabase {
    db: Database,
}

impl LedgerDatabase {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> DbResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(WALLETS)?;
            let _ = write_txn.open_table(WALLET_PUBLIC_IDS)?;
            let _ = write_txn.open_table(OWNER_WALLETS)?;
            let _ = write_txn.open_table(TRANSACTIONS)?;
            let _ = write_txn.open_table(TRANSACTION_PUBLIC_IDS)?;
            let _ = write_txn.open_table(WALLET_TRANSACTIONS)?;
            let _ = write_txn.open_table(LEDGER_ENTRIES)?;
            let _ = write_txn.open_table(WALLET_LEDGER)?;
            let _ = write_txn.open_table(TRANSACTION_LEDGER)?;
            let _ = write_txn.open_table(COMPENSATIONS)?;
            let _ = write_txn.open_table(SUSPENDED_USERS)?;
            let _ = write_txn.open_table(AUDIT_LOGS)?;
            let _ = write_txn.open_table(SEQUENCES)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Begin an atomic unit of work. Blocks while another unit is open.
    pub fn begin(&self) -> DbResult<UnitOfWork> {
        Ok(UnitOfWork {
            txn: self.db.begin_write()?,
        })
    }

    /// Take a consistent read-only snapshot.
    pub fn snapshot(&self) -> DbResult<Snapshot> {
        Ok(Snapshot {
            txn: self.db.begin_read()?,
        })
    }
}

/// One atomic write transaction spanning every table.
pub struct UnitOfWork {
    txn: WriteTransaction,
}

impl UnitOfWork {
    pub(crate) fn txn(&self) -> &WriteTransaction {
        &self.txn
    }

    /// Issue the next id for a sequence.
    pub(crate) fn next_id(&self, sequence: &str) -> DbResult<u64> {
        let mut table = self.txn.open_table(SEQUENCES)?;
        let next = table.get(sequence)?.map(|v| v.value()).unwrap_or(0) + 1;
        table.insert(sequence, next)?;
        Ok(next)
    }

    /// Make every write of this unit durable and visible.
    pub fn commit(self) -> DbResult<()> {
        self.txn.commit()?;
        Ok(())
    }

    /// Discard every write of this unit.
    pub fn abort(self) -> DbResult<()> {
        self.txn.abort()?;
        Ok(())
    }
}

/// Consistent read-only view of the database.
pub struct Snapshot {
    txn: ReadTransaction,
}

impl Snapshot {
    pub(crate) fn txn(&self) -> &ReadTransaction {
        &self.txn
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn temp_db() -> (LedgerDatabase, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = LedgerDatabase::open(&dir.path().join("ledger.redb")).unwrap();
        (db, dir)
    }

    #[test]
    fn sequences_are_monotonic_per_name() {
        let (db, _dir) = temp_db();
        let unit = db.begin().unwrap();
        assert_eq!(unit.next_id("wallet").unwrap(), 1);
        assert_eq!(unit.next_id("wallet").unwrap(), 2);
        assert_eq!(unit.next_id("transaction").unwrap(), 1);
        unit.commit().unwrap();

        let unit = db.begin().unwrap();
        assert_eq!(unit.next_id("wallet").unwrap(), 3);
    }

    #[test]
    fn aborted_unit_leaves_no_trace() {
        let (db, _dir) = temp_db();
        let unit = db.begin().unwrap();
        unit.next_id("wallet").unwrap();
        unit.abort().unwrap();

        let unit = db.begin().unwrap();
        assert_eq!(unit.next_id("wallet").unwrap(), 1);
    }

    #[test]
    fn dropped_unit_is_rolled_back() {
        let (db, _dir) = temp_db();
        {
            let unit = db.begin().unwrap();
            unit.next_id("wallet").unwrap();
        }
        let unit = db.begin().unwrap();
        assert_eq!(unit.next_id("wallet").unwrap(), 1);
    }

    #[test]
    fn index_ids_are_returned_newest_first() {
        let (db, _dir) = temp_db();
        let unit = db.begin().unwrap();
        {
            let mut index = unit.txn().open_table(WALLET_LEDGER).unwrap();
            for entry in [3u64, 1, 2] {
                index.insert((7u64, entry), ()).unwrap();
            }
            index.insert((8u64, 99), ()).unwrap();
        }
        unit.commit().unwrap();

        let snapshot = db.snapshot().unwrap();
        let index = snapshot.txn().open_table(WALLET_LEDGER).unwrap();
        assert_eq!(index_ids_desc(&index, 7).unwrap(), vec![3, 2, 1]);
        assert!(index_ids_desc(&index, 6).unwrap().is_empty());
    }

    #[test]
    fn public_ids_are_prefixed_and_unique() {
        let a = new_public_id("wal");
        let b = new_public_id("wal");
        assert!(a.starts_with("wal_"));
        assert_eq!(a.len(), 4 + 32);
        assert_ne!(a, b);
    }
}
