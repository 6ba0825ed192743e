// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! Persistent state lives in one embedded redb database file under
//! `DATA_DIR`.
//!
//! ## Layout
//!
//! ```text
//! $DATA_DIR/
//!   ledger.redb       # wallets, transactions, ledger, suspensions, audit log
//! ```
//!
//! ## Access Pattern
//!
//! - Writes go through store views (`WalletStore`, `TransactionStore`,
//!   `Ledger`, `UserStore`) bound to one `UnitOfWork`
//! - Reads go through a `Snapshot`, which sees only committed units
//! - Audit entries are appended in their own unit via `AuditSink`

pub mod audit;
pub mod database;
pub mod id_cache;
pub mod ledger;
pub mod ownership;
pub mod pagination;
pub mod transactions;
pub mod users;
pub mod wallets;

pub use audit::{AuditAction, AuditEntry, AuditFilter, AuditLog, AuditSink, EntityType};
pub use database::{DbError, DbResult, LedgerDatabase, Snapshot, UnitOfWork};
pub use id_cache::IdCache;
pub use ledger::{EntryType, Ledger, LedgerEntry};
pub use ownership::{NotOwner, OwnedResource, OwnershipEnforcer};
pub use pagination::{Page, PageRequest, Pagination};
pub use transactions::{
    InvalidTransition, TransactionDraft, TransactionRecord, TransactionStatus, TransactionStore,
    TransactionType, TransferType, WalletRef,
};
pub use users::{UserStatus, UserStatusRecord, UserStore};
pub use wallets::{Wallet, WalletFilter, WalletStore, WalletWriteError};

/// File name of the database inside `DATA_DIR`.
pub const DATABASE_FILE: &str = "ledger.redb";
