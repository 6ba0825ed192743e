// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Append-only ledger.
//!
//! One entry per wallet per balance-changing transaction. The entry carries
//! the signed delta and the balance it produced, so a wallet's history can
//! be replayed and checked against its stored balance.

use chrono::{DateTime, Utc};
use redb::ReadableTable;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::database::{
    encode, index_ids_desc, load_id_page, load_indexed_row, DbResult, Snapshot, UnitOfWork,
    LEDGER_ENTRIES, TRANSACTION_LEDGER, WALLET_LEDGER,
};
use super::pagination::{Page, PageRequest};
use super::transactions::{TransactionRecord, WalletRef};
use super::wallets::Wallet;

const LEDGER_SEQUENCE: &str = "ledger_entry";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryType {
    Deposit,
    Withdraw,
    P2p,
    OwnWallet,
    Refund,
    Reversal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: u64,
    pub wallet: WalletRef,
    pub transaction_id: u64,
    pub transaction_public_id: String,
    pub entry_type: EntryType,
    /// Signed delta
    pub amount: Decimal,
    pub balance_after: Decimal,
    pub created_at: DateTime<Utc>,
}

fn sum_amounts<I, R>(index: &I, table: &R, wallet_id: u64) -> DbResult<Decimal>
where
    I: ReadableTable<(u64, u64), ()>,
    R: ReadableTable<u64, &'static [u8]>,
{
    let mut sum = Decimal::ZERO;
    for id in index_ids_desc(index, wallet_id)? {
        let entry: LedgerEntry = load_indexed_row(table, id, "wallet_ledger")?;
        sum += entry.amount;
    }
    Ok(sum)
}

fn entries_for_transaction<I, R>(index: &I, table: &R, transaction_id: u64) -> DbResult<Vec<LedgerEntry>>
where
    I: ReadableTable<(u64, u64), ()>,
    R: ReadableTable<u64, &'static [u8]>,
{
    let mut ids = index_ids_desc(index, transaction_id)?;
    ids.reverse();
    ids.into_iter()
        .map(|id| load_indexed_row(table, id, "transaction_ledger"))
        .collect()
}

/// Ledger writes inside one unit of work.
pub struct Ledger<'u> {
    unit: &'u UnitOfWork,
}

impl<'u> Ledger<'u> {
    pub fn new(unit: &'u UnitOfWork) -> Self {
        Self { unit }
    }

    /// Record `amount` against `wallet`, which must already hold the new balance.
    pub fn append(
        &self,
        wallet: &Wallet,
        transaction: &TransactionRecord,
        entry_type: EntryType,
        amount: Decimal,
    ) -> DbResult<LedgerEntry> {
        let entry = LedgerEntry {
            id: self.unit.next_id(LEDGER_SEQUENCE)?,
            wallet: wallet.into(),
            transaction_id: transaction.id,
            transaction_public_id: transaction.public_id.clone(),
            entry_type,
            amount,
            balance_after: wallet.balance,
            created_at: Utc::now(),
        };

        let bytes = encode(&entry)?;
        let txn = self.unit.txn();
        txn.open_table(LEDGER_ENTRIES)?
            .insert(entry.id, bytes.as_slice())?;
        txn.open_table(WALLET_LEDGER)?
            .insert((wallet.id, entry.id), ())?;
        txn.open_table(TRANSACTION_LEDGER)?
            .insert((transaction.id, entry.id), ())?;
        Ok(entry)
    }

    pub fn list_for_transaction(&self, transaction_id: u64) -> DbResult<Vec<LedgerEntry>> {
        let index = self.unit.txn().open_table(TRANSACTION_LEDGER)?;
        let table = self.unit.txn().open_table(LEDGER_ENTRIES)?;
        entries_for_transaction(&index, &table, transaction_id)
    }

    pub fn sum_for_wallet(&self, wallet_id: u64) -> DbResult<Decimal> {
        let index = self.unit.txn().open_table(WALLET_LEDGER)?;
        let table = self.unit.txn().open_table(LEDGER_ENTRIES)?;
        sum_amounts(&index, &table, wallet_id)
    }
}

impl Snapshot {
    /// Ledger of a wallet, newest first.
    pub fn wallet_ledger(&self, wallet_id: u64, page: PageRequest) -> DbResult<Page<LedgerEntry>> {
        let index = self.txn().open_table(WALLET_LEDGER)?;
        let table = self.txn().open_table(LEDGER_ENTRIES)?;
        let ids = index_ids_desc(&index, wallet_id)?;
        load_id_page(&table, &ids, page, "wallet_ledger")
    }

    pub fn transaction_ledger(&self, transaction_id: u64) -> DbResult<Vec<LedgerEntry>> {
        let index = self.txn().open_table(TRANSACTION_LEDGER)?;
        let table = self.txn().open_table(LEDGER_ENTRIES)?;
        entries_for_transaction(&index, &table, transaction_id)
    }

    pub fn ledger_sum(&self, wallet_id: u64) -> DbResult<Decimal> {
        let index = self.txn().open_table(WALLET_LEDGER)?;
        let table = self.txn().open_table(LEDGER_ENTRIES)?;
        sum_amounts(&index, &table, wallet_id)
    }
}
