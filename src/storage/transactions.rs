// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Transaction records.
//!
//! A record is prepared as `PENDING`, moved through a checked status
//! transition and only then inserted. Inserted records are never rewritten;
//! refunds and reversals are new records linked through the
//! `compensations` table.

use chrono::{DateTime, Utc};
use redb::ReadableTable;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::database::{
    encode, index_ids_desc, load_id_page, load_indexed_row, load_row, new_public_id, DbResult,
    Snapshot, UnitOfWork, COMPENSATIONS, TRANSACTIONS, TRANSACTION_PUBLIC_IDS, WALLET_TRANSACTIONS,
};
use super::pagination::{Page, PageRequest};
use super::wallets::Wallet;

const TRANSACTION_SEQUENCE: &str = "transaction";
pub const TRANSACTION_ID_PREFIX: &str = "txn";

/// Transaction lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Pending,
    /// Reserved for an OTP-confirmed leg; never produced yet
    OtpVerified,
    Completed,
    Failed,
}

impl TransactionStatus {
    pub fn can_transition_to(self, next: TransactionStatus) -> bool {
        use TransactionStatus::*;
        matches!(
            (self, next),
            (Pending, OtpVerified)
                | (Pending, Completed)
                | (Pending, Failed)
                | (OtpVerified, Completed)
                | (OtpVerified, Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TransactionStatus::Completed | TransactionStatus::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Transfer,
    Deposit,
    Withdraw,
    Purchase,
    Refund,
    AdminAdjustment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferType {
    /// Between two wallets of the same owner
    OwnWallet,
    /// To another user's wallet
    P2p,
}

/// Wallet reference carried on transaction and ledger rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletRef {
    pub id: u64,
    pub public_id: String,
}

impl From<&Wallet> for WalletRef {
    fn from(wallet: &Wallet) -> Self {
        Self {
            id: wallet.id,
            public_id: wallet.public_id.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("transaction {transaction} cannot move from {from:?} to {to:?}")]
pub struct InvalidTransition {
    pub transaction: String,
    pub from: TransactionStatus,
    pub to: TransactionStatus,
}

/// What the engine wants recorded.
#[derive(Debug, Clone)]
pub struct TransactionDraft {
    pub transaction_type: TransactionType,
    pub transfer_type: Option<TransferType>,
    pub amount: Decimal,
    pub payer: Option<WalletRef>,
    pub receiver: Option<WalletRef>,
    pub initiated_by: String,
    pub description: Option<String>,
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl TransactionDraft {
    pub fn new(transaction_type: TransactionType, amount: Decimal, initiated_by: &str) -> Self {
        Self {
            transaction_type,
            transfer_type: None,
            amount,
            payer: None,
            receiver: None,
            initiated_by: initiated_by.to_string(),
            description: None,
            metadata: serde_json::Map::new(),
        }
    }

    pub fn payer(mut self, wallet: &Wallet) -> Self {
        self.payer = Some(wallet.into());
        self
    }

    pub fn receiver(mut self, wallet: &Wallet) -> Self {
        self.receiver = Some(wallet.into());
        self
    }

    pub fn transfer_type(mut self, transfer_type: TransferType) -> Self {
        self.transfer_type = Some(transfer_type);
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn meta(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

/// Stored transaction row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: u64,
    pub public_id: String,
    pub status: TransactionStatus,
    pub transaction_type: TransactionType,
    pub transfer_type: Option<TransferType>,
    /// Positive magnitude
    pub amount: Decimal,
    pub payer: Option<WalletRef>,
    pub receiver: Option<WalletRef>,
    pub initiated_by: String,
    pub description: Option<String>,
    pub metadata: serde_json::Map<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl TransactionRecord {
    pub fn transition(&mut self, next: TransactionStatus) -> Result<(), InvalidTransition> {
        if !self.status.can_transition_to(next) {
            return Err(InvalidTransition {
                transaction: self.public_id.clone(),
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        if next.is_terminal() {
            self.completed_at = Some(Utc::now());
        }
        Ok(())
    }

    /// True if either side of the transaction is one of `wallet_ids`.
    pub fn touches_any(&self, wallet_ids: &[u64]) -> bool {
        [&self.payer, &self.receiver]
            .into_iter()
            .flatten()
            .any(|w| wallet_ids.contains(&w.id))
    }

    fn wallet_ids(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = [&self.payer, &self.receiver]
            .into_iter()
            .flatten()
            .map(|w| w.id)
            .collect();
        ids.dedup();
        ids
    }
}

fn lookup_public_id<I>(index: &I, public_id: &str) -> DbResult<Option<u64>>
where
    I: ReadableTable<&'static str, u64>,
{
    Ok(index.get(public_id)?.map(|v| v.value()))
}

fn compensation_ids<I>(index: &I, original: u64) -> DbResult<Vec<u64>>
where
    I: ReadableTable<(u64, u64), ()>,
{
    let mut ids = index_ids_desc(index, original)?;
    ids.reverse();
    Ok(ids)
}

// =============================================================================
// Write side
// =============================================================================

pub struct TransactionStore<'u> {
    unit: &'u UnitOfWork,
}

impl<'u> TransactionStore<'u> {
    pub fn new(unit: &'u UnitOfWork) -> Self {
        Self { unit }
    }

    /// Allocate ids and build a `PENDING` record. Nothing is written yet.
    pub fn prepare(&self, draft: TransactionDraft) -> DbResult<TransactionRecord> {
        let id = self.unit.next_id(TRANSACTION_SEQUENCE)?;
        let index = self.unit.txn().open_table(TRANSACTION_PUBLIC_IDS)?;
        let mut public_id = new_public_id(TRANSACTION_ID_PREFIX);
        while lookup_public_id(&index, &public_id)?.is_some() {
            public_id = new_public_id(TRANSACTION_ID_PREFIX);
        }

        Ok(TransactionRecord {
            id,
            public_id,
            status: TransactionStatus::Pending,
            transaction_type: draft.transaction_type,
            transfer_type: draft.transfer_type,
            amount: draft.amount,
            payer: draft.payer,
            receiver: draft.receiver,
            initiated_by: draft.initiated_by,
            description: draft.description,
            metadata: draft.metadata,
            created_at: Utc::now(),
            completed_at: None,
        })
    }

    /// Write the record and its wallet indexes.
    pub fn insert(&self, record: &TransactionRecord) -> DbResult<()> {
        let bytes = encode(record)?;
        self.unit
            .txn()
            .open_table(TRANSACTIONS)?
            .insert(record.id, bytes.as_slice())?;
        self.unit
            .txn()
            .open_table(TRANSACTION_PUBLIC_IDS)?
            .insert(record.public_id.as_str(), record.id)?;

        let mut by_wallet = self.unit.txn().open_table(WALLET_TRANSACTIONS)?;
        for wallet_id in record.wallet_ids() {
            by_wallet.insert((wallet_id, record.id), ())?;
        }
        Ok(())
    }

    pub fn get(&self, id: u64) -> DbResult<Option<TransactionRecord>> {
        let table = self.unit.txn().open_table(TRANSACTIONS)?;
        load_row(&table, id)
    }

    pub fn find_by_public_id(&self, public_id: &str) -> DbResult<Option<TransactionRecord>> {
        let id = {
            let index = self.unit.txn().open_table(TRANSACTION_PUBLIC_IDS)?;
            lookup_public_id(&index, public_id)?
        };
        match id {
            Some(id) => self.get(id),
            None => Ok(None),
        }
    }

    pub fn link_compensation(&self, original: u64, compensation: u64) -> DbResult<()> {
        self.unit
            .txn()
            .open_table(COMPENSATIONS)?
            .insert((original, compensation), ())?;
        Ok(())
    }

    /// Compensations already recorded against `original`, oldest first.
    pub fn compensations_of(&self, original: u64) -> DbResult<Vec<TransactionRecord>> {
        let ids = {
            let index = self.unit.txn().open_table(COMPENSATIONS)?;
            compensation_ids(&index, original)?
        };
        let table = self.unit.txn().open_table(TRANSACTIONS)?;
        ids.into_iter()
            .map(|id| load_indexed_row(&table, id, "compensations"))
            .collect()
    }
}

// =============================================================================
// Read side
// =============================================================================

impl Snapshot {
    pub fn transaction(&self, id: u64) -> DbResult<Option<TransactionRecord>> {
        let table = self.txn().open_table(TRANSACTIONS)?;
        load_row(&table, id)
    }

    pub fn transaction_by_public_id(&self, public_id: &str) -> DbResult<Option<TransactionRecord>> {
        let id = {
            let index = self.txn().open_table(TRANSACTION_PUBLIC_IDS)?;
            lookup_public_id(&index, public_id)?
        };
        match id {
            Some(id) => self.transaction(id),
            None => Ok(None),
        }
    }

    /// Transactions touching a wallet, newest first.
    pub fn wallet_transactions(
        &self,
        wallet_id: u64,
        page: PageRequest,
    ) -> DbResult<Page<TransactionRecord>> {
        let index = self.txn().open_table(WALLET_TRANSACTIONS)?;
        let table = self.txn().open_table(TRANSACTIONS)?;
        let ids = index_ids_desc(&index, wallet_id)?;
        load_id_page(&table, &ids, page, "wallet_transactions")
    }

    pub fn compensations_of(&self, original: u64) -> DbResult<Vec<TransactionRecord>> {
        let index = self.txn().open_table(COMPENSATIONS)?;
        let table = self.txn().open_table(TRANSACTIONS)?;
        compensation_ids(&index, original)?
            .into_iter()
            .map(|id| load_indexed_row(&table, id, "compensations"))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::database::tests::temp_db;
    use crate::storage::wallets::WalletStore;
    use rust_decimal_macros::dec;

    #[test]
    fn status_transitions_are_checked() {
        use TransactionStatus::*;
        assert!(Pending.can_transition_to(Completed));
        assert!(Pending.can_transition_to(OtpVerified));
        assert!(OtpVerified.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Pending));
        assert!(!Completed.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(Completed));
    }

    #[test]
    fn prepared_record_is_pending_until_transitioned() {
        let (db, _dir) = temp_db();
        let unit = db.begin().unwrap();
        let wallet = WalletStore::new(&unit).create("user_1").unwrap();
        let store = TransactionStore::new(&unit);

        let mut record = store
            .prepare(TransactionDraft::new(TransactionType::Deposit, dec!(5), "user_1").receiver(&wallet))
            .unwrap();
        assert_eq!(record.status, TransactionStatus::Pending);
        assert!(record.completed_at.is_none());
        assert!(record.public_id.starts_with("txn_"));

        record.transition(TransactionStatus::Completed).unwrap();
        assert!(record.completed_at.is_some());

        let err = record.transition(TransactionStatus::Failed).unwrap_err();
        assert_eq!(err.from, TransactionStatus::Completed);
    }

    #[test]
    fn inserted_record_is_indexed_for_both_wallets() {
        let (db, _dir) = temp_db();
        let unit = db.begin().unwrap();
        let wallets = WalletStore::new(&unit);
        let a = wallets.create("user_1").unwrap();
        let b = wallets.create("user_2").unwrap();
        let store = TransactionStore::new(&unit);

        let mut record = store
            .prepare(
                TransactionDraft::new(TransactionType::Transfer, dec!(1), "user_1")
                    .payer(&a)
                    .receiver(&b)
                    .transfer_type(TransferType::P2p),
            )
            .unwrap();
        record.transition(TransactionStatus::Completed).unwrap();
        store.insert(&record).unwrap();
        unit.commit().unwrap();

        let snapshot = db.snapshot().unwrap();
        assert_eq!(
            snapshot.transaction_by_public_id(&record.public_id).unwrap(),
            Some(record.clone())
        );
        for wallet in [&a, &b] {
            let page = snapshot.wallet_transactions(wallet.id, PageRequest::default()).unwrap();
            assert_eq!(page.data, vec![record.clone()]);
        }
    }

    #[test]
    fn deposit_to_same_wallet_is_indexed_once() {
        let (db, _dir) = temp_db();
        let unit = db.begin().unwrap();
        let wallet = WalletStore::new(&unit).create("user_1").unwrap();
        let store = TransactionStore::new(&unit);
        let mut record = store
            .prepare(
                TransactionDraft::new(TransactionType::Deposit, dec!(3), "user_1")
                    .payer(&wallet)
                    .receiver(&wallet),
            )
            .unwrap();
        record.transition(TransactionStatus::Completed).unwrap();
        store.insert(&record).unwrap();
        unit.commit().unwrap();

        let page = db
            .snapshot()
            .unwrap()
            .wallet_transactions(wallet.id, PageRequest::default())
            .unwrap();
        assert_eq!(page.pagination.total, 1);
    }

    #[test]
    fn compensations_are_linked_oldest_first() {
        let (db, _dir) = temp_db();
        let unit = db.begin().unwrap();
        let store = TransactionStore::new(&unit);
        let mut ids = Vec::new();
        for ty in [TransactionType::Deposit, TransactionType::Refund, TransactionType::Refund] {
            let mut record = store.prepare(TransactionDraft::new(ty, dec!(1), "adm")).unwrap();
            record.transition(TransactionStatus::Completed).unwrap();
            store.insert(&record).unwrap();
            ids.push(record.id);
        }
        store.link_compensation(ids[0], ids[1]).unwrap();
        store.link_compensation(ids[0], ids[2]).unwrap();
        let linked: Vec<u64> = store.compensations_of(ids[0]).unwrap().iter().map(|r| r.id).collect();
        assert_eq!(linked, vec![ids[1], ids[2]]);
        unit.commit().unwrap();

        let snapshot = db.snapshot().unwrap();
        assert_eq!(snapshot.compensations_of(ids[0]).unwrap().len(), 2);
        assert!(snapshot.compensations_of(ids[1]).unwrap().is_empty());
    }
}
