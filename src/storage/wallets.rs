// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet store.
//!
//! Wallet rows are only written through a [`WalletStore`] bound to an open
//! [`UnitOfWork`]. Every write compares the caller's copy against the stored
//! version and bumps it, so a stale read can never overwrite a newer balance.

use chrono::{DateTime, Utc};
use redb::ReadableTable;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::IntoParams;

use super::database::{
    encode, load_indexed_row, load_row, new_public_id, DbError, DbResult, Snapshot, UnitOfWork,
    OWNER_WALLETS, WALLETS, WALLET_PUBLIC_IDS,
};
use super::ownership::OwnedResource;
use super::pagination::{Page, PageRequest};

const WALLET_SEQUENCE: &str = "wallet";
pub const WALLET_ID_PREFIX: &str = "wal";

/// Stored wallet row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    /// Internal id, never exposed over HTTP
    pub id: u64,
    pub public_id: String,
    pub owner_id: String,
    pub balance: Decimal,
    pub frozen: bool,
    pub primary: bool,
    /// Bumped on every write
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OwnedResource for Wallet {
    fn owner_user_id(&self) -> &str {
        &self.owner_id
    }

    fn resource_label(&self) -> String {
        format!("wallet {}", self.public_id)
    }
}

/// Failure of a single wallet write.
#[derive(Debug, thiserror::Error)]
pub enum WalletWriteError {
    #[error(transparent)]
    Db(#[from] DbError),

    #[error("wallet {wallet} has {available}, cannot debit {requested}")]
    Overdraft {
        wallet: String,
        available: Decimal,
        requested: Decimal,
    },

    #[error("wallet {wallet} balance {balance} cannot absorb {delta}")]
    Overflow {
        wallet: String,
        balance: Decimal,
        delta: Decimal,
    },

    #[error("wallet {wallet} changed underneath the unit (expected version {expected}, found {found})")]
    VersionConflict {
        wallet: String,
        expected: u64,
        found: u64,
    },
}

/// Admin listing filter.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct WalletFilter {
    /// Only wallets of this owner
    pub owner_id: Option<String>,
    /// Inclusive lower balance bound
    #[param(value_type = Option<String>)]
    pub min_balance: Option<Decimal>,
    /// Inclusive upper balance bound
    #[param(value_type = Option<String>)]
    pub max_balance: Option<Decimal>,
    /// Only frozen (`true`) or only active (`false`) wallets
    pub frozen: Option<bool>,
}

impl WalletFilter {
    pub fn matches(&self, wallet: &Wallet) -> bool {
        self.owner_id.as_ref().is_none_or(|o| *o == wallet.owner_id)
            && self.min_balance.is_none_or(|min| wallet.balance >= min)
            && self.max_balance.is_none_or(|max| wallet.balance <= max)
            && self.frozen.is_none_or(|f| f == wallet.frozen)
    }
}

// =============================================================================
// Shared lookups (read and write transactions)
// =============================================================================

fn lookup_public_id<I>(index: &I, public_id: &str) -> DbResult<Option<u64>>
where
    I: ReadableTable<&'static str, u64>,
{
    Ok(index.get(public_id)?.map(|v| v.value()))
}

fn owner_wallet_ids<I>(index: &I, owner_id: &str) -> DbResult<Vec<u64>>
where
    I: ReadableTable<(&'static str, u64), ()>,
{
    let mut ids = Vec::new();
    for entry in index.range((owner_id, 0u64)..=(owner_id, u64::MAX))? {
        let (key, _) = entry?;
        ids.push(key.value().1);
    }
    Ok(ids)
}

// =============================================================================
// Write side
// =============================================================================

/// Wallet writes inside one unit of work.
pub struct WalletStore<'u> {
    unit: &'u UnitOfWork,
}

impl<'u> WalletStore<'u> {
    pub fn new(unit: &'u UnitOfWork) -> Self {
        Self { unit }
    }

    /// Create a zero-balance wallet. The owner's first wallet becomes primary.
    pub fn create(&self, owner_id: &str) -> DbResult<Wallet> {
        let id = self.unit.next_id(WALLET_SEQUENCE)?;
        let is_first = self.list_by_owner(owner_id)?.is_empty();

        let mut public_ids = self.unit.txn().open_table(WALLET_PUBLIC_IDS)?;
        let mut public_id = new_public_id(WALLET_ID_PREFIX);
        while lookup_public_id(&public_ids, &public_id)?.is_some() {
            public_id = new_public_id(WALLET_ID_PREFIX);
        }

        let now = Utc::now();
        let wallet = Wallet {
            id,
            public_id,
            owner_id: owner_id.to_string(),
            balance: Decimal::ZERO,
            frozen: false,
            primary: is_first,
            version: 0,
            created_at: now,
            updated_at: now,
        };

        public_ids.insert(wallet.public_id.as_str(), id)?;
        self.unit
            .txn()
            .open_table(OWNER_WALLETS)?
            .insert((owner_id, id), ())?;
        self.put(&wallet)?;
        Ok(wallet)
    }

    pub fn get(&self, id: u64) -> DbResult<Option<Wallet>> {
        let table = self.unit.txn().open_table(WALLETS)?;
        load_row(&table, id)
    }

    pub fn find_by_public_id(&self, public_id: &str) -> DbResult<Option<Wallet>> {
        let id = {
            let index = self.unit.txn().open_table(WALLET_PUBLIC_IDS)?;
            lookup_public_id(&index, public_id)?
        };
        match id {
            Some(id) => self.get(id),
            None => Ok(None),
        }
    }

    /// Owner's wallets in creation order.
    pub fn list_by_owner(&self, owner_id: &str) -> DbResult<Vec<Wallet>> {
        let ids = {
            let index = self.unit.txn().open_table(OWNER_WALLETS)?;
            owner_wallet_ids(&index, owner_id)?
        };
        let table = self.unit.txn().open_table(WALLETS)?;
        ids.into_iter()
            .map(|id| load_indexed_row(&table, id, "owner_wallets"))
            .collect()
    }

    /// Add `delta` (signed) to the balance. Rejects any result below zero or
    /// beyond the representable range.
    pub fn apply_delta(&self, wallet: &Wallet, delta: Decimal) -> Result<Wallet, WalletWriteError> {
        self.compare_and_set(wallet, |current| {
            let new_balance = current.balance.checked_add(delta).ok_or_else(|| {
                WalletWriteError::Overflow {
                    wallet: current.public_id.clone(),
                    balance: current.balance,
                    delta,
                }
            })?;
            if new_balance < Decimal::ZERO {
                return Err(WalletWriteError::Overdraft {
                    wallet: current.public_id.clone(),
                    available: current.balance,
                    requested: -delta,
                });
            }
            current.balance = new_balance;
            Ok(())
        })
    }

    pub fn set_frozen(&self, wallet: &Wallet, frozen: bool) -> Result<Wallet, WalletWriteError> {
        self.compare_and_set(wallet, |current| {
            current.frozen = frozen;
            Ok(())
        })
    }

    /// Make `wallet` the owner's only primary wallet.
    pub fn set_primary(&self, wallet: &Wallet) -> Result<Wallet, WalletWriteError> {
        for other in self.list_by_owner(&wallet.owner_id)? {
            if other.id != wallet.id && other.primary {
                self.compare_and_set(&other, |current| {
                    current.primary = false;
                    Ok(())
                })?;
            }
        }
        self.compare_and_set(wallet, |current| {
            current.primary = true;
            Ok(())
        })
    }

    fn compare_and_set(
        &self,
        expected: &Wallet,
        mutate: impl FnOnce(&mut Wallet) -> Result<(), WalletWriteError>,
    ) -> Result<Wallet, WalletWriteError> {
        let mut current = self
            .get(expected.id)?
            .ok_or_else(|| DbError::DanglingIndex(format!("wallets → {}", expected.id)))?;
        if current.version != expected.version {
            return Err(WalletWriteError::VersionConflict {
                wallet: current.public_id,
                expected: expected.version,
                found: current.version,
            });
        }
        mutate(&mut current)?;
        current.version += 1;
        current.updated_at = Utc::now();
        self.put(&current)?;
        Ok(current)
    }

    fn put(&self, wallet: &Wallet) -> DbResult<()> {
        let bytes = encode(wallet)?;
        let mut table = self.unit.txn().open_table(WALLETS)?;
        table.insert(wallet.id, bytes.as_slice())?;
        Ok(())
    }
}

// =============================================================================
// Read side
// =============================================================================

impl Snapshot {
    pub fn wallet(&self, id: u64) -> DbResult<Option<Wallet>> {
        let table = self.txn().open_table(WALLETS)?;
        load_row(&table, id)
    }

    pub fn wallet_id_for(&self, public_id: &str) -> DbResult<Option<u64>> {
        let index = self.txn().open_table(WALLET_PUBLIC_IDS)?;
        lookup_public_id(&index, public_id)
    }

    pub fn wallet_by_public_id(&self, public_id: &str) -> DbResult<Option<Wallet>> {
        match self.wallet_id_for(public_id)? {
            Some(id) => self.wallet(id),
            None => Ok(None),
        }
    }

    /// Owner's wallets in creation order.
    pub fn wallets_by_owner(&self, owner_id: &str) -> DbResult<Vec<Wallet>> {
        let index = self.txn().open_table(OWNER_WALLETS)?;
        let table = self.txn().open_table(WALLETS)?;
        owner_wallet_ids(&index, owner_id)?
            .into_iter()
            .map(|id| load_indexed_row(&table, id, "owner_wallets"))
            .collect()
    }

    /// Every wallet matching `filter`, newest first.
    pub fn all_wallets(&self, filter: &WalletFilter, page: PageRequest) -> DbResult<Page<Wallet>> {
        let table = self.txn().open_table(WALLETS)?;
        let mut matching = Vec::new();
        for entry in table.iter()?.rev() {
            let (_, value) = entry?;
            let wallet: Wallet = super::database::decode(value.value())?;
            if filter.matches(&wallet) {
                matching.push(wallet);
            }
        }
        Ok(Page::from_vec(matching, page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::database::tests::temp_db;
    use rust_decimal_macros::dec;

    #[test]
    fn first_wallet_is_primary_and_second_is_not() {
        let (db, _dir) = temp_db();
        let unit = db.begin().unwrap();
        let store = WalletStore::new(&unit);
        let first = store.create("user_1").unwrap();
        let second = store.create("user_1").unwrap();
        let other = store.create("user_2").unwrap();
        unit.commit().unwrap();

        assert!(first.primary);
        assert!(!second.primary);
        assert!(other.primary);
        assert_eq!(first.balance, Decimal::ZERO);
        assert!(first.public_id.starts_with("wal_"));

        let snapshot = db.snapshot().unwrap();
        let owned = snapshot.wallets_by_owner("user_1").unwrap();
        assert_eq!(owned.iter().map(|w| w.id).collect::<Vec<_>>(), vec![first.id, second.id]);
        assert_eq!(
            snapshot.wallet_by_public_id(&other.public_id).unwrap().unwrap().owner_id,
            "user_2"
        );
    }

    #[test]
    fn apply_delta_bumps_version_and_rejects_overdraft() {
        let (db, _dir) = temp_db();
        let unit = db.begin().unwrap();
        let store = WalletStore::new(&unit);
        let wallet = store.create("user_1").unwrap();

        let credited = store.apply_delta(&wallet, dec!(10.50)).unwrap();
        assert_eq!(credited.balance, dec!(10.50));
        assert_eq!(credited.version, wallet.version + 1);

        let err = store.apply_delta(&credited, dec!(-10.51)).unwrap_err();
        assert!(matches!(
            err,
            WalletWriteError::Overdraft { available, requested, .. }
                if available == dec!(10.50) && requested == dec!(10.51)
        ));

        let drained = store.apply_delta(&credited, dec!(-10.50)).unwrap();
        assert_eq!(drained.balance, Decimal::ZERO);
    }

    #[test]
    fn apply_delta_rejects_overflow_without_writing() {
        let (db, _dir) = temp_db();
        let unit = db.begin().unwrap();
        let store = WalletStore::new(&unit);
        let wallet = store.create("user_1").unwrap();
        let full = store.apply_delta(&wallet, Decimal::MAX).unwrap();

        let err = store.apply_delta(&full, Decimal::ONE).unwrap_err();
        assert!(matches!(err, WalletWriteError::Overflow { balance, .. } if balance == Decimal::MAX));

        let stored = store.get(full.id).unwrap().unwrap();
        assert_eq!(stored.balance, Decimal::MAX);
        assert_eq!(stored.version, full.version);
    }

    #[test]
    fn stale_copy_is_rejected() {
        let (db, _dir) = temp_db();
        let unit = db.begin().unwrap();
        let store = WalletStore::new(&unit);
        let stale = store.create("user_1").unwrap();
        store.apply_delta(&stale, dec!(5)).unwrap();

        let err = store.apply_delta(&stale, dec!(5)).unwrap_err();
        assert!(matches!(err, WalletWriteError::VersionConflict { expected: 0, found: 1, .. }));
    }

    #[test]
    fn set_primary_moves_the_flag() {
        let (db, _dir) = temp_db();
        let unit = db.begin().unwrap();
        let store = WalletStore::new(&unit);
        let first = store.create("user_1").unwrap();
        let second = store.create("user_1").unwrap();
        store.set_primary(&second).unwrap();
        unit.commit().unwrap();

        let snapshot = db.snapshot().unwrap();
        let owned = snapshot.wallets_by_owner("user_1").unwrap();
        let primaries: Vec<_> = owned.iter().filter(|w| w.primary).map(|w| w.id).collect();
        assert_eq!(primaries, vec![second.id]);
        assert!(!snapshot.wallet(first.id).unwrap().unwrap().primary);
    }

    #[test]
    fn uncommitted_wallets_are_invisible() {
        let (db, _dir) = temp_db();
        let public_id = {
            let unit = db.begin().unwrap();
            WalletStore::new(&unit).create("user_1").unwrap().public_id
        };
        let snapshot = db.snapshot().unwrap();
        assert!(snapshot.wallet_by_public_id(&public_id).unwrap().is_none());
        assert!(snapshot.wallets_by_owner("user_1").unwrap().is_empty());
    }

    #[test]
    fn admin_listing_filters_and_orders_newest_first() {
        let (db, _dir) = temp_db();
        let unit = db.begin().unwrap();
        let store = WalletStore::new(&unit);
        let poor = store.create("user_1").unwrap();
        let rich = store.create("user_2").unwrap();
        let rich = store.apply_delta(&rich, dec!(500)).unwrap();
        let frozen = store.create("user_3").unwrap();
        store.set_frozen(&frozen, true).unwrap();
        unit.commit().unwrap();

        let snapshot = db.snapshot().unwrap();
        let all = snapshot
            .all_wallets(&WalletFilter::default(), PageRequest::default())
            .unwrap();
        assert_eq!(
            all.data.iter().map(|w| w.id).collect::<Vec<_>>(),
            vec![frozen.id, rich.id, poor.id]
        );

        let filter = WalletFilter {
            min_balance: Some(dec!(100)),
            ..Default::default()
        };
        let page = snapshot.all_wallets(&filter, PageRequest::default()).unwrap();
        assert_eq!(page.data, vec![rich]);

        let filter = WalletFilter {
            frozen: Some(true),
            ..Default::default()
        };
        let page = snapshot.all_wallets(&filter, PageRequest::default()).unwrap();
        assert_eq!(page.pagination.total, 1);
        assert_eq!(page.data[0].id, frozen.id);
    }
}
