// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet lifecycle and read operations.
//!
//! Reads run against a snapshot and never block writers. A wallet is
//! readable by its owner or by an admin holding the matching read
//! permission.

use rust_decimal::Decimal;
use serde::Serialize;

use super::{
    authorize_read, commit, require_permission, EngineError, EngineResult, TransactionEngine,
};
use crate::audit::FlushReport;
use crate::auth::{AuthenticatedUser, Permission};
use crate::storage::{
    AuditFilter, AuditLog, LedgerEntry, Page, PageRequest, TransactionRecord,
    UserStatus, UserStore, Wallet, WalletFilter, WalletStore,
};

/// A transaction with the ledger entries it produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionDetails {
    pub transaction: TransactionRecord,
    pub ledger: Vec<LedgerEntry>,
    /// Refunds and reversals recorded against this transaction, oldest first
    pub compensations: Vec<TransactionRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciliationReport {
    pub wallet_id: String,
    pub balance: Decimal,
    pub ledger_sum: Decimal,
    pub consistent: bool,
}

impl TransactionEngine {
    /// Open a new zero-balance wallet. The owner's first wallet is primary.
    pub fn create_wallet(&self, user: &AuthenticatedUser) -> EngineResult<Wallet> {
        let unit = self.begin()?;
        if UserStore::new(&unit).status(&user.user_id)? == UserStatus::Suspended {
            return Err(EngineError::UserSuspended {
                user_id: user.user_id.clone(),
            });
        }
        let wallet = WalletStore::new(&unit).create(&user.user_id)?;
        commit(unit)?;
        self.wallet_ids.put(&wallet.public_id, wallet.id);

        tracing::info!(
            user_id = %user.user_id,
            wallet_id = %wallet.public_id,
            primary = wallet.primary,
            "Wallet created"
        );
        Ok(wallet)
    }

    pub fn set_primary_wallet(
        &self,
        user: &AuthenticatedUser,
        wallet_id: &str,
    ) -> EngineResult<Wallet> {
        let unit = self.begin()?;
        let wallet = self.wallet_in(&unit, wallet_id)?;
        self.authorize_owner(&unit, user, &wallet)?;
        let wallet = WalletStore::new(&unit).set_primary(&wallet)?;
        commit(unit)?;
        tracing::info!(user_id = %user.user_id, wallet_id = %wallet.public_id, "Primary wallet changed");
        Ok(wallet)
    }

    pub fn get_wallet(&self, user: &AuthenticatedUser, wallet_id: &str) -> EngineResult<Wallet> {
        let snapshot = self.snapshot()?;
        let wallet = self.wallet_at(&snapshot, wallet_id)?;
        authorize_read(user, &wallet, Permission::WalletsRead)?;
        Ok(wallet)
    }

    /// The caller's own wallets, in creation order.
    pub fn list_wallets(&self, user: &AuthenticatedUser) -> EngineResult<Vec<Wallet>> {
        Ok(self.snapshot()?.wallets_by_owner(&user.user_id)?)
    }

    pub fn get_balance(&self, user: &AuthenticatedUser, wallet_id: &str) -> EngineResult<Decimal> {
        Ok(self.get_wallet(user, wallet_id)?.balance)
    }

    /// Readable by the owner of either side, or with `transactions:read`.
    pub fn get_transaction(
        &self,
        user: &AuthenticatedUser,
        transaction_id: &str,
    ) -> EngineResult<TransactionDetails> {
        let snapshot = self.snapshot()?;
        let transaction = snapshot
            .transaction_by_public_id(transaction_id)?
            .ok_or_else(|| EngineError::transaction_not_found(transaction_id))?;

        if !user.has_permission(Permission::TransactionsRead) {
            let owned: Vec<u64> = snapshot
                .wallets_by_owner(&user.user_id)?
                .iter()
                .map(|w| w.id)
                .collect();
            if !transaction.touches_any(&owned) {
                return Err(EngineError::forbidden(format!(
                    "user {} is not a party to transaction {transaction_id}",
                    user.user_id
                )));
            }
        }

        let ledger = snapshot.transaction_ledger(transaction.id)?;
        let compensations = snapshot.compensations_of(transaction.id)?;
        Ok(TransactionDetails {
            transaction,
            ledger,
            compensations,
        })
    }

    /// Transactions touching a wallet, newest first.
    pub fn list_wallet_transactions(
        &self,
        user: &AuthenticatedUser,
        wallet_id: &str,
        page: PageRequest,
    ) -> EngineResult<Page<TransactionRecord>> {
        let snapshot = self.snapshot()?;
        let wallet = self.wallet_at(&snapshot, wallet_id)?;
        authorize_read(user, &wallet, Permission::TransactionsRead)?;
        Ok(snapshot.wallet_transactions(wallet.id, page.clamped())?)
    }

    /// Ledger entries of a wallet, newest first.
    pub fn list_wallet_ledger(
        &self,
        user: &AuthenticatedUser,
        wallet_id: &str,
        page: PageRequest,
    ) -> EngineResult<Page<LedgerEntry>> {
        let snapshot = self.snapshot()?;
        let wallet = self.wallet_at(&snapshot, wallet_id)?;
        authorize_read(user, &wallet, Permission::WalletsRead)?;
        Ok(snapshot.wallet_ledger(wallet.id, page.clamped())?)
    }

    pub fn list_all_wallets(
        &self,
        admin: &AuthenticatedUser,
        filter: &WalletFilter,
        page: PageRequest,
    ) -> EngineResult<Page<Wallet>> {
        require_permission(admin, Permission::WalletsRead)?;
        Ok(self.snapshot()?.all_wallets(filter, page.clamped())?)
    }

    /// Compare a wallet's stored balance with the sum of its ledger.
    pub fn reconcile_wallet(
        &self,
        admin: &AuthenticatedUser,
        wallet_id: &str,
    ) -> EngineResult<ReconciliationReport> {
        require_permission(admin, Permission::WalletsRead)?;
        let snapshot = self.snapshot()?;
        let wallet = self.wallet_at(&snapshot, wallet_id)?;
        let ledger_sum = snapshot.ledger_sum(wallet.id)?;
        let consistent = ledger_sum == wallet.balance;
        if !consistent {
            tracing::error!(
                alert = "ledger_drift",
                wallet_id = %wallet.public_id,
                balance = %wallet.balance,
                %ledger_sum,
                "Wallet balance does not match its ledger"
            );
        }
        Ok(ReconciliationReport {
            wallet_id: wallet.public_id,
            balance: wallet.balance,
            ledger_sum,
            consistent,
        })
    }

    pub fn list_audit_logs(
        &self,
        admin: &AuthenticatedUser,
        filter: &AuditFilter,
        page: PageRequest,
    ) -> EngineResult<Page<AuditLog>> {
        require_permission(admin, Permission::AuditRead)?;
        Ok(self.snapshot()?.audit_logs(filter, page.clamped())?)
    }

    /// Retry audit entries whose write failed after commit.
    pub fn flush_audit_backlog(&self, admin: &AuthenticatedUser) -> EngineResult<FlushReport> {
        require_permission(admin, Permission::AuditRead)?;
        self.audit.flush_backlog()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AdminType;
    use crate::engine::tests::{admin_of, customer, harness, super_admin};
    use crate::engine::{AdjustDirection, AdjustmentRequest, TransferRequest};
    use crate::storage::{AuditAction, TransferType};
    use rust_decimal_macros::dec;
    use std::sync::atomic::Ordering;

    #[test]
    fn first_wallet_is_primary_and_primary_can_move() {
        let h = harness();
        let user = customer("user_a");
        let first = h.engine.create_wallet(&user).unwrap();
        let second = h.engine.create_wallet(&user).unwrap();
        assert!(first.primary);
        assert!(!second.primary);
        assert_eq!(first.balance, Decimal::ZERO);

        let updated = h.engine.set_primary_wallet(&user, &second.public_id).unwrap();
        assert!(updated.primary);
        let wallets = h.engine.list_wallets(&user).unwrap();
        let primaries: Vec<&str> = wallets
            .iter()
            .filter(|w| w.primary)
            .map(|w| w.public_id.as_str())
            .collect();
        assert_eq!(primaries, vec![second.public_id.as_str()]);

        let err = h
            .engine
            .set_primary_wallet(&customer("user_b"), &first.public_id)
            .unwrap_err();
        assert!(matches!(err, EngineError::Forbidden { .. }));
    }

    #[test]
    fn wallet_reads_are_owner_or_permission() {
        let h = harness();
        let wallet = h.funded_wallet("user_a", dec!(7));

        assert_eq!(
            h.engine.get_balance(&customer("user_a"), &wallet.public_id).unwrap(),
            dec!(7)
        );
        assert!(matches!(
            h.engine.get_wallet(&customer("user_b"), &wallet.public_id),
            Err(EngineError::Forbidden { .. })
        ));
        assert!(h
            .engine
            .get_wallet(&admin_of(AdminType::SupportAdmin), &wallet.public_id)
            .is_ok());
    }

    #[test]
    fn transaction_is_visible_to_both_parties_only() {
        let h = harness();
        let a = h.funded_wallet("user_a", dec!(10));
        let b = h.funded_wallet("user_b", dec!(0));
        let tx = h
            .engine
            .transfer(
                &customer("user_a"),
                TransferRequest {
                    from_wallet: a.public_id.clone(),
                    to_wallet: b.public_id.clone(),
                    amount: dec!(4),
                    transfer_type: TransferType::P2p,
                    description: Some("lunch".into()),
                },
            )
            .unwrap()
            .transaction;

        for user in [customer("user_a"), customer("user_b"), super_admin()] {
            let details = h.engine.get_transaction(&user, &tx.public_id).unwrap();
            assert_eq!(details.transaction, tx);
            assert_eq!(details.ledger.len(), 2);
            assert!(details.compensations.is_empty());
        }
        assert!(matches!(
            h.engine.get_transaction(&customer("user_c"), &tx.public_id),
            Err(EngineError::Forbidden { .. })
        ));
        assert!(matches!(
            h.engine.get_transaction(&customer("user_a"), "txn_missing"),
            Err(EngineError::TransactionNotFound { .. })
        ));
    }

    #[test]
    fn wallet_history_is_newest_first_and_paged() {
        let h = harness();
        let user = customer("user_a");
        let wallet = h.funded_wallet("user_a", dec!(0));
        for amount in [dec!(1), dec!(2), dec!(3)] {
            h.engine.deposit(&user, &wallet.public_id, amount).unwrap();
        }

        let page = h
            .engine
            .list_wallet_transactions(&user, &wallet.public_id, PageRequest::new(1, 2))
            .unwrap();
        assert_eq!(page.pagination.total, 3);
        assert_eq!(page.pagination.total_pages, 2);
        assert_eq!(page.data[0].amount, dec!(3));

        let ledger = h
            .engine
            .list_wallet_ledger(&user, &wallet.public_id, PageRequest::new(2, 2))
            .unwrap();
        assert_eq!(ledger.data.len(), 1);
        assert_eq!(ledger.data[0].balance_after, dec!(1));
    }

    #[test]
    fn reconciliation_matches_after_mixed_activity() {
        let h = harness();
        let wallet = h.funded_wallet("user_a", dec!(20));
        h.engine
            .withdraw(&customer("user_a"), &wallet.public_id, dec!(5.5))
            .unwrap();
        h.engine
            .adjust_balance(
                &super_admin(),
                &wallet.public_id,
                AdjustmentRequest {
                    amount: dec!(0.25),
                    direction: AdjustDirection::Add,
                    reason: Some("goodwill".into()),
                },
            )
            .unwrap();

        let report = h
            .engine
            .reconcile_wallet(&admin_of(AdminType::RiskAdmin), &wallet.public_id)
            .unwrap();
        assert!(report.consistent);
        assert_eq!(report.balance, dec!(14.75));
        assert!(matches!(
            h.engine.reconcile_wallet(&customer("user_a"), &wallet.public_id),
            Err(EngineError::Forbidden { .. })
        ));
    }

    #[test]
    fn admin_listings_require_permissions() {
        let h = harness();
        h.funded_wallet("user_a", dec!(1));
        h.funded_wallet("user_b", dec!(50));

        let filter = WalletFilter {
            min_balance: Some(dec!(10)),
            ..Default::default()
        };
        let page = h
            .engine
            .list_all_wallets(&super_admin(), &filter, PageRequest::default())
            .unwrap();
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.data[0].owner_id, "user_b");

        assert!(matches!(
            h.engine.list_all_wallets(&customer("user_a"), &filter, PageRequest::default()),
            Err(EngineError::Forbidden { .. })
        ));
        assert!(matches!(
            h.engine.list_audit_logs(
                &admin_of(AdminType::SupportAdmin),
                &AuditFilter::default(),
                PageRequest::default()
            ),
            Err(EngineError::Forbidden { .. })
        ));
    }

    #[test]
    fn suspended_user_cannot_open_wallets() {
        let h = harness();
        h.engine
            .suspend_user(&super_admin(), "user_a", Some("kyc".into()))
            .unwrap();
        assert!(matches!(
            h.engine.create_wallet(&customer("user_a")),
            Err(EngineError::UserSuspended { .. })
        ));
    }

    #[test]
    fn backlog_flush_is_permissioned_and_reports() {
        let h = harness();
        let wallet = h.funded_wallet("user_a", dec!(0));
        h.sink.failing.store(true, Ordering::SeqCst);
        let outcome = h
            .engine
            .freeze_wallet(&super_admin(), &wallet.public_id, Some("review".into()))
            .unwrap();
        assert!(!outcome.audit.is_recorded());

        assert!(matches!(
            h.engine.flush_audit_backlog(&customer("user_a")),
            Err(EngineError::Forbidden { .. })
        ));
        assert!(matches!(
            h.engine.flush_audit_backlog(&super_admin()),
            Err(EngineError::AuditWriteFailure { .. })
        ));

        h.sink.failing.store(false, Ordering::SeqCst);
        let report = h.engine.flush_audit_backlog(&super_admin()).unwrap();
        assert_eq!(report.flushed, 1);
        assert_eq!(h.sink.written.lock().unwrap()[0].action, AuditAction::WalletFrozen);
    }
}
