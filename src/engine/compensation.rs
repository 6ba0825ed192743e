// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Refunds and reversals.
//!
//! A compensation never edits the original transaction. It is a new
//! `REFUND` transaction whose ledger entries negate the original entries,
//! scaled to the compensated amount, and which is linked to the original
//! through the `compensations` table. A transfer refund therefore still
//! nets to zero across both wallets.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{
    commit, require_permission, require_reason, validate_amount, EngineError, EngineResult,
    TransactionEngine,
};
use crate::audit::AuditReceipt;
use crate::auth::{AuthenticatedUser, Permission};
use crate::storage::{
    AuditAction, AuditEntry, EntryType, Ledger, LedgerEntry, TransactionDraft, TransactionRecord,
    TransactionStatus, TransactionStore, TransactionType, WalletStore,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompensationKind {
    /// Full or partial, repeatable until the original amount is exhausted
    Refund,
    /// Full amount, only if nothing was compensated before
    Reversal,
}

impl CompensationKind {
    fn entry_type(self) -> EntryType {
        match self {
            CompensationKind::Refund => EntryType::Refund,
            CompensationKind::Reversal => EntryType::Reversal,
        }
    }

    fn audit_action(self) -> AuditAction {
        match self {
            CompensationKind::Refund => AuditAction::TransactionRefunded,
            CompensationKind::Reversal => AuditAction::TransactionReversed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompensationOutcome {
    pub kind: CompensationKind,
    pub original: TransactionRecord,
    pub compensation: TransactionRecord,
    pub ledger: Vec<LedgerEntry>,
    /// Amount of the original still refundable after this compensation
    pub remaining: Decimal,
    pub audit: AuditReceipt,
}

impl TransactionEngine {
    /// Refund `amount` (default: everything still refundable) of a transaction.
    pub fn refund(
        &self,
        admin: &AuthenticatedUser,
        transaction_id: &str,
        reason: Option<String>,
        amount: Option<Decimal>,
    ) -> EngineResult<CompensationOutcome> {
        self.compensate(admin, transaction_id, reason, amount, CompensationKind::Refund)
    }

    /// Undo a transaction in full.
    pub fn reverse(
        &self,
        admin: &AuthenticatedUser,
        transaction_id: &str,
        reason: Option<String>,
    ) -> EngineResult<CompensationOutcome> {
        self.compensate(admin, transaction_id, reason, None, CompensationKind::Reversal)
    }

    fn compensate(
        &self,
        admin: &AuthenticatedUser,
        transaction_id: &str,
        reason: Option<String>,
        amount: Option<Decimal>,
        kind: CompensationKind,
    ) -> EngineResult<CompensationOutcome> {
        require_permission(admin, Permission::TransactionsRefund)?;
        let reason = require_reason(reason.as_deref())?;
        let requested = amount.map(validate_amount).transpose()?;

        let unit = self.begin()?;
        let transactions = TransactionStore::new(&unit);
        let original = transactions
            .find_by_public_id(transaction_id)?
            .ok_or_else(|| EngineError::transaction_not_found(transaction_id))?;

        if original.transaction_type == TransactionType::Refund {
            return Err(EngineError::NotRefundable {
                transaction: original.public_id,
                reason: "refund transactions cannot themselves be refunded".into(),
            });
        }
        if original.status != TransactionStatus::Completed {
            return Err(EngineError::NotRefundable {
                transaction: original.public_id,
                reason: format!("status is {:?}, only completed transactions can be refunded", original.status),
            });
        }

        let prior = transactions.compensations_of(original.id)?;
        let compensated = prior
            .iter()
            .try_fold(Decimal::ZERO, |total, r| total.checked_add(r.amount))
            .ok_or_else(|| EngineError::AtomicityFailure {
                message: format!("compensation total of {} overflowed", original.public_id),
            })?;
        let remaining = original.amount - compensated;

        let amount = match kind {
            CompensationKind::Reversal if !prior.is_empty() => {
                return Err(EngineError::AlreadyCompensated {
                    transaction: original.public_id,
                });
            }
            CompensationKind::Reversal => original.amount,
            CompensationKind::Refund if remaining <= Decimal::ZERO => {
                return Err(EngineError::AlreadyCompensated {
                    transaction: original.public_id,
                });
            }
            CompensationKind::Refund => {
                let amount = requested.unwrap_or(remaining);
                if amount > remaining {
                    return Err(EngineError::RefundExceedsRemaining {
                        transaction: original.public_id,
                        remaining,
                        requested: amount,
                    });
                }
                amount
            }
        };

        let ledger = Ledger::new(&unit);
        let mut original_entries = ledger.list_for_transaction(original.id)?;
        original_entries.sort_by_key(|e| e.wallet.id);

        let mut draft = TransactionDraft::new(TransactionType::Refund, amount, admin.actor_id())
            .description(format!("{kind:?} of {}: {reason}", original.public_id))
            .meta("kind", serde_json::json!(kind))
            .meta("originalTransactionId", original.public_id.clone())
            .meta("reason", reason.clone());
        draft.payer = original.receiver.clone();
        draft.receiver = original.payer.clone();

        let mut record = transactions.prepare(draft)?;
        let wallets = WalletStore::new(&unit);
        let mut entries = Vec::with_capacity(original_entries.len());
        for original_entry in &original_entries {
            // Every original entry moved exactly `original.amount`, so the
            // scaled negation is `amount` with the opposite sign.
            let delta = if original_entry.amount.is_sign_negative() {
                amount
            } else {
                -amount
            };
            let wallet = wallets
                .get(original_entry.wallet.id)?
                .ok_or_else(|| EngineError::wallet_not_found(&original_entry.wallet.public_id))?;
            let wallet = wallets.apply_delta(&wallet, delta)?;
            entries.push(ledger.append(&wallet, &record, kind.entry_type(), delta)?);
        }

        record.transition(TransactionStatus::Completed)?;
        transactions.insert(&record)?;
        transactions.link_compensation(original.id, record.id)?;
        commit(unit)?;

        let remaining = remaining - amount;
        tracing::info!(
            admin_id = %admin.actor_id(),
            original = %original.public_id,
            compensation = %record.public_id,
            kind = ?kind,
            %amount,
            %remaining,
            "Compensation committed"
        );

        let audit = self.audit.record(
            AuditEntry::new(kind.audit_action(), admin.actor_id(), &original.public_id)
                .with_description(reason.clone())
                .with_detail("refundTransactionId", record.public_id.clone())
                .with_detail("amount", amount.to_string())
                .with_detail("originalAmount", original.amount.to_string())
                .with_detail("remaining", remaining.to_string())
                .with_detail("reason", reason),
        );

        Ok(CompensationOutcome {
            kind,
            original,
            compensation: record,
            ledger: entries,
            remaining,
            audit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AdminType;
    use crate::engine::tests::{admin_of, customer, harness, super_admin};
    use crate::engine::TransferRequest;
    use crate::storage::TransferType;
    use rust_decimal_macros::dec;

    fn reason() -> Option<String> {
        Some("customer dispute".into())
    }

    /// Two wallets with `amount` transferred from the first to the second.
    fn transferred(h: &crate::engine::tests::Harness, amount: Decimal) -> (String, String, String) {
        let a = h.funded_wallet("user_a", dec!(100));
        let b = h.funded_wallet("user_b", dec!(0));
        let outcome = h
            .engine
            .transfer(
                &customer("user_a"),
                TransferRequest {
                    from_wallet: a.public_id.clone(),
                    to_wallet: b.public_id.clone(),
                    amount,
                    transfer_type: TransferType::P2p,
                    description: None,
                },
            )
            .unwrap();
        (a.public_id, b.public_id, outcome.transaction.public_id)
    }

    #[test]
    fn partial_refunds_net_to_zero_and_stop_at_the_original_amount() {
        let h = harness();
        let (a, b, tx) = transferred(&h, dec!(40));
        let admin = admin_of(AdminType::FinanceAdmin);

        let first = h.engine.refund(&admin, &tx, reason(), Some(dec!(15))).unwrap();
        assert_eq!(first.remaining, dec!(25));
        assert_eq!(first.compensation.transaction_type, TransactionType::Refund);
        assert_eq!(first.compensation.payer.as_ref().unwrap().public_id, b);
        let net: Decimal = first.ledger.iter().map(|e| e.amount).sum();
        assert_eq!(net, Decimal::ZERO);
        assert!(first.ledger.iter().all(|e| e.entry_type == EntryType::Refund));
        assert_eq!(h.wallet(&a).balance, dec!(75));
        assert_eq!(h.wallet(&b).balance, dec!(25));

        let err = h.engine.refund(&admin, &tx, reason(), Some(dec!(25.01))).unwrap_err();
        assert!(matches!(
            err,
            EngineError::RefundExceedsRemaining { remaining, .. } if remaining == dec!(25)
        ));

        let rest = h.engine.refund(&admin, &tx, reason(), None).unwrap();
        assert_eq!(rest.compensation.amount, dec!(25));
        assert_eq!(rest.remaining, Decimal::ZERO);
        assert_eq!(h.wallet(&a).balance, dec!(100));
        assert_eq!(h.wallet(&b).balance, dec!(0));

        let err = h.engine.refund(&admin, &tx, reason(), None).unwrap_err();
        assert!(matches!(err, EngineError::AlreadyCompensated { .. }));

        h.assert_reconciled(&a);
        h.assert_reconciled(&b);
    }

    #[test]
    fn reversal_requires_a_clean_original() {
        let h = harness();
        let (a, _b, tx) = transferred(&h, dec!(10));
        let admin = super_admin();

        h.engine.refund(&admin, &tx, reason(), Some(dec!(1))).unwrap();
        let err = h.engine.reverse(&admin, &tx, reason()).unwrap_err();
        assert!(matches!(err, EngineError::AlreadyCompensated { .. }));
        assert_eq!(h.wallet(&a).balance, dec!(91));
    }

    #[test]
    fn reversal_undoes_a_deposit() {
        let h = harness();
        let wallet = h.funded_wallet("user_a", dec!(0));
        let deposit = h
            .engine
            .deposit(&customer("user_a"), &wallet.public_id, dec!(12))
            .unwrap();

        let outcome = h
            .engine
            .reverse(&super_admin(), &deposit.transaction.public_id, reason())
            .unwrap();
        assert_eq!(outcome.kind, CompensationKind::Reversal);
        assert_eq!(outcome.ledger.len(), 1);
        assert_eq!(outcome.ledger[0].amount, dec!(-12));
        assert_eq!(outcome.ledger[0].entry_type, EntryType::Reversal);
        assert_eq!(h.wallet(&wallet.public_id).balance, Decimal::ZERO);

        let written = h.sink.written.lock().unwrap();
        assert_eq!(written[0].action, AuditAction::TransactionReversed);
        assert_eq!(written[0].entity_id, deposit.transaction.public_id);
    }

    #[test]
    fn refund_fails_when_receiver_already_spent_the_funds() {
        let h = harness();
        let (a, b, tx) = transferred(&h, dec!(30));
        h.engine
            .withdraw(&customer("user_b"), &b, dec!(20))
            .unwrap();

        let err = h.engine.reverse(&super_admin(), &tx, reason()).unwrap_err();
        assert!(matches!(err, EngineError::InsufficientBalance { .. }));
        assert_eq!(h.wallet(&a).balance, dec!(70));
        assert_eq!(h.wallet(&b).balance, dec!(10));
    }

    #[test]
    fn refund_transactions_are_not_refundable() {
        let h = harness();
        let (_a, _b, tx) = transferred(&h, dec!(5));
        let admin = super_admin();
        let refund = h.engine.refund(&admin, &tx, reason(), Some(dec!(1))).unwrap();

        let err = h
            .engine
            .refund(&admin, &refund.compensation.public_id, reason(), None)
            .unwrap_err();
        assert!(matches!(err, EngineError::NotRefundable { .. }));
    }

    #[test]
    fn compensation_preconditions() {
        let h = harness();
        let (_a, _b, tx) = transferred(&h, dec!(5));

        let err = h
            .engine
            .refund(&admin_of(AdminType::RiskAdmin), &tx, reason(), None)
            .unwrap_err();
        assert!(matches!(err, EngineError::Forbidden { .. }));

        let err = h.engine.refund(&super_admin(), &tx, None, None).unwrap_err();
        assert_eq!(err, EngineError::MissingReason);

        let err = h
            .engine
            .refund(&super_admin(), "txn_missing", reason(), None)
            .unwrap_err();
        assert!(matches!(err, EngineError::TransactionNotFound { .. }));

        let err = h
            .engine
            .refund(&super_admin(), &tx, reason(), Some(dec!(-1)))
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidAmount { .. }));
    }

    #[test]
    fn original_transaction_is_never_modified() {
        let h = harness();
        let (_a, _b, tx) = transferred(&h, dec!(8));
        let before = h.db.snapshot().unwrap().transaction_by_public_id(&tx).unwrap();
        h.engine.reverse(&super_admin(), &tx, reason()).unwrap();
        let after = h.db.snapshot().unwrap().transaction_by_public_id(&tx).unwrap();
        assert_eq!(before, after);
    }
}
