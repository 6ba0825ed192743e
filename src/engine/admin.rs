// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Back-office operations: balance adjustment, freeze/unfreeze and user
//! suspension.
//!
//! Each operation checks its permission before reading anything, commits
//! its unit, then writes an audit entry. Freeze state does not block
//! adjustments.

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
    TransactionStatus, TransactionStore, TransactionType, UserStatus, UserStatusRecord, UserStore,
    Wallet, WalletStore,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdjustDirection {
    Add,
    Subtract,
}

impl AdjustDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdjustDirection::Add => "ADD",
            AdjustDirection::Subtract => "SUBTRACT",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AdjustmentRequest {
    pub amount: Decimal,
    pub direction: AdjustDirection,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdjustmentOutcome {
    pub transaction: TransactionRecord,
    pub ledger: LedgerEntry,
    pub previous_balance: Decimal,
    pub new_balance: Decimal,
    pub audit: AuditReceipt,
}

/// Outcome of a flag change (freeze, suspension).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusChangeOutcome<T> {
    pub message: String,
    pub subject: T,
    pub audit: AuditReceipt,
}

impl TransactionEngine {
    /// Credit or debit a wallet on behalf of an admin.
    pub fn adjust_balance(
        &self,
        admin: &AuthenticatedUser,
        wallet_id: &str,
        request: AdjustmentRequest,
    ) -> EngineResult<AdjustmentOutcome> {
        require_permission(admin, Permission::WalletsAdjust)?;
        let reason = require_reason(request.reason.as_deref())?;
        let amount = validate_amount(request.amount)?;

        let unit = self.begin()?;
        let wallet = self.wallet_in(&unit, wallet_id)?;
        let (delta, entry_type) = match request.direction {
            AdjustDirection::Add => (amount, EntryType::Deposit),
            AdjustDirection::Subtract => (-amount, EntryType::Withdraw),
        };
        let previous_balance = wallet.balance;
        let new_balance = previous_balance.checked_add(delta).ok_or_else(|| {
            EngineError::BalanceOverflow {
                wallet: wallet.public_id.clone(),
                amount,
            }
        })?;
        if new_balance < Decimal::ZERO {
            return Err(EngineError::InsufficientBalance {
                wallet: wallet.public_id,
                available: previous_balance,
                requested: amount,
            });
        }

        let mut draft = TransactionDraft::new(
            TransactionType::AdminAdjustment,
            amount,
            admin.actor_id(),
        )
        .description(format!("Admin adjustment: {reason}"))
        .meta("direction", request.direction.as_str())
        .meta("reason", reason.clone())
        .meta("previousBalance", previous_balance.to_string())
        .meta("newBalance", new_balance.to_string());
        draft = match request.direction {
            AdjustDirection::Add => draft.payer(&wallet).receiver(&wallet),
            AdjustDirection::Subtract => draft.payer(&wallet),
        };

        let transactions = TransactionStore::new(&unit);
        let mut record = transactions.prepare(draft)?;
        let wallet = WalletStore::new(&unit).apply_delta(&wallet, delta)?;
        let entry = Ledger::new(&unit).append(&wallet, &record, entry_type, delta)?;
        record.transition(TransactionStatus::Completed)?;
        transactions.insert(&record)?;
        commit(unit)?;

        tracing::info!(
            admin_id = %admin.actor_id(),
            wallet_id = %wallet.public_id,
            transaction_id = %record.public_id,
            direction = ?request.direction,
            %amount,
            %previous_balance,
            new_balance = %wallet.balance,
            "Admin balance adjustment committed"
        );

        let audit = self.audit.record(
            AuditEntry::new(AuditAction::WalletAdjusted, admin.actor_id(), &wallet.public_id)
                .with_description(format!("Balance adjusted: {reason}"))
                .with_detail("transactionId", record.public_id.clone())
                .with_detail("direction", request.direction.as_str())
                .with_detail("amount", amount.to_string())
                .with_detail("reason", reason)
                .with_detail("previousBalance", previous_balance.to_string())
                .with_detail("newBalance", wallet.balance.to_string()),
        );

        Ok(AdjustmentOutcome {
            transaction: record,
            ledger: entry,
            previous_balance,
            new_balance: wallet.balance,
            audit,
        })
    }

    pub fn freeze_wallet(
        &self,
        admin: &AuthenticatedUser,
        wallet_id: &str,
        reason: Option<String>,
    ) -> EngineResult<StatusChangeOutcome<Wallet>> {
        self.set_wallet_frozen(admin, wallet_id, true, reason)
    }

    pub fn unfreeze_wallet(
        &self,
        admin: &AuthenticatedUser,
        wallet_id: &str,
        reason: Option<String>,
    ) -> EngineResult<StatusChangeOutcome<Wallet>> {
        self.set_wallet_frozen(admin, wallet_id, false, reason)
    }

    fn set_wallet_frozen(
        &self,
        admin: &AuthenticatedUser,
        wallet_id: &str,
        frozen: bool,
        reason: Option<String>,
    ) -> EngineResult<StatusChangeOutcome<Wallet>> {
        require_permission(admin, Permission::WalletsFreeze)?;
        let unit = self.begin()?;
        let wallet = self.wallet_in(&unit, wallet_id)?;
        let wallet = WalletStore::new(&unit).set_frozen(&wallet, frozen)?;
        commit(unit)?;

        let (action, verb) = if frozen {
            (AuditAction::WalletFrozen, "frozen")
        } else {
            (AuditAction::WalletUnfrozen, "unfrozen")
        };
        tracing::info!(admin_id = %admin.actor_id(), wallet_id = %wallet.public_id, frozen, "Wallet {verb}");

        let reason = reason.filter(|r| !r.trim().is_empty());
        let description = reason.clone().unwrap_or_else(|| format!("Wallet {verb}"));
        let mut entry = AuditEntry::new(action, admin.actor_id(), &wallet.public_id)
            .with_description(description)
            .with_detail("ownerId", wallet.owner_id.clone());
        if let Some(reason) = reason {
            entry = entry.with_detail("reason", reason);
        }
        let audit = self.audit.record(entry);

        Ok(StatusChangeOutcome {
            message: format!("Wallet {verb} successfully"),
            subject: wallet,
            audit,
        })
    }

    pub fn suspend_user(
        &self,
        admin: &AuthenticatedUser,
        user_id: &str,
        reason: Option<String>,
    ) -> EngineResult<StatusChangeOutcome<UserStatusRecord>> {
        self.set_user_status(admin, user_id, UserStatus::Suspended, reason)
    }

    pub fn reactivate_user(
        &self,
        admin: &AuthenticatedUser,
        user_id: &str,
        reason: Option<String>,
    ) -> EngineResult<StatusChangeOutcome<UserStatusRecord>> {
        self.set_user_status(admin, user_id, UserStatus::Active, reason)
    }

    fn set_user_status(
        &self,
        admin: &AuthenticatedUser,
        user_id: &str,
        status: UserStatus,
        reason: Option<String>,
    ) -> EngineResult<StatusChangeOutcome<UserStatusRecord>> {
        require_permission(admin, Permission::UsersSuspend)?;
        let reason = reason.filter(|r| !r.trim().is_empty());

        let unit = self.begin()?;
        let record = UserStore::new(&unit).set_status(user_id, status, reason.clone(), admin.actor_id())?;
        commit(unit)?;

        let (action, verb) = match status {
            UserStatus::Suspended => (AuditAction::UserSuspended, "suspended"),
            UserStatus::Active => (AuditAction::UserReactivated, "reactivated"),
        };
        tracing::info!(admin_id = %admin.actor_id(), %user_id, "User {verb}");

        let mut entry = AuditEntry::new(action, admin.actor_id(), user_id)
            .with_description(reason.clone().unwrap_or_else(|| format!("User {verb}")));
        if let Some(reason) = reason {
            entry = entry.with_detail("reason", reason);
        }
        let audit = self.audit.record(entry);

        Ok(StatusChangeOutcome {
            message: format!("User {verb} successfully"),
            subject: record,
            audit,
        })
    }
}
