// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Engine error taxonomy.

use rust_decimal::Decimal;

use crate::storage::{DbError, InvalidTransition, NotOwner, WalletWriteError};

/// Every way an engine operation can fail.
///
/// All variants except `AuditWriteFailure` are raised before commit and
/// leave no trace. `AuditWriteFailure` only surfaces from explicit audit
/// retries; a failed audit write after a financial commit is reported on
/// the outcome instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("Invalid amount '{amount}': must be positive with at most {max_scale} decimal places")]
    InvalidAmount { amount: String, max_scale: u32 },

    #[error("Wallet {wallet} not found")]
    WalletNotFound { wallet: String },

    #[error("Wallet {wallet} is frozen")]
    WalletFrozen { wallet: String },

    #[error("Insufficient balance in wallet {wallet}: available {available}, requested {requested}")]
    InsufficientBalance {
        wallet: String,
        available: Decimal,
        requested: Decimal,
    },

    #[error("Crediting {amount} to wallet {wallet} would exceed the maximum representable balance")]
    BalanceOverflow { wallet: String, amount: Decimal },

    #[error("Forbidden: {reason}")]
    Forbidden { reason: String },

    #[error("Transaction {transaction} not found")]
    TransactionNotFound { transaction: String },

    #[error("Operation aborted, no changes were made: {message}")]
    AtomicityFailure { message: String },

    #[error("Audit log write failed: {message}")]
    AuditWriteFailure { message: String },

    #[error("Cannot transfer from wallet {wallet} to itself")]
    SameWalletTransfer { wallet: String },

    #[error("Own-wallet transfer requires the caller to own receiving wallet {wallet}")]
    TransferTypeMismatch { wallet: String },

    #[error("A reason is required for this operation")]
    MissingReason,

    #[error("Transaction {transaction} cannot be refunded: {reason}")]
    NotRefundable { transaction: String, reason: String },

    #[error("Refund of {requested} exceeds the {remaining} still refundable on transaction {transaction}")]
    RefundExceedsRemaining {
        transaction: String,
        remaining: Decimal,
        requested: Decimal,
    },

    #[error("Transaction {transaction} has already been refunded or reversed")]
    AlreadyCompensated { transaction: String },

    #[error("User {user_id} is suspended")]
    UserSuspended { user_id: String },
}

pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    /// Stable machine-readable code.
    pub fn error_code(&self) -> &'static str {
        match self {
            EngineError::InvalidAmount { .. } => "invalid_amount",
            EngineError::WalletNotFound { .. } => "wallet_not_found",
            EngineError::WalletFrozen { .. } => "wallet_frozen",
            EngineError::InsufficientBalance { .. } => "insufficient_balance",
            EngineError::BalanceOverflow { .. } => "balance_overflow",
            EngineError::Forbidden { .. } => "forbidden",
            EngineError::TransactionNotFound { .. } => "transaction_not_found",
            EngineError::AtomicityFailure { .. } => "atomicity_failure",
            EngineError::AuditWriteFailure { .. } => "audit_write_failure",
            EngineError::SameWalletTransfer { .. } => "same_wallet_transfer",
            EngineError::TransferTypeMismatch { .. } => "transfer_type_mismatch",
            EngineError::MissingReason => "missing_reason",
            EngineError::NotRefundable { .. } => "not_refundable",
            EngineError::RefundExceedsRemaining { .. } => "refund_exceeds_remaining",
            EngineError::AlreadyCompensated { .. } => "already_compensated",
            EngineError::UserSuspended { .. } => "user_suspended",
        }
    }

    /// True if the same request may succeed when simply retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EngineError::AtomicityFailure { .. } | EngineError::AuditWriteFailure { .. }
        )
    }

    pub(crate) fn forbidden(reason: impl Into<String>) -> Self {
        EngineError::Forbidden {
            reason: reason.into(),
        }
    }

    pub(crate) fn wallet_not_found(wallet: &str) -> Self {
        EngineError::WalletNotFound {
            wallet: wallet.to_string(),
        }
    }

    pub(crate) fn transaction_not_found(transaction: &str) -> Self {
        EngineError::TransactionNotFound {
            transaction: transaction.to_string(),
        }
    }
}

impl From<DbError> for EngineError {
    fn from(err: DbError) -> Self {
        EngineError::AtomicityFailure {
            message: err.to_string(),
        }
    }
}

impl From<WalletWriteError> for EngineError {
    fn from(err: WalletWriteError) -> Self {
        match err {
            WalletWriteError::Overdraft {
                wallet,
                available,
                requested,
            } => EngineError::InsufficientBalance {
                wallet,
                available,
                requested,
            },
            WalletWriteError::Overflow { wallet, delta, .. } => EngineError::BalanceOverflow {
                wallet,
                amount: delta,
            },
            other => EngineError::AtomicityFailure {
                message: other.to_string(),
            },
        }
    }
}

impl From<InvalidTransition> for EngineError {
    fn from(err: InvalidTransition) -> Self {
        EngineError::AtomicityFailure {
            message: err.to_string(),
        }
    }
}

impl From<NotOwner> for EngineError {
    fn from(err: NotOwner) -> Self {
        EngineError::Forbidden {
            reason: err.to_string(),
        }
    }
}
