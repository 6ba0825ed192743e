// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Response shapes shared by the wallet, transaction and admin endpoints.
//! Request bodies live next to their handlers.
//!
//! ## Conventions
//!
//! - Field names are camelCase on the wire
//! - Only public ids (`wal_…`, `txn_…`) are exposed, never internal row ids
//! - Amounts and balances are decimal strings, never JSON numbers

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::audit::AuditReceipt;
use crate::engine::{
    AdjustmentOutcome, CompensationKind, CompensationOutcome, MovementOutcome,
    ReconciliationReport, TransactionDetails,
};
use crate::storage::{
    EntryType, LedgerEntry, TransactionRecord, TransactionStatus, TransactionType, TransferType,
    Wallet,
};

// =============================================================================
// Wallets
// =============================================================================

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WalletResponse {
    pub wallet_id: String,
    pub owner_id: String,
    /// Decimal string
    pub balance: String,
    pub frozen: bool,
    pub primary: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Wallet> for WalletResponse {
    fn from(wallet: Wallet) -> Self {
        Self {
            wallet_id: wallet.public_id,
            owner_id: wallet.owner_id,
            balance: wallet.balance.to_string(),
            frozen: wallet.frozen,
            primary: wallet.primary,
            created_at: wallet.created_at,
            updated_at: wallet.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BalanceResponse {
    pub wallet_id: String,
    pub balance: String,
}

// =============================================================================
// Transactions and ledger
// =============================================================================

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResponse {
    pub transaction_id: String,
    pub status: TransactionStatus,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transfer_type: Option<TransferType>,
    pub amount: String,
    pub payer_wallet_id: Option<String>,
    pub receiver_wallet_id: Option<String>,
    pub initiated_by: String,
    pub description: Option<String>,
    #[schema(value_type = Object)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<TransactionRecord> for TransactionResponse {
    fn from(record: TransactionRecord) -> Self {
        Self {
            transaction_id: record.public_id,
            status: record.status,
            transaction_type: record.transaction_type,
            transfer_type: record.transfer_type,
            amount: record.amount.to_string(),
            payer_wallet_id: record.payer.map(|w| w.public_id),
            receiver_wallet_id: record.receiver.map(|w| w.public_id),
            initiated_by: record.initiated_by,
            description: record.description,
            metadata: record.metadata,
            created_at: record.created_at,
            completed_at: record.completed_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntryResponse {
    pub wallet_id: String,
    pub transaction_id: String,
    pub entry_type: EntryType,
    /// Signed delta
    pub amount: String,
    pub balance_after: String,
    pub created_at: DateTime<Utc>,
}

impl From<LedgerEntry> for LedgerEntryResponse {
    fn from(entry: LedgerEntry) -> Self {
        Self {
            wallet_id: entry.wallet.public_id,
            transaction_id: entry.transaction_public_id,
            entry_type: entry.entry_type,
            amount: entry.amount.to_string(),
            balance_after: entry.balance_after.to_string(),
            created_at: entry.created_at,
        }
    }
}

fn ledger(entries: Vec<LedgerEntry>) -> Vec<LedgerEntryResponse> {
    entries.into_iter().map(Into::into).collect()
}

/// Result of a deposit, withdrawal or transfer.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MovementResponse {
    pub transaction: TransactionResponse,
    pub ledger: Vec<LedgerEntryResponse>,
    /// Balance of the wallet the request acted on (the sender for transfers)
    pub new_balance: String,
}

impl From<MovementOutcome> for MovementResponse {
    fn from(outcome: MovementOutcome) -> Self {
        Self {
            transaction: outcome.transaction.into(),
            ledger: ledger(outcome.ledger),
            new_balance: outcome.new_balance.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDetailsResponse {
    pub transaction: TransactionResponse,
    pub ledger: Vec<LedgerEntryResponse>,
    pub compensations: Vec<TransactionResponse>,
}

impl From<TransactionDetails> for TransactionDetailsResponse {
    fn from(details: TransactionDetails) -> Self {
        Self {
            transaction: details.transaction.into(),
            ledger: ledger(details.ledger),
            compensations: details.compensations.into_iter().map(Into::into).collect(),
        }
    }
}

// =============================================================================
// Back office
// =============================================================================

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdjustmentResponse {
    pub success: bool,
    pub previous_balance: String,
    pub new_balance: String,
    pub transaction: TransactionResponse,
    pub ledger_entry: LedgerEntryResponse,
    pub audit: AuditReceipt,
}

impl From<AdjustmentOutcome> for AdjustmentResponse {
    fn from(outcome: AdjustmentOutcome) -> Self {
        Self {
            success: true,
            previous_balance: outcome.previous_balance.to_string(),
            new_balance: outcome.new_balance.to_string(),
            transaction: outcome.transaction.into(),
            ledger_entry: outcome.ledger.into(),
            audit: outcome.audit,
        }
    }
}

/// Result of a freeze, unfreeze, suspension or reactivation.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusChangeResponse {
    pub success: bool,
    pub message: String,
    /// Wallet or user id the change applied to
    pub subject_id: String,
    pub audit: AuditReceipt,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompensationResult {
    pub kind: CompensationKind,
    pub original_transaction_id: String,
    pub refund_transaction: TransactionResponse,
    pub ledger: Vec<LedgerEntryResponse>,
    /// Amount of the original still refundable
    pub remaining: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompensationResponse {
    pub result: CompensationResult,
    pub audit: AuditReceipt,
}

impl From<CompensationOutcome> for CompensationResponse {
    fn from(outcome: CompensationOutcome) -> Self {
        Self {
            result: CompensationResult {
                kind: outcome.kind,
                original_transaction_id: outcome.original.public_id,
                refund_transaction: outcome.compensation.into(),
                ledger: ledger(outcome.ledger),
                remaining: outcome.remaining.to_string(),
            },
            audit: outcome.audit,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationResponse {
    pub wallet_id: String,
    pub balance: String,
    pub ledger_sum: String,
    pub consistent: bool,
}

impl From<ReconciliationReport> for ReconciliationResponse {
    fn from(report: ReconciliationReport) -> Self {
        Self {
            wallet_id: report.wallet_id,
            balance: report.balance.to_string(),
            ledger_sum: report.ledger_sum.to_string(),
            consistent: report.consistent,
        }
    }
}
