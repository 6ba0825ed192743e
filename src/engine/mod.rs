// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Transaction Engine
//!
//! The only component that changes wallet balances.
//!
//! ## Unit of Work
//!
//! Each operation runs inside one redb write transaction:
//!
//! 1. Validate the request (amount, reason)
//! 2. Resolve wallets and check ownership, suspension and freeze state
//! 3. Prepare a `PENDING` transaction record
//! 4. Apply balance deltas (ascending wallet id) and append ledger entries
//! 5. Complete the record, insert it, commit
//!
//! Any error before step 5 drops the unit, which aborts every write made
//! so far. Administrative operations are audited after the commit.
//!
//! ## Concurrency
//!
//! redb serializes write transactions, so two deltas on the same wallet
//! can never interleave. Wallet writes additionally compare the stored
//! version against the copy read in the same unit.
//!
//! All operations block on I/O; async callers run them on the blocking pool.

pub mod admin;
pub mod compensation;
pub mod error;
pub mod movements;
pub mod queries;

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::audit::AuditRecorder;
use crate::auth::{AuthenticatedUser, Permission};
use crate::storage::{
    IdCache, LedgerDatabase, LedgerEntry, OwnershipEnforcer, Snapshot, TransactionRecord,
    UnitOfWork, UserStatus, UserStore, Wallet, WalletStore,
};

pub use admin::{AdjustDirection, AdjustmentOutcome, AdjustmentRequest, StatusChangeOutcome};
pub use compensation::{CompensationKind, CompensationOutcome};
pub use error::{EngineError, EngineResult};
pub use movements::TransferRequest;
pub use queries::{ReconciliationReport, TransactionDetails};

/// Maximum number of decimal places accepted in an amount.
pub const MAX_AMOUNT_SCALE: u32 = 8;

const ID_CACHE_CAPACITY: usize = 10_000;

/// Outcome of a committed balance-changing operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MovementOutcome {
    pub transaction: TransactionRecord,
    pub ledger: Vec<LedgerEntry>,
    /// Balance of the wallet the caller acted on
    pub new_balance: Decimal,
}

pub struct TransactionEngine {
    db: Arc<LedgerDatabase>,
    audit: Arc<AuditRecorder>,
    wallet_ids: IdCache,
}

impl TransactionEngine {
    pub fn new(db: Arc<LedgerDatabase>, audit: Arc<AuditRecorder>) -> Self {
        Self {
            db,
            audit,
            wallet_ids: IdCache::new(ID_CACHE_CAPACITY),
        }
    }

    pub fn audit(&self) -> &Arc<AuditRecorder> {
        &self.audit
    }

    fn begin(&self) -> EngineResult<UnitOfWork> {
        Ok(self.db.begin()?)
    }

    fn snapshot(&self) -> EngineResult<Snapshot> {
        Ok(self.db.snapshot()?)
    }

    /// Resolve a public wallet id inside a unit of work.
    fn wallet_in(&self, unit: &UnitOfWork, public_id: &str) -> EngineResult<Wallet> {
        let store = WalletStore::new(unit);
        let wallet = match self.wallet_ids.get(public_id) {
            Some(id) => store.get(id)?,
            None => store.find_by_public_id(public_id)?,
        }
        .ok_or_else(|| EngineError::wallet_not_found(public_id))?;
        self.wallet_ids.put(public_id, wallet.id);
        Ok(wallet)
    }

    /// Resolve a public wallet id against a snapshot.
    fn wallet_at(&self, snapshot: &Snapshot, public_id: &str) -> EngineResult<Wallet> {
        let wallet = match self.wallet_ids.get(public_id) {
            Some(id) => snapshot.wallet(id)?,
            None => snapshot.wallet_by_public_id(public_id)?,
        }
        .ok_or_else(|| EngineError::wallet_not_found(public_id))?;
        self.wallet_ids.put(public_id, wallet.id);
        Ok(wallet)
    }

    /// Ownership, then suspension, for an owner-initiated mutation.
    fn authorize_owner(
        &self,
        unit: &UnitOfWork,
        user: &AuthenticatedUser,
        wallet: &Wallet,
    ) -> EngineResult<()> {
        wallet.verify_ownership(user)?;
        if UserStore::new(unit).status(&user.user_id)? == UserStatus::Suspended {
            return Err(EngineError::UserSuspended {
                user_id: user.user_id.clone(),
            });
        }
        Ok(())
    }
}

/// Parse a decimal string amount.
pub fn parse_amount(raw: &str) -> EngineResult<Decimal> {
    let amount: Decimal = raw.trim().parse().map_err(|_| EngineError::InvalidAmount {
        amount: raw.to_string(),
        max_scale: MAX_AMOUNT_SCALE,
    })?;
    validate_amount(amount)
}

/// Amounts must be strictly positive with at most [`MAX_AMOUNT_SCALE`] decimals.
pub fn validate_amount(amount: Decimal) -> EngineResult<Decimal> {
    let amount = amount.normalize();
    if amount <= Decimal::ZERO || amount.scale() > MAX_AMOUNT_SCALE {
        return Err(EngineError::InvalidAmount {
            amount: amount.to_string(),
            max_scale: MAX_AMOUNT_SCALE,
        });
    }
    Ok(amount)
}

fn ensure_not_frozen(wallet: &Wallet) -> EngineResult<()> {
    if wallet.frozen {
        return Err(EngineError::WalletFrozen {
            wallet: wallet.public_id.clone(),
        });
    }
    Ok(())
}

fn ensure_covers(wallet: &Wallet, amount: Decimal) -> EngineResult<()> {
    if wallet.balance < amount {
        return Err(EngineError::InsufficientBalance {
            wallet: wallet.public_id.clone(),
            available: wallet.balance,
            requested: amount,
        });
    }
    Ok(())
}

fn require_permission(user: &AuthenticatedUser, permission: Permission) -> EngineResult<()> {
    if user.has_permission(permission) {
        Ok(())
    } else {
        tracing::warn!(
            user_id = %user.user_id,
            permission = %permission,
            "Admin operation denied"
        );
        Err(EngineError::forbidden(format!("missing permission '{permission}'")))
    }
}

/// Owner of the wallet, or an admin holding `permission`.
fn authorize_read(
    user: &AuthenticatedUser,
    wallet: &Wallet,
    permission: Permission,
) -> EngineResult<()> {
    match wallet.verify_ownership(user) {
        Ok(()) => Ok(()),
        Err(_) if user.has_permission(permission) => Ok(()),
        Err(denied) => Err(denied.into()),
    }
}

fn require_reason(reason: Option<&str>) -> EngineResult<String> {
    match reason.map(str::trim) {
        Some(r) if !r.is_empty() => Ok(r.to_string()),
        _ => Err(EngineError::MissingReason),
    }
}

fn commit(unit: UnitOfWork) -> EngineResult<()> {
    unit.commit().map_err(|e| {
        tracing::error!(error = %e, "Commit failed; unit rolled back");
        EngineError::from(e)
    })
}
