// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Owner-initiated movements: deposit, withdraw and transfer.

use rust_decimal::Decimal;

use super::{
    commit, ensure_covers, ensure_not_frozen, validate_amount, EngineError, EngineResult,
    MovementOutcome, TransactionEngine,
};
use crate::auth::AuthenticatedUser;
use crate::storage::{
    EntryType, Ledger, TransactionDraft, TransactionStatus, TransactionStore, TransactionType,
    TransferType, WalletStore,
};

/// Transfer between two wallets.
#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub from_wallet: String,
    pub to_wallet: String,
    pub amount: Decimal,
    pub transfer_type: TransferType,
    pub description: Option<String>,
}

impl TransferType {
    fn entry_type(self) -> EntryType {
        match self {
            TransferType::OwnWallet => EntryType::OwnWallet,
            TransferType::P2p => EntryType::P2p,
        }
    }
}

impl TransactionEngine {
    /// Credit `amount` to one of the caller's wallets.
    pub fn deposit(
        &self,
        user: &AuthenticatedUser,
        wallet_id: &str,
        amount: Decimal,
    ) -> EngineResult<MovementOutcome> {
        let amount = validate_amount(amount)?;
        let unit = self.begin()?;
        let wallet = self.wallet_in(&unit, wallet_id)?;
        self.authorize_owner(&unit, user, &wallet)?;
        ensure_not_frozen(&wallet)?;

        let transactions = TransactionStore::new(&unit);
        let mut record = transactions.prepare(
            TransactionDraft::new(TransactionType::Deposit, amount, &user.user_id)
                .payer(&wallet)
                .receiver(&wallet)
                .description("Deposit"),
        )?;
        let wallet = WalletStore::new(&unit).apply_delta(&wallet, amount)?;
        let entry = Ledger::new(&unit).append(&wallet, &record, EntryType::Deposit, amount)?;
        record.transition(TransactionStatus::Completed)?;
        transactions.insert(&record)?;
        commit(unit)?;

        tracing::info!(
            user_id = %user.user_id,
            wallet_id = %wallet.public_id,
            transaction_id = %record.public_id,
            %amount,
            new_balance = %wallet.balance,
            "Deposit completed"
        );

        Ok(MovementOutcome {
            transaction: record,
            ledger: vec![entry],
            new_balance: wallet.balance,
        })
    }

    /// Debit `amount` from one of the caller's wallets.
    pub fn withdraw(
        &self,
        user: &AuthenticatedUser,
        wallet_id: &str,
        amount: Decimal,
    ) -> EngineResult<MovementOutcome> {
        let amount = validate_amount(amount)?;
        let unit = self.begin()?;
        let wallet = self.wallet_in(&unit, wallet_id)?;
        self.authorize_owner(&unit, user, &wallet)?;
        ensure_not_frozen(&wallet)?;
        ensure_covers(&wallet, amount)?;

        let transactions = TransactionStore::new(&unit);
        let mut record = transactions.prepare(
            TransactionDraft::new(TransactionType::Withdraw, amount, &user.user_id)
                .payer(&wallet)
                .description("Withdrawal"),
        )?;
        let wallet = WalletStore::new(&unit).apply_delta(&wallet, -amount)?;
        let entry = Ledger::new(&unit).append(&wallet, &record, EntryType::Withdraw, -amount)?;
        record.transition(TransactionStatus::Completed)?;
        transactions.insert(&record)?;
        commit(unit)?;

        tracing::info!(
            user_id = %user.user_id,
            wallet_id = %wallet.public_id,
            transaction_id = %record.public_id,
            %amount,
            new_balance = %wallet.balance,
            "Withdrawal completed"
        );

        Ok(MovementOutcome {
            transaction: record,
            ledger: vec![entry],
            new_balance: wallet.balance,
        })
    }

    /// Move `amount` from a caller-owned wallet to another wallet.
    ///
    /// `new_balance` on the outcome is the sender's balance.
    pub fn transfer(
        &self,
        user: &AuthenticatedUser,
        request: TransferRequest,
    ) -> EngineResult<MovementOutcome> {
        let amount = validate_amount(request.amount)?;
        if request.from_wallet == request.to_wallet {
            return Err(EngineError::SameWalletTransfer {
                wallet: request.from_wallet,
            });
        }

        let unit = self.begin()?;
        let sender = self.wallet_in(&unit, &request.from_wallet)?;
        let receiver = self.wallet_in(&unit, &request.to_wallet)?;
        self.authorize_owner(&unit, user, &sender)?;
        if request.transfer_type == TransferType::OwnWallet && receiver.owner_id != user.user_id {
            return Err(EngineError::TransferTypeMismatch {
                wallet: receiver.public_id,
            });
        }
        ensure_not_frozen(&sender)?;
        ensure_not_frozen(&receiver)?;
        ensure_covers(&sender, amount)?;

        let transactions = TransactionStore::new(&unit);
        let mut draft = TransactionDraft::new(TransactionType::Transfer, amount, &user.user_id)
            .payer(&sender)
            .receiver(&receiver)
            .transfer_type(request.transfer_type);
        if let Some(description) = request.description {
            draft = draft.description(description);
        }
        let mut record = transactions.prepare(draft)?;

        let wallets = WalletStore::new(&unit);
        let ledger = Ledger::new(&unit);
        let entry_type = request.transfer_type.entry_type();
        let sender_id = sender.id;

        let mut legs = [(sender, -amount), (receiver, amount)];
        legs.sort_by_key(|(wallet, _)| wallet.id);

        let mut entries = Vec::with_capacity(2);
        let mut new_balance = Decimal::ZERO;
        for (wallet, delta) in &legs {
            let updated = wallets.apply_delta(wallet, *delta)?;
            entries.push(ledger.append(&updated, &record, entry_type, *delta)?);
            if updated.id == sender_id {
                new_balance = updated.balance;
            }
        }

        record.transition(TransactionStatus::Completed)?;
        transactions.insert(&record)?;
        commit(unit)?;

        tracing::info!(
            user_id = %user.user_id,
            transaction_id = %record.public_id,
            from = %request.from_wallet,
            to = %request.to_wallet,
            transfer_type = ?request.transfer_type,
            %amount,
            "Transfer completed"
        );

        Ok(MovementOutcome {
            transaction: record,
            ledger: entries,
            new_balance,
        })
    }
}
