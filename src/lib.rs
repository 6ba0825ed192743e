// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ledgered Wallet Server - wallet balances, ledger and back-office service
//!
//! Customers hold wallets and move money between them; administrators
//! adjust balances, freeze wallets, refund transactions and suspend users.
//! Every balance change is written together with its transaction record
//! and ledger entries in one atomic unit.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `audit` - Audit recorder with failure backlog
//! - `auth` - Bearer-token authentication and admin permissions
//! - `engine` - Transaction engine, the only writer of balances
//! - `storage` - redb tables: wallets, transactions, ledger, audit log

pub mod api;
pub mod audit;
pub mod auth;
pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod state;
pub mod storage;
