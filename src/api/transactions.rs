// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Transfer and transaction lookup endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{
    auth::Auth,
    engine::{parse_amount, TransferRequest},
    error::ApiError,
    models::{MovementResponse, TransactionDetailsResponse},
    state::AppState,
    storage::TransferType,
};

// =============================================================================
// Request Types
// =============================================================================

/// Request to move money between two wallets.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransferBody {
    /// Sending wallet (must be owned by the caller)
    pub from_wallet_id: String,
    /// Receiving wallet public id
    pub to_wallet_id: String,
    /// Positive decimal string (e.g. "25.00")
    pub amount: String,
    /// `OWN_WALLET` or `P2P` (default)
    #[serde(default)]
    pub transfer_type: Option<TransferType>,
    #[serde(default)]
    pub description: Option<String>,
}

// =============================================================================
// Handlers
// =============================================================================

/// Transfer funds from one of the caller's wallets.
///
/// `OWN_WALLET` transfers require the caller to own both wallets. The
/// response carries the sender's new balance.
#[utoipa::path(
    post,
    path = "/v1/transactions/transfer",
    tag = "Transactions",
    security(("bearer_auth" = [])),
    request_body = TransferBody,
    responses(
        (status = 200, description = "Transfer completed", body = MovementResponse),
        (status = 400, description = "Invalid amount, same wallet or transfer type mismatch"),
        (status = 403, description = "Not your wallet or user suspended"),
        (status = 404, description = "Wallet not found"),
        (status = 409, description = "Wallet frozen"),
        (status = 422, description = "Insufficient balance")
    )
)]
pub async fn transfer(
    Auth(user): Auth,
    State(state): State<AppState>,
    Json(body): Json<TransferBody>,
) -> Result<Json<MovementResponse>, ApiError> {
    let request = TransferRequest {
        amount: parse_amount(&body.amount)?,
        from_wallet: body.from_wallet_id,
        to_wallet: body.to_wallet_id,
        transfer_type: body.transfer_type.unwrap_or(TransferType::P2p),
        description: body.description,
    };
    let outcome = state
        .run(move |engine| engine.transfer(&user, request))
        .await?;
    Ok(Json(outcome.into()))
}

/// Get a transaction with its ledger entries and any refunds against it.
///
/// Visible to the owner of either wallet and to admins with
/// `transactions:read`.
#[utoipa::path(
    get,
    path = "/v1/transactions/{transaction_id}",
    tag = "Transactions",
    security(("bearer_auth" = [])),
    params(("transaction_id" = String, Path, description = "Public transaction id")),
    responses(
        (status = 200, description = "Transaction", body = TransactionDetailsResponse),
        (status = 403, description = "Not a party to this transaction"),
        (status = 404, description = "Transaction not found")
    )
)]
pub async fn get_transaction(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(transaction_id): Path<String>,
) -> Result<Json<TransactionDetailsResponse>, ApiError> {
    let details = state
        .run(move |engine| engine.get_transaction(&user, &transaction_id))
        .await?;
    Ok(Json(details.into()))
}
