// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet endpoints: lifecycle, balance, deposit/withdraw and history.
//!
//! All operations require authentication. Mutations are restricted to the
//! wallet owner; reads are also open to admins holding the read permission.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    auth::Auth,
    engine::parse_amount,
    error::ApiError,
    models::{BalanceResponse, LedgerEntryResponse, MovementResponse, TransactionResponse, WalletResponse},
    state::AppState,
    storage::{Page, PageRequest},
};

/// Amount in a deposit or withdrawal.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AmountRequest {
    /// Positive decimal string, at most 8 decimal places (e.g. "10.50")
    pub amount: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CreateWalletResponse {
    pub wallet: WalletResponse,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WalletListResponse {
    pub wallets: Vec<WalletResponse>,
    pub total: usize,
}

/// Open a new wallet for the authenticated user.
///
/// The user's first wallet becomes their primary wallet.
#[utoipa::path(
    post,
    path = "/v1/wallets",
    tag = "Wallets",
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Wallet created", body = CreateWalletResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "User suspended")
    )
)]
pub async fn create_wallet(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<CreateWalletResponse>), ApiError> {
    let wallet = state.run(move |engine| engine.create_wallet(&user)).await?;
    Ok((
        StatusCode::CREATED,
        Json(CreateWalletResponse {
            wallet: wallet.into(),
        }),
    ))
}

/// List the authenticated user's wallets.
#[utoipa::path(
    get,
    path = "/v1/wallets",
    tag = "Wallets",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Own wallets", body = WalletListResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn list_wallets(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<WalletListResponse>, ApiError> {
    let wallets = state.run(move |engine| engine.list_wallets(&user)).await?;
    let wallets: Vec<WalletResponse> = wallets.into_iter().map(Into::into).collect();
    Ok(Json(WalletListResponse {
        total: wallets.len(),
        wallets,
    }))
}

#[utoipa::path(
    get,
    path = "/v1/wallets/{wallet_id}",
    tag = "Wallets",
    security(("bearer_auth" = [])),
    params(("wallet_id" = String, Path, description = "Public wallet id")),
    responses(
        (status = 200, description = "Wallet", body = WalletResponse),
        (status = 403, description = "Not your wallet"),
        (status = 404, description = "Wallet not found")
    )
)]
pub async fn get_wallet(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(wallet_id): Path<String>,
) -> Result<Json<WalletResponse>, ApiError> {
    let wallet = state
        .run(move |engine| engine.get_wallet(&user, &wallet_id))
        .await?;
    Ok(Json(wallet.into()))
}

#[utoipa::path(
    get,
    path = "/v1/wallets/{wallet_id}/balance",
    tag = "Wallets",
    security(("bearer_auth" = [])),
    params(("wallet_id" = String, Path, description = "Public wallet id")),
    responses(
        (status = 200, description = "Current balance", body = BalanceResponse),
        (status = 403, description = "Not your wallet"),
        (status = 404, description = "Wallet not found")
    )
)]
pub async fn get_balance(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(wallet_id): Path<String>,
) -> Result<Json<BalanceResponse>, ApiError> {
    let balance = {
        let wallet_id = wallet_id.clone();
        state
            .run(move |engine| engine.get_balance(&user, &wallet_id))
            .await?
    };
    Ok(Json(BalanceResponse {
        wallet_id,
        balance: balance.to_string(),
    }))
}

/// Make this wallet the user's primary wallet.
#[utoipa::path(
    post,
    path = "/v1/wallets/{wallet_id}/primary",
    tag = "Wallets",
    security(("bearer_auth" = [])),
    params(("wallet_id" = String, Path, description = "Public wallet id")),
    responses(
        (status = 200, description = "Updated wallet", body = WalletResponse),
        (status = 403, description = "Not your wallet"),
        (status = 404, description = "Wallet not found")
    )
)]
pub async fn set_primary(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(wallet_id): Path<String>,
) -> Result<Json<WalletResponse>, ApiError> {
    let wallet = state
        .run(move |engine| engine.set_primary_wallet(&user, &wallet_id))
        .await?;
    Ok(Json(wallet.into()))
}

#[utoipa::path(
    post,
    path = "/v1/wallets/{wallet_id}/deposit",
    tag = "Wallets",
    security(("bearer_auth" = [])),
    params(("wallet_id" = String, Path, description = "Public wallet id")),
    request_body = AmountRequest,
    responses(
        (status = 200, description = "Deposit completed", body = MovementResponse),
        (status = 400, description = "Invalid amount"),
        (status = 403, description = "Not your wallet or user suspended"),
        (status = 404, description = "Wallet not found"),
        (status = 409, description = "Wallet frozen")
    )
)]
pub async fn deposit(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(wallet_id): Path<String>,
    Json(request): Json<AmountRequest>,
) -> Result<Json<MovementResponse>, ApiError> {
    let amount = parse_amount(&request.amount)?;
    let outcome = state
        .run(move |engine| engine.deposit(&user, &wallet_id, amount))
        .await?;
    Ok(Json(outcome.into()))
}

#[utoipa::path(
    post,
    path = "/v1/wallets/{wallet_id}/withdraw",
    tag = "Wallets",
    security(("bearer_auth" = [])),
    params(("wallet_id" = String, Path, description = "Public wallet id")),
    request_body = AmountRequest,
    responses(
        (status = 200, description = "Withdrawal completed", body = MovementResponse),
        (status = 400, description = "Invalid amount"),
        (status = 403, description = "Not your wallet or user suspended"),
        (status = 404, description = "Wallet not found"),
        (status = 409, description = "Wallet frozen"),
        (status = 422, description = "Insufficient balance")
    )
)]
pub async fn withdraw(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(wallet_id): Path<String>,
    Json(request): Json<AmountRequest>,
) -> Result<Json<MovementResponse>, ApiError> {
    let amount = parse_amount(&request.amount)?;
    let outcome = state
        .run(move |engine| engine.withdraw(&user, &wallet_id, amount))
        .await?;
    Ok(Json(outcome.into()))
}

/// Transactions touching this wallet, newest first.
#[utoipa::path(
    get,
    path = "/v1/wallets/{wallet_id}/transactions",
    tag = "Wallets",
    security(("bearer_auth" = [])),
    params(("wallet_id" = String, Path, description = "Public wallet id"), PageRequest),
    responses(
        (status = 200, description = "Transaction page", body = Page<TransactionResponse>),
        (status = 403, description = "Not your wallet"),
        (status = 404, description = "Wallet not found")
    )
)]
pub async fn list_transactions(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(wallet_id): Path<String>,
    Query(page): Query<PageRequest>,
) -> Result<Json<Page<TransactionResponse>>, ApiError> {
    let page = state
        .run(move |engine| engine.list_wallet_transactions(&user, &wallet_id, page))
        .await?;
    Ok(Json(page.map(Into::into)))
}

/// Ledger entries of this wallet, newest first.
#[utoipa::path(
    get,
    path = "/v1/wallets/{wallet_id}/ledger",
    tag = "Wallets",
    security(("bearer_auth" = [])),
    params(("wallet_id" = String, Path, description = "Public wallet id"), PageRequest),
    responses(
        (status = 200, description = "Ledger page", body = Page<LedgerEntryResponse>),
        (status = 403, description = "Not your wallet"),
        (status = 404, description = "Wallet not found")
    )
)]
pub async fn list_ledger(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(wallet_id): Path<String>,
    Query(page): Query<PageRequest>,
) -> Result<Json<Page<LedgerEntryResponse>>, ApiError> {
    let page = state
        .run(move |engine| engine.list_wallet_ledger(&user, &wallet_id, page))
        .await?;
    Ok(Json(page.map(Into::into)))
}
