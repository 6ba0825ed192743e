// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Back-office API endpoints.
//!
//! Every route requires an admin token (`AdminAuth`). The specific
//! permission (`wallets:adjust`, `wallets:freeze`, `transactions:refund`,
//! `users:suspend`, `audit:read`, …) is checked by the engine operation
//! before it reads anything. Mutating operations are audited; the response
//! says whether the audit entry was recorded or deferred.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{
    audit::FlushReport,
    auth::AdminAuth,
    engine::{parse_amount, AdjustDirection, AdjustmentRequest},
    error::ApiError,
    models::{
        AdjustmentResponse, CompensationResponse, ReconciliationResponse, StatusChangeResponse,
        WalletResponse,
    },
    state::AppState,
    storage::{AuditFilter, AuditLog, Page, PageRequest, WalletFilter},
};

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdjustBalanceBody {
    /// Positive decimal string
    pub amount: String,
    /// `ADD` or `SUBTRACT`
    pub direction: AdjustDirection,
    /// Required, recorded on the transaction and the audit log
    pub reason: Option<String>,
}

/// Optional reason for flag changes.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ReasonBody {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RefundBody {
    pub reason: Option<String>,
    /// Partial refund amount; defaults to everything still refundable
    #[serde(default)]
    pub amount: Option<String>,
}

// ============================================================================
// Wallets
// ============================================================================

/// Credit or debit a wallet.
///
/// Requires `wallets:adjust`. Overrides the wallet's freeze flag.
#[utoipa::path(
    post,
    path = "/v1/admin/wallets/{wallet_id}/adjust",
    tag = "Admin",
    security(("bearer_auth" = [])),
    params(("wallet_id" = String, Path, description = "Public wallet id")),
    request_body = AdjustBalanceBody,
    responses(
        (status = 200, description = "Balance adjusted", body = AdjustmentResponse),
        (status = 400, description = "Invalid amount or missing reason"),
        (status = 403, description = "Missing permission"),
        (status = 404, description = "Wallet not found"),
        (status = 422, description = "Result would be negative")
    )
)]
pub async fn adjust_balance(
    AdminAuth(admin): AdminAuth,
    State(state): State<AppState>,
    Path(wallet_id): Path<String>,
    Json(body): Json<AdjustBalanceBody>,
) -> Result<Json<AdjustmentResponse>, ApiError> {
    let request = AdjustmentRequest {
        amount: parse_amount(&body.amount)?,
        direction: body.direction,
        reason: body.reason,
    };
    let outcome = state
        .run(move |engine| engine.adjust_balance(&admin, &wallet_id, request))
        .await?;
    Ok(Json(outcome.into()))
}

/// Freeze a wallet. Requires `wallets:freeze`.
#[utoipa::path(
    post,
    path = "/v1/admin/wallets/{wallet_id}/freeze",
    tag = "Admin",
    security(("bearer_auth" = [])),
    params(("wallet_id" = String, Path, description = "Public wallet id")),
    request_body = ReasonBody,
    responses(
        (status = 200, description = "Wallet frozen", body = StatusChangeResponse),
        (status = 403, description = "Missing permission"),
        (status = 404, description = "Wallet not found")
    )
)]
pub async fn freeze_wallet(
    AdminAuth(admin): AdminAuth,
    State(state): State<AppState>,
    Path(wallet_id): Path<String>,
    Json(body): Json<ReasonBody>,
) -> Result<Json<StatusChangeResponse>, ApiError> {
    let outcome = state
        .run(move |engine| engine.freeze_wallet(&admin, &wallet_id, body.reason))
        .await?;
    Ok(Json(StatusChangeResponse {
        success: true,
        message: outcome.message,
        subject_id: outcome.subject.public_id,
        audit: outcome.audit,
    }))
}

/// Unfreeze a wallet. Requires `wallets:freeze`.
#[utoipa::path(
    post,
    path = "/v1/admin/wallets/{wallet_id}/unfreeze",
    tag = "Admin",
    security(("bearer_auth" = [])),
    params(("wallet_id" = String, Path, description = "Public wallet id")),
    request_body = ReasonBody,
    responses(
        (status = 200, description = "Wallet unfrozen", body = StatusChangeResponse),
        (status = 403, description = "Missing permission"),
        (status = 404, description = "Wallet not found")
    )
)]
pub async fn unfreeze_wallet(
    AdminAuth(admin): AdminAuth,
    State(state): State<AppState>,
    Path(wallet_id): Path<String>,
    Json(body): Json<ReasonBody>,
) -> Result<Json<StatusChangeResponse>, ApiError> {
    let outcome = state
        .run(move |engine| engine.unfreeze_wallet(&admin, &wallet_id, body.reason))
        .await?;
    Ok(Json(StatusChangeResponse {
        success: true,
        message: outcome.message,
        subject_id: outcome.subject.public_id,
        audit: outcome.audit,
    }))
}

/// List every wallet, newest first. Requires `wallets:read`.
#[utoipa::path(
    get,
    path = "/v1/admin/wallets",
    tag = "Admin",
    security(("bearer_auth" = [])),
    params(WalletFilter, PageRequest),
    responses(
        (status = 200, description = "Wallet page", body = Page<WalletResponse>),
        (status = 403, description = "Missing permission")
    )
)]
pub async fn list_all_wallets(
    AdminAuth(admin): AdminAuth,
    State(state): State<AppState>,
    Query(filter): Query<WalletFilter>,
    Query(page): Query<PageRequest>,
) -> Result<Json<Page<WalletResponse>>, ApiError> {
    let page = state
        .run(move |engine| engine.list_all_wallets(&admin, &filter, page))
        .await?;
    Ok(Json(page.map(Into::into)))
}

/// Compare a wallet's balance with the sum of its ledger. Requires `wallets:read`.
#[utoipa::path(
    get,
    path = "/v1/admin/wallets/{wallet_id}/reconcile",
    tag = "Admin",
    security(("bearer_auth" = [])),
    params(("wallet_id" = String, Path, description = "Public wallet id")),
    responses(
        (status = 200, description = "Reconciliation report", body = ReconciliationResponse),
        (status = 403, description = "Missing permission"),
        (status = 404, description = "Wallet not found")
    )
)]
pub async fn reconcile_wallet(
    AdminAuth(admin): AdminAuth,
    State(state): State<AppState>,
    Path(wallet_id): Path<String>,
) -> Result<Json<ReconciliationResponse>, ApiError> {
    let report = state
        .run(move |engine| engine.reconcile_wallet(&admin, &wallet_id))
        .await?;
    Ok(Json(report.into()))
}

// ============================================================================
// Transactions
// ============================================================================

/// Refund all or part of a completed transaction. Requires `transactions:refund`.
#[utoipa::path(
    post,
    path = "/v1/admin/transactions/{transaction_id}/refund",
    tag = "Admin",
    security(("bearer_auth" = [])),
    params(("transaction_id" = String, Path, description = "Public transaction id")),
    request_body = RefundBody,
    responses(
        (status = 200, description = "Refund recorded", body = CompensationResponse),
        (status = 400, description = "Invalid amount or missing reason"),
        (status = 403, description = "Missing permission"),
        (status = 404, description = "Transaction not found"),
        (status = 409, description = "Not refundable or already fully refunded"),
        (status = 422, description = "Amount exceeds the refundable remainder")
    )
)]
pub async fn refund_transaction(
    AdminAuth(admin): AdminAuth,
    State(state): State<AppState>,
    Path(transaction_id): Path<String>,
    Json(body): Json<RefundBody>,
) -> Result<Json<CompensationResponse>, ApiError> {
    let amount = body.amount.as_deref().map(parse_amount).transpose()?;
    let outcome = state
        .run(move |engine| engine.refund(&admin, &transaction_id, body.reason, amount))
        .await?;
    Ok(Json(outcome.into()))
}

/// Reverse a completed transaction in full. Requires `transactions:refund`.
#[utoipa::path(
    post,
    path = "/v1/admin/transactions/{transaction_id}/reverse",
    tag = "Admin",
    security(("bearer_auth" = [])),
    params(("transaction_id" = String, Path, description = "Public transaction id")),
    request_body = ReasonBody,
    responses(
        (status = 200, description = "Reversal recorded", body = CompensationResponse),
        (status = 400, description = "Missing reason"),
        (status = 403, description = "Missing permission"),
        (status = 404, description = "Transaction not found"),
        (status = 409, description = "Not refundable or already compensated")
    )
)]
pub async fn reverse_transaction(
    AdminAuth(admin): AdminAuth,
    State(state): State<AppState>,
    Path(transaction_id): Path<String>,
    Json(body): Json<ReasonBody>,
) -> Result<Json<CompensationResponse>, ApiError> {
    let outcome = state
        .run(move |engine| engine.reverse(&admin, &transaction_id, body.reason))
        .await?;
    Ok(Json(outcome.into()))
}

// ============================================================================
// Users
// ============================================================================

/// Suspend a user. Requires `users:suspend`.
#[utoipa::path(
    post,
    path = "/v1/admin/users/{user_id}/suspend",
    tag = "Admin",
    security(("bearer_auth" = [])),
    params(("user_id" = String, Path, description = "User id")),
    request_body = ReasonBody,
    responses(
        (status = 200, description = "User suspended", body = StatusChangeResponse),
        (status = 403, description = "Missing permission")
    )
)]
pub async fn suspend_user(
    AdminAuth(admin): AdminAuth,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(body): Json<ReasonBody>,
) -> Result<Json<StatusChangeResponse>, ApiError> {
    let outcome = state
        .run(move |engine| engine.suspend_user(&admin, &user_id, body.reason))
        .await?;
    Ok(Json(StatusChangeResponse {
        success: true,
        message: outcome.message,
        subject_id: outcome.subject.user_id,
        audit: outcome.audit,
    }))
}

/// Reactivate a suspended user. Requires `users:suspend`.
#[utoipa::path(
    post,
    path = "/v1/admin/users/{user_id}/reactivate",
    tag = "Admin",
    security(("bearer_auth" = [])),
    params(("user_id" = String, Path, description = "User id")),
    request_body = ReasonBody,
    responses(
        (status = 200, description = "User reactivated", body = StatusChangeResponse),
        (status = 403, description = "Missing permission")
    )
)]
pub async fn reactivate_user(
    AdminAuth(admin): AdminAuth,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(body): Json<ReasonBody>,
) -> Result<Json<StatusChangeResponse>, ApiError> {
    let outcome = state
        .run(move |engine| engine.reactivate_user(&admin, &user_id, body.reason))
        .await?;
    Ok(Json(StatusChangeResponse {
        success: true,
        message: outcome.message,
        subject_id: outcome.subject.user_id,
        audit: outcome.audit,
    }))
}

// ============================================================================
// Audit
// ============================================================================

/// Query audit logs, newest first. Requires `audit:read`.
#[utoipa::path(
    get,
    path = "/v1/admin/audit-logs",
    tag = "Admin",
    security(("bearer_auth" = [])),
    params(AuditFilter, PageRequest),
    responses(
        (status = 200, description = "Audit log page", body = Page<AuditLog>),
        (status = 403, description = "Missing permission")
    )
)]
pub async fn list_audit_logs(
    AdminAuth(admin): AdminAuth,
    State(state): State<AppState>,
    Query(filter): Query<AuditFilter>,
    Query(page): Query<PageRequest>,
) -> Result<Json<Page<AuditLog>>, ApiError> {
    let page = state
        .run(move |engine| engine.list_audit_logs(&admin, &filter, page))
        .await?;
    Ok(Json(page))
}

/// Retry audit entries whose write failed. Requires `audit:read`.
#[utoipa::path(
    post,
    path = "/v1/admin/audit-logs/flush",
    tag = "Admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Backlog flushed", body = FlushReport),
        (status = 403, description = "Missing permission"),
        (status = 503, description = "Audit store still failing")
    )
)]
pub async fn flush_audit_backlog(
    AdminAuth(admin): AdminAuth,
    State(state): State<AppState>,
) -> Result<Json<FlushReport>, ApiError> {
    let report = state
        .run(move |engine| engine.flush_audit_backlog(&admin))
        .await?;
    Ok(Json(report))
}
