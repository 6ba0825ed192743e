// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::HeaderName,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    audit::{AuditReceipt, AuditStatus, FlushReport},
    auth::{AdminType, Permission},
    engine::{AdjustDirection, CompensationKind},
    models::{
        AdjustmentResponse, BalanceResponse, CompensationResponse, CompensationResult,
        LedgerEntryResponse, MovementResponse, ReconciliationResponse, StatusChangeResponse,
        TransactionDetailsResponse, TransactionResponse, WalletResponse,
    },
    state::AppState,
    storage::{
        AuditAction, AuditLog, EntityType, EntryType, Pagination, TransactionStatus,
        TransactionType, TransferType,
    },
};

pub mod admin;
pub mod health;
pub mod transactions;
pub mod wallets;

const REQUEST_ID_HEADER: &str = "x-request-id";

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route(
            "/wallets",
            get(wallets::list_wallets).post(wallets::create_wallet),
        )
        .route("/wallets/{wallet_id}", get(wallets::get_wallet))
        .route("/wallets/{wallet_id}/balance", get(wallets::get_balance))
        .route("/wallets/{wallet_id}/primary", post(wallets::set_primary))
        .route("/wallets/{wallet_id}/deposit", post(wallets::deposit))
        .route("/wallets/{wallet_id}/withdraw", post(wallets::withdraw))
        .route(
            "/wallets/{wallet_id}/transactions",
            get(wallets::list_transactions),
        )
        .route("/wallets/{wallet_id}/ledger", get(wallets::list_ledger))
        .route("/transactions/transfer", post(transactions::transfer))
        .route(
            "/transactions/{transaction_id}",
            get(transactions::get_transaction),
        )
        .route("/admin/wallets", get(admin::list_all_wallets))
        .route(
            "/admin/wallets/{wallet_id}/adjust",
            post(admin::adjust_balance),
        )
        .route(
            "/admin/wallets/{wallet_id}/freeze",
            post(admin::freeze_wallet),
        )
        .route(
            "/admin/wallets/{wallet_id}/unfreeze",
            post(admin::unfreeze_wallet),
        )
        .route(
            "/admin/wallets/{wallet_id}/reconcile",
            get(admin::reconcile_wallet),
        )
        .route(
            "/admin/transactions/{transaction_id}/refund",
            post(admin::refund_transaction),
        )
        .route(
            "/admin/transactions/{transaction_id}/reverse",
            post(admin::reverse_transaction),
        )
        .route("/admin/users/{user_id}/suspend", post(admin::suspend_user))
        .route(
            "/admin/users/{user_id}/reactivate",
            post(admin::reactivate_user),
        )
        .route("/admin/audit-logs", get(admin::list_audit_logs))
        .route("/admin/audit-logs/flush", post(admin::flush_audit_backlog));

    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness));

    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    Router::new()
        .nest("/v1", v1_routes)
        .merge(health_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        wallets::create_wallet,
        wallets::list_wallets,
        wallets::get_wallet,
        wallets::get_balance,
        wallets::set_primary,
        wallets::deposit,
        wallets::withdraw,
        wallets::list_transactions,
        wallets::list_ledger,
        transactions::transfer,
        transactions::get_transaction,
        admin::adjust_balance,
        admin::freeze_wallet,
        admin::unfreeze_wallet,
        admin::list_all_wallets,
        admin::reconcile_wallet,
        admin::refund_transaction,
        admin::reverse_transaction,
        admin::suspend_user,
        admin::reactivate_user,
        admin::list_audit_logs,
        admin::flush_audit_backlog,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            WalletResponse,
            BalanceResponse,
            TransactionResponse,
            TransactionDetailsResponse,
            LedgerEntryResponse,
            MovementResponse,
            AdjustmentResponse,
            StatusChangeResponse,
            CompensationResponse,
            CompensationResult,
            ReconciliationResponse,
            Pagination,
            AuditLog,
            AuditReceipt,
            AuditStatus,
            FlushReport,
            AuditAction,
            EntityType,
            EntryType,
            TransactionStatus,
            TransactionType,
            TransferType,
            CompensationKind,
            AdjustDirection,
            AdminType,
            Permission,
            wallets::AmountRequest,
            wallets::CreateWalletResponse,
            wallets::WalletListResponse,
            transactions::TransferBody,
            admin::AdjustBalanceBody,
            admin::ReasonBody,
            admin::RefundBody,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Wallets", description = "Wallet lifecycle, deposits, withdrawals and history"),
        (name = "Transactions", description = "Transfers and transaction lookup"),
        (name = "Admin", description = "Permissioned back-office operations"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;
