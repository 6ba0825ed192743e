// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::auth::AuthError;
use crate::engine::EngineError;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub error_code: &'static str,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    error_code: &'static str,
}

impl ApiError {
    pub fn new(status: StatusCode, error_code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            error_code,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "bad_request", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        let status = match &err {
            EngineError::InvalidAmount { .. }
            | EngineError::MissingReason
            | EngineError::SameWalletTransfer { .. }
            | EngineError::TransferTypeMismatch { .. } => StatusCode::BAD_REQUEST,
            EngineError::WalletNotFound { .. } | EngineError::TransactionNotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            EngineError::Forbidden { .. } | EngineError::UserSuspended { .. } => StatusCode::FORBIDDEN,
            EngineError::WalletFrozen { .. }
            | EngineError::NotRefundable { .. }
            | EngineError::AlreadyCompensated { .. } => StatusCode::CONFLICT,
            EngineError::InsufficientBalance { .. }
            | EngineError::RefundExceedsRemaining { .. }
            | EngineError::BalanceOverflow { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            EngineError::AtomicityFailure { .. } | EngineError::AuditWriteFailure { .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            }
        };
        if status.is_server_error() {
            tracing::error!(error_code = err.error_code(), error = %err, "Engine operation failed");
        }
        Self::new(status, err.error_code(), err.to_string())
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        Self::new(err.status_code(), err.error_code(), err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
            error_code: self.error_code,
        });
        (self.status, body).into_response()
    }
}
