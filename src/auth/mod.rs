// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Bearer-token authentication for the wallet API.
//!
//! ## Auth Flow
//!
//! 1. The identity service authenticates the user (password, OTP) and issues a JWT
//! 2. Clients send `Authorization: Bearer <JWT>`
//! 3. This server:
//!    - Verifies the HS256 signature, expiry and issuer
//!    - Extracts:
//!      - `sub` → canonical `user_id`
//!      - `admin` → back-office identity and permission set
//!
//! ## Security
//!
//! - All non-health endpoints require authentication
//! - Admin routes additionally require an `admin` claim
//! - Each admin operation checks its own permission before touching data
//! - Clock skew tolerance is 60 seconds

pub mod claims;
pub mod error;
pub mod extractor;
pub mod permissions;

pub use claims::{AdminIdentity, AuthenticatedUser};
pub use error::AuthError;
pub use extractor::{AdminAuth, Auth};
pub use permissions::{AdminType, Permission, PermissionSet};
