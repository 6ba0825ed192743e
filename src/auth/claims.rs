// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWT claims and authenticated user representation.

use serde::Deserialize;

use super::permissions::{AdminType, Permission, PermissionSet};

/// Claims carried by a bearer token.
///
/// Tokens are issued by the identity service; this server only verifies them.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenClaims {
    /// Subject (user ID)
    pub sub: String,

    /// Issued at timestamp
    #[serde(default)]
    pub iat: i64,

    /// Expiration timestamp
    #[serde(default)]
    pub exp: i64,

    /// Issuer
    #[serde(default)]
    pub iss: String,

    /// Session ID
    #[serde(default)]
    pub sid: Option<String>,

    /// Present only on back-office tokens
    #[serde(default)]
    pub admin: Option<AdminClaim>,
}

/// Back-office section of a token.
#[derive(Debug, Clone, Deserialize)]
pub struct AdminClaim {
    /// Admin account ID (recorded in the audit log)
    pub id: String,

    #[serde(rename = "type")]
    pub admin_type: AdminType,

    /// Explicit permission list; the admin type's defaults apply when absent
    #[serde(default)]
    pub permissions: Option<Vec<String>>,
}

/// Admin identity attached to an authenticated principal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminIdentity {
    pub admin_id: String,
    pub admin_type: AdminType,
    pub permissions: PermissionSet,
}

impl From<AdminClaim> for AdminIdentity {
    fn from(claim: AdminClaim) -> Self {
        let permissions = match claim.permissions {
            Some(raw) => PermissionSet::from_strings(raw),
            None => claim.admin_type.default_permissions(),
        };
        Self {
            admin_id: claim.id,
            admin_type: claim.admin_type,
            permissions,
        }
    }
}

/// Authenticated principal extracted from a verified token.
///
/// This is the type every engine operation receives to decide who is acting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    /// Canonical user ID (`sub` claim)
    pub user_id: String,

    /// Back-office identity, if the token carries one
    pub admin: Option<AdminIdentity>,

    /// Session ID (if available)
    pub session_id: Option<String>,

    /// Original issuer
    pub issuer: String,

    /// Token expiration (Unix timestamp)
    pub expires_at: i64,
}

impl AuthenticatedUser {
    pub fn from_claims(claims: TokenClaims) -> Self {
        Self {
            user_id: claims.sub,
            admin: claims.admin.map(AdminIdentity::from),
            session_id: claims.sid,
            issuer: claims.iss,
            expires_at: claims.exp,
        }
    }

    /// A regular customer principal.
    pub fn customer(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            admin: None,
            session_id: None,
            issuer: String::new(),
            expires_at: 0,
        }
    }

    /// A back-office principal holding the given permissions.
    pub fn admin(
        admin_id: impl Into<String>,
        admin_type: AdminType,
        permissions: PermissionSet,
    ) -> Self {
        let admin_id = admin_id.into();
        Self {
            user_id: admin_id.clone(),
            admin: Some(AdminIdentity {
                admin_id,
                admin_type,
                permissions,
            }),
            session_id: None,
            issuer: String::new(),
            expires_at: 0,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.admin.is_some()
    }

    /// True if this principal is an admin holding `permission`.
    pub fn has_permission(&self, permission: Permission) -> bool {
        self.admin
            .as_ref()
            .is_some_and(|a| a.permissions.allows(permission))
    }

    /// Admin ID when acting in the back office, user ID otherwise.
    pub fn actor_id(&self) -> &str {
        match &self.admin {
            Some(admin) => &admin.admin_id,
            None => &self.user_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_claims() -> TokenClaims {
        serde_json::from_value(serde_json::json!({
            "sub": "user_123",
            "iat": 1700000000,
            "exp": 1700003600,
            "iss": "https://id.example.com",
            "sid": "sess_abc"
        }))
        .unwrap()
    }

    #[test]
    fn from_claims_extracts_user_id() {
        let user = AuthenticatedUser::from_claims(sample_claims());
        assert_eq!(user.user_id, "user_123");
        assert_eq!(user.session_id.as_deref(), Some("sess_abc"));
        assert!(!user.is_admin());
    }

    #[test]
    fn admin_claim_without_list_uses_type_defaults() {
        let mut claims = sample_claims();
        claims.admin = Some(AdminClaim {
            id: "adm_1".into(),
            admin_type: AdminType::RiskAdmin,
            permissions: None,
        });
        let user = AuthenticatedUser::from_claims(claims);
        assert!(user.has_permission(Permission::WalletsFreeze));
        assert!(!user.has_permission(Permission::WalletsAdjust));
        assert_eq!(user.actor_id(), "adm_1");
    }

    #[test]
    fn explicit_permission_list_overrides_defaults() {
        let claims: TokenClaims = serde_json::from_value(serde_json::json!({
            "sub": "user_9",
            "admin": {"id": "adm_9", "type": "SUPPORT_ADMIN", "permissions": ["audit:read"]}
        }))
        .unwrap();
        let user = AuthenticatedUser::from_claims(claims);
        assert!(user.has_permission(Permission::AuditRead));
        assert!(!user.has_permission(Permission::UsersSuspend));
    }

    #[test]
    fn customers_hold_no_permissions() {
        let user = AuthenticatedUser::customer("user_1");
        assert!(!user.has_permission(Permission::WalletsRead));
        assert_eq!(user.actor_id(), "user_1");
    }
}
