// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Back-office admin types and permissions.
//!
//! ## Admin Types
//!
//! | Type             | Default permissions                                                      |
//! |------------------|--------------------------------------------------------------------------|
//! | `SUPER_ADMIN`    | `*` (everything)                                                         |
//! | `SUPPORT_ADMIN`  | users read/write/suspend, transactions read, wallets read, dashboard     |
//! | `FINANCE_ADMIN`  | users read, transactions read/refund, wallets read/adjust, dashboard, audit |
//! | `RISK_ADMIN`     | users read, transactions read, wallets read/freeze, dashboard, audit     |
//! | `BUSINESS_ADMIN` | business read/write/verify, transactions read, wallets read, dashboard   |
//!
//! Permissions travel inside the bearer token. When a token names an admin
//! type but no explicit list, the type's defaults apply.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Wildcard granting every permission.
pub const WILDCARD: &str = "*";

/// A single back-office permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Permission {
    #[serde(rename = "users:read")]
    UsersRead,
    #[serde(rename = "users:write")]
    UsersWrite,
    #[serde(rename = "users:suspend")]
    UsersSuspend,
    #[serde(rename = "transactions:read")]
    TransactionsRead,
    #[serde(rename = "transactions:refund")]
    TransactionsRefund,
    #[serde(rename = "wallets:read")]
    WalletsRead,
    #[serde(rename = "wallets:adjust")]
    WalletsAdjust,
    #[serde(rename = "wallets:freeze")]
    WalletsFreeze,
    #[serde(rename = "dashboard:view")]
    DashboardView,
    #[serde(rename = "audit:read")]
    AuditRead,
    #[serde(rename = "business:read")]
    BusinessRead,
    #[serde(rename = "business:write")]
    BusinessWrite,
    #[serde(rename = "business:verify")]
    BusinessVerify,
}

impl Permission {
    pub const ALL: [Permission; 13] = [
        Permission::UsersRead,
        Permission::UsersWrite,
        Permission::UsersSuspend,
        Permission::TransactionsRead,
        Permission::TransactionsRefund,
        Permission::WalletsRead,
        Permission::WalletsAdjust,
        Permission::WalletsFreeze,
        Permission::DashboardView,
        Permission::AuditRead,
        Permission::BusinessRead,
        Permission::BusinessWrite,
        Permission::BusinessVerify,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::UsersRead => "users:read",
            Permission::UsersWrite => "users:write",
            Permission::UsersSuspend => "users:suspend",
            Permission::TransactionsRead => "transactions:read",
            Permission::TransactionsRefund => "transactions:refund",
            Permission::WalletsRead => "wallets:read",
            Permission::WalletsAdjust => "wallets:adjust",
            Permission::WalletsFreeze => "wallets:freeze",
            Permission::DashboardView => "dashboard:view",
            Permission::AuditRead => "audit:read",
            Permission::BusinessRead => "business:read",
            Permission::BusinessWrite => "business:write",
            Permission::BusinessVerify => "business:verify",
        }
    }

    /// Parse a permission string such as `wallets:adjust`.
    pub fn parse(s: &str) -> Option<Permission> {
        Permission::ALL.into_iter().find(|p| p.as_str() == s)
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The permissions an admin holds.
///
/// The wildcard is its own variant rather than a magic member of the set,
/// so `allows` cannot forget to check for it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PermissionSet {
    /// `*`: every permission, including ones added later.
    All,
    Granted(HashSet<Permission>),
    #[default]
    None,
}

impl PermissionSet {
    /// Build from the raw strings carried in a token. Unknown strings are ignored.
    pub fn from_strings<I, S>(raw: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut granted = HashSet::new();
        for item in raw {
            let item = item.as_ref();
            if item == WILDCARD {
                return PermissionSet::All;
            }
            match Permission::parse(item) {
                Some(p) => {
                    granted.insert(p);
                }
                None => tracing::debug!(permission = %item, "Ignoring unknown permission"),
            }
        }
        if granted.is_empty() {
            PermissionSet::None
        } else {
            PermissionSet::Granted(granted)
        }
    }

    pub fn of(permissions: &[Permission]) -> Self {
        if permissions.is_empty() {
            PermissionSet::None
        } else {
            PermissionSet::Granted(permissions.iter().copied().collect())
        }
    }

    pub fn allows(&self, permission: Permission) -> bool {
        match self {
            PermissionSet::All => true,
            PermissionSet::Granted(set) => set.contains(&permission),
            PermissionSet::None => false,
        }
    }

    /// Sorted string form, `["*"]` for the wildcard.
    pub fn to_strings(&self) -> Vec<String> {
        match self {
            PermissionSet::All => vec![WILDCARD.to_string()],
            PermissionSet::Granted(set) => {
                let mut out: Vec<String> = set.iter().map(|p| p.as_str().to_string()).collect();
                out.sort();
                out
            }
            PermissionSet::None => Vec::new(),
        }
    }
}

/// Back-office admin type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdminType {
    SuperAdmin,
    SupportAdmin,
    FinanceAdmin,
    RiskAdmin,
    BusinessAdmin,
}

impl AdminType {
    pub fn default_permissions(&self) -> PermissionSet {
        use Permission::*;
        match self {
            AdminType::SuperAdmin => PermissionSet::All,
            AdminType::SupportAdmin => PermissionSet::of(&[
                UsersRead,
                UsersWrite,
                UsersSuspend,
                TransactionsRead,
                WalletsRead,
                DashboardView,
            ]),
            AdminType::FinanceAdmin => PermissionSet::of(&[
                UsersRead,
                TransactionsRead,
                TransactionsRefund,
                WalletsRead,
                WalletsAdjust,
                DashboardView,
                AuditRead,
            ]),
            AdminType::RiskAdmin => PermissionSet::of(&[
                UsersRead,
                TransactionsRead,
                WalletsRead,
                WalletsFreeze,
                DashboardView,
                AuditRead,
            ]),
            AdminType::BusinessAdmin => PermissionSet::of(&[
                BusinessRead,
                BusinessWrite,
                BusinessVerify,
                TransactionsRead,
                WalletsRead,
                DashboardView,
            ]),
        }
    }
}

impl fmt::Display for AdminType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AdminType::SuperAdmin => "SUPER_ADMIN",
            AdminType::SupportAdmin => "SUPPORT_ADMIN",
            AdminType::FinanceAdmin => "FINANCE_ADMIN",
            AdminType::RiskAdmin => "RISK_ADMIN",
            AdminType::BusinessAdmin => "BUSINESS_ADMIN",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_grants_everything() {
        let set = PermissionSet::from_strings(["users:read", "*"]);
        assert_eq!(set, PermissionSet::All);
        for p in Permission::ALL {
            assert!(set.allows(p), "{p} should be allowed");
        }
    }

    #[test]
    fn unknown_permissions_are_ignored() {
        let set = PermissionSet::from_strings(["wallets:adjust", "wallets:teleport"]);
        assert!(set.allows(Permission::WalletsAdjust));
        assert!(!set.allows(Permission::WalletsFreeze));
    }

    #[test]
    fn empty_list_grants_nothing() {
        let set = PermissionSet::from_strings(Vec::<String>::new());
        assert_eq!(set, PermissionSet::None);
        assert!(!set.allows(Permission::WalletsRead));
    }

    #[test]
    fn finance_admin_can_adjust_but_not_freeze() {
        let set = AdminType::FinanceAdmin.default_permissions();
        assert!(set.allows(Permission::WalletsAdjust));
        assert!(set.allows(Permission::TransactionsRefund));
        assert!(!set.allows(Permission::WalletsFreeze));
        assert!(!set.allows(Permission::UsersSuspend));
    }

    #[test]
    fn risk_admin_can_freeze_but_not_adjust() {
        let set = AdminType::RiskAdmin.default_permissions();
        assert!(set.allows(Permission::WalletsFreeze));
        assert!(!set.allows(Permission::WalletsAdjust));
    }

    #[test]
    fn permission_strings_round_trip_through_parse() {
        for p in Permission::ALL {
            assert_eq!(Permission::parse(p.as_str()), Some(p));
        }
        assert_eq!(Permission::parse("WALLETS:ADJUST"), None);
    }

    #[test]
    fn admin_type_serializes_screaming_snake() {
        let json = serde_json::to_string(&AdminType::FinanceAdmin).unwrap();
        assert_eq!(json, "\"FINANCE_ADMIN\"");
        assert_eq!(AdminType::FinanceAdmin.to_string(), "FINANCE_ADMIN");
    }

    #[test]
    fn to_strings_is_sorted() {
        let set = PermissionSet::of(&[Permission::WalletsRead, Permission::AuditRead]);
        assert_eq!(set.to_strings(), vec!["audit:read", "wallets:read"]);
        assert_eq!(PermissionSet::All.to_strings(), vec!["*"]);
    }
}
