// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ownership enforcement for customer-facing operations.
//!
//! Every owner-initiated read or mutation passes through these checks.
//! Admin paths never use them; they go through permission checks instead.

use crate::auth::AuthenticatedUser;

/// The acting user does not own the resource.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("user {user_id} does not own {resource}")]
pub struct NotOwner {
    pub user_id: String,
    pub resource: String,
}

/// Trait for resources that have an owner.
pub trait OwnedResource {
    /// Get the owner's user ID.
    fn owner_user_id(&self) -> &str;

    /// Human-readable label used in denial messages.
    fn resource_label(&self) -> String;
}

/// Trait for enforcing ownership.
pub trait OwnershipEnforcer {
    /// Verify that the user owns this resource.
    fn verify_ownership(&self, user: &AuthenticatedUser) -> Result<(), NotOwner>;
}

impl<T: OwnedResource> OwnershipEnforcer for T {
    fn verify_ownership(&self, user: &AuthenticatedUser) -> Result<(), NotOwner> {
        if self.owner_user_id() == user.user_id {
            Ok(())
        } else {
            Err(NotOwner {
                user_id: user.user_id.clone(),
                resource: self.resource_label(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestResource {
        owner: String,
    }

    impl OwnedResource for TestResource {
        fn owner_user_id(&self) -> &str {
            &self.owner
        }

        fn resource_label(&self) -> String {
            "test resource".to_string()
        }
    }

    #[test]
    fn ownership_verification_passes_for_owner() {
        let resource = TestResource {
            owner: "user_123".to_string(),
        };
        let user = AuthenticatedUser::customer("user_123");

        assert!(resource.verify_ownership(&user).is_ok());
    }

    #[test]
    fn ownership_verification_fails_for_non_owner() {
        let resource = TestResource {
            owner: "user_123".to_string(),
        };
        let user = AuthenticatedUser::customer("user_456");

        let err = resource.verify_ownership(&user).unwrap_err();
        assert_eq!(err.user_id, "user_456");
        assert_eq!(err.resource, "test resource");
    }

    #[test]
    fn admin_identity_does_not_imply_ownership() {
        use crate::auth::{AdminType, PermissionSet};

        let resource = TestResource {
            owner: "user_123".to_string(),
        };
        let admin = AuthenticatedUser::admin("adm_1", AdminType::SuperAdmin, PermissionSet::All);
        assert!(resource.verify_ownership(&admin).is_err());
    }
}
