//! Role-based access policy.
//!
//! A single table decides which role may perform which operation on whose
//! record. Handlers consult it once per request, before loading the target.
//! Writes to another user's record additionally pass [`may_modify`], which
//! keeps managers away from privileged accounts.

use accounts_core::{UserId, UserRole};

/// Operations on user records that are subject to the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Administrative create (self-registration is public).
    CreateUser,
    ReadUser,
    UpdateUser,
    DeleteUser,
    ListUsers,
    ChangeRole,
    UnlockUser,
}

/// Whose record an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Own,
    Other,
}

impl Scope {
    /// Scope of an operation by `caller` on `target`.
    #[must_use]
    pub fn of(caller: UserId, target: UserId) -> Self {
        if caller == target { Self::Own } else { Self::Other }
    }
}

/// The authenticated principal making a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub id: UserId,
    pub role: UserRole,
}

impl Caller {
    /// Whether the caller may perform `operation`, optionally on `target`.
    ///
    /// Operations without a target record (listing, creating) are checked
    /// with [`Scope::Other`].
    #[must_use]
    pub fn may(&self, operation: Operation, target: Option<UserId>) -> bool {
        let scope = target.map_or(Scope::Other, |target| Scope::of(self.id, target));
        allowed(self.role, operation, scope)
    }
}

/// Whether `role` may write to another user's record held by `target_role`.
///
/// Only admins modify MANAGER or ADMIN records other than their own.
#[must_use]
pub const fn may_modify(role: UserRole, target_role: UserRole) -> bool {
    matches!(role, UserRole::Admin) || !matches!(target_role, UserRole::Manager | UserRole::Admin)
}

/// Whether `role` may perform `operation` within `scope`.
#[must_use]
pub const fn allowed(role: UserRole, operation: Operation, scope: Scope) -> bool {
    match role {
        UserRole::Admin => true,
        UserRole::Manager => matches!(
            operation,
            Operation::CreateUser
                | Operation::ReadUser
                | Operation::UpdateUser
                | Operation::ListUsers
        ),
        UserRole::Authenticated => {
            matches!(scope, Scope::Own)
                && matches!(operation, Operation::ReadUser | Operation::UpdateUser)
        }
        UserRole::Anonymous => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OPERATIONS: [Operation; 7] = [
        Operation::CreateUser,
        Operation::ReadUser,
        Operation::UpdateUser,
        Operation::DeleteUser,
        Operation::ListUsers,
        Operation::ChangeRole,
        Operation::UnlockUser,
    ];

    #[test]
    fn test_only_admin_modifies_privileged_records() {
        for target in UserRole::ALL {
            assert!(may_modify(UserRole::Admin, target));
        }
        assert!(may_modify(UserRole::Manager, UserRole::Authenticated));
        assert!(may_modify(UserRole::Manager, UserRole::Anonymous));
        assert!(!may_modify(UserRole::Manager, UserRole::Manager));
        assert!(!may_modify(UserRole::Manager, UserRole::Admin));
    }

    #[test]
    fn test_admin_may_do_everything() {
        for operation in OPERATIONS {
            assert!(allowed(UserRole::Admin, operation, Scope::Other));
        }
    }

    #[test]
    fn test_anonymous_may_do_nothing() {
        for operation in OPERATIONS {
            assert!(!allowed(UserRole::Anonymous, operation, Scope::Own));
        }
    }

    #[test]
    fn test_manager_cannot_delete_change_role_or_unlock() {
        assert!(allowed(UserRole::Manager, Operation::ListUsers, Scope::Other));
        assert!(allowed(UserRole::Manager, Operation::ReadUser, Scope::Other));
        assert!(allowed(UserRole::Manager, Operation::CreateUser, Scope::Other));
        assert!(!allowed(UserRole::Manager, Operation::DeleteUser, Scope::Other));
        assert!(!allowed(UserRole::Manager, Operation::ChangeRole, Scope::Own));
        assert!(!allowed(UserRole::Manager, Operation::UnlockUser, Scope::Other));
    }

    #[test]
    fn test_authenticated_limited_to_own_record() {
        assert!(allowed(UserRole::Authenticated, Operation::ReadUser, Scope::Own));
        assert!(allowed(UserRole::Authenticated, Operation::UpdateUser, Scope::Own));
        assert!(!allowed(UserRole::Authenticated, Operation::ReadUser, Scope::Other));
        assert!(!allowed(UserRole::Authenticated, Operation::UpdateUser, Scope::Other));
        assert!(!allowed(UserRole::Authenticated, Operation::ListUsers, Scope::Own));
        assert!(!allowed(UserRole::Authenticated, Operation::CreateUser, Scope::Own));
        assert!(!allowed(UserRole::Authenticated, Operation::DeleteUser, Scope::Own));
        assert!(!allowed(UserRole::Authenticated, Operation::ChangeRole, Scope::Own));
    }

    #[test]
    fn test_caller_may() {
        let caller = Caller {
            id: UserId::new_v4(),
            role: UserRole::Authenticated,
        };
        assert!(caller.may(Operation::ReadUser, Some(caller.id)));
        assert!(!caller.may(Operation::ReadUser, Some(UserId::new_v4())));
        assert!(!caller.may(Operation::ListUsers, None));
    }

    #[test]
    fn test_scope_of() {
        let a = UserId::new_v4();
        let b = UserId::new_v4();
        assert_eq!(Scope::of(a, a), Scope::Own);
        assert_eq!(Scope::of(a, b), Scope::Other);
    }
}
