//! Caller identity and the single authorization policy.
//!
//! Every route asks [`authorize`] whether the caller holds the permission it
//! needs; no route inspects role sets directly.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Error;

/// Role granting access to sync triggers.
pub const ADMINISTRATOR_ROLE: &str = "administrator";

/// Headline returned when the administrator role is missing.
pub const ADMIN_REQUIRED: &str = "Forbidden - Admin access required";

/// Platform user identifier issued by the auth provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Roles held by a user, compared case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleSet(BTreeSet<String>);

impl RoleSet {
    pub fn contains(&self, role: &str) -> bool {
        self.0.contains(&role.trim().to_ascii_lowercase())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for RoleSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|role| role.as_ref().trim().to_ascii_lowercase())
                .filter(|role| !role.is_empty())
                .collect(),
        )
    }
}

/// An authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: UserId,
    pub roles: RoleSet,
}

/// Actions guarded by the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    /// Trigger any sync stage.
    RunSync,
    /// Read totals and run history.
    ViewSyncStatus,
}

/// Decide whether `caller` may perform `permission`.
///
/// # Examples
/// ```
/// use roster_sync::domain::auth::{Caller, Permission, UserId, authorize};
/// use uuid::Uuid;
///
/// let admin = Caller {
///     user_id: UserId::from_uuid(Uuid::nil()),
///     roles: ["administrator"].into_iter().collect(),
/// };
/// assert!(authorize(&admin, Permission::RunSync).is_ok());
/// ```
pub fn authorize(caller: &Caller, permission: Permission) -> Result<(), Error> {
    match permission {
        Permission::ViewSyncStatus => Ok(()),
        Permission::RunSync if caller.roles.contains(ADMINISTRATOR_ROLE) => Ok(()),
        Permission::RunSync => Err(Error::forbidden(ADMIN_REQUIRED)),
    }
}
