//! Driven port listing the roles held by a platform user.

use async_trait::async_trait;

use super::define_port_error;
use crate::domain::{RoleSet, UserId};

define_port_error! {
    /// Errors raised while loading roles.
    pub enum RoleDirectoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "role directory connection failed: {message}",
        /// Query failed during execution.
        Query { message: String } =>
            "role directory query failed: {message}",
    }
}

/// Port for looking up a user's roles.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RoleDirectory: Send + Sync {
    /// Roles of `user`; empty when the user is unknown.
    async fn roles_for(&self, user: &UserId) -> Result<RoleSet, RoleDirectoryError>;
}

/// Fixture directory granting no roles.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureRoleDirectory;

#[async_trait]
impl RoleDirectory for FixtureRoleDirectory {
    async fn roles_for(&self, _user: &UserId) -> Result<RoleSet, RoleDirectoryError> {
        Ok(RoleSet::default())
    }
}
