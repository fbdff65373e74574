//! Role lookup against the `users.roles` column.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{RoleDirectory, RoleDirectoryError};
use crate::domain::{RoleSet, UserId};

use super::diesel_helpers::{map_basic_diesel_error, pool_error_message};
use super::pool::DbPool;
use super::schema::users;

/// Diesel-backed implementation of the [`RoleDirectory`] port.
#[derive(Clone)]
pub struct DieselRoleDirectory {
    pool: DbPool,
}

impl DieselRoleDirectory {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoleDirectory for DieselRoleDirectory {
    async fn roles_for(&self, user: &UserId) -> Result<RoleSet, RoleDirectoryError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|error| RoleDirectoryError::connection(pool_error_message(error)))?;
        let roles: Option<Vec<String>> = users::table
            .find(*user.as_uuid())
            .select(users::roles)
            .first(&mut conn)
            .await
            .optional()
            .map_err(|error| {
                map_basic_diesel_error(
                    error,
                    RoleDirectoryError::query,
                    RoleDirectoryError::connection,
                )
            })?;
        Ok(roles.unwrap_or_default().into_iter().collect())
    }
}
