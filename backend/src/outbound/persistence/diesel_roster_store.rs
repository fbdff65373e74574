//! PostgreSQL-backed `RosterStore` implementation using Diesel ORM.
//!
//! Organizations and teams are keyed by their CMS external id; memberships by
//! the `(team_id, user_id)` pair. Batch inserts are chunked to stay under the
//! PostgreSQL bind-parameter limit and run inside one transaction so a batch
//! is all or nothing.

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt as _;
use diesel_async::{AsyncConnection as _, AsyncPgConnection, RunQueryDsl};
use uuid::Uuid;

use crate::domain::ports::{RosterStore, RosterStoreError};
use crate::domain::{
    EntityKind, ExternalId, MatchKey, RosterCounts, RowDraft, RowLinks, StoredRow, UserRef,
};

use super::diesel_helpers::{
    count_from_db, extra_to_json, json_to_extra, map_roster_diesel_error, map_roster_pool_error,
};
use super::models::{
    MembershipRow, MembershipUpdate, NewMembershipRow, NewOrganizationRow, NewTeamRow,
    OrganizationRow, OrganizationUpdate, TeamRow, TeamUpdate, UserRefRow,
};
use super::pool::DbPool;
use super::schema::{organizations, team_memberships, teams, users};

/// Rows per INSERT statement.
const INSERT_CHUNK: usize = 1_000;

/// Diesel-backed implementation of the [`RosterStore`] port.
#[derive(Clone)]
pub struct DieselRosterStore {
    pool: DbPool,
}

impl DieselRosterStore {
    /// Create a new store with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

enum NewRows<'a> {
    Organizations(Vec<NewOrganizationRow<'a>>),
    Teams(Vec<NewTeamRow<'a>>),
    Memberships(Vec<NewMembershipRow<'a>>),
}

fn wrong_links(kind: EntityKind, draft: &RowDraft) -> RosterStoreError {
    RosterStoreError::query(format!(
        "{kind} row {} carries links of another entity type",
        draft.external_id
    ))
}

fn new_rows(kind: EntityKind, drafts: &[RowDraft]) -> Result<NewRows<'_>, RosterStoreError> {
    let now = Utc::now();
    match kind {
        EntityKind::Organizations => drafts
            .iter()
            .map(|draft| match draft.links {
                RowLinks::Root => Ok(NewOrganizationRow {
                    id: Uuid::new_v4(),
                    external_id: draft.external_id.as_str(),
                    name: draft.name.as_str(),
                    metadata: extra_to_json(&draft.extra),
                    last_synced_at: now,
                }),
                _ => Err(wrong_links(kind, draft)),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(NewRows::Organizations),
        EntityKind::Teams => drafts
            .iter()
            .map(|draft| match draft.links {
                RowLinks::Organization { organization_id } => Ok(NewTeamRow {
                    id: Uuid::new_v4(),
                    external_id: draft.external_id.as_str(),
                    organization_id,
                    name: draft.name.as_str(),
                    metadata: extra_to_json(&draft.extra),
                    last_synced_at: now,
                }),
                _ => Err(wrong_links(kind, draft)),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(NewRows::Teams),
        EntityKind::Memberships => drafts
            .iter()
            .map(|draft| match draft.links {
                RowLinks::Membership { team_id, user_id } => Ok(NewMembershipRow {
                    id: Uuid::new_v4(),
                    team_id,
                    user_id,
                    role: draft.name.as_str(),
                    metadata: extra_to_json(&draft.extra),
                    last_synced_at: now,
                }),
                _ => Err(wrong_links(kind, draft)),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(NewRows::Memberships),
    }
}

async fn insert_rows(conn: &mut AsyncPgConnection, rows: &NewRows<'_>) -> QueryResult<usize> {
    let mut inserted = 0;
    match rows {
        NewRows::Organizations(rows) => {
            for chunk in rows.chunks(INSERT_CHUNK) {
                inserted += diesel::insert_into(organizations::table)
                    .values(chunk)
                    .execute(conn)
                    .await?;
            }
        }
        NewRows::Teams(rows) => {
            for chunk in rows.chunks(INSERT_CHUNK) {
                inserted += diesel::insert_into(teams::table)
                    .values(chunk)
                    .execute(conn)
                    .await?;
            }
        }
        NewRows::Memberships(rows) => {
            for chunk in rows.chunks(INSERT_CHUNK) {
                inserted += diesel::insert_into(team_memberships::table)
                    .values(chunk)
                    .execute(conn)
                    .await?;
            }
        }
    }
    Ok(inserted)
}

fn stored_external_id(kind: EntityKind, id: Uuid, raw: &str) -> Result<ExternalId, RosterStoreError> {
    ExternalId::new(raw).map_err(|error| {
        RosterStoreError::query(format!("stored {kind} row {id} has an invalid external id: {error}"))
    })
}

fn organization_to_stored(row: OrganizationRow) -> Result<StoredRow, RosterStoreError> {
    let external_id = stored_external_id(EntityKind::Organizations, row.id, &row.external_id)?;
    Ok(StoredRow {
        id: row.id,
        key: MatchKey::External(external_id),
        name: row.name,
        links: RowLinks::Root,
        extra: json_to_extra(row.metadata),
    })
}

fn team_to_stored(row: TeamRow) -> Result<StoredRow, RosterStoreError> {
    let external_id = stored_external_id(EntityKind::Teams, row.id, &row.external_id)?;
    Ok(StoredRow {
        id: row.id,
        key: MatchKey::External(external_id),
        name: row.name,
        links: RowLinks::Organization {
            organization_id: row.organization_id,
        },
        extra: json_to_extra(row.metadata),
    })
}

fn membership_to_stored(row: MembershipRow) -> StoredRow {
    StoredRow {
        id: row.id,
        key: MatchKey::Membership {
            team_id: row.team_id,
            user_id: row.user_id,
        },
        name: row.role,
        links: RowLinks::Membership {
            team_id: row.team_id,
            user_id: row.user_id,
        },
        extra: json_to_extra(row.metadata),
    }
}

#[async_trait]
impl RosterStore for DieselRosterStore {
    async fn snapshot(&self, kind: EntityKind) -> Result<Vec<StoredRow>, RosterStoreError> {
        let mut conn = self.pool.get().await.map_err(map_roster_pool_error)?;
        match kind {
            EntityKind::Organizations => {
                let rows: Vec<OrganizationRow> = organizations::table
                    .select(OrganizationRow::as_select())
                    .order_by(organizations::external_id)
                    .load(&mut conn)
                    .await
                    .map_err(map_roster_diesel_error)?;
                rows.into_iter().map(organization_to_stored).collect()
            }
            EntityKind::Teams => {
                let rows: Vec<TeamRow> = teams::table
                    .select(TeamRow::as_select())
                    .order_by(teams::external_id)
                    .load(&mut conn)
                    .await
                    .map_err(map_roster_diesel_error)?;
                rows.into_iter().map(team_to_stored).collect()
            }
            EntityKind::Memberships => {
                let rows: Vec<MembershipRow> = team_memberships::table
                    .select(MembershipRow::as_select())
                    .order_by((team_memberships::team_id, team_memberships::user_id))
                    .load(&mut conn)
                    .await
                    .map_err(map_roster_diesel_error)?;
                Ok(rows.into_iter().map(membership_to_stored).collect())
            }
        }
    }

    async fn user_refs(&self) -> Result<Vec<UserRef>, RosterStoreError> {
        let mut conn = self.pool.get().await.map_err(map_roster_pool_error)?;
        let rows: Vec<UserRefRow> = users::table
            .select(UserRefRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_roster_diesel_error)?;
        Ok(rows
            .into_iter()
            .map(|row| UserRef {
                id: row.id,
                external_id: row.external_id,
                email: row.email,
            })
            .collect())
    }

    async fn insert_batch(
        &self,
        kind: EntityKind,
        rows: &[RowDraft],
    ) -> Result<u64, RosterStoreError> {
        if rows.is_empty() {
            return Ok(0);
        }
        let new_rows = new_rows(kind, rows)?;
        let mut conn = self.pool.get().await.map_err(map_roster_pool_error)?;
        let batch = &new_rows;
        let inserted = conn
            .transaction(|conn| async move { insert_rows(conn, batch).await }.scope_boxed())
            .await
            .map_err(map_roster_diesel_error)?;
        Ok(u64::try_from(inserted).unwrap_or(u64::MAX))
    }

    async fn insert_row(&self, kind: EntityKind, row: &RowDraft) -> Result<(), RosterStoreError> {
        let new_rows = new_rows(kind, std::slice::from_ref(row))?;
        let mut conn = self.pool.get().await.map_err(map_roster_pool_error)?;
        insert_rows(&mut conn, &new_rows)
            .await
            .map_err(map_roster_diesel_error)?;
        Ok(())
    }

    async fn update_row(
        &self,
        kind: EntityKind,
        id: Uuid,
        row: &RowDraft,
    ) -> Result<(), RosterStoreError> {
        let now = Utc::now();
        let metadata = extra_to_json(&row.extra);
        let mut conn = self.pool.get().await.map_err(map_roster_pool_error)?;
        let updated = match (kind, row.links) {
            (EntityKind::Organizations, RowLinks::Root) => {
                diesel::update(organizations::table.find(id))
                    .set(OrganizationUpdate {
                        name: row.name.as_str(),
                        metadata,
                        last_synced_at: now,
                        updated_at: now,
                    })
                    .execute(&mut conn)
                    .await
            }
            (EntityKind::Teams, RowLinks::Organization { organization_id }) => {
                diesel::update(teams::table.find(id))
                    .set(TeamUpdate {
                        organization_id,
                        name: row.name.as_str(),
                        metadata,
                        last_synced_at: now,
                        updated_at: now,
                    })
                    .execute(&mut conn)
                    .await
            }
            (EntityKind::Memberships, RowLinks::Membership { .. }) => {
                diesel::update(team_memberships::table.find(id))
                    .set(MembershipUpdate {
                        role: row.name.as_str(),
                        metadata,
                        last_synced_at: now,
                        updated_at: now,
                    })
                    .execute(&mut conn)
                    .await
            }
            _ => return Err(wrong_links(kind, row)),
        }
        .map_err(map_roster_diesel_error)?;

        if updated == 0 {
            return Err(RosterStoreError::query(format!(
                "{kind} row {id} no longer exists"
            )));
        }
        Ok(())
    }

    async fn counts(&self) -> Result<RosterCounts, RosterStoreError> {
        let mut conn = self.pool.get().await.map_err(map_roster_pool_error)?;
        let organizations: i64 = organizations::table
            .count()
            .get_result(&mut conn)
            .await
            .map_err(map_roster_diesel_error)?;
        let teams: i64 = teams::table
            .count()
            .get_result(&mut conn)
            .await
            .map_err(map_roster_diesel_error)?;
        let team_memberships: i64 = team_memberships::table
            .count()
            .get_result(&mut conn)
            .await
            .map_err(map_roster_diesel_error)?;
        Ok(RosterCounts {
            organizations: count_from_db(organizations),
            teams: count_from_db(teams),
            team_memberships: count_from_db(team_memberships),
        })
    }
}
