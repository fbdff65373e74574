//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use super::schema::{organizations, sync_runs, team_memberships, teams, users};

// ---------------------------------------------------------------------------
// Organizations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = organizations)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct OrganizationRow {
    pub id: Uuid,
    pub external_id: String,
    pub name: String,
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = organizations)]
pub(crate) struct NewOrganizationRow<'a> {
    pub id: Uuid,
    pub external_id: &'a str,
    pub name: &'a str,
    pub metadata: serde_json::Value,
    pub last_synced_at: DateTime<Utc>,
}

#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = organizations)]
pub(crate) struct OrganizationUpdate<'a> {
    pub name: &'a str,
    pub metadata: serde_json::Value,
    pub last_synced_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Teams
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = teams)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct TeamRow {
    pub id: Uuid,
    pub external_id: String,
    pub organization_id: Uuid,
    pub name: String,
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = teams)]
pub(crate) struct NewTeamRow<'a> {
    pub id: Uuid,
    pub external_id: &'a str,
    pub organization_id: Uuid,
    pub name: &'a str,
    pub metadata: serde_json::Value,
    pub last_synced_at: DateTime<Utc>,
}

#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = teams)]
pub(crate) struct TeamUpdate<'a> {
    pub organization_id: Uuid,
    pub name: &'a str,
    pub metadata: serde_json::Value,
    pub last_synced_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Memberships
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = team_memberships)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct MembershipRow {
    pub id: Uuid,
    pub team_id: Uuid,
    pub user_id: Uuid,
    pub role: String,
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = team_memberships)]
pub(crate) struct NewMembershipRow<'a> {
    pub id: Uuid,
    pub team_id: Uuid,
    pub user_id: Uuid,
    pub role: &'a str,
    pub metadata: serde_json::Value,
    pub last_synced_at: DateTime<Utc>,
}

#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = team_memberships)]
pub(crate) struct MembershipUpdate<'a> {
    pub role: &'a str,
    pub metadata: serde_json::Value,
    pub last_synced_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserRefRow {
    pub id: Uuid,
    pub external_id: Option<String>,
    pub email: Option<String>,
}

// ---------------------------------------------------------------------------
// Sync runs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = sync_runs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct SyncRunRow {
    pub id: Uuid,
    pub sync_type: String,
    pub status: String,
    pub records_processed: i64,
    pub records_created: i64,
    pub records_updated: i64,
    pub errors: serde_json::Value,
    pub error_message: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = sync_runs)]
pub(crate) struct NewSyncRunRow<'a> {
    pub id: Uuid,
    pub sync_type: &'a str,
    pub status: &'a str,
    pub records_processed: i64,
    pub records_created: i64,
    pub records_updated: i64,
    pub errors: serde_json::Value,
    pub error_message: Option<&'a str>,
    pub metadata: Option<&'a serde_json::Value>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}
