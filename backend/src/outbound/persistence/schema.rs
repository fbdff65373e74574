//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match `backend/migrations` exactly. When a migration
//! changes a table, update this file by hand or regenerate it with
//! `diesel print-schema`.

diesel::table! {
    /// Platform users. Provisioned by the auth system; read-only here.
    users (id) {
        id -> Uuid,
        /// CMS user id, when the account was imported from the CMS.
        external_id -> Nullable<Text>,
        email -> Nullable<Text>,
        display_name -> Text,
        /// Role labels driving authorization, e.g. `administrator`.
        roles -> Array<Text>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    organizations (id) {
        id -> Uuid,
        external_id -> Text,
        name -> Text,
        /// Flat string map of extra CMS fields.
        metadata -> Jsonb,
        last_synced_at -> Timestamptz,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    teams (id) {
        id -> Uuid,
        external_id -> Text,
        organization_id -> Uuid,
        name -> Text,
        metadata -> Jsonb,
        last_synced_at -> Timestamptz,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// User-team-role links. Unique per `(team_id, user_id)`.
    team_memberships (id) {
        id -> Uuid,
        team_id -> Uuid,
        user_id -> Uuid,
        role -> Text,
        metadata -> Jsonb,
        last_synced_at -> Timestamptz,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Append-only audit log, one row per stage or full run.
    sync_runs (id) {
        id -> Uuid,
        recorded_seq -> Int8,
        sync_type -> Text,
        status -> Text,
        records_processed -> Int8,
        records_created -> Int8,
        records_updated -> Int8,
        errors -> Jsonb,
        error_message -> Nullable<Text>,
        metadata -> Nullable<Jsonb>,
        started_at -> Timestamptz,
        finished_at -> Timestamptz,
    }
}

diesel::joinable!(teams -> organizations (organization_id));
diesel::joinable!(team_memberships -> teams (team_id));
diesel::joinable!(team_memberships -> users (user_id));

diesel::allow_tables_to_appear_in_same_query!(
    organizations,
    sync_runs,
    team_memberships,
    teams,
    users,
);
