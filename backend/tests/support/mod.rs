//! In-memory port implementations shared by the integration tests.
//!
//! Each double records how often it was called so tests can assert that a
//! rejected request never touched the datastore.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use roster_sync::domain::ports::{
    BearerToken, IdentityProvider, IdentityProviderError, RoleDirectory, RoleDirectoryError,
    RosterStore, RosterStoreError, SyncLogRepository, SyncLogRepositoryError,
};
use roster_sync::domain::{
    EntityKind, RoleSet, RosterCounts, RowDraft, StoredRow, SyncRun, UserId, UserRef,
};
use tempfile::TempDir;
use uuid::Uuid;

pub const ADMIN_TOKEN: &str = "admin-token";
pub const COACH_TOKEN: &str = "coach-token";

/// Roster tables held in memory.
#[derive(Default)]
pub struct InMemoryRosterStore {
    rows: Mutex<HashMap<EntityKind, Vec<StoredRow>>>,
    users: Vec<UserRef>,
    calls: AtomicUsize,
    writes: AtomicUsize,
}

impl InMemoryRosterStore {
    pub fn with_users(users: Vec<UserRef>) -> Self {
        Self {
            users,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn rows(&self, kind: EntityKind) -> Vec<StoredRow> {
        self.rows
            .lock()
            .expect("store lock")
            .get(&kind)
            .cloned()
            .unwrap_or_default()
    }

    fn touch(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    fn stored(draft: &RowDraft, id: Uuid) -> StoredRow {
        StoredRow {
            id,
            key: draft.match_key(),
            name: draft.name.clone(),
            links: draft.links,
            extra: draft.extra.clone(),
        }
    }
}

#[async_trait]
impl RosterStore for InMemoryRosterStore {
    async fn snapshot(&self, kind: EntityKind) -> Result<Vec<StoredRow>, RosterStoreError> {
        self.touch();
        Ok(self.rows(kind))
    }

    async fn user_refs(&self) -> Result<Vec<UserRef>, RosterStoreError> {
        self.touch();
        Ok(self.users.clone())
    }

    async fn insert_batch(
        &self,
        kind: EntityKind,
        rows: &[RowDraft],
    ) -> Result<u64, RosterStoreError> {
        self.touch();
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut tables = self.rows.lock().expect("store lock");
        let table = tables.entry(kind).or_default();
        table.extend(rows.iter().map(|draft| Self::stored(draft, Uuid::new_v4())));
        Ok(rows.len() as u64)
    }

    async fn insert_row(&self, kind: EntityKind, row: &RowDraft) -> Result<(), RosterStoreError> {
        self.insert_batch(kind, std::slice::from_ref(row))
            .await
            .map(|_| ())
    }

    async fn update_row(
        &self,
        kind: EntityKind,
        id: Uuid,
        row: &RowDraft,
    ) -> Result<(), RosterStoreError> {
        self.touch();
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut tables = self.rows.lock().expect("store lock");
        let existing = tables
            .entry(kind)
            .or_default()
            .iter_mut()
            .find(|stored| stored.id == id)
            .ok_or_else(|| RosterStoreError::query(format!("{kind} row {id} no longer exists")))?;
        *existing = Self::stored(row, id);
        Ok(())
    }

    async fn counts(&self) -> Result<RosterCounts, RosterStoreError> {
        self.touch();
        let tables = self.rows.lock().expect("store lock");
        let count = |kind| tables.get(&kind).map_or(0, |rows: &Vec<StoredRow>| rows.len() as u64);
        Ok(RosterCounts {
            organizations: count(EntityKind::Organizations),
            teams: count(EntityKind::Teams),
            team_memberships: count(EntityKind::Memberships),
        })
    }
}

/// Append-only sync log; history is latest recorded first.
#[derive(Default)]
pub struct RecordingSyncLog {
    runs: Mutex<Vec<SyncRun>>,
}

impl RecordingSyncLog {
    pub fn runs(&self) -> Vec<SyncRun> {
        self.runs.lock().expect("log lock").clone()
    }
}

#[async_trait]
impl SyncLogRepository for RecordingSyncLog {
    async fn record(&self, run: &SyncRun) -> Result<(), SyncLogRepositoryError> {
        self.runs.lock().expect("log lock").push(run.clone());
        Ok(())
    }

    async fn history(&self, limit: u32) -> Result<Vec<SyncRun>, SyncLogRepositoryError> {
        let runs = self.runs.lock().expect("log lock");
        Ok(runs
            .iter()
            .rev()
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }
}

/// Accepts the two well-known tokens.
pub struct StaticIdentityProvider {
    pub admin: UserId,
    pub coach: UserId,
}

impl Default for StaticIdentityProvider {
    fn default() -> Self {
        Self {
            admin: UserId::from_uuid(Uuid::from_u128(0xA)),
            coach: UserId::from_uuid(Uuid::from_u128(0xC)),
        }
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn resolve(&self, token: &BearerToken) -> Result<Option<UserId>, IdentityProviderError> {
        Ok(match token.expose() {
            ADMIN_TOKEN => Some(self.admin),
            COACH_TOKEN => Some(self.coach),
            _ => None,
        })
    }
}

/// Grants `administrator` to one user and counts lookups.
pub struct CountingRoleDirectory {
    admin: UserId,
    lookups: AtomicUsize,
}

impl CountingRoleDirectory {
    pub fn new(admin: UserId) -> Self {
        Self {
            admin,
            lookups: AtomicUsize::new(0),
        }
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RoleDirectory for CountingRoleDirectory {
    async fn roles_for(&self, user: &UserId) -> Result<RoleSet, RoleDirectoryError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let roles: &[&str] = if *user == self.admin {
            &["Administrator"]
        } else {
            &["coach"]
        };
        Ok(roles.iter().collect())
    }
}

/// Platform users referenced by the team export's member lists.
pub fn platform_users() -> Vec<UserRef> {
    vec![
        UserRef {
            id: Uuid::from_u128(101),
            external_id: Some("101".to_owned()),
            email: Some("ada@example.com".to_owned()),
        },
        UserRef {
            id: Uuid::from_u128(102),
            external_id: Some("102".to_owned()),
            email: None,
        },
    ]
}

/// CMS exports written to a temporary directory.
pub struct Exports {
    dir: TempDir,
}

impl Exports {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("temp dir"),
        }
    }

    /// Path inside the export directory, whether or not it exists.
    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.path(name);
        fs::write(&path, contents).expect("write export");
        path
    }

    pub fn organizations(&self, lakeside_name: &str) -> PathBuf {
        self.write(
            "organizations.csv",
            &format!("ID,Title,Region\norg-1,{lakeside_name},North\norg-2,Riverside FC,South\n"),
        )
    }

    pub fn teams(&self) -> PathBuf {
        self.write(
            "teams.csv",
            "ID,Title,Organization,learndash_group_users_9\n\
             team-1,Lakeside U10,org-1,\"a:2:{i:0;i:101;i:1;i:102;}\"\n\
             team-2,Riverside U12,org-2,\"a:1:{i:0;i:999;}\"\n",
        )
    }
}
