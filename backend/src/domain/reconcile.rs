//! Reconciliation of source records against the datastore snapshot.
//!
//! The reconciler is pure: it resolves parent references through a
//! [`ResolutionIndex`], matches rows by [`MatchKey`], and partitions them into
//! creates, updates and row errors. Output order follows source order.

use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use super::roster::{
    EntityKind, ExternalId, MatchKey, RowDraft, RowLinks, SourceRecord, StoredRow, UserRef,
};
use super::sync_run::{RowError, RowErrorReason};

/// Lookup tables from CMS references to internal ids.
#[derive(Debug, Clone, Default)]
pub struct ResolutionIndex {
    organizations: HashMap<ExternalId, Uuid>,
    teams: HashMap<ExternalId, Uuid>,
    users_by_external_id: HashMap<String, Uuid>,
    users_by_email: HashMap<String, Uuid>,
}

impl ResolutionIndex {
    /// Index stored organizations by external id.
    #[must_use]
    pub fn with_organizations(mut self, rows: &[StoredRow]) -> Self {
        self.organizations = external_ids(rows);
        self
    }

    /// Index stored teams by external id.
    #[must_use]
    pub fn with_teams(mut self, rows: &[StoredRow]) -> Self {
        self.teams = external_ids(rows);
        self
    }

    /// Index users by CMS id and by lower-cased email.
    #[must_use]
    pub fn with_users(mut self, users: &[UserRef]) -> Self {
        for user in users {
            if let Some(external_id) = user.external_id.as_deref().map(str::trim) {
                self.users_by_external_id
                    .insert(external_id.to_owned(), user.id);
            }
            if let Some(email) = user.email.as_deref() {
                self.users_by_email
                    .insert(email.trim().to_lowercase(), user.id);
            }
        }
        self
    }

    fn organization(&self, id: &ExternalId) -> Option<Uuid> {
        self.organizations.get(id).copied()
    }

    fn team(&self, id: &ExternalId) -> Option<Uuid> {
        self.teams.get(id).copied()
    }

    /// References containing `@` are emails; anything else is tried as a CMS
    /// id first and as an email second.
    fn user(&self, reference: &ExternalId) -> Option<Uuid> {
        let raw = reference.as_str();
        let by_email = || self.users_by_email.get(&raw.to_lowercase()).copied();
        if raw.contains('@') {
            return by_email();
        }
        self.users_by_external_id.get(raw).copied().or_else(by_email)
    }
}

fn external_ids(rows: &[StoredRow]) -> HashMap<ExternalId, Uuid> {
    rows.iter()
        .filter_map(|row| match &row.key {
            MatchKey::External(external_id) => Some((external_id.clone(), row.id)),
            MatchKey::Membership { .. } => None,
        })
        .collect()
}

/// A matched row whose fields changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedUpdate {
    pub id: Uuid,
    pub draft: RowDraft,
}

/// Result of reconciling one entity type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcilePlan {
    pub to_create: Vec<RowDraft>,
    pub to_update: Vec<PlannedUpdate>,
    pub unchanged: u64,
    pub errors: Vec<RowError>,
}

/// Partition `records` into creates, updates and errors.
///
/// # Examples
/// ```
/// use roster_sync::domain::reconcile::{ResolutionIndex, reconcile};
/// use roster_sync::domain::{EntityKind, ExternalId, SourceRecord};
///
/// let lakeside = SourceRecord::new(ExternalId::new("org-1").expect("valid id"), "Lakeside");
/// let plan = reconcile(
///     EntityKind::Organizations,
///     vec![lakeside],
///     &[],
///     &ResolutionIndex::default(),
/// );
/// assert_eq!(plan.to_create.len(), 1);
/// ```
pub fn reconcile(
    kind: EntityKind,
    records: Vec<SourceRecord>,
    snapshot: &[StoredRow],
    index: &ResolutionIndex,
) -> ReconcilePlan {
    let existing: HashMap<&MatchKey, &StoredRow> =
        snapshot.iter().map(|row| (&row.key, row)).collect();
    let mut seen = HashSet::new();
    let mut plan = ReconcilePlan::default();

    for record in records {
        let draft = match resolve(kind, record, index) {
            Ok(draft) => draft,
            Err(error) => {
                plan.errors.push(error);
                continue;
            }
        };
        let key = draft.match_key();
        if !seen.insert(key.clone()) {
            plan.errors.push(RowError::malformed(
                Some(&draft.external_id),
                duplicate_message(kind, &draft),
            ));
            continue;
        }
        match existing.get(&key) {
            Some(stored) if draft.differs_from(stored) => plan.to_update.push(PlannedUpdate {
                id: stored.id,
                draft,
            }),
            Some(_) => plan.unchanged += 1,
            None => plan.to_create.push(draft),
        }
    }
    plan
}

fn duplicate_message(kind: EntityKind, draft: &RowDraft) -> String {
    match kind {
        EntityKind::Memberships => format!(
            "duplicate membership for user {} in the same team",
            draft.external_id
        ),
        EntityKind::Organizations | EntityKind::Teams => {
            format!("duplicate external id {}", draft.external_id)
        }
    }
}

fn resolve(
    kind: EntityKind,
    record: SourceRecord,
    index: &ResolutionIndex,
) -> Result<RowDraft, RowError> {
    let SourceRecord {
        external_id,
        name,
        parent_external_id,
        extra,
    } = record;

    let links = match kind {
        EntityKind::Organizations => RowLinks::Root,
        EntityKind::Teams => {
            let organization_id = parent_external_id
                .as_ref()
                .and_then(|parent| index.organization(parent))
                .ok_or_else(|| {
                    orphaned(&external_id, "organization", parent_external_id.as_ref())
                })?;
            RowLinks::Organization { organization_id }
        }
        EntityKind::Memberships => {
            let team_id = parent_external_id
                .as_ref()
                .and_then(|parent| index.team(parent))
                .ok_or_else(|| orphaned(&external_id, "team", parent_external_id.as_ref()))?;
            let user_id = index.user(&external_id).ok_or_else(|| {
                RowError::new(
                    Some(&external_id),
                    RowErrorReason::UnknownUser,
                    format!("user {external_id} is not provisioned"),
                )
            })?;
            RowLinks::Membership { team_id, user_id }
        }
    };

    Ok(RowDraft {
        external_id,
        name,
        links,
        extra,
    })
}

fn orphaned(external_id: &ExternalId, parent_kind: &str, parent: Option<&ExternalId>) -> RowError {
    let message = match parent {
        Some(parent) => format!("{parent_kind} {parent} does not exist"),
        None => format!("no {parent_kind} given for {external_id}"),
    };
    RowError::new(Some(external_id), RowErrorReason::OrphanedParent, message)
}

#[cfg(test)]
#[path = "reconcile_tests.rs"]
mod tests;
