//! Roster records flowing through the sync pipeline.
//!
//! Source adapters normalise CMS rows into [`SourceRecord`]s. The reconciler
//! turns them into [`RowDraft`]s (datastore-shaped rows with resolved internal
//! references) and compares those against [`StoredRow`] snapshots.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Free-form string metadata carried alongside a record.
pub type ExtraFields = BTreeMap<String, String>;

/// Entity types synchronised by the pipeline, in dependency order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Clubs and leagues owning teams.
    Organizations,
    /// Teams owned by an organization.
    Teams,
    /// User/team/role links.
    Memberships,
}

impl EntityKind {
    /// Stage order for a full run.
    pub const PIPELINE: [Self; 3] = [Self::Organizations, Self::Teams, Self::Memberships];

    /// Lower-case label used in logs and CMS endpoint paths.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Organizations => "organizations",
            Self::Teams => "teams",
            Self::Memberships => "memberships",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validation errors for [`ExternalId`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExternalIdError {
    #[error("external identifier must not be blank")]
    Blank,
}

/// Identifier assigned by the CMS, stable across syncs.
///
/// Surrounding whitespace is trimmed; the remainder must be non-empty.
///
/// # Examples
/// ```
/// use roster_sync::domain::ExternalId;
///
/// let id = ExternalId::new(" 42 ").expect("valid id");
/// assert_eq!(id.as_str(), "42");
/// assert!(ExternalId::new("   ").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ExternalId(String);

impl ExternalId {
    pub fn new(raw: impl AsRef<str>) -> Result<Self, ExternalIdError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(ExternalIdError::Blank);
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for ExternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ExternalId {
    type Error = ExternalIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ExternalId> for String {
    fn from(value: ExternalId) -> Self {
        value.0
    }
}

/// A normalised record read from the CMS.
///
/// For memberships `external_id` names the user (CMS id or email),
/// `parent_external_id` the team and `name` the platform role label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRecord {
    pub external_id: ExternalId,
    pub name: String,
    pub parent_external_id: Option<ExternalId>,
    pub extra: ExtraFields,
}

impl SourceRecord {
    pub fn new(external_id: ExternalId, name: impl Into<String>) -> Self {
        Self {
            external_id,
            name: name.into(),
            parent_external_id: None,
            extra: ExtraFields::new(),
        }
    }

    #[must_use]
    pub fn with_parent(mut self, parent: ExternalId) -> Self {
        self.parent_external_id = Some(parent);
        self
    }

    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// Internal references a datastore row carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowLinks {
    /// Organizations reference nothing.
    Root,
    /// A team's owning organization.
    Organization { organization_id: Uuid },
    /// A membership's team and user.
    Membership { team_id: Uuid, user_id: Uuid },
}

/// How a row is matched between source and datastore.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MatchKey {
    External(ExternalId),
    Membership { team_id: Uuid, user_id: Uuid },
}

/// A datastore-shaped row produced by reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowDraft {
    /// Source identifier, kept for error reporting.
    pub external_id: ExternalId,
    pub name: String,
    pub links: RowLinks,
    pub extra: ExtraFields,
}

impl RowDraft {
    pub fn match_key(&self) -> MatchKey {
        match self.links {
            RowLinks::Membership { team_id, user_id } => MatchKey::Membership { team_id, user_id },
            RowLinks::Root | RowLinks::Organization { .. } => {
                MatchKey::External(self.external_id.clone())
            }
        }
    }

    /// Whether writing this draft over `stored` would change anything.
    ///
    /// The external identifier is the match key and is not compared.
    pub fn differs_from(&self, stored: &StoredRow) -> bool {
        self.name != stored.name || self.links != stored.links || self.extra != stored.extra
    }
}

/// A row as it currently exists in the datastore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRow {
    pub id: Uuid,
    pub key: MatchKey,
    pub name: String,
    pub links: RowLinks,
    pub extra: ExtraFields,
}

/// Identity fields of a platform user used to resolve membership rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRef {
    pub id: Uuid,
    pub external_id: Option<String>,
    pub email: Option<String>,
}

/// Current row totals reported by the status endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RosterCounts {
    pub organizations: u64,
    pub teams: u64,
    pub team_memberships: u64,
}
