//! Normalisation of raw CMS rows into [`SourceRecord`]s.
//!
//! CSV exports and REST payloads both arrive as loosely named columns. This
//! module owns the header aliases so every source adapter agrees on them.

use std::collections::HashSet;

use super::cms_conventions::{is_member_column, map_member_role, parse_member_ids};
use super::roster::{EntityKind, ExternalId, ExtraFields, SourceRecord};
use super::sync_run::RowError;

const ID_COLUMNS: &[&str] = &["id", "external_id", "externalid"];
const NAME_COLUMNS: &[&str] = &["title", "name"];
const PARENT_COLUMNS: &[&str] = &["organization", "organization_id", "parent", "parent_id"];
const USER_COLUMNS: &[&str] = &["user", "user_id", "email", "username"];
const TEAM_COLUMNS: &[&str] = &["team", "team_id", "group", "group_id"];
const ROLE_COLUMNS: &[&str] = &["role"];

/// One row as read from the CMS, columns in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    /// One-based data row number, used in error messages.
    pub position: usize,
    pub fields: Vec<(String, String)>,
}

impl RawRow {
    pub fn new(position: usize) -> Self {
        Self {
            position,
            fields: Vec::new(),
        }
    }

    #[must_use]
    pub fn with(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((column.into(), value.into()));
        self
    }

    /// First non-blank value among `aliases`, compared case-insensitively.
    fn lookup(&self, aliases: &[&str]) -> Option<&str> {
        aliases.iter().find_map(|alias| {
            self.fields
                .iter()
                .filter(|(column, _)| column.trim().eq_ignore_ascii_case(alias))
                .map(|(_, value)| value.trim())
                .find(|value| !value.is_empty())
        })
    }

    fn has_member_columns(&self) -> bool {
        self.fields.iter().any(|(column, _)| is_member_column(column))
    }
}

/// Knobs applied while normalising.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormaliseOptions {
    /// Organization assigned to teams whose row names no parent.
    pub default_organization: Option<ExternalId>,
}

/// Records and row-level rejections produced by a source read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceBatch {
    pub records: Vec<SourceRecord>,
    pub rejected: Vec<RowError>,
}

impl SourceBatch {
    /// Number of candidate records seen, accepted or not.
    pub fn processed(&self) -> u64 {
        (self.records.len() + self.rejected.len()) as u64
    }
}

/// Normalise `rows` for `kind`.
///
/// # Examples
/// ```
/// use roster_sync::domain::source_rows::{NormaliseOptions, RawRow, normalise_rows};
/// use roster_sync::domain::EntityKind;
///
/// let rows = vec![RawRow::new(1).with("ID", "org-1").with("Title", "Lakeside")];
/// let batch = normalise_rows(EntityKind::Organizations, rows, &NormaliseOptions::default());
/// assert_eq!(batch.records[0].name, "Lakeside");
/// ```
pub fn normalise_rows(
    kind: EntityKind,
    rows: impl IntoIterator<Item = RawRow>,
    options: &NormaliseOptions,
) -> SourceBatch {
    let mut batch = SourceBatch::default();
    match kind {
        EntityKind::Organizations => {
            for row in rows {
                push(&mut batch, normalise_entity(&row, None));
            }
        }
        EntityKind::Teams => {
            for row in rows {
                push(
                    &mut batch,
                    normalise_entity(&row, Some(options.default_organization.as_ref())),
                );
            }
        }
        EntityKind::Memberships => {
            let rows: Vec<RawRow> = rows.into_iter().collect();
            // One dialect per export: a team export's rows may be ragged and
            // lose their member cells.
            let team_export = rows.iter().any(RawRow::has_member_columns);
            for row in &rows {
                if team_export {
                    normalise_team_members(row, &mut batch);
                } else {
                    normalise_membership_row(row, &mut batch);
                }
            }
        }
    }
    batch
}

fn push(batch: &mut SourceBatch, result: Result<SourceRecord, RowError>) {
    match result {
        Ok(record) => batch.records.push(record),
        Err(error) => batch.rejected.push(error),
    }
}

/// `parent_fallback` is `None` for organizations and `Some(default)` for teams.
fn normalise_entity(
    row: &RawRow,
    parent_fallback: Option<Option<&ExternalId>>,
) -> Result<SourceRecord, RowError> {
    let external_id = required_id(row, ID_COLUMNS, "external identifier")?;
    let name = row.lookup(NAME_COLUMNS).ok_or_else(|| {
        RowError::malformed(
            Some(&external_id),
            format!("row {}: missing name", row.position),
        )
    })?;

    let mut record = SourceRecord::new(external_id, name);
    if let Some(fallback) = parent_fallback {
        record.parent_external_id = row
            .lookup(PARENT_COLUMNS)
            .and_then(|raw| ExternalId::new(raw).ok())
            .or_else(|| fallback.cloned());
    }
    record.extra = extra_fields(row);
    Ok(record)
}

fn extra_fields(row: &RawRow) -> ExtraFields {
    let reserved: Vec<&str> = ID_COLUMNS
        .iter()
        .chain(NAME_COLUMNS)
        .chain(PARENT_COLUMNS)
        .copied()
        .collect();
    row.fields
        .iter()
        .filter(|(column, value)| {
            let column = column.trim();
            !value.trim().is_empty()
                && !column.is_empty()
                && !is_member_column(column)
                && !reserved
                    .iter()
                    .any(|alias| column.eq_ignore_ascii_case(alias))
        })
        .map(|(column, value)| (column.trim().to_lowercase(), value.trim().to_owned()))
        .collect()
}

fn required_id(row: &RawRow, aliases: &[&str], what: &str) -> Result<ExternalId, RowError> {
    row.lookup(aliases)
        .and_then(|raw| ExternalId::new(raw).ok())
        .ok_or_else(|| RowError::malformed(None, format!("row {}: missing {what}", row.position)))
}

/// Team-export row: every id in its member columns becomes a membership.
fn normalise_team_members(row: &RawRow, batch: &mut SourceBatch) {
    let role = map_member_role(row.lookup(ROLE_COLUMNS));
    let team = match required_id(row, ID_COLUMNS, "team identifier") {
        Ok(team) => team,
        Err(error) => {
            batch.rejected.push(error);
            return;
        }
    };
    let mut seen = HashSet::new();
    let member_ids = row
        .fields
        .iter()
        .filter(|(column, _)| is_member_column(column))
        .flat_map(|(_, blob)| parse_member_ids(blob));
    for user in member_ids {
        if !seen.insert(user.clone()) {
            continue;
        }
        if let Ok(user) = ExternalId::new(&user) {
            batch
                .records
                .push(SourceRecord::new(user, role).with_parent(team.clone()));
        }
    }
}

/// Membership-export row naming one user and one team.
fn normalise_membership_row(row: &RawRow, batch: &mut SourceBatch) {
    let role = map_member_role(row.lookup(ROLE_COLUMNS));
    let user = required_id(row, USER_COLUMNS, "user reference");
    let team = required_id(row, TEAM_COLUMNS, "team reference");
    match (user, team) {
        (Ok(user), Ok(team)) => batch
            .records
            .push(SourceRecord::new(user, role).with_parent(team)),
        (Err(error), _) | (_, Err(error)) => batch.rejected.push(error),
    }
}
