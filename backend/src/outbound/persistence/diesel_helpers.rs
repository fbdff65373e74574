//! Shared helpers for the Diesel adapters.
//!
//! Covers error mapping from pool and Diesel failures into port errors, the
//! JSONB encoding of extra CMS fields, and count casts between the domain's
//! unsigned counters and PostgreSQL `BIGINT`.

use serde_json::{Map, Value};
use tracing::debug;

use crate::domain::ExtraFields;
use crate::domain::ports::RosterStoreError;

use super::pool::PoolError;

/// Extract a readable message from a pool error.
pub fn pool_error_message(error: PoolError) -> String {
    match error {
        PoolError::Checkout { message } | PoolError::Build { message } => message,
    }
}

fn log_diesel_error(error: &diesel::result::Error) {
    use diesel::result::Error as DieselError;

    match error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "diesel operation failed");
        }
        _ => debug!(
            error_type = %std::any::type_name_of_val(error),
            "diesel operation failed"
        ),
    }
}

/// Map common Diesel error variants into query/connection constructors.
pub fn map_basic_diesel_error<E, Q, C>(error: diesel::result::Error, query: Q, connection: C) -> E
where
    Q: Fn(String) -> E,
    C: Fn(String) -> E,
{
    use diesel::result::{DatabaseErrorKind, Error as DieselError};

    log_diesel_error(&error);
    match error {
        DieselError::NotFound => query("record not found".to_owned()),
        DieselError::QueryBuilderError(_) => query("database query error".to_owned()),
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            connection("database connection error".to_owned())
        }
        DieselError::DatabaseError(_, info) => query(info.message().to_owned()),
        other => query(other.to_string()),
    }
}

/// Map Diesel errors for roster writes, separating constraint violations so
/// the writer can isolate the offending row.
pub fn map_roster_diesel_error(error: diesel::result::Error) -> RosterStoreError {
    use diesel::result::{DatabaseErrorKind, Error as DieselError};

    match &error {
        DieselError::DatabaseError(
            DatabaseErrorKind::UniqueViolation
            | DatabaseErrorKind::ForeignKeyViolation
            | DatabaseErrorKind::NotNullViolation
            | DatabaseErrorKind::CheckViolation,
            info,
        ) => {
            log_diesel_error(&error);
            let message = match info.constraint_name() {
                Some(constraint) => format!("{} ({constraint})", info.message()),
                None => info.message().to_owned(),
            };
            RosterStoreError::constraint(message)
        }
        _ => map_basic_diesel_error(error, RosterStoreError::query, RosterStoreError::connection),
    }
}

/// Map pool checkout failures for the roster store.
pub fn map_roster_pool_error(error: PoolError) -> RosterStoreError {
    RosterStoreError::connection(pool_error_message(error))
}

/// Encode extra CMS fields as a flat JSON object.
pub fn extra_to_json(extra: &ExtraFields) -> Value {
    Value::Object(
        extra
            .iter()
            .map(|(key, value)| (key.clone(), Value::String(value.clone())))
            .collect::<Map<_, _>>(),
    )
}

/// Decode a metadata column back into extra fields.
///
/// Non-string scalars are kept in their JSON text form; `null` entries and
/// non-object documents are dropped.
pub fn json_to_extra(metadata: Value) -> ExtraFields {
    let Value::Object(map) = metadata else {
        return ExtraFields::new();
    };
    map.into_iter()
        .filter_map(|(key, value)| match value {
            Value::String(text) => Some((key, text)),
            Value::Null => None,
            other => Some((key, other.to_string())),
        })
        .collect()
}

/// Cast a domain counter to `BIGINT`, saturating at `i64::MAX`.
pub fn count_for_db(count: u64) -> i64 {
    i64::try_from(count).unwrap_or(i64::MAX)
}

/// Cast a `BIGINT` counter to the domain, treating negatives as zero.
pub fn count_from_db(count: i64) -> u64 {
    u64::try_from(count).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    fn extra_fields_round_trip_through_json() {
        let extra: ExtraFields = [
            ("slug".to_owned(), "u12-girls".to_owned()),
            ("level".to_owned(), "A".to_owned()),
        ]
        .into_iter()
        .collect();

        let encoded = extra_to_json(&extra);
        assert_eq!(encoded, json!({"level": "A", "slug": "u12-girls"}));
        assert_eq!(json_to_extra(encoded), extra);
    }

    #[rstest]
    fn non_string_metadata_is_rendered_as_text() {
        let extra = json_to_extra(json!({"season": 2025, "active": true, "note": null}));
        assert_eq!(extra.get("season").map(String::as_str), Some("2025"));
        assert_eq!(extra.get("active").map(String::as_str), Some("true"));
        assert!(!extra.contains_key("note"));
    }

    #[rstest]
    fn non_object_metadata_decodes_to_nothing() {
        assert!(json_to_extra(json!(["a", "b"])).is_empty());
    }

    #[rstest]
    #[case(0, 0)]
    #[case(42, 42)]
    #[case(-3, 0)]
    fn counts_from_db_never_go_negative(#[case] raw: i64, #[case] expected: u64) {
        assert_eq!(count_from_db(raw), expected);
    }

    #[rstest]
    fn oversized_counts_saturate() {
        assert_eq!(count_for_db(u64::MAX), i64::MAX);
    }

    #[rstest]
    fn not_found_maps_to_query_error() {
        let error = map_roster_diesel_error(diesel::result::Error::NotFound);
        assert_eq!(error, RosterStoreError::query("record not found"));
    }

    #[rstest]
    fn pool_failures_are_connection_errors() {
        let error = map_roster_pool_error(PoolError::checkout("timed out"));
        assert!(error.is_unrecoverable());
    }
}
