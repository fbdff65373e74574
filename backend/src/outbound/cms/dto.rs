//! DTOs for decoding CMS collection pages.
//!
//! Items are loose JSON objects. Scalars become string columns, WordPress
//! `{ "rendered": ... }` objects collapse to their text, and integer arrays are
//! re-encoded in the serialised form used by CSV exports.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::domain::source_rows::RawRow;

#[derive(Debug, Deserialize)]
#[serde(transparent)]
pub(super) struct CmsPageDto {
    pub(super) items: Vec<CmsItemDto>,
}

#[derive(Debug, Deserialize)]
#[serde(transparent)]
pub(super) struct CmsItemDto {
    fields: Map<String, Value>,
}

impl CmsItemDto {
    pub(super) fn into_raw_row(self, position: usize) -> RawRow {
        RawRow {
            position,
            fields: self
                .fields
                .into_iter()
                .filter_map(|(column, value)| column_text(&value).map(|text| (column, text)))
                .collect(),
        }
    }
}

fn column_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Object(object) => object
            .get("rendered")
            .and_then(Value::as_str)
            .map(str::to_owned),
        Value::Array(items) => serialise_int_array(items),
        Value::Null => None,
    }
}

/// Encode `[42, 7]` as `a:2:{i:0;i:42;i:1;i:7;}`.
fn serialise_int_array(items: &[Value]) -> Option<String> {
    let ids: Vec<String> = items
        .iter()
        .map(|item| match item {
            Value::Number(number) if number.is_u64() => Some(number.to_string()),
            Value::String(text) if text.chars().all(|ch| ch.is_ascii_digit()) && !text.is_empty() => {
                Some(text.clone())
            }
            _ => None,
        })
        .collect::<Option<_>>()?;
    let entries: String = ids
        .iter()
        .enumerate()
        .map(|(index, id)| format!("i:{index};i:{id};"))
        .collect();
    Some(format!("a:{}:{{{entries}}}", ids.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn decode(value: Value) -> RawRow {
        let item: CmsItemDto = serde_json::from_value(value).expect("item decodes");
        item.into_raw_row(1)
    }

    fn column<'a>(row: &'a RawRow, name: &str) -> Option<&'a str> {
        row.fields
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, value)| value.as_str())
    }

    #[rstest]
    fn numeric_ids_and_rendered_titles_become_text() {
        let row = decode(json!({
            "id": 101,
            "title": { "rendered": "U12 Blue" },
            "parent": "org-1",
            "featured": null
        }));
        assert_eq!(column(&row, "id"), Some("101"));
        assert_eq!(column(&row, "title"), Some("U12 Blue"));
        assert_eq!(column(&row, "parent"), Some("org-1"));
        assert_eq!(column(&row, "featured"), None);
    }

    #[rstest]
    fn member_arrays_are_serialised() {
        let row = decode(json!({ "id": 1, "learndash_group_users_1": [42, "7"] }));
        assert_eq!(
            column(&row, "learndash_group_users_1"),
            Some("a:2:{i:0;i:42;i:1;i:7;}")
        );
    }

    #[rstest]
    fn mixed_arrays_are_dropped() {
        let row = decode(json!({ "id": 1, "tags": ["a", 2] }));
        assert_eq!(column(&row, "tags"), None);
    }
}
