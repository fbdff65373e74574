//! Conventions of the CMS export format.
//!
//! Team exports list members in `learndash_group_users_*` columns holding
//! PHP-serialised integer arrays such as `a:2:{i:0;i:42;i:1;i:7;}`.

/// Column prefix carrying serialised member lists.
pub const MEMBER_COLUMN_PREFIX: &str = "learndash_group_users_";

/// Role label given to members with no CMS role.
pub const DEFAULT_MEMBER_ROLE: &str = "player";

/// Whether `column` holds a serialised member list.
pub fn is_member_column(column: &str) -> bool {
    column
        .trim()
        .to_ascii_lowercase()
        .starts_with(MEMBER_COLUMN_PREFIX)
}

/// Extract the user ids from a PHP-serialised integer array.
///
/// Only `i:<index>;i:<value>;` entries are read; anything else in the blob is
/// ignored, so truncated exports still yield the ids present.
///
/// # Examples
/// ```
/// use roster_sync::domain::cms_conventions::parse_member_ids;
///
/// assert_eq!(parse_member_ids("a:2:{i:0;i:42;i:1;i:7;}"), vec!["42", "7"]);
/// assert!(parse_member_ids("").is_empty());
/// ```
pub fn parse_member_ids(serialised: &str) -> Vec<String> {
    let mut ids = Vec::new();
    let mut rest = serialised;
    while let Some(start) = rest.find("i:") {
        rest = rest.get(start + 2..).unwrap_or_default();
        let Some((_, after_index)) = take_digits(rest) else {
            continue;
        };
        let Some(value_part) = after_index.strip_prefix(";i:") else {
            continue;
        };
        let Some((value, after_value)) = take_digits(value_part) else {
            continue;
        };
        if !after_value.starts_with(';') {
            continue;
        }
        ids.push(value.to_owned());
        rest = after_value;
    }
    ids
}

fn take_digits(input: &str) -> Option<(&str, &str)> {
    let end = input
        .char_indices()
        .find(|(_, ch)| !ch.is_ascii_digit())
        .map_or(input.len(), |(idx, _)| idx);
    if end == 0 {
        return None;
    }
    Some((input.get(..end)?, input.get(end..)?))
}

/// Map a CMS role name onto a platform role label.
///
/// # Examples
/// ```
/// use roster_sync::domain::cms_conventions::map_member_role;
///
/// assert_eq!(map_member_role(Some("Assistant Coach")), "assistant_coach");
/// assert_eq!(map_member_role(Some("group_leader_admin")), "head_coach");
/// assert_eq!(map_member_role(None), "player");
/// ```
pub fn map_member_role(raw: Option<&str>) -> &'static str {
    let Some(raw) = raw.map(str::trim).filter(|role| !role.is_empty()) else {
        return DEFAULT_MEMBER_ROLE;
    };
    let lowered = raw.to_ascii_lowercase();
    if lowered.contains("assistant") {
        "assistant_coach"
    } else if lowered.contains("admin") || lowered.contains("coach") {
        "head_coach"
    } else {
        DEFAULT_MEMBER_ROLE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("a:0:{}", &[])]
    #[case("a:1:{i:0;i:42;}", &["42"])]
    #[case("a:3:{i:0;i:5;i:1;i:6;i:2;i:7;}", &["5", "6", "7"])]
    #[case("a:2:{i:0;i:5;i:1;s:3:\"abc\";}", &["5"])]
    #[case("a:2:{i:0;i:5;i:1;i:", &["5"])]
    #[case("not serialised", &[])]
    fn parses_member_blobs(#[case] blob: &str, #[case] expected: &[&str]) {
        assert_eq!(parse_member_ids(blob), expected);
    }

    #[rstest]
    #[case(Some("Player"), "player")]
    #[case(Some("head coach"), "head_coach")]
    #[case(Some("ASSISTANT_COACH"), "assistant_coach")]
    #[case(Some("administrator"), "head_coach")]
    #[case(Some("   "), "player")]
    #[case(Some("parent"), "player")]
    fn maps_cms_roles(#[case] raw: Option<&str>, #[case] expected: &str) {
        assert_eq!(map_member_role(raw), expected);
    }

    #[rstest]
    #[case("learndash_group_users_1234", true)]
    #[case("LearnDash_Group_Users_9", true)]
    #[case("learndash_group_leaders_9", false)]
    fn recognises_member_columns(#[case] column: &str, #[case] expected: bool) {
        assert_eq!(is_member_column(column), expected);
    }
}
