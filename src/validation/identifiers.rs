//! Platform-compliant identifier rules
//!
//! The data-modeling platform constrains spaces, external ids, and
//! property names. Conceptual models need not be compliant (violations
//! are warnings there), but a physical model must be deployable, so the
//! same patterns are errors on that side.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::physical::{MAX_EXTERNAL_ID_LENGTH, MAX_SPACE_LENGTH};

static SPACE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9_-]{0,42}$").unwrap());

static EXTERNAL_ID_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z]([a-zA-Z0-9_]{0,253}[a-zA-Z0-9])?$").unwrap());

static PROPERTY_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9_]{0,253}$").unwrap());

/// Property names the platform reserves for instance bookkeeping.
pub const RESERVED_PROPERTIES: &[&str] = &[
    "space",
    "externalId",
    "createdTime",
    "lastUpdatedTime",
    "deletedTime",
    "edge_id",
    "node_id",
    "project_id",
    "property_group",
    "seq",
    "tg_table_name",
    "extensions",
];

/// Spaces the platform reserves for system resources.
pub const RESERVED_SPACES: &[&str] = &["space", "cdf", "dms", "pg3", "shared", "system", "node", "edge"];

pub fn is_compliant_space(space: &str) -> bool {
    SPACE_REGEX.is_match(space) && !RESERVED_SPACES.contains(&space)
}

pub fn is_compliant_external_id(external_id: &str) -> bool {
    EXTERNAL_ID_REGEX.is_match(external_id)
}

pub fn is_compliant_property(property: &str) -> bool {
    PROPERTY_REGEX.is_match(property) && !RESERVED_PROPERTIES.contains(&property)
}

pub fn exceeds_external_id_length(external_id: &str) -> bool {
    external_id.len() > MAX_EXTERNAL_ID_LENGTH
}

pub fn exceeds_space_length(space: &str) -> bool {
    space.len() > MAX_SPACE_LENGTH
}

/// Index tags are `name` or `name:kind` with kind in the supported set.
pub fn index_kind(tag: &str) -> Option<&str> {
    Some(tag.split_once(':').map_or("btree", |(_, kind)| kind.trim()))
}

pub const SUPPORTED_INDEX_KINDS: &[&str] = &["btree", "inverted"];

/// Constraint tags are `kind:argument`, e.g. `unique:name` or
/// `requires:power:Asset`.
pub fn constraint_kind(tag: &str) -> &str {
    tag.split_once(':').map_or(tag, |(kind, _)| kind).trim()
}

pub const SUPPORTED_CONSTRAINT_KINDS: &[&str] = &["unique", "requires"];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_space_rules() {
        assert!(is_compliant_space("power"));
        assert!(is_compliant_space("power-grid_2"));
        assert!(!is_compliant_space("1power"));
        assert!(!is_compliant_space("cdf"));
        assert!(!is_compliant_space(&"x".repeat(44)));
    }

    #[test]
    fn test_property_rules() {
        assert!(is_compliant_property("ratedPower"));
        assert!(!is_compliant_property("rated power"));
        assert!(!is_compliant_property("externalId"));
        assert!(!is_compliant_property("3phase"));
    }

    #[test]
    fn test_index_and_constraint_kinds() {
        assert_eq!(index_kind("name"), Some("btree"));
        assert_eq!(index_kind("name:inverted"), Some("inverted"));
        assert_eq!(constraint_kind("unique:name"), "unique");
        assert_eq!(constraint_kind("requires:power:Asset"), "requires");
    }
}
