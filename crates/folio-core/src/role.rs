//! Roles
//!
//! The role set is closed. Each slug maps to a stable numeric id and a display
//! name through a private static table; callers go through the lookup
//! functions below. Authorization compares slugs, never ids.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleSlug {
    Na,
    Admin,
    Moderator,
    Member,
    Guest,
}

struct RoleEntry {
    slug: RoleSlug,
    id: i64,
    name: &'static str,
    key: &'static str,
}

static ROLE_TABLE: [RoleEntry; 5] = [
    RoleEntry { slug: RoleSlug::Na, id: 0, name: "N/A", key: "na" },
    RoleEntry { slug: RoleSlug::Admin, id: 1, name: "Administrator", key: "admin" },
    RoleEntry { slug: RoleSlug::Moderator, id: 2, name: "Moderator", key: "moderator" },
    RoleEntry { slug: RoleSlug::Member, id: 3, name: "Member", key: "member" },
    RoleEntry { slug: RoleSlug::Guest, id: 4, name: "Guest", key: "guest" },
];

impl RoleSlug {
    fn entry(self) -> &'static RoleEntry {
        // Table order follows the enum discriminants.
        &ROLE_TABLE[self as usize]
    }

    pub fn as_str(self) -> &'static str {
        self.entry().key
    }

    /// Stable numeric id, for ordering and display
    pub fn id(self) -> i64 {
        self.entry().id
    }

    pub fn display_name(self) -> &'static str {
        self.entry().name
    }

    /// Case-insensitive slug lookup
    pub fn from_slug(slug: &str) -> Option<Self> {
        let slug = slug.trim();
        ROLE_TABLE
            .iter()
            .find(|e| e.key.eq_ignore_ascii_case(slug))
            .map(|e| e.slug)
    }

    pub fn from_id(id: i64) -> Option<Self> {
        ROLE_TABLE.iter().find(|e| e.id == id).map(|e| e.slug)
    }

    pub fn all() -> impl Iterator<Item = RoleSlug> {
        ROLE_TABLE.iter().map(|e| e.slug)
    }
}

impl fmt::Display for RoleSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolve free-form slugs to the known set.
///
/// Unknown slugs are dropped, duplicates collapse, and the result is ordered
/// by role id.
pub fn resolve_slugs<I, S>(slugs: I) -> Vec<RoleSlug>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    slugs
        .into_iter()
        .filter_map(|s| RoleSlug::from_slug(s.as_ref()))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Stored role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: i64,
    pub name: String,
    pub slug: RoleSlug,
    pub created_at: DateTime<Utc>,
}

impl Role {
    /// Role row as seeded from the static table
    pub fn from_slug(slug: RoleSlug, created_at: DateTime<Utc>) -> Self {
        Self {
            id: slug.id(),
            name: slug.display_name().to_string(),
            slug,
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_table_matches_discriminants() {
        for (index, slug) in RoleSlug::all().enumerate() {
            assert_eq!(slug as usize, index);
            assert_eq!(slug.id(), index as i64);
        }
    }

    #[test]
    fn test_lookup() {
        assert_eq!(RoleSlug::from_slug("admin"), Some(RoleSlug::Admin));
        assert_eq!(RoleSlug::from_slug(" Member "), Some(RoleSlug::Member));
        assert_eq!(RoleSlug::from_slug("root"), None);
        assert_eq!(RoleSlug::from_id(4), Some(RoleSlug::Guest));
        assert_eq!(RoleSlug::from_id(9), None);
        assert_eq!(RoleSlug::Moderator.display_name(), "Moderator");
    }

    #[test]
    fn test_resolve_drops_unknown_and_duplicates() {
        let resolved = resolve_slugs(["member", "admin", "superuser", "admin"]);
        assert_eq!(resolved, vec![RoleSlug::Admin, RoleSlug::Member]);
        assert!(resolve_slugs(Vec::<String>::new()).is_empty());
    }

    #[test]
    fn test_serde_uses_slug() {
        let json = serde_json::to_string(&RoleSlug::Admin).unwrap();
        assert_eq!(json, "\"admin\"");
        let slug: RoleSlug = serde_json::from_str("\"guest\"").unwrap();
        assert_eq!(slug, RoleSlug::Guest);
    }

    proptest! {
        #[test]
        fn prop_slug_round_trips(index in 0usize..5) {
            let slug = RoleSlug::all().nth(index).unwrap();
            prop_assert_eq!(RoleSlug::from_slug(slug.as_str()), Some(slug));
            prop_assert_eq!(RoleSlug::from_id(slug.id()), Some(slug));
        }

        #[test]
        fn prop_resolve_is_sorted_and_unique(input in proptest::collection::vec("[a-z]{1,10}", 0..12)) {
            let resolved = resolve_slugs(&input);
            prop_assert!(resolved.windows(2).all(|w| w[0] < w[1]));
            for slug in &resolved {
                prop_assert!(input.iter().any(|s| s == slug.as_str()));
            }
        }
    }
}
