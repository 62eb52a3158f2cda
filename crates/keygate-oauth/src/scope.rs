//! Scope catalog and scope sets.
//!
//! The catalog is the static registry of capability strings the platform
//! understands. Anything not listed here is dropped from grants rather than
//! rejected outright.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// Categories & catalog
// ============================================================================

/// Broad capability class a scope belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeCategory {
    Read,
    Write,
    Admin,
}

impl fmt::Display for ScopeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeCategory::Read => write!(f, "read"),
            ScopeCategory::Write => write!(f, "write"),
            ScopeCategory::Admin => write!(f, "admin"),
        }
    }
}

/// One entry of the scope catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScopeDefinition {
    pub name: &'static str,
    pub category: ScopeCategory,
    pub description: &'static str,
}

const CATALOG: &[ScopeDefinition] = &[
    ScopeDefinition {
        name: "api:read",
        category: ScopeCategory::Read,
        description: "Read access to the platform API",
    },
    ScopeDefinition {
        name: "api:write",
        category: ScopeCategory::Write,
        description: "Write access to the platform API",
    },
    ScopeDefinition {
        name: "websites:read",
        category: ScopeCategory::Read,
        description: "View websites and their settings",
    },
    ScopeDefinition {
        name: "websites:write",
        category: ScopeCategory::Write,
        description: "Create, update and delete websites",
    },
    ScopeDefinition {
        name: "campaigns:read",
        category: ScopeCategory::Read,
        description: "View traffic campaigns",
    },
    ScopeDefinition {
        name: "campaigns:write",
        category: ScopeCategory::Write,
        description: "Create and manage traffic campaigns",
    },
    ScopeDefinition {
        name: "analytics:read",
        category: ScopeCategory::Read,
        description: "Read aggregated analytics and reports",
    },
    ScopeDefinition {
        name: "webhooks:read",
        category: ScopeCategory::Read,
        description: "List webhook subscriptions",
    },
    ScopeDefinition {
        name: "webhooks:write",
        category: ScopeCategory::Write,
        description: "Create and delete webhook subscriptions",
    },
    ScopeDefinition {
        name: "admin",
        category: ScopeCategory::Admin,
        description: "Full administrative access to the account",
    },
];

/// All scopes the platform understands.
pub fn all() -> &'static [ScopeDefinition] {
    CATALOG
}

/// Human description of a scope, or `None` if the scope is unknown.
pub fn describe(name: &str) -> Option<&'static str> {
    CATALOG
        .iter()
        .find(|def| def.name == name)
        .map(|def| def.description)
}

/// Whether the catalog knows this scope.
pub fn is_known(name: &str) -> bool {
    describe(name).is_some()
}

/// Every scope in the given category.
pub fn by_category(category: ScopeCategory) -> ScopeSet {
    CATALOG
        .iter()
        .filter(|def| def.category == category)
        .map(|def| def.name)
        .collect()
}

/// Drop every scope the catalog does not know.
pub fn known(scopes: &ScopeSet) -> ScopeSet {
    scopes.iter().filter(|s| is_known(s)).collect()
}

// ============================================================================
// ScopeSet
// ============================================================================

/// An order-independent set of scope names.
///
/// Renders as the space-delimited `scope` parameter of RFC 6749 §3.3 and
/// serializes as a JSON array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopeSet(BTreeSet<String>);

impl ScopeSet {
    /// Create an empty scope set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a space-delimited scope string. Repeated whitespace is ignored.
    pub fn parse(raw: &str) -> Self {
        raw.split_whitespace().collect()
    }

    pub fn contains(&self, scope: &str) -> bool {
        self.0.contains(scope)
    }

    pub fn insert(&mut self, scope: impl Into<String>) -> bool {
        self.0.insert(scope.into())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Scopes present in both sets.
    pub fn intersection(&self, other: &ScopeSet) -> ScopeSet {
        ScopeSet(self.0.intersection(&other.0).cloned().collect())
    }

    pub fn is_subset(&self, other: &ScopeSet) -> bool {
        self.0.is_subset(&other.0)
    }
}

impl fmt::Display for ScopeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for scope in &self.0 {
            if !first {
                f.write_str(" ")?;
            }
            f.write_str(scope)?;
            first = false;
        }
        Ok(())
    }
}

impl<S: Into<String>> FromIterator<S> for ScopeSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        ScopeSet(iter.into_iter().map(Into::into).collect())
    }
}
