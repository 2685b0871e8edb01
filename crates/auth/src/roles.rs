use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Role identifier used for RBAC.
///
/// Roles stay opaque strings at this layer: a token may carry a role name the
/// policy has never heard of, and such a role is simply granted nothing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    /// Management staff.
    pub const GESTION: Role = Role(Cow::Borrowed("gestion"));
    /// Sales staff owning clients and contracts.
    pub const COMMERCIAL: Role = Role(Cow::Borrowed("commercial"));
    /// Support staff running events.
    pub const SUPPORT: Role = Role(Cow::Borrowed("support"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Role {
    fn from(value: &str) -> Self {
        Self(Cow::Owned(value.to_string()))
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        Self(Cow::Owned(value))
    }
}

/// The fixed role catalog, as configured at process start.
///
/// The ownership rules are phrased in terms of "the management role", "the
/// sales role" and "the support role"; this maps those slots to role names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleCatalog {
    pub management: Role,
    pub sales: Role,
    pub support: Role,
}

impl RoleCatalog {
    pub fn all(&self) -> [&Role; 3] {
        [&self.management, &self.sales, &self.support]
    }

    pub fn contains(&self, role: &Role) -> bool {
        self.all().contains(&role)
    }

    pub fn description(&self, role: &Role) -> Option<&'static str> {
        if role == &self.management {
            Some("Management: staff accounts, contracts, event assignment")
        } else if role == &self.sales {
            Some("Sales: owns clients and their contracts, requests events")
        } else if role == &self.support {
            Some("Support: runs the events assigned to them")
        } else {
            None
        }
    }
}

impl Default for RoleCatalog {
    fn default() -> Self {
        Self {
            management: Role::GESTION,
            sales: Role::COMMERCIAL,
            support: Role::SUPPORT,
        }
    }
}
