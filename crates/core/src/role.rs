//! Role records as persisted in the store.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Entity, RoleId};

/// Stored permission payload: resource name → action names.
///
/// This is the raw JSON shape kept on each role row, e.g.
/// `{"client": ["read", "create"]}`. The auth crate compiles it into typed
/// resources/actions when the stored payload is used as the policy source.
pub type PermissionMap = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRecord {
    pub id: RoleId,
    pub name: String,
    #[serde(default)]
    pub permissions: PermissionMap,
}

impl Entity for RoleRecord {
    type Id = RoleId;

    fn id(&self) -> RoleId {
        self.id
    }
}
