//! Typed permissions for the user-management layer.
//!
//! Replaces the old string-keyed `{ "permission": bool }` maps with a closed
//! set, so an unknown or misspelled permission is caught where it is parsed.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{error::Result, Error};

/// A capability a user may be granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Permission {
    ViewActivities,
    ManageActivities,
    ViewReports,
    ManageReports,
    ManageYearProject,
    ViewArchives,
    ManageArchives,
    ManageUsers,
}

impl Permission {
    pub const ALL: [Permission; 8] = [
        Permission::ViewActivities,
        Permission::ManageActivities,
        Permission::ViewReports,
        Permission::ManageReports,
        Permission::ManageYearProject,
        Permission::ViewArchives,
        Permission::ManageArchives,
        Permission::ManageUsers,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::ViewActivities => "viewActivities",
            Permission::ManageActivities => "manageActivities",
            Permission::ViewReports => "viewReports",
            Permission::ManageReports => "manageReports",
            Permission::ManageYearProject => "manageYearProject",
            Permission::ViewArchives => "viewArchives",
            Permission::ManageArchives => "manageArchives",
            Permission::ManageUsers => "manageUsers",
        }
    }

    fn bit(self) -> u16 {
        1 << (self as u16)
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Permission::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| Error::UnknownPermission(s.to_string()))
    }
}

/// A set of permissions, stored as a bit-set.
///
/// Serializes as the list of granted permission names.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<Permission>", into = "Vec<Permission>")]
pub struct PermissionSet(u16);

impl PermissionSet {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn all() -> Self {
        Permission::ALL.into_iter().collect()
    }

    /// Read-only access to everything except user management.
    pub fn viewer() -> Self {
        [
            Permission::ViewActivities,
            Permission::ViewReports,
            Permission::ViewArchives,
        ]
        .into_iter()
        .collect()
    }

    pub fn insert(&mut self, permission: Permission) {
        self.0 |= permission.bit();
    }

    pub fn remove(&mut self, permission: Permission) {
        self.0 &= !permission.bit();
    }

    pub fn contains(&self, permission: Permission) -> bool {
        self.0 & permission.bit() != 0
    }

    /// Check that every permission in `other` is granted here.
    pub fn contains_all(&self, other: PermissionSet) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Granted permissions in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = Permission> + '_ {
        Permission::ALL.into_iter().filter(|p| self.contains(*p))
    }

    /// Convert a legacy `{ "viewActivities": true, ... }` map.
    ///
    /// Keys set to `false` are ignored; unknown keys and non-boolean values
    /// are rejected.
    pub fn from_legacy_map(map: &Map<String, Value>) -> Result<Self> {
        let mut set = Self::empty();
        for (key, value) in map {
            let permission: Permission = key.parse()?;
            match value {
                Value::Bool(true) => set.insert(permission),
                Value::Bool(false) => {}
                other => {
                    return Err(Error::InvalidPayload(format!(
                        "permission '{}' must be a boolean, got {}",
                        key, other
                    )))
                }
            }
        }
        Ok(set)
    }

    /// Render as a legacy map with every known permission present.
    pub fn to_legacy_map(&self) -> Map<String, Value> {
        Permission::ALL
            .into_iter()
            .map(|p| (p.as_str().to_string(), Value::Bool(self.contains(p))))
            .collect()
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = Permission>>(iter: I) -> Self {
        let mut set = Self::empty();
        for permission in iter {
            set.insert(permission);
        }
        set
    }
}

impl From<Vec<Permission>> for PermissionSet {
    fn from(permissions: Vec<Permission>) -> Self {
        permissions.into_iter().collect()
    }
}

impl From<PermissionSet> for Vec<Permission> {
    fn from(set: PermissionSet) -> Self {
        set.iter().collect()
    }
}

impl fmt::Debug for PermissionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn insert_remove_contains() {
        let mut set = PermissionSet::empty();
        assert!(set.is_empty());

        set.insert(Permission::ManageReports);
        set.insert(Permission::ManageReports);
        assert!(set.contains(Permission::ManageReports));
        assert!(!set.contains(Permission::ManageUsers));
        assert_eq!(set.len(), 1);

        set.remove(Permission::ManageReports);
        assert!(set.is_empty());
    }

    #[test]
    fn all_and_viewer() {
        assert_eq!(PermissionSet::all().len(), Permission::ALL.len());
        assert!(PermissionSet::all().contains_all(PermissionSet::viewer()));
        assert!(!PermissionSet::viewer().contains(Permission::ManageActivities));
    }

    #[test]
    fn legacy_map_conversion() {
        let legacy = json!({
            "viewActivities": true,
            "manageActivities": false,
            "manageUsers": true
        });
        let set = PermissionSet::from_legacy_map(legacy.as_object().unwrap()).unwrap();

        assert_eq!(
            set.iter().collect::<Vec<_>>(),
            vec![Permission::ViewActivities, Permission::ManageUsers]
        );

        let back = set.to_legacy_map();
        assert_eq!(back.len(), Permission::ALL.len());
        assert_eq!(back["manageUsers"], json!(true));
        assert_eq!(back["viewReports"], json!(false));
    }

    #[test]
    fn legacy_map_rejects_typos() {
        let legacy = json!({"viewActivites": true});
        let result = PermissionSet::from_legacy_map(legacy.as_object().unwrap());
        assert_eq!(result, Err(Error::UnknownPermission("viewActivites".into())));
    }

    #[test]
    fn legacy_map_rejects_non_boolean() {
        let legacy = json!({"viewActivities": "yes"});
        assert!(matches!(
            PermissionSet::from_legacy_map(legacy.as_object().unwrap()),
            Err(Error::InvalidPayload(_))
        ));
    }

    #[test]
    fn serializes_as_name_list() {
        let set: PermissionSet = [Permission::ViewArchives, Permission::ManageArchives]
            .into_iter()
            .collect();
        let json = serde_json::to_value(set).unwrap();
        assert_eq!(json, json!(["viewArchives", "manageArchives"]));

        let parsed: PermissionSet = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, set);
    }
}
