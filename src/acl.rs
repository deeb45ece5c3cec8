//! CIFS share ACL entries
//!
//! One entry grants a permission to a user or group on a share. Entries are
//! identified by `(user_or_group, type)`; the permission is the only mutable
//! attribute.

use declarative::{DefaultEntryPolicy, Entry};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Principal that ONTAP grants full control on every new share
pub const DEFAULT_PRINCIPAL: &str = "Everyone";

/// Kind of principal an ACL entry names
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AclType {
    #[default]
    Windows,
    UnixUser,
    UnixGroup,
}

impl AclType {
    /// Name used by the ONTAP REST API
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Windows => "windows",
            Self::UnixUser => "unix_user",
            Self::UnixGroup => "unix_group",
        }
    }
}

impl fmt::Display for AclType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Access right granted on a share
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    FullControl,
    Read,
    Change,
    NoAccess,
}

impl Permission {
    /// Name used by the ONTAP REST API
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FullControl => "full_control",
            Self::Read => "read",
            Self::Change => "change",
            Self::NoAccess => "no_access",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of an ACL entry
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AclKey {
    pub user_or_group: String,
    pub acl_type: AclType,
}

impl fmt::Display for AclKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.user_or_group, self.acl_type)
    }
}

/// One grant in a CIFS share's access control list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclEntry {
    pub user_or_group: String,
    #[serde(rename = "type", default)]
    pub acl_type: AclType,
    pub permission: Permission,
}

impl AclEntry {
    pub fn new(user_or_group: impl Into<String>, acl_type: AclType, permission: Permission) -> Self {
        Self {
            user_or_group: user_or_group.into(),
            acl_type,
            permission,
        }
    }
}

impl Entry for AclEntry {
    type Key = AclKey;
    type Attributes = Permission;

    fn key(&self) -> AclKey {
        AclKey {
            user_or_group: self.user_or_group.clone(),
            acl_type: self.acl_type,
        }
    }

    fn attributes(&self) -> Permission {
        self.permission
    }

    fn from_parts(key: AclKey, permission: Permission) -> Self {
        Self {
            user_or_group: key.user_or_group,
            acl_type: key.acl_type,
            permission,
        }
    }
}

/// The entry ONTAP adds to a share created without an explicit Everyone grant
pub fn default_entry() -> AclEntry {
    AclEntry::new(DEFAULT_PRINCIPAL, AclType::Windows, Permission::FullControl)
}

/// Default-entry policy for CIFS share ACLs
pub fn share_policy() -> DefaultEntryPolicy<AclEntry> {
    DefaultEntryPolicy::new(default_entry())
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::{reconcile, Collection, DeleteReason, Operation};

    #[test]
    fn test_entry_deserializes_with_default_type() {
        let entry: AclEntry =
            toml::from_str("user_or_group = 'BUILTIN\\Administrators'\npermission = 'read'")
                .unwrap();
        assert_eq!(entry.acl_type, AclType::Windows);
        assert_eq!(entry.permission, Permission::Read);
        assert_eq!(entry.user_or_group, "BUILTIN\\Administrators");
    }

    #[test]
    fn test_entry_json_uses_ontap_field_names() {
        let entry = AclEntry::new("staff", AclType::UnixGroup, Permission::NoAccess);
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "user_or_group": "staff",
                "type": "unix_group",
                "permission": "no_access"
            })
        );
    }

    #[test]
    fn test_key_includes_type() {
        let windows = AclEntry::new("staff", AclType::Windows, Permission::Read);
        let unix = AclEntry::new("staff", AclType::UnixGroup, Permission::Read);
        assert_ne!(windows.key(), unix.key());
    }

    #[test]
    fn test_share_policy_suppresses_everyone() {
        let applied = Collection::from_entries([default_entry()]);
        let plan = reconcile(&Collection::new(), &applied, &share_policy()).unwrap();

        assert_eq!(
            plan.operations(),
            &[Operation::Delete {
                key: default_entry().key(),
                reason: DeleteReason::SuppressDefault,
            }]
        );
    }

    #[test]
    fn test_permission_change_is_an_update() {
        let desired = Collection::from_entries([AclEntry::new(
            "BUILTIN\\Administrators",
            AclType::Windows,
            Permission::FullControl,
        )]);
        let applied = Collection::from_entries([AclEntry::new(
            "BUILTIN\\Administrators",
            AclType::Windows,
            Permission::Read,
        )]);

        let plan = reconcile(&desired, &applied, &share_policy()).unwrap();
        assert_eq!(plan.summary().updates, 1);
        assert_eq!(plan.len(), 1);
    }
}
