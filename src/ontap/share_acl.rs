//! Share ACL gateway - one CIFS share's ACL as a sub-resource collection.

use super::client::RestClient;
use super::error::{ClientError, Result};
use crate::acl::{AclEntry, AclKey, Permission};
use declarative::{Collection, Entry, GatewayResult, SubResourceGateway};
use serde_json::{Value, json};

/// Fields requested when listing ACL entries.
const ACL_FIELDS: &str = "user_or_group,type,permission";

/// Gateway over `/protocols/cifs/shares/{svm.uuid}/{share}/acls`.
pub struct ShareAclGateway {
    client: RestClient,
    svm_uuid: String,
    share: String,
}

impl ShareAclGateway {
    /// Resolve the SVM by name and bind a gateway to one of its shares.
    pub fn connect(client: RestClient, svm: &str, share: &str) -> Result<Self> {
        let svm_uuid = lookup_svm_uuid(&client, svm)?;
        log::debug!("SVM {svm} on {} has uuid {svm_uuid}", client.api_base());
        Ok(Self::new(client, svm_uuid, share))
    }

    /// Bind a gateway to a share of an SVM whose uuid is already known.
    pub fn new(client: RestClient, svm_uuid: impl Into<String>, share: impl Into<String>) -> Self {
        Self {
            client,
            svm_uuid: svm_uuid.into(),
            share: share.into(),
        }
    }

    /// Read the share's ACL.
    pub fn fetch(&self) -> Result<Collection<AclEntry>> {
        let records = self
            .client
            .get_records(&self.collection_path(), &[("fields", ACL_FIELDS)])?;
        Ok(Collection::from_entries(decode_entries(records)?))
    }

    fn collection_path(&self) -> String {
        acls_path(&self.svm_uuid, &self.share)
    }

    fn entry_path(&self, key: &AclKey) -> String {
        acl_path(&self.svm_uuid, &self.share, key)
    }
}

impl SubResourceGateway<AclEntry> for ShareAclGateway {
    fn create(&self, entry: &AclEntry) -> GatewayResult<AclEntry> {
        let body = serde_json::to_value(entry).map_err(ClientError::from)?;
        let response = self.client.post(
            &self.collection_path(),
            &[("return_records", "true")],
            &body,
        )?;

        Ok(canonical_created(entry, &response))
    }

    fn update(&self, key: &AclKey, permission: &Permission) -> GatewayResult<()> {
        // user_or_group and type are part of the path, not the body.
        self.client
            .patch(&self.entry_path(key), &json!({ "permission": permission }))?;
        Ok(())
    }

    fn delete(&self, key: &AclKey) -> GatewayResult<()> {
        self.client.delete(&self.entry_path(key))?;
        Ok(())
    }

    fn list(&self) -> GatewayResult<Option<Collection<AclEntry>>> {
        Ok(Some(self.fetch()?))
    }
}

/// Look up an SVM's uuid by name.
pub fn lookup_svm_uuid(client: &RestClient, svm: &str) -> Result<String> {
    let records = client.get_records("/svm/svms", &[("name", svm), ("fields", "uuid")])?;
    records
        .first()
        .and_then(|r| r.get("uuid"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ClientError::SvmNotFound(svm.to_string()))
}

fn acls_path(svm_uuid: &str, share: &str) -> String {
    format!(
        "/protocols/cifs/shares/{}/{}/acls",
        svm_uuid,
        urlencoding::encode(share)
    )
}

fn acl_path(svm_uuid: &str, share: &str, key: &AclKey) -> String {
    format!(
        "{}/{}/{}",
        acls_path(svm_uuid, share),
        urlencoding::encode(&key.user_or_group),
        key.acl_type.as_str()
    )
}

/// Entry the cluster reports for a create
///
/// Only the permission is taken from the returned record. The key stays the
/// requested one, since the record may omit `type`. Older releases return
/// no records for this endpoint.
fn canonical_created(entry: &AclEntry, response: &Value) -> AclEntry {
    response
        .get("records")
        .and_then(Value::as_array)
        .and_then(|records| records.first())
        .and_then(|record| record.get("permission"))
        .and_then(|permission| serde_json::from_value::<Permission>(permission.clone()).ok())
        .map_or_else(|| entry.clone(), |permission| AclEntry::from_parts(entry.key(), permission))
}

/// Decode ACL records. One undecodable record fails the whole read.
fn decode_entries(records: Vec<Value>) -> Result<Vec<AclEntry>> {
    records
        .into_iter()
        .map(|record| serde_json::from_value::<AclEntry>(record).map_err(ClientError::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acl::AclType;

    #[test]
    fn test_paths_encode_segments() {
        let entry = AclEntry::new(
            "BUILTIN\\Administrators",
            AclType::Windows,
            Permission::Read,
        );
        assert_eq!(
            acls_path("6fa1-42", "eng share"),
            "/protocols/cifs/shares/6fa1-42/eng%20share/acls"
        );
        assert_eq!(
            acl_path("6fa1-42", "eng", &entry.key()),
            "/protocols/cifs/shares/6fa1-42/eng/acls/BUILTIN%5CAdministrators/windows"
        );
    }

    #[test]
    fn test_decode_entries_ignores_extra_fields() {
        let records = vec![
            json!({
                "share": "eng",
                "svm": {"name": "svm1", "uuid": "6fa1-42"},
                "user_or_group": "Everyone",
                "type": "windows",
                "permission": "full_control",
                "_links": {"self": {"href": "/api/..."}}
            }),
            json!({
                "user_or_group": "staff",
                "type": "unix_group",
                "permission": "change"
            }),
        ];

        let entries = decode_entries(records).unwrap();
        assert_eq!(entries[0], crate::acl::default_entry());
        assert_eq!(
            entries[1],
            AclEntry::new("staff", AclType::UnixGroup, Permission::Change)
        );
    }

    #[test]
    fn test_created_record_without_type_keeps_requested_key() {
        let entry = AclEntry::new("staff", AclType::UnixGroup, Permission::Change);
        let response = json!({
            "num_records": 1,
            "records": [{"user_or_group": "staff", "permission": "change"}]
        });

        let created = canonical_created(&entry, &response);
        assert_eq!(created, entry);

        let desired = Collection::from_entries([entry.clone()]);
        let applied = Collection::from_entries([created]);
        let plan = declarative::reconcile(&desired, &applied, &crate::acl::share_policy()).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn test_created_record_permission_wins() {
        let entry = AclEntry::new("staff", AclType::UnixGroup, Permission::Change);
        let response = json!({
            "records": [{"user_or_group": "staff", "type": "windows", "permission": "read"}]
        });
        assert_eq!(
            canonical_created(&entry, &response),
            AclEntry::new("staff", AclType::UnixGroup, Permission::Read)
        );
    }

    #[test]
    fn test_created_without_records_falls_back_to_request() {
        let entry = AclEntry::new("staff", AclType::UnixUser, Permission::NoAccess);
        assert_eq!(canonical_created(&entry, &json!({})), entry);
        assert_eq!(
            canonical_created(&entry, &json!({"records": [{"permission": "owner"}]})),
            entry
        );
    }

    #[test]
    fn test_decode_entries_rejects_unknown_permission() {
        let records = vec![json!({
            "user_or_group": "staff",
            "type": "windows",
            "permission": "owner"
        })];
        assert!(matches!(
            decode_entries(records),
            Err(ClientError::InvalidResponse(_))
        ));
    }
}
