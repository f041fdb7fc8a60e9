use serde::{Deserialize, Serialize};

/// Staff profile attached to some accounts. Fields the client does not know about are
/// kept in `extra` so the record round-trips unchanged through storage.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StaffProfile {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Denormalized user identity cached next to the credential.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct IdentityRecord {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staff_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staff: Option<StaffProfile>,
}

impl IdentityRecord {
    pub fn has_role(&self, role: &str) -> bool { self.role.eq_ignore_ascii_case(role) }
}
