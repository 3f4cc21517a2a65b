// Handle Domain Model

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Client-facing identifier of a persisted handle
pub type HandleId = String;

/// Identifier of the object in the underlying store (e.g. a Shock node id)
pub type NodeId = String;

/// Reference to file data held in an external object store.
///
/// All named fields are optional on the wire and omitted when `None`. Fields
/// the server adds that this client does not know about (`created_by`,
/// `creation_date`, ...) are kept in `additional_properties` and written back
/// unchanged, so a fetched handle can be passed to `delete_handles` intact.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Handle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hid: Option<HandleId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<NodeId>,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub store_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_md5: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_sha1: Option<String>,

    #[serde(flatten)]
    pub additional_properties: Map<String, Value>,
}

impl Handle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hid(mut self, hid: impl Into<HandleId>) -> Self {
        self.hid = Some(hid.into());
        self
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    pub fn with_id(mut self, id: impl Into<NodeId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_store_type(mut self, store_type: impl Into<String>) -> Self {
        self.store_type = Some(store_type.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_remote_md5(mut self, md5: impl Into<String>) -> Self {
        self.remote_md5 = Some(md5.into());
        self
    }

    pub fn with_remote_sha1(mut self, sha1: impl Into<String>) -> Self {
        self.remote_sha1 = Some(sha1.into());
        self
    }

    /// Set an extra property that has no named field
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.additional_properties.insert(name.into(), value.into());
        self
    }

    /// Look up an extra property captured from the wire
    pub fn property(&self, name: &str) -> Option<&Value> {
        self.additional_properties.get(name)
    }
}
