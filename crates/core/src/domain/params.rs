// Query descriptor for fetch_handles_by

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Select handles whose `field_name` value is one of `elements`.
///
/// `additional_properties` is merged into the serialized object next to the
/// named fields, so newer server-side options can be sent without a client
/// upgrade.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FetchHandlesParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elements: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_name: Option<String>,

    #[serde(flatten)]
    pub additional_properties: Map<String, Value>,
}

impl FetchHandlesParams {
    /// Match `field_name` against every value in `elements`
    pub fn new<I, S>(field_name: impl Into<String>, elements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            elements: Some(elements.into_iter().map(Into::into).collect()),
            field_name: Some(field_name.into()),
            additional_properties: Map::new(),
        }
    }

    pub fn with_elements(mut self, elements: Vec<String>) -> Self {
        self.elements = Some(elements);
        self
    }

    pub fn with_field_name(mut self, field_name: impl Into<String>) -> Self {
        self.field_name = Some(field_name.into());
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.additional_properties.insert(name.into(), value.into());
        self
    }
}
