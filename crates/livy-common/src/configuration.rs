use serde::{Deserialize, Serialize};

/// A named configuration value. `id` is generated by the server on insert and
/// never changes afterwards; `name` is not unique at the storage layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    pub id: String,
    #[serde(rename = "configname")]
    pub name: String,
    pub value: String,
}

impl Configuration {
    pub const TABLE: &'static str = "configuration";

    pub fn new(id: impl Into<String>, name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            value: value.into(),
        }
    }

    /// True for the zero value returned when a lookup matches nothing.
    pub fn is_empty(&self) -> bool {
        self.id.is_empty()
    }
}
