use livy_common::{Error, Result};
use serde::Deserialize;

pub const MAX_NAME_LEN: usize = 255;

/// Body of the create and update endpoints. Both fields are required strings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConfigurationPayload {
    pub name: String,
    pub value: String,
}

impl ConfigurationPayload {
    /// Strip control characters and check the name.
    pub fn validated(self) -> Result<Self> {
        let name = sanitize(&self.name);
        let value = sanitize(&self.value);
        if name.trim().is_empty() {
            return Err(Error::Validation("name cannot be empty".into()));
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(Error::Validation(format!(
                "name longer than {MAX_NAME_LEN} characters"
            )));
        }
        Ok(Self { name, value })
    }
}

/// Remove control characters, keeping newlines and tabs.
pub fn sanitize(input: &str) -> String {
    input
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect()
}
