use std::collections::BTreeMap;

use serde::Serialize;

/// Retrieved text plus free-form string metadata (`source`, `title`, ...).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub content: String,
    pub metadata: BTreeMap<String, String>,
}

impl Document {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<String>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    pub fn meta(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }
}
