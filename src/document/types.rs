use crate::types::SerializableDateTime;
use chrono::Utc;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Metadata {
    pub created_at: SerializableDateTime,
    pub updated_at: SerializableDateTime,
}

impl Metadata {
    #[must_use]
    pub fn new() -> Self {
        let now = SerializableDateTime(Utc::now());
        Self { created_at: now.clone(), updated_at: now }
    }

    pub fn touch(&mut self) {
        self.updated_at = SerializableDateTime(Utc::now());
    }
}

impl Default for Metadata {
    fn default() -> Self {
        Self::new()
    }
}
