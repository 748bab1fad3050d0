use crate::document::Document;
use crate::index::IndexSpec;
use bson::Document as BsonDocument;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use uuid::Uuid;

pub type CollectionName = String;

/// A wrapper around `uuid::Uuid` to ensure Bincode serialization compatibility.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub Uuid);

impl DocumentId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A wrapper for `bson::Document` that serializes as raw BSON bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct SerializableBsonDocument(pub BsonDocument);

impl Serialize for SerializableBsonDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let bytes = bson::to_vec(&self.0).map_err(serde::ser::Error::custom)?;
        serializer.serialize_bytes(&bytes)
    }
}

impl<'de> Deserialize<'de> for SerializableBsonDocument {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bytes: Vec<u8> = <Vec<u8>>::deserialize(deserializer)?;
        let doc = bson::from_slice(&bytes).map_err(serde::de::Error::custom)?;
        Ok(Self(doc))
    }
}

/// A wrapper for `chrono::DateTime<Utc>` stored as RFC 3339 text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializableDateTime(pub DateTime<Utc>);

impl Serialize for SerializableDateTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_rfc3339())
    }
}

impl<'de> Deserialize<'de> for SerializableDateTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let dt =
            DateTime::parse_from_rfc3339(&s).map_err(serde::de::Error::custom)?.with_timezone(&Utc);
        Ok(Self(dt))
    }
}

/// Represents operations recorded by a storage engine and replayed on open.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub enum Operation {
    CreateCollection { collection: CollectionName },
    DropCollection { collection: CollectionName },
    Insert { collection: CollectionName, document: Document },
    Update { collection: CollectionName, document: Document },
    Delete { collection: CollectionName, document_id: DocumentId },
    CreateIndex { collection: CollectionName, spec: IndexSpec },
    DropIndex { collection: CollectionName, name: String },
}

impl Operation {
    #[must_use]
    pub fn collection(&self) -> &str {
        match self {
            Self::CreateCollection { collection }
            | Self::DropCollection { collection }
            | Self::Insert { collection, .. }
            | Self::Update { collection, .. }
            | Self::Delete { collection, .. }
            | Self::CreateIndex { collection, .. }
            | Self::DropIndex { collection, .. } => collection,
        }
    }
}
