use crate::document::types::Metadata;
use crate::types::{DocumentId, SerializableBsonDocument};
use bson::{Bson, Document as BsonDocument};
use serde::{Deserialize, Serialize};

/// Name under which the document id is exposed to projections.
pub const ID_FIELD: &str = "_id";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Document {
    pub id: DocumentId,
    pub data: SerializableBsonDocument,
    pub metadata: Metadata,
}

impl Document {
    #[must_use]
    pub fn new(data: BsonDocument) -> Self {
        Self { id: DocumentId::new(), data: SerializableBsonDocument(data), metadata: Metadata::new() }
    }

    /// Builds a document from any serde-serializable value whose BSON form is a document.
    ///
    /// # Errors
    /// Returns an error if the value does not serialize to a BSON document.
    pub fn from_serde<T: Serialize>(value: &T) -> Result<Self, crate::errors::DbError> {
        Ok(Self::new(bson::to_document(value)?))
    }

    #[must_use]
    pub fn body(&self) -> &BsonDocument {
        &self.data.0
    }

    #[must_use]
    pub fn id_bson(&self) -> Bson {
        Bson::String(self.id.to_string())
    }

    pub fn update(&mut self, new_data: BsonDocument) {
        self.data = SerializableBsonDocument(new_data);
        self.metadata.touch();
    }
}
