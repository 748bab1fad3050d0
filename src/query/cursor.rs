use bson::Document as BsonDocument;
use serde::de::DeserializeOwned;

use crate::errors::DbError;

/// Materialized result rows of a find, already sorted, paginated and projected.
#[derive(Debug, Clone, Default)]
pub struct Cursor {
    rows: Vec<BsonDocument>,
    pos: usize,
}

impl Cursor {
    #[must_use]
    pub const fn new(rows: Vec<BsonDocument>) -> Self {
        Self { rows, pos: 0 }
    }

    pub fn advance(&mut self) -> Option<BsonDocument> {
        let row = self.rows.get(self.pos).cloned();
        if row.is_some() {
            self.pos += 1;
        }
        row
    }

    /// Rows not yet returned.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.rows.len().saturating_sub(self.pos)
    }

    #[must_use]
    pub fn to_vec(mut self) -> Vec<BsonDocument> {
        self.rows.split_off(self.pos.min(self.rows.len()))
    }

    /// Decode the remaining rows into `T`.
    ///
    /// # Errors
    /// Returns `DbError::BsonDe` if a row does not match `T`.
    pub fn deserialize<T: DeserializeOwned>(self) -> Result<Vec<T>, DbError> {
        self.to_vec().into_iter().map(|d| bson::from_document(d).map_err(DbError::from)).collect()
    }
}

impl Iterator for Cursor {
    type Item = BsonDocument;
    fn next(&mut self) -> Option<Self::Item> {
        self.advance()
    }
}
