pub mod aggregate;
pub mod book;
pub mod collection;
pub mod config;
pub mod document;
pub mod engine;
pub mod errors;
pub mod index;
pub mod query;
pub mod storage;
pub mod types;
pub mod utils;

#[cfg(test)]
mod test_support;

use crate::aggregate::Pipeline;
use crate::book::{BOOKS_COLLECTION, Books};
use crate::collection::Collection;
use crate::config::DbConfig;
use crate::document::Document;
use crate::engine::Engine;
use crate::errors::DbError;
use crate::index::IndexSpec;
use crate::query::{
    Cursor, DeleteReport, ExplainReport, ExplainVerbosity, Filter, FindOptions, Projection, UpdateDoc, UpdateReport,
};
use crate::types::DocumentId;
use bson::Document as BsonDocument;
use std::path::Path;
use std::sync::Arc;

/// The main database handle.
#[derive(Debug)]
pub struct Database {
    engine: Arc<Engine>,
}

impl Database {
    /// A database whose operation log lives in memory only.
    #[must_use]
    pub fn in_memory() -> Self {
        Self { engine: Arc::new(Engine::in_memory()) }
    }

    /// Opens or creates a write-ahead log at `path` and replays it.
    ///
    /// # Errors
    /// Returns an error if the log cannot be opened or is corrupt.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, DbError> {
        let engine = Engine::open_wal(path.as_ref())?;
        log::info!("opened database at {}", path.as_ref().display());
        Ok(Self { engine: Arc::new(engine) })
    }

    /// Applies logging and telemetry settings, then opens `cfg.path` or an in-memory database.
    ///
    /// # Errors
    /// Returns a logger error or any error from [`Database::open`].
    pub fn from_config(cfg: &DbConfig) -> Result<Self, DbError> {
        cfg.apply_ambient()?;
        match &cfg.path {
            Some(p) => Self::open(p),
            None => Ok(Self::in_memory()),
        }
    }

    #[must_use]
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// # Errors
    /// Returns `DbError::CollectionAlreadyExists` if the name is taken.
    pub fn create_collection(&self, name: &str) -> Result<Arc<Collection>, DbError> {
        self.engine.create_collection(name)
    }

    /// # Errors
    /// Returns `DbError::NoSuchCollection` if there is no such collection.
    pub fn collection(&self, name: &str) -> Result<Arc<Collection>, DbError> {
        self.engine.get_collection(name).ok_or_else(|| DbError::NoSuchCollection(name.to_string()))
    }

    /// # Errors
    /// Returns an error if the collection has to be created and that fails.
    pub fn get_or_create_collection(&self, name: &str) -> Result<Arc<Collection>, DbError> {
        self.engine.get_or_create(name)
    }

    /// # Errors
    /// Returns an error if the storage append fails.
    pub fn drop_collection(&self, name: &str) -> Result<bool, DbError> {
        self.engine.drop_collection(name)
    }

    #[must_use]
    pub fn list_collection_names(&self) -> Vec<String> {
        self.engine.list_collection_names()
    }

    /// Typed helpers over the `books` collection, created on first use.
    ///
    /// # Errors
    /// Returns an error if the collection cannot be created.
    pub fn books(&self) -> Result<Books, DbError> {
        Ok(Books::new(self.get_or_create_collection(BOOKS_COLLECTION)?))
    }

    /// # Errors
    /// Returns `DbError::NoSuchCollection` or the insert error.
    pub fn insert_document(&self, collection: &str, document: Document) -> Result<DocumentId, DbError> {
        self.collection(collection)?.insert_document(document)
    }

    // --- Query API (facade over the query module) ---

    /// # Errors
    /// Returns `DbError::NoSuchCollection` if there is no such collection.
    pub fn find(&self, collection: &str, filter: &Filter, opts: &FindOptions) -> Result<Cursor, DbError> {
        Ok(query::find_docs(&*self.collection(collection)?, filter, opts))
    }

    /// # Errors
    /// Returns `DbError::NoSuchCollection` if there is no such collection.
    pub fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
        projection: Option<&Projection>,
    ) -> Result<Option<BsonDocument>, DbError> {
        Ok(query::find_one(&*self.collection(collection)?, filter, projection))
    }

    /// # Errors
    /// Returns `DbError::NoSuchCollection` if there is no such collection.
    pub fn count(&self, collection: &str, filter: &Filter) -> Result<usize, DbError> {
        Ok(query::count_docs(&*self.collection(collection)?, filter))
    }

    /// # Errors
    /// Returns `DbError::NoSuchCollection`, an invalid-update error or a storage error.
    pub fn update_one(&self, collection: &str, filter: &Filter, update: &UpdateDoc) -> Result<UpdateReport, DbError> {
        query::update_one(&*self.collection(collection)?, filter, update)
    }

    /// # Errors
    /// Returns `DbError::NoSuchCollection`, an invalid-update error or a storage error.
    pub fn update_many(&self, collection: &str, filter: &Filter, update: &UpdateDoc) -> Result<UpdateReport, DbError> {
        query::update_many(&*self.collection(collection)?, filter, update)
    }

    /// # Errors
    /// Returns `DbError::NoSuchCollection` or a storage error.
    pub fn delete_one(&self, collection: &str, filter: &Filter) -> Result<DeleteReport, DbError> {
        query::delete_one(&*self.collection(collection)?, filter)
    }

    /// # Errors
    /// Returns `DbError::NoSuchCollection` or a storage error.
    pub fn delete_many(&self, collection: &str, filter: &Filter) -> Result<DeleteReport, DbError> {
        query::delete_many(&*self.collection(collection)?, filter)
    }

    /// # Errors
    /// Returns `DbError::NoSuchCollection` or an aggregation error.
    pub fn aggregate(&self, collection: &str, pipeline: &Pipeline) -> Result<Vec<BsonDocument>, DbError> {
        aggregate::aggregate(&*self.collection(collection)?, pipeline)
    }

    /// # Errors
    /// Returns `DbError::NoSuchCollection` or an index error.
    pub fn create_index(&self, collection: &str, spec: IndexSpec) -> Result<String, DbError> {
        self.collection(collection)?.create_index(spec)
    }

    /// # Errors
    /// Returns `DbError::NoSuchCollection` or `DbError::IndexError` for an unknown name.
    pub fn drop_index(&self, collection: &str, name: &str) -> Result<(), DbError> {
        self.collection(collection)?.drop_index(name)
    }

    /// # Errors
    /// Returns `DbError::NoSuchCollection` if there is no such collection.
    pub fn explain(
        &self,
        collection: &str,
        filter: &Filter,
        opts: &FindOptions,
        verbosity: ExplainVerbosity,
    ) -> Result<ExplainReport, DbError> {
        Ok(query::explain_find(&*self.collection(collection)?, filter, opts, verbosity))
    }

    // --- JSON forms ---

    /// `find` with MongoDB-shaped JSON filter, and optional sort and projection.
    ///
    /// # Errors
    /// Returns a parse error or `DbError::NoSuchCollection`.
    pub fn find_json(
        &self,
        collection: &str,
        filter: &str,
        sort: Option<&str>,
        projection: Option<&str>,
    ) -> Result<Cursor, DbError> {
        let filter = query::parse_filter_json(filter)?;
        let mut opts = FindOptions::new();
        if let Some(s) = sort {
            opts = opts.with_sort(query::parse_sort_json(s)?);
        }
        if let Some(p) = projection {
            opts = opts.with_projection(query::parse_projection_json(p)?);
        }
        self.find(collection, &filter, &opts)
    }

    /// # Errors
    /// Returns a parse error, `DbError::NoSuchCollection` or a storage error.
    pub fn update_one_json(&self, collection: &str, filter: &str, update: &str) -> Result<UpdateReport, DbError> {
        self.update_one(collection, &query::parse_filter_json(filter)?, &query::parse_update_json(update)?)
    }

    /// # Errors
    /// Returns a parse error, `DbError::NoSuchCollection` or a storage error.
    pub fn delete_one_json(&self, collection: &str, filter: &str) -> Result<DeleteReport, DbError> {
        self.delete_one(collection, &query::parse_filter_json(filter)?)
    }

    /// # Errors
    /// Returns a parse error, `DbError::NoSuchCollection` or an aggregation error.
    pub fn aggregate_json(&self, collection: &str, pipeline: &str) -> Result<Vec<BsonDocument>, DbError> {
        self.aggregate(collection, &aggregate::parse_pipeline_json(pipeline)?)
    }

    /// # Errors
    /// Returns a parse error, `DbError::NoSuchCollection` or an index error.
    pub fn create_index_json(&self, collection: &str, keys: &str) -> Result<String, DbError> {
        self.create_index(collection, index::parse_index_json(keys)?)
    }

    /// Flush the write-ahead log, if any.
    ///
    /// # Errors
    /// Returns an error if the flush fails.
    pub fn sync(&self) -> Result<(), DbError> {
        self.engine.sync()
    }
}

/// Install logging from `BOOKSHELF_LOG_*` environment variables.
///
/// # Errors
/// Returns an error if the log directory or appenders cannot be created.
pub fn init() -> Result<(), DbError> {
    utils::logger::configure_from_env()
}
