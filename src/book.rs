//! Typed access to a `books` collection: the bookstore workload expressed through the
//! generic query, update, aggregation and index APIs.

use bson::Document as BsonDocument;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::aggregate::{Accumulator, Expr, GroupStage, Pipeline, aggregate};
use crate::collection::Collection;
use crate::document::Document;
use crate::errors::DbError;
use crate::index::IndexSpec;
use crate::query::{
    DeleteReport, ExplainReport, ExplainVerbosity, Filter, FindOptions, Order, Projection, SortSpec, UpdateDoc,
    UpdateReport, delete_one, explain_find, find_docs, find_one, update_one,
};
use crate::types::DocumentId;

pub const BOOKS_COLLECTION: &str = "books";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub title: String,
    pub author: String,
    pub genre: String,
    pub published_year: i32,
    pub price: f64,
    pub in_stock: bool,
}

impl Book {
    #[must_use]
    pub fn new(title: &str, author: &str, genre: &str, published_year: i32, price: f64, in_stock: bool) -> Self {
        Self {
            title: title.to_string(),
            author: author.to_string(),
            genre: genre.to_string(),
            published_year,
            price,
            in_stock,
        }
    }
}

/// Title, author and price only.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BookSummary {
    pub title: String,
    pub author: String,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GenrePrice {
    #[serde(rename = "_id")]
    pub genre: String,
    pub average_price: Option<f64>,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthorCount {
    #[serde(rename = "_id")]
    pub author: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DecadeCount {
    /// `None` for books without a publication year.
    #[serde(rename = "_id")]
    pub decade: Option<String>,
    pub count: i64,
}

fn decode_rows<T: DeserializeOwned>(rows: Vec<BsonDocument>) -> Result<Vec<T>, DbError> {
    rows.into_iter().map(|r| bson::from_document(r).map_err(DbError::from)).collect()
}

/// Handle over a collection of [`Book`] documents.
#[derive(Debug, Clone)]
pub struct Books {
    col: Arc<Collection>,
}

impl Books {
    #[must_use]
    pub const fn new(col: Arc<Collection>) -> Self {
        Self { col }
    }

    #[must_use]
    pub fn collection(&self) -> &Arc<Collection> {
        &self.col
    }

    /// # Errors
    /// Returns an error if the book does not serialize or the write fails.
    pub fn insert(&self, book: &Book) -> Result<DocumentId, DbError> {
        self.col.insert_document(Document::from_serde(book)?)
    }

    /// # Errors
    /// Stops at the first failing insert.
    pub fn insert_many(&self, books: &[Book]) -> Result<Vec<DocumentId>, DbError> {
        books.iter().map(|b| self.insert(b)).collect()
    }

    /// # Errors
    /// Returns `DbError::BsonDe` if a matching document is not a well-formed book.
    pub fn find(&self, filter: &Filter, opts: &FindOptions) -> Result<Vec<Book>, DbError> {
        find_docs(&self.col, filter, opts).deserialize()
    }

    /// # Errors
    /// See [`Books::find`].
    pub fn find_by_genre(&self, genre: &str) -> Result<Vec<Book>, DbError> {
        self.find(&Filter::eq("genre", genre), &FindOptions::default())
    }

    /// # Errors
    /// See [`Books::find`].
    pub fn find_by_author(&self, author: &str) -> Result<Vec<Book>, DbError> {
        self.find(&Filter::eq("author", author), &FindOptions::default())
    }

    /// Books published strictly after `year`.
    ///
    /// # Errors
    /// See [`Books::find`].
    pub fn published_after(&self, year: i32) -> Result<Vec<Book>, DbError> {
        self.find(&Filter::gt("published_year", year), &FindOptions::default())
    }

    /// # Errors
    /// See [`Books::find`].
    pub fn in_stock_published_after(&self, year: i32) -> Result<Vec<Book>, DbError> {
        let filter = Filter::eq("in_stock", true).and(Filter::gt("published_year", year));
        self.find(&filter, &FindOptions::default())
    }

    /// First book with this title in natural order.
    ///
    /// # Errors
    /// Returns `DbError::BsonDe` if the stored document is not a well-formed book.
    pub fn by_title(&self, title: &str) -> Result<Option<Book>, DbError> {
        find_one(&self.col, &Filter::eq("title", title), None)
            .map(|row| bson::from_document(row).map_err(DbError::from))
            .transpose()
    }

    /// `$set` the price of the first book with this title.
    ///
    /// # Errors
    /// Returns an error if the write fails.
    pub fn set_price(&self, title: &str, price: f64) -> Result<UpdateReport, DbError> {
        update_one(&self.col, &Filter::eq("title", title), &UpdateDoc::new().set("price", price))
    }

    /// # Errors
    /// Returns an error if the write fails.
    pub fn delete_by_title(&self, title: &str) -> Result<DeleteReport, DbError> {
        delete_one(&self.col, &Filter::eq("title", title))
    }

    /// # Errors
    /// See [`Books::find`].
    pub fn summaries(&self) -> Result<Vec<BookSummary>, DbError> {
        let projection = Projection::include(&["title", "author", "price"]).without_id();
        find_docs(&self.col, &Filter::True, &FindOptions::new().with_projection(projection)).deserialize()
    }

    /// # Errors
    /// See [`Books::find`].
    pub fn sorted_by_price(&self, order: Order) -> Result<Vec<Book>, DbError> {
        let sort = SortSpec { field: "price".to_string(), order };
        self.find(&Filter::True, &FindOptions::new().with_sort(vec![sort]))
    }

    /// One-based page of `per_page` books in natural order.
    ///
    /// # Errors
    /// Returns `DbError::QueryError` for page 0 or an empty page size.
    pub fn page(&self, page: usize, per_page: usize) -> Result<Vec<Book>, DbError> {
        if page == 0 || per_page == 0 {
            return Err(DbError::QueryError("page and page size start at 1".into()));
        }
        let skip = (page - 1).saturating_mul(per_page);
        self.find(&Filter::True, &FindOptions::new().with_skip(skip).with_limit(per_page))
    }

    /// Average price and count per genre, genres in order of first appearance.
    ///
    /// # Errors
    /// Returns an aggregation error if a price is not usable.
    pub fn average_price_by_genre(&self) -> Result<Vec<GenrePrice>, DbError> {
        let pipeline = Pipeline::new().group(
            GroupStage::by(Expr::field("genre"))
                .with("average_price", Accumulator::Avg(Expr::field("price")))
                .with("count", Accumulator::count()),
        );
        decode_rows(aggregate(&self.col, &pipeline)?)
    }

    /// Author with the most books; ties go to the author seen first.
    ///
    /// # Errors
    /// Returns an aggregation error.
    pub fn top_author(&self) -> Result<Option<AuthorCount>, DbError> {
        let pipeline = Pipeline::new()
            .group(GroupStage::by(Expr::field("author")).with("count", Accumulator::count()))
            .sort(vec![SortSpec::desc("count")])
            .limit(1);
        Ok(decode_rows(aggregate(&self.col, &pipeline)?)?.into_iter().next())
    }

    /// Book counts per publication decade ("1940s", ...), oldest first.
    ///
    /// # Errors
    /// Returns an aggregation error if a year is not numeric.
    pub fn count_by_decade(&self) -> Result<Vec<DecadeCount>, DbError> {
        let pipeline = Pipeline::new()
            .group(GroupStage::by(Expr::decade_of("published_year")).with("count", Accumulator::count()))
            .sort(vec![SortSpec::asc("_id")]);
        decode_rows(aggregate(&self.col, &pipeline)?)
    }

    /// Create `title_1` and `author_1_published_year_-1`. Returns their names.
    ///
    /// # Errors
    /// Returns an error if an index cannot be created.
    pub fn ensure_indexes(&self) -> Result<Vec<String>, DbError> {
        let compound =
            IndexSpec::new(vec![("author".to_string(), Order::Asc), ("published_year".to_string(), Order::Desc)])?;
        Ok(vec![self.col.create_index(IndexSpec::ascending("title"))?, self.col.create_index(compound)?])
    }

    #[must_use]
    pub fn explain_title_lookup(&self, title: &str) -> ExplainReport {
        explain_find(&self.col, &Filter::eq("title", title), &FindOptions::default(), ExplainVerbosity::ExecutionStats)
    }

    #[must_use]
    pub fn explain_author_since(&self, author: &str, year: i32) -> ExplainReport {
        let filter = Filter::eq("author", author).and(Filter::gt("published_year", year));
        explain_find(&self.col, &filter, &FindOptions::default(), ExplainVerbosity::ExecutionStats)
    }
}
