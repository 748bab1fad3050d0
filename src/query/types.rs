use crate::errors::DbError;
use bson::Bson;
use serde::{Deserialize, Serialize};

// Safety limits to prevent resource abuse
pub(crate) const MAX_PATH_DEPTH: usize = 32;
pub(crate) const MAX_IN_SET: usize = 1000;
pub(crate) const MAX_SORT_FIELDS: usize = 8;
pub(crate) const MAX_PROJECTION_FIELDS: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Order {
    Asc,
    Desc,
}

impl Order {
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        match self {
            Self::Asc => 1,
            Self::Desc => -1,
        }
    }

    /// Parse a `1` / `-1` direction.
    ///
    /// # Errors
    /// Returns `DbError::QueryError` for any other value.
    pub fn from_bson(v: &Bson) -> Result<Self, DbError> {
        match crate::utils::num::as_f64(v) {
            Some(x) if x == 1.0 => Ok(Self::Asc),
            Some(x) if x == -1.0 => Ok(Self::Desc),
            _ => Err(DbError::QueryError(format!("direction must be 1 or -1, got {v}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    pub order: Order,
}

impl SortSpec {
    #[must_use]
    pub fn asc(field: &str) -> Self {
        Self { field: field.to_string(), order: Order::Asc }
    }

    #[must_use]
    pub fn desc(field: &str) -> Self {
        Self { field: field.to_string(), order: Order::Desc }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectionMode {
    Include,
    Exclude,
}

/// Field restriction applied to returned documents.
///
/// `_id` is governed only by `include_id`; it is never listed in `fields`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Projection {
    pub mode: ProjectionMode,
    pub fields: Vec<String>,
    pub include_id: bool,
}

impl Projection {
    #[must_use]
    pub fn include<S: AsRef<str>>(fields: &[S]) -> Self {
        Self {
            mode: ProjectionMode::Include,
            fields: fields.iter().map(|s| s.as_ref().to_string()).collect(),
            include_id: true,
        }
    }

    #[must_use]
    pub fn exclude<S: AsRef<str>>(fields: &[S]) -> Self {
        Self {
            mode: ProjectionMode::Exclude,
            fields: fields.iter().map(|s| s.as_ref().to_string()).collect(),
            include_id: true,
        }
    }

    #[must_use]
    pub fn without_id(mut self) -> Self {
        self.include_id = false;
        self
    }
}

/// Options for `find_docs`.
///
/// Semantics:
/// - Sorting is applied first, then `skip`/`limit`, then projection.
/// - `limit` of `None` or `Some(0)` returns everything after `skip`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FindOptions {
    pub projection: Option<Projection>,
    pub sort: Option<Vec<SortSpec>>,
    pub limit: Option<usize>,
    pub skip: Option<usize>,
}

impl FindOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_projection(mut self, projection: Projection) -> Self {
        self.projection = Some(projection);
        self
    }

    #[must_use]
    pub fn with_sort(mut self, sort: Vec<SortSpec>) -> Self {
        self.sort = Some(sort);
        self
    }

    #[must_use]
    pub const fn with_skip(mut self, skip: usize) -> Self {
        self.skip = Some(skip);
        self
    }

    #[must_use]
    pub const fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    True,
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Nor(Vec<Filter>),
    Not(Box<Filter>),
    Exists { path: String, exists: bool },
    In { path: String, values: Vec<Bson> },
    Nin { path: String, values: Vec<Bson> },
    Cmp { path: String, op: CmpOp, value: Bson },
    #[cfg(feature = "regex")]
    Regex { path: String, pattern: String, case_insensitive: bool },
}

impl Filter {
    fn cmp(path: &str, op: CmpOp, value: impl Into<Bson>) -> Self {
        Self::Cmp { path: path.to_string(), op, value: value.into() }
    }

    #[must_use]
    pub fn eq(path: &str, value: impl Into<Bson>) -> Self {
        Self::cmp(path, CmpOp::Eq, value)
    }

    #[must_use]
    pub fn ne(path: &str, value: impl Into<Bson>) -> Self {
        Self::cmp(path, CmpOp::Ne, value)
    }

    #[must_use]
    pub fn gt(path: &str, value: impl Into<Bson>) -> Self {
        Self::cmp(path, CmpOp::Gt, value)
    }

    #[must_use]
    pub fn gte(path: &str, value: impl Into<Bson>) -> Self {
        Self::cmp(path, CmpOp::Gte, value)
    }

    #[must_use]
    pub fn lt(path: &str, value: impl Into<Bson>) -> Self {
        Self::cmp(path, CmpOp::Lt, value)
    }

    #[must_use]
    pub fn lte(path: &str, value: impl Into<Bson>) -> Self {
        Self::cmp(path, CmpOp::Lte, value)
    }

    #[must_use]
    pub fn exists(path: &str, exists: bool) -> Self {
        Self::Exists { path: path.to_string(), exists }
    }

    #[must_use]
    pub fn in_values(path: &str, values: Vec<Bson>) -> Self {
        Self::In { path: path.to_string(), values }
    }

    /// Conjunction of `self` and `other`, flattening nested ANDs.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        match (self, other) {
            (Self::True, f) | (f, Self::True) => f,
            (Self::And(mut a), Self::And(b)) => {
                a.extend(b);
                Self::And(a)
            }
            (Self::And(mut a), f) => {
                a.push(f);
                Self::And(a)
            }
            (f, g) => Self::And(vec![f, g]),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct UpdateDoc {
    pub set: Vec<(String, Bson)>,
    pub inc: Vec<(String, Bson)>,
    pub unset: Vec<String>,
}

impl UpdateDoc {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn set(mut self, path: &str, value: impl Into<Bson>) -> Self {
        self.set.push((path.to_string(), value.into()));
        self
    }

    #[must_use]
    pub fn inc(mut self, path: &str, by: impl Into<Bson>) -> Self {
        self.inc.push((path.to_string(), by.into()));
        self
    }

    #[must_use]
    pub fn unset(mut self, path: &str) -> Self {
        self.unset.push(path.to_string());
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.inc.is_empty() && self.unset.is_empty()
    }

    /// # Errors
    /// Returns `DbError::QueryError` if the update has no operators or `$inc` is not numeric.
    pub fn validate(&self) -> Result<(), DbError> {
        if self.is_empty() {
            return Err(DbError::QueryError("update document has no operators".into()));
        }
        if let Some((path, _)) = self.inc.iter().find(|(_, v)| !crate::utils::num::is_number(v)) {
            return Err(DbError::QueryError(format!("$inc on '{path}' requires a number")));
        }
        let paths = self.set.iter().map(|(p, _)| p).chain(self.inc.iter().map(|(p, _)| p)).chain(&self.unset);
        for p in paths {
            if p.is_empty() || p.split('.').any(str::is_empty) {
                return Err(DbError::QueryError(format!("invalid update path '{p}'")));
            }
            if p == "_id" {
                return Err(DbError::QueryError("_id cannot be modified".into()));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateReport {
    pub matched: u64,
    pub modified: u64,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteReport {
    pub deleted: u64,
}
