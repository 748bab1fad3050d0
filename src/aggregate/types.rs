use bson::Bson;

use crate::query::{Filter, Projection, SortSpec};

pub(crate) const MAX_PIPELINE_STAGES: usize = 64;
pub(crate) const MAX_EXPR_DEPTH: usize = 32;

/// Computed value over one input row.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `"$path"`
    Field(String),
    Literal(Bson),
    Concat(Vec<Expr>),
    ToString(Box<Expr>),
    Add(Vec<Expr>),
    Multiply(Vec<Expr>),
    Divide(Box<Expr>, Box<Expr>),
    Floor(Box<Expr>),
    /// Embedded document, used for compound group keys.
    Object(Vec<(String, Expr)>),
}

impl Expr {
    #[must_use]
    pub fn field(path: &str) -> Self {
        Self::Field(path.to_string())
    }

    #[must_use]
    pub fn lit(v: impl Into<Bson>) -> Self {
        Self::Literal(v.into())
    }

    /// `floor(path / 10) * 10` rendered as a string with an `s` suffix, e.g. `"1940s"`.
    #[must_use]
    pub fn decade_of(path: &str) -> Self {
        let decade = Self::Multiply(vec![
            Self::Floor(Box::new(Self::Divide(Box::new(Self::field(path)), Box::new(Self::lit(10))))),
            Self::lit(10),
        ]);
        Self::Concat(vec![Self::ToString(Box::new(decade)), Self::lit("s")])
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Accumulator {
    Sum(Expr),
    Avg(Expr),
    Min(Expr),
    Max(Expr),
    First(Expr),
    Last(Expr),
}

impl Accumulator {
    /// `{$sum: 1}`
    #[must_use]
    pub fn count() -> Self {
        Self::Sum(Expr::lit(1))
    }

    #[must_use]
    pub const fn operator(&self) -> &'static str {
        match self {
            Self::Sum(_) => "$sum",
            Self::Avg(_) => "$avg",
            Self::Min(_) => "$min",
            Self::Max(_) => "$max",
            Self::First(_) => "$first",
            Self::Last(_) => "$last",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupStage {
    pub key: Expr,
    pub fields: Vec<(String, Accumulator)>,
}

impl GroupStage {
    #[must_use]
    pub const fn by(key: Expr) -> Self {
        Self { key, fields: Vec::new() }
    }

    #[must_use]
    pub fn with(mut self, name: &str, acc: Accumulator) -> Self {
        self.fields.push((name.to_string(), acc));
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Match(Filter),
    Group(GroupStage),
    Sort(Vec<SortSpec>),
    Skip(usize),
    Limit(usize),
    Project(Projection),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pipeline {
    pub stages: Vec<Stage>,
}

impl Pipeline {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn matching(mut self, filter: Filter) -> Self {
        self.stages.push(Stage::Match(filter));
        self
    }

    #[must_use]
    pub fn group(mut self, group: GroupStage) -> Self {
        self.stages.push(Stage::Group(group));
        self
    }

    #[must_use]
    pub fn sort(mut self, sort: Vec<SortSpec>) -> Self {
        self.stages.push(Stage::Sort(sort));
        self
    }

    #[must_use]
    pub fn skip(mut self, n: usize) -> Self {
        self.stages.push(Stage::Skip(n));
        self
    }

    #[must_use]
    pub fn limit(mut self, n: usize) -> Self {
        self.stages.push(Stage::Limit(n));
        self
    }

    #[must_use]
    pub fn project(mut self, projection: Projection) -> Self {
        self.stages.push(Stage::Project(projection));
        self
    }
}
