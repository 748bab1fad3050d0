use super::support::{seeded, titles};
use bookshelf::book::Book;
use bookshelf::errors::DbError;
use bookshelf::query::{ExplainVerbosity, Filter, FindOptions, parse_filter_json, update_one, UpdateDoc};
use bson::doc;

const FILTERS: &[&str] = &[
    r#"{"title": "1984"}"#,
    r#"{"author": "J.R.R. Tolkien"}"#,
    r#"{"author": "George Orwell", "published_year": {"$gt": 1946}}"#,
    r#"{"author": "George Orwell", "published_year": {"$lte": 1945}}"#,
    r#"{"title": {"$gte": "The"}}"#,
    r#"{"title": {"$in": ["Moby Dick", "Emma", "1984"]}}"#,
    r#"{"author": {"$exists": true}, "price": {"$lt": 10}}"#,
];

fn run_all(books: &bookshelf::book::Books) -> Vec<Vec<Book>> {
    FILTERS
        .iter()
        .map(|f| books.find(&parse_filter_json(f).unwrap(), &FindOptions::default()).unwrap())
        .collect()
}

#[test]
fn indexes_never_change_results() {
    let (_db, books) = seeded();
    let before = run_all(&books);
    books.ensure_indexes().unwrap();
    assert_eq!(run_all(&books), before);
}

#[test]
fn create_index_from_json_and_explain() {
    let (db, books) = seeded();
    let explain = |json: &str| {
        db.explain("books", &parse_filter_json(json).unwrap(), &FindOptions::default(), ExplainVerbosity::ExecutionStats)
            .unwrap()
    };
    let scan = explain(r#"{"title": "1984"}"#);
    assert_eq!(scan.stages(), ["COLLSCAN"]);
    assert_eq!(scan.execution_stats.unwrap().total_docs_examined, 12);

    assert_eq!(db.create_index_json("books", r#"{"title": 1}"#).unwrap(), "title_1");
    assert_eq!(
        db.create_index_json("books", r#"{"author": 1, "published_year": -1}"#).unwrap(),
        "author_1_published_year_-1"
    );

    let seek = explain(r#"{"title": "1984"}"#);
    assert_eq!(seek.stages(), ["FETCH", "IXSCAN"]);
    let stats = seek.execution_stats.unwrap();
    assert_eq!((stats.n_returned, stats.total_docs_examined), (1, 1));

    let compound = books.explain_author_since("George Orwell", 1946);
    assert_eq!(compound.index_used(), Some("author_1_published_year_-1"));
    assert_eq!(compound.execution_stats.unwrap().n_returned, 1);

    let json = seek.to_json().unwrap();
    assert!(json.contains("\"winningPlan\""));
    assert!(json.contains("\"indexName\": \"title_1\""));
    assert!(json.contains("\"totalKeysExamined\""));
}

#[test]
fn query_planner_verbosity_skips_execution() {
    let (db, books) = seeded();
    books.ensure_indexes().unwrap();
    let report = db
        .explain("books", &Filter::eq("title", "1984"), &FindOptions::default(), "queryPlanner".parse().unwrap())
        .unwrap();
    assert!(report.execution_stats.is_none());
    assert_eq!(report.index_used(), Some("title_1"));
    assert!("allPlansExecution".parse::<ExplainVerbosity>().is_err());
}

#[test]
fn indexes_follow_writes() {
    let (_db, books) = seeded();
    books.ensure_indexes().unwrap();
    update_one(books.collection(), &Filter::eq("title", "1984"), &UpdateDoc::new().set("title", "Nineteen Eighty-Four"))
        .unwrap();
    assert!(books.by_title("1984").unwrap().is_none());
    assert_eq!(books.by_title("Nineteen Eighty-Four").unwrap().unwrap().author, "George Orwell");
    books.delete_by_title("Nineteen Eighty-Four").unwrap();
    assert!(books.by_title("Nineteen Eighty-Four").unwrap().is_none());
    books.insert(&Book::new("Emma", "Jane Austen", "Romance", 1815, 8.25, true)).unwrap();
    assert_eq!(titles(&books.find_by_author("Jane Austen").unwrap()), ["Pride and Prejudice", "Emma"]);
    let title_idx = books.collection().list_indexes().into_iter().find(|d| d.name == "title_1").unwrap();
    assert_eq!(title_idx.stats.entries, 12);
}

#[test]
fn null_equality_uses_index_and_matches_missing() {
    let (db, books) = seeded();
    db.insert_document("books", bookshelf::document::Document::new(doc! {"title": "Anonymous pamphlet"})).unwrap();
    let without = books.find(&Filter::eq("author", bson::Bson::Null), &FindOptions::default());
    // the pamphlet is not a well-formed Book
    assert!(without.is_err());
    let before = db.count("books", &Filter::eq("author", bson::Bson::Null)).unwrap();
    books.ensure_indexes().unwrap();
    let after = db.count("books", &Filter::eq("author", bson::Bson::Null)).unwrap();
    assert_eq!((before, after), (1, 1));
}

#[test]
fn index_admin_errors() {
    let (db, books) = seeded();
    books.ensure_indexes().unwrap();
    assert_eq!(books.ensure_indexes().unwrap().len(), 2);
    assert_eq!(books.collection().list_indexes().len(), 2);
    db.drop_index("books", "title_1").unwrap();
    assert!(matches!(db.drop_index("books", "title_1"), Err(DbError::IndexError(_))));
    assert!(db.create_index_json("books", r#"{"title": 2}"#).is_err());
    assert!(db.create_index_json("books", "{}").is_err());
}
