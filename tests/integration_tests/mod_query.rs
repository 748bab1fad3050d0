use super::support::{seeded, titles};
use bookshelf::book::Book;
use bookshelf::errors::DbError;
use bookshelf::query::{Filter, FindOptions, Order, Projection, SortSpec, find_one};
use bookshelf::utils::devlog::Capture;
use bson::{Bson, doc};

#[test]
fn range_filter_from_json() {
    let (db, _books) = seeded();
    let rows: Vec<Book> =
        db.find_json("books", r#"{"published_year": {"$gt": 1950}}"#, None, None).unwrap().deserialize().unwrap();
    assert_eq!(
        titles(&rows),
        ["To Kill a Mockingbird", "The Catcher in the Rye", "The Lord of the Rings", "The Alchemist"]
    );
}

#[test]
fn compound_filters() {
    let (db, books) = seeded();
    assert!(books.in_stock_published_after(2010).unwrap().is_empty());
    assert_eq!(books.in_stock_published_after(1950).unwrap().len(), 4);

    let count = |json: &str| db.find_json("books", json, None, None).unwrap().remaining();
    assert_eq!(count(r#"{"genre": {"$in": ["Fantasy", "Romance"]}}"#), 3);
    assert_eq!(count(r#"{"$or": [{"author": "George Orwell"}, {"price": {"$gte": 19}}]}"#), 3);
    assert_eq!(count(r#"{"$nor": [{"in_stock": true}]}"#), 3);
    assert_eq!(count(r#"{"genre": {"$ne": "Fiction"}}"#), 8);
    assert_eq!(count(r#"{"price": {"$lt": 9, "$gte": 8}}"#), 2);
    assert_eq!(count(r#"{"isbn": {"$exists": false}}"#), 12);
    assert_eq!(count(r#"{"published_year": {"$not": {"$lt": 1900}}}"#), 9);
    // strings never satisfy a numeric range
    assert_eq!(count(r#"{"title": {"$gt": 0}}"#), 0);
}

#[test]
fn unknown_operators_are_rejected() {
    let (db, _books) = seeded();
    let err = db.find_json("books", r#"{"price": {"$where": "1"}}"#, None, None).unwrap_err();
    assert!(matches!(err, DbError::QueryError(_)));
    assert!(db.find_json("books", r#"{"title": 1}"#, None, Some(r#"{"title": 1, "price": 0}"#)).is_err());
    assert!(db.find_json("books", "{}", Some(r#"{"price": 2}"#), None).is_err());
}

#[test]
fn projection_shapes_rows() {
    let (db, books) = seeded();
    let summaries = books.summaries().unwrap();
    assert_eq!(summaries.len(), 12);
    assert_eq!(summaries[1].title, "1984");
    assert_eq!(summaries[1].price, 10.99);

    let rows = db.find_json("books", "{}", None, Some(r#"{"title": 1}"#)).unwrap().to_vec();
    let keys: Vec<&str> = rows[0].keys().map(String::as_str).collect();
    assert_eq!(keys, ["_id", "title"]);

    let rows = db.find_json("books", "{}", None, Some(r#"{"_id": 0, "price": 0, "genre": 0}"#)).unwrap().to_vec();
    let keys: Vec<&str> = rows[0].keys().map(String::as_str).collect();
    assert_eq!(keys, ["title", "author", "published_year", "in_stock"]);
}

#[test]
fn sort_by_price_is_stable() {
    let (db, books) = seeded();
    let desc = books.sorted_by_price(Order::Desc).unwrap();
    assert_eq!(desc[0].title, "The Lord of the Rings");
    let asc = books.sorted_by_price(Order::Asc).unwrap();
    assert_eq!(
        titles(&asc)[..7],
        [
            "Pride and Prejudice",
            "Animal Farm",
            "The Catcher in the Rye",
            "The Great Gatsby",
            "Wuthering Heights",
            "1984",
            "The Alchemist"
        ]
    );
    let rows: Vec<Book> = db
        .find_json("books", r#"{"genre": "Fiction"}"#, Some(r#"{"price": -1, "title": 1}"#), None)
        .unwrap()
        .deserialize()
        .unwrap();
    assert_eq!(titles(&rows)[0], "To Kill a Mockingbird");
}

#[test]
fn missing_fields_sort_first() {
    let (db, _books) = seeded();
    db.insert_document("books", bookshelf::document::Document::new(doc! {"title": "Untitled draft"})).unwrap();
    let opts = FindOptions::new().with_sort(vec![SortSpec::asc("price")]).with_limit(1);
    let first = db.find("books", &Filter::True, &opts).unwrap().to_vec();
    assert_eq!(first[0].get_str("title").unwrap(), "Untitled draft");
}

#[test]
fn skip_and_limit_slice_the_result() {
    let (db, books) = seeded();
    let second: Vec<Book> = db
        .find("books", &Filter::True, &FindOptions::new().with_skip(5).with_limit(5))
        .unwrap()
        .deserialize()
        .unwrap();
    assert_eq!(second, books.page(2, 5).unwrap());
    assert_eq!(titles(&second)[0], "The Catcher in the Rye");
    let past_end = db.find("books", &Filter::True, &FindOptions::new().with_skip(50)).unwrap();
    assert_eq!(past_end.remaining(), 0);
    let unbounded = db.find("books", &Filter::True, &FindOptions::new().with_limit(0)).unwrap();
    assert_eq!(unbounded.remaining(), 12);
}

#[test]
fn find_one_returns_projected_first_match() {
    let (_db, books) = seeded();
    let projection = Projection::include(&["author"]).without_id();
    let row = find_one(books.collection(), &Filter::eq("genre", "Fantasy"), Some(&projection)).unwrap();
    assert_eq!(row, doc! {"author": "J.R.R. Tolkien"});
    assert!(find_one(books.collection(), &Filter::eq("genre", "Horror"), None).is_none());
}

#[test]
fn numbers_compare_by_value() {
    let (db, _books) = seeded();
    let by_int = db.count("books", &Filter::eq("published_year", Bson::Int64(1949))).unwrap();
    let by_double = db.count("books", &Filter::eq("published_year", 1949.0)).unwrap();
    assert_eq!((by_int, by_double), (1, 1));
}

#[test]
fn reads_emit_query_lines() {
    let (db, _books) = seeded();
    let cap = Capture::start();
    db.count("books", &Filter::True).unwrap();
    db.find("books", &Filter::eq("genre", "Fiction"), &FindOptions::default()).unwrap();
    let lines = cap.take();
    assert!(lines.iter().any(|l| l["bench"] == "query" && l["op"] == "count"));
    assert!(lines.iter().any(|l| l["op"] == "find" && l["result_count"] == 4));
}
