use super::support::{catalogue, seeded, titles};
use bookshelf::book::Book;
use bookshelf::query::telemetry;
use bookshelf::Database;
use parking_lot::RwLock;
use std::sync::Arc;

#[test]
fn bookstore_walkthrough() {
    let (_db, books) = seeded();
    assert_eq!(titles(&books.find_by_author("George Orwell").unwrap()), ["1984", "Animal Farm"]);
    assert_eq!(books.published_after(1950).unwrap().len(), 4);
    assert_eq!(books.by_title("1984").unwrap().unwrap().price, 10.99);
    books.set_price("1984", 12.99).unwrap();
    assert_eq!(books.by_title("1984").unwrap().unwrap().price, 12.99);
    assert_eq!(books.delete_by_title("Moby Dick").unwrap().deleted, 1);
    assert_eq!(books.summaries().unwrap().len(), 11);
}

#[test]
fn books_handle_creates_collection_once() {
    let db = Database::in_memory();
    let a = db.books().unwrap();
    let b = db.books().unwrap();
    a.insert(&catalogue()[0]).unwrap();
    assert_eq!(b.collection().len(), 1);
    assert_eq!(db.list_collection_names(), vec!["books".to_string()]);
}

#[test]
fn typed_round_trip() {
    let db = Database::in_memory();
    let books = db.books().unwrap();
    let dune = Book::new("Dune", "Frank Herbert", "Science Fiction", 1965, 9.5, true);
    books.insert(&dune).unwrap();
    assert_eq!(books.by_title("Dune").unwrap(), Some(dune));
}

#[test]
fn writes_are_audited() {
    let sink = Arc::new(RwLock::new(Vec::new()));
    telemetry::set_audit_sink_for_tests(sink.clone());
    let (_db, books) = seeded();
    books.set_price("The Hobbit", 15.99).unwrap();
    let lines = sink.read();
    assert!(lines.iter().any(|l| l.contains("\"op\":\"insert\"") && l.contains("\"collection\":\"books\"")));
    assert!(lines.iter().any(|l| l.contains("\"op\":\"update\"")));
    let before = telemetry::metrics_snapshot();
    books.average_price_by_genre().unwrap();
    assert!(telemetry::metrics_snapshot().aggregations_total > before.aggregations_total);
}
