use super::support::{seeded, titles};
use bookshelf::errors::DbError;
use bookshelf::query::{Filter, FindOptions, UpdateDoc, update_many, update_one};
use bson::Bson;

#[test]
fn find_by_genre_keeps_insertion_order() {
    let (_db, books) = seeded();
    let fiction = books.find_by_genre("Fiction").unwrap();
    assert_eq!(
        titles(&fiction),
        ["To Kill a Mockingbird", "The Great Gatsby", "The Catcher in the Rye", "The Alchemist"]
    );
    assert!(books.find_by_genre("Cookbook").unwrap().is_empty());
}

#[test]
fn update_one_json_changes_only_the_first_match() {
    let (db, books) = seeded();
    let report = db.update_one_json("books", r#"{"title": "1984"}"#, r#"{"$set": {"price": 12.99}}"#).unwrap();
    assert_eq!((report.matched, report.modified), (1, 1));
    assert_eq!(books.by_title("1984").unwrap().unwrap().price, 12.99);

    // Same value again matches but modifies nothing.
    let again = db.update_one_json("books", r#"{"title": "1984"}"#, r#"{"$set": {"price": 12.99}}"#).unwrap();
    assert_eq!((again.matched, again.modified), (1, 0));
}

#[test]
fn update_without_match_leaves_collection_untouched() {
    let (_db, books) = seeded();
    let before = books.collection().documents();
    let report =
        update_one(books.collection(), &Filter::eq("title", "Dune"), &UpdateDoc::new().set("price", 1.0)).unwrap();
    assert_eq!(report.matched, 0);
    assert_eq!(books.collection().documents(), before);
}

#[test]
fn update_many_inc_keeps_integer_years() {
    let (_db, books) = seeded();
    let report =
        update_many(books.collection(), &Filter::eq("author", "George Orwell"), &UpdateDoc::new().inc("published_year", 1))
            .unwrap();
    assert_eq!(report.modified, 2);
    let rows = bookshelf::query::find_docs(books.collection(), &Filter::eq("author", "George Orwell"), &FindOptions::default())
        .to_vec();
    assert_eq!(rows[0].get("published_year"), Some(&Bson::Int32(1950)));
    assert_eq!(rows[1].get("published_year"), Some(&Bson::Int32(1946)));
}

#[test]
fn invalid_updates_are_rejected() {
    let (db, _books) = seeded();
    assert!(matches!(db.update_one_json("books", "{}", "{}"), Err(DbError::QueryError(_))));
    assert!(db.update_one_json("books", "{}", r#"{"$inc": {"price": "a lot"}}"#).is_err());
    assert!(db.update_one_json("books", "{}", r#"{"$rename": {"price": "cost"}}"#).is_err());
    assert!(db.update_one_json("books", "{}", r#"{"$set": {"_id": "x"}}"#).is_err());
}

#[test]
fn delete_one_removes_a_single_document() {
    let (db, books) = seeded();
    let report = db.delete_one_json("books", r#"{"title": "Moby Dick"}"#).unwrap();
    assert_eq!(report.deleted, 1);
    assert_eq!(db.count("books", &Filter::True).unwrap(), 11);
    assert!(books.by_title("Moby Dick").unwrap().is_none());
    assert_eq!(books.delete_by_title("Moby Dick").unwrap().deleted, 0);
    assert_eq!(db.count("books", &Filter::True).unwrap(), 11);
}

#[test]
fn delete_one_with_duplicates_takes_the_earliest() {
    let (_db, books) = seeded();
    let mut copy = books.by_title("The Hobbit").unwrap().unwrap();
    copy.price = 1.0;
    books.insert(&copy).unwrap();
    books.delete_by_title("The Hobbit").unwrap();
    let left = books.find(&Filter::eq("title", "The Hobbit"), &FindOptions::default()).unwrap();
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].price, 1.0);
}

#[test]
fn delete_many_and_missing_collection() {
    let (db, _books) = seeded();
    let report = db.delete_many("books", &Filter::eq("in_stock", false)).unwrap();
    assert_eq!(report.deleted, 3);
    assert_eq!(db.count("books", &Filter::True).unwrap(), 9);
    assert!(matches!(db.count("magazines", &Filter::True), Err(DbError::NoSuchCollection(_))));
}
