use super::support::catalogue;
use bookshelf::Database;
use bookshelf::errors::DbError;
use bookshelf::query::Filter;
use bookshelf::storage::{StorageEngine, WalStorage};
use std::io::Write;

#[test]
fn reopen_restores_documents_and_indexes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plp_bookstore.wal");
    {
        let db = Database::open(&path).unwrap();
        let books = db.books().unwrap();
        books.insert_many(&catalogue()).unwrap();
        books.ensure_indexes().unwrap();
        books.set_price("1984", 12.99).unwrap();
        books.delete_by_title("Moby Dick").unwrap();
        db.create_collection("scratch").unwrap();
        db.drop_collection("scratch").unwrap();
        db.sync().unwrap();
    }
    let db = Database::open(&path).unwrap();
    assert_eq!(db.list_collection_names(), vec!["books".to_string()]);
    let books = db.books().unwrap();
    assert_eq!(db.count("books", &Filter::True).unwrap(), 11);
    assert_eq!(books.by_title("1984").unwrap().unwrap().price, 12.99);
    let names: Vec<String> = books.collection().list_indexes().into_iter().map(|d| d.name).collect();
    assert_eq!(names, vec!["title_1".to_string(), "author_1_published_year_-1".to_string()]);
    assert_eq!(books.explain_title_lookup("1984").index_used(), Some("title_1"));
    // natural order survives the replay
    assert_eq!(books.page(1, 1).unwrap()[0].title, "To Kill a Mockingbird");
}

#[test]
fn torn_tail_is_dropped_on_open() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("torn.wal");
    {
        let db = Database::open(&path).unwrap();
        db.books().unwrap().insert_many(&catalogue()[..3]).unwrap();
    }
    let mut f = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
    f.write_all(&[0x20, 0x00, 0x00]).unwrap();
    drop(f);
    let db = Database::open(&path).unwrap();
    assert_eq!(db.count("books", &Filter::True).unwrap(), 3);
    db.books().unwrap().insert(&catalogue()[3]).unwrap();
    drop(db);
    assert_eq!(Database::open(&path).unwrap().count("books", &Filter::True).unwrap(), 4);
}

#[test]
fn corrupt_record_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("corrupt.wal");
    {
        let mut wal = WalStorage::open(&path).unwrap();
        wal.append(&bookshelf::types::Operation::CreateCollection { collection: "books".into() }).unwrap();
    }
    let mut bytes = std::fs::read(&path).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0x5A;
    std::fs::write(&path, &bytes).unwrap();
    assert!(matches!(Database::open(&path), Err(DbError::WalError(_))));
}

#[test]
fn in_memory_describes_itself() {
    let db = Database::in_memory();
    assert_eq!(db.engine().describe_storage(), "memory");
    db.sync().unwrap();
}

#[test]
fn dropped_collection_stays_dropped_after_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dropped.wal");
    {
        let db = Database::open(&path).unwrap();
        let books = db.books().unwrap();
        books.insert(&catalogue()[0]).unwrap();
        assert!(db.drop_collection("books").unwrap());
        assert!(matches!(books.insert(&catalogue()[1]), Err(DbError::NoSuchCollection(_))));
        assert!(db.list_collection_names().is_empty());
        db.sync().unwrap();
    }
    let db = Database::open(&path).unwrap();
    assert!(db.list_collection_names().is_empty());
}
