use bookshelf::Database;
use bookshelf::book::{Book, Books};
use proptest::prelude::*;

mod prop_aggregate;
mod prop_filter;
mod prop_index;
mod prop_pagination;
mod prop_update;

const GENRES: &[&str] = &["Fiction", "Dystopian", "Fantasy", "Romance", "Adventure"];
const AUTHORS: &[&str] = &["George Orwell", "Jane Austen", "J.R.R. Tolkien", "Harper Lee"];

pub fn arb_book() -> impl Strategy<Value = Book> {
    (0..GENRES.len(), 0..AUTHORS.len(), 1800i32..2025, 100u32..5000, any::<bool>(), 0u16..40).prop_map(
        |(g, a, year, cents, in_stock, n)| Book {
            title: format!("Title {n}"),
            author: AUTHORS[a].to_string(),
            genre: GENRES[g].to_string(),
            published_year: year,
            price: f64::from(cents) / 100.0,
            in_stock,
        },
    )
}

pub fn arb_books(max: usize) -> impl Strategy<Value = Vec<Book>> {
    prop::collection::vec(arb_book(), 0..max)
}

pub fn load(books: &[Book]) -> (Database, Books) {
    let db = Database::in_memory();
    let handle = db.books().unwrap();
    handle.insert_many(books).unwrap();
    (db, handle)
}
