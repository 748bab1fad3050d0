#![cfg(test)]

// Test-only fixtures shared by unit tests.
use crate::collection::Collection;
use crate::document::Document;
use crate::storage::{MemoryStorage, StorageEngine};
use bson::doc;
use parking_lot::RwLock;
use std::sync::Arc;

/// A collection backed by in-memory storage.
pub fn memory_collection(name: &str) -> Arc<Collection> {
    let storage: Box<dyn StorageEngine> = Box::new(MemoryStorage::new());
    Arc::new(Collection::new(name, Arc::new(RwLock::new(storage))))
}

pub fn book_doc(title: &str, author: &str, genre: &str, year: i32, price: f64, in_stock: bool) -> Document {
    Document::new(doc! {
        "title": title,
        "author": author,
        "genre": genre,
        "published_year": year,
        "price": price,
        "in_stock": in_stock,
    })
}

/// A small catalogue covering several genres, authors and decades.
pub fn sample_books() -> Vec<Document> {
    vec![
        book_doc("To Kill a Mockingbird", "Harper Lee", "Fiction", 1960, 12.99, true),
        book_doc("1984", "George Orwell", "Dystopian", 1949, 10.99, true),
        book_doc("The Great Gatsby", "F. Scott Fitzgerald", "Fiction", 1925, 9.99, true),
        book_doc("Brave New World", "Aldous Huxley", "Dystopian", 1932, 11.50, false),
        book_doc("The Hobbit", "J.R.R. Tolkien", "Fantasy", 1937, 14.99, true),
        book_doc("The Catcher in the Rye", "J.D. Salinger", "Fiction", 1951, 8.99, true),
        book_doc("Pride and Prejudice", "Jane Austen", "Romance", 1813, 7.99, true),
        book_doc("The Lord of the Rings", "J.R.R. Tolkien", "Fantasy", 1954, 19.99, true),
        book_doc("Animal Farm", "George Orwell", "Political Satire", 1945, 8.50, false),
        book_doc("The Alchemist", "Paulo Coelho", "Fiction", 1988, 10.99, true),
        book_doc("Moby Dick", "Herman Melville", "Adventure", 1851, 12.50, false),
        book_doc("Wuthering Heights", "Emily Bronte", "Gothic Fiction", 1847, 9.99, true),
    ]
}

/// `sample_books` loaded into a fresh in-memory collection.
pub fn books_collection() -> Arc<Collection> {
    let col = memory_collection("books");
    for d in sample_books() {
        col.insert_document(d).expect("insert sample book");
    }
    col
}
