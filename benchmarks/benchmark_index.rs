//! Synthetic bookstore benchmark: plans and timings for indexed vs. unindexed lookups.
//! Usage: cargo run --release --bin benchmark_index [book_count]

use bookshelf::Database;
use bookshelf::book::{Book, Books};
use bookshelf::query::ExplainReport;
use fake::faker::lorem::en::Words;
use fake::faker::name::en::Name;
use fake::{Fake, Faker};
use std::time::Instant;

const GENRES: &[&str] = &["Fiction", "Dystopian", "Fantasy", "Romance", "Adventure", "Gothic Fiction"];
const DEFAULT_BOOKS: usize = 50_000;

fn synthetic_book(authors: &[String]) -> Book {
    let words: Vec<String> = Words(2..5).fake();
    Book {
        title: words.join(" "),
        author: authors[(0..authors.len()).fake::<usize>()].clone(),
        genre: GENRES[(0..GENRES.len()).fake::<usize>()].to_string(),
        published_year: (1800..2025).fake::<i32>(),
        price: f64::from((199..4999).fake::<u32>()) / 100.0,
        in_stock: Faker.fake::<bool>(),
    }
}

fn report(label: &str, r: &ExplainReport) {
    let stats = r.execution_stats.unwrap_or_default();
    println!(
        "{{\"bench\":\"index\",\"case\":\"{label}\",\"plan\":\"{}\",\"nReturned\":{},\"totalKeysExamined\":{},\"totalDocsExamined\":{},\"executionTimeMillis\":{}}}",
        r.stages().join(">"),
        stats.n_returned,
        stats.total_keys_examined,
        stats.total_docs_examined,
        stats.execution_time_millis
    );
}

fn run_cases(books: &Books, phase: &str, probe: &Book) {
    report(&format!("{phase}:title"), &books.explain_title_lookup(&probe.title));
    report(&format!("{phase}:author_since_1950"), &books.explain_author_since(&probe.author, 1950));
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let count = std::env::args().nth(1).and_then(|s| s.parse().ok()).unwrap_or(DEFAULT_BOOKS);
    let authors: Vec<String> = (0..200).map(|_| Name().fake()).collect();

    let db = Database::in_memory();
    let books = db.books()?;
    let start = Instant::now();
    let catalogue: Vec<Book> = (0..count).map(|_| synthetic_book(&authors)).collect();
    books.insert_many(&catalogue)?;
    println!("loaded {count} books in {} ms", start.elapsed().as_millis());

    let Some(probe) = catalogue.get(count / 2) else {
        return Ok(());
    };
    run_cases(&books, "collscan", probe);

    let start = Instant::now();
    let names = books.ensure_indexes()?;
    println!("built {} in {} ms", names.join(", "), start.elapsed().as_millis());
    run_cases(&books, "ixscan", probe);
    Ok(())
}
