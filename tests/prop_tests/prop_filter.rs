use super::{arb_books, load};
use bookshelf::book::Book;
use bookshelf::query::{Filter, FindOptions};
use proptest::prelude::*;

proptest! {
    #![proptest_config(proptest::test_runner::Config {
        failure_persistence: Some(Box::new(proptest::test_runner::FileFailurePersistence::WithSource("proptest-regressions"))),
        cases: 32,
        .. proptest::test_runner::Config::default()
    })]

    #[test]
    fn prop_filter_returns_exactly_the_matches(books in arb_books(40), year in 1800i32..2025, in_stock in any::<bool>()) {
        let (_db, handle) = load(&books);
        let filter = Filter::eq("in_stock", in_stock).and(Filter::gt("published_year", year));
        let got = handle.find(&filter, &FindOptions::default()).unwrap();
        let expected: Vec<Book> =
            books.iter().filter(|b| b.in_stock == in_stock && b.published_year > year).cloned().collect();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn prop_genre_json_filter_matches_typed(books in arb_books(30), genre in prop::sample::select(super::GENRES)) {
        let (db, handle) = load(&books);
        let json = format!("{{\"genre\": \"{genre}\"}}");
        let via_json: Vec<Book> = db.find_json("books", &json, None, None).unwrap().deserialize().unwrap();
        prop_assert_eq!(&via_json, &handle.find_by_genre(genre).unwrap());
        prop_assert_eq!(via_json.len(), books.iter().filter(|b| b.genre == genre).count());
    }
}
