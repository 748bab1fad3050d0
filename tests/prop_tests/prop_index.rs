use super::{AUTHORS, arb_books, load};
use bookshelf::query::{Filter, FindOptions};
use proptest::prelude::*;

proptest! {
    #![proptest_config(proptest::test_runner::Config {
        failure_persistence: Some(Box::new(proptest::test_runner::FileFailurePersistence::WithSource("proptest-regressions"))),
        cases: 32,
        .. proptest::test_runner::Config::default()
    })]

    #[test]
    fn prop_index_does_not_change_results(
        books in arb_books(40),
        author in prop::sample::select(AUTHORS),
        year in 1800i32..2025,
        n in 0u16..40,
    ) {
        let (_db, handle) = load(&books);
        let filters = [
            Filter::eq("author", author).and(Filter::gt("published_year", year)),
            Filter::eq("author", author).and(Filter::lte("published_year", year)),
            Filter::eq("title", format!("Title {n}")),
            Filter::gte("title", format!("Title {n}")),
        ];
        let opts = FindOptions::default();
        let before: Vec<_> = filters.iter().map(|f| handle.find(f, &opts).unwrap()).collect();
        handle.ensure_indexes().unwrap();
        let after: Vec<_> = filters.iter().map(|f| handle.find(f, &opts).unwrap()).collect();
        prop_assert_eq!(before, after);
        prop_assert!(handle.explain_author_since(author, year).index_used().is_some());
    }
}
