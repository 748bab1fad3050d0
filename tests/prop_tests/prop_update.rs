use super::{arb_books, load};
use bookshelf::query::{Filter, UpdateDoc, delete_one, update_one};
use proptest::prelude::*;

proptest! {
    #![proptest_config(proptest::test_runner::Config {
        failure_persistence: Some(Box::new(proptest::test_runner::FileFailurePersistence::WithSource("proptest-regressions"))),
        cases: 32,
        .. proptest::test_runner::Config::default()
    })]

    #[test]
    fn prop_no_match_leaves_collection_unchanged(books in arb_books(20), price in 0.0f64..100.0) {
        let (_db, handle) = load(&books);
        let before = handle.collection().documents();
        let missing = Filter::eq("title", "No Such Title");
        let report = update_one(handle.collection(), &missing, &UpdateDoc::new().set("price", price)).unwrap();
        prop_assert_eq!(report.matched, 0);
        prop_assert_eq!(delete_one(handle.collection(), &missing).unwrap().deleted, 0);
        prop_assert_eq!(handle.collection().documents(), before);
    }

    #[test]
    fn prop_set_price_is_read_back(books in arb_books(20), n in 0u16..40, price in 0.0f64..100.0) {
        let (_db, handle) = load(&books);
        let title = format!("Title {n}");
        let report = handle.set_price(&title, price).unwrap();
        let first = books.iter().position(|b| b.title == title);
        prop_assert_eq!(report.matched, u64::from(first.is_some()));
        if first.is_some() {
            prop_assert_eq!(handle.by_title(&title).unwrap().unwrap().price, price);
        }
    }
}
