use super::{arb_books, load};
use bookshelf::book::Book;
use bookshelf::query::{Filter, FindOptions, SortSpec};
use proptest::prelude::*;

proptest! {
    #![proptest_config(proptest::test_runner::Config {
        failure_persistence: Some(Box::new(proptest::test_runner::FileFailurePersistence::WithSource("proptest-regressions"))),
        cases: 32,
        .. proptest::test_runner::Config::default()
    })]

    #[test]
    fn prop_pages_partition_sorted_results(books in arb_books(40), per_page in 1usize..8) {
        let (_db, handle) = load(&books);
        let opts = FindOptions::new().with_sort(vec![SortSpec::asc("price")]);
        let all = handle.find(&Filter::True, &opts).unwrap();
        let mut stitched: Vec<Book> = Vec::new();
        let mut skip = 0;
        loop {
            let page = handle.find(&Filter::True, &opts.clone().with_skip(skip).with_limit(per_page)).unwrap();
            prop_assert!(page.len() <= per_page);
            if page.is_empty() {
                break;
            }
            stitched.extend(page);
            skip += per_page;
        }
        prop_assert_eq!(stitched, all);
    }

    #[test]
    fn prop_skip_limit_is_a_slice(books in arb_books(30), skip in 0usize..35, limit in 0usize..10) {
        let (_db, handle) = load(&books);
        let got = handle.find(&Filter::True, &FindOptions::new().with_skip(skip).with_limit(limit)).unwrap();
        let take = if limit == 0 { usize::MAX } else { limit };
        let expected: Vec<Book> = books.iter().skip(skip).take(take).cloned().collect();
        prop_assert_eq!(got, expected);
    }
}
