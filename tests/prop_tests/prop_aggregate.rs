use super::{arb_books, load};
use proptest::prelude::*;

proptest! {
    #![proptest_config(proptest::test_runner::Config {
        failure_persistence: Some(Box::new(proptest::test_runner::FileFailurePersistence::WithSource("proptest-regressions"))),
        cases: 32,
        .. proptest::test_runner::Config::default()
    })]

    #[test]
    fn prop_count_times_average_is_the_total(books in arb_books(40)) {
        let (_db, handle) = load(&books);
        let stats = handle.average_price_by_genre().unwrap();
        let mut counted = 0i64;
        for g in &stats {
            let total: f64 = books.iter().filter(|b| b.genre == g.genre).map(|b| b.price).sum();
            let avg = g.average_price.unwrap();
            #[allow(clippy::cast_precision_loss)]
            let product = g.count as f64 * avg;
            prop_assert!((product - total).abs() < 1e-6, "{}: {} * {} != {}", g.genre, g.count, avg, total);
            counted += g.count;
        }
        prop_assert_eq!(counted, i64::try_from(books.len()).unwrap());
    }

    #[test]
    fn prop_decade_counts_cover_every_book(books in arb_books(40)) {
        let (_db, handle) = load(&books);
        let decades = handle.count_by_decade().unwrap();
        prop_assert_eq!(decades.iter().map(|d| d.count).sum::<i64>(), i64::try_from(books.len()).unwrap());
        for d in &decades {
            let label = d.decade.clone().unwrap();
            let expected = books.iter().filter(|b| format!("{}s", b.published_year / 10 * 10) == label).count();
            prop_assert_eq!(d.count, i64::try_from(expected).unwrap());
        }
    }
}
