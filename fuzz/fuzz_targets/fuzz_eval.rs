#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 8192 { return; }
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(filter) = bookshelf::query::parse_filter_json(s) {
            let docs = [
                bson::doc! {"title": "1984", "published_year": 1949, "price": 10.99, "in_stock": true},
                bson::doc! {"title": "Moby Dick", "tags": ["sea", "whale"], "meta": {"pages": 635}},
                bson::doc! {"in_stock": false, "price": null},
            ];
            for d in &docs {
                let _ = bookshelf::query::eval_filter(d, &filter);
            }
        }
    }
});
