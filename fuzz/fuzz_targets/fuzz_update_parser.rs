#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 8192 { return; }
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(update) = bookshelf::query::parse_update_json(s) {
            let mut doc = bson::doc! {"title": "1984", "price": 10.99, "meta": {"copies": 3}};
            let _ = bookshelf::query::apply_update(&mut doc, &update);
        }
    }
});
