#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 8192 { return; }
    if let Ok(s) = std::str::from_utf8(data) {
        let _ = bookshelf::query::parse_filter_json(s);
        let _ = bookshelf::query::parse_sort_json(s);
        let _ = bookshelf::query::parse_projection_json(s);
    }
});
