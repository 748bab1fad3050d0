#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 8192 { return; }
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(pipeline) = bookshelf::aggregate::parse_pipeline_json(s) {
            let rows = vec![
                bson::doc! {"genre": "Fiction", "price": 12.99, "published_year": 1960},
                bson::doc! {"genre": "Fantasy", "price": 14.99, "published_year": 1937},
                bson::doc! {"title": "Undated"},
            ];
            let _ = bookshelf::aggregate::run_stages(rows, &pipeline.stages);
        }
    }
});
