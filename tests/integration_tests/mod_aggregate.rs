use super::support::seeded;
use bookshelf::aggregate::{Accumulator, Expr, GroupStage, Pipeline};
use bookshelf::errors::DbError;
use bookshelf::query::{Filter, Projection, SortSpec};
use bson::{Bson, doc};

#[test]
fn average_price_by_genre() {
    let (_db, books) = seeded();
    let stats = books.average_price_by_genre().unwrap();
    let genres: Vec<&str> = stats.iter().map(|g| g.genre.as_str()).collect();
    assert_eq!(
        genres,
        ["Fiction", "Dystopian", "Fantasy", "Romance", "Political Satire", "Adventure", "Gothic Fiction"]
    );
    let fiction = &stats[0];
    assert_eq!(fiction.count, 4);
    let avg = fiction.average_price.unwrap();
    assert!((avg - 10.74).abs() < 1e-9, "fiction average was {avg}");
}

#[test]
fn top_author_from_json_pipeline() {
    let (db, books) = seeded();
    let rows = db
        .aggregate_json(
            "books",
            r#"[{"$group": {"_id": "$author", "count": {"$sum": 1}}}, {"$sort": {"count": -1}}, {"$limit": 1}]"#,
        )
        .unwrap();
    assert_eq!(rows, vec![doc! {"_id": "George Orwell", "count": 2}]);
    let top = books.top_author().unwrap().unwrap();
    assert_eq!((top.author.as_str(), top.count), ("George Orwell", 2));
}

#[test]
fn decade_pipeline_matches_typed_helper() {
    let (db, books) = seeded();
    let rows = db
        .aggregate_json(
            "books",
            r#"[
                {"$group": {
                    "_id": {"$concat": [
                        {"$toString": {"$multiply": [{"$floor": {"$divide": ["$published_year", 10]}}, 10]}},
                        "s"
                    ]},
                    "count": {"$sum": 1}
                }},
                {"$sort": {"_id": 1}}
            ]"#,
        )
        .unwrap();
    let labels: Vec<&str> = rows.iter().map(|r| r.get_str("_id").unwrap()).collect();
    assert_eq!(labels, ["1810s", "1840s", "1850s", "1920s", "1930s", "1940s", "1950s", "1960s", "1980s"]);
    let typed = books.count_by_decade().unwrap();
    assert_eq!(typed.len(), rows.len());
    assert_eq!(typed[5].count, 2);
}

#[test]
fn match_project_skip_limit_chain() {
    let (db, _books) = seeded();
    let pipeline = Pipeline::new()
        .matching(Filter::eq("in_stock", true))
        .sort(vec![SortSpec::desc("price")])
        .skip(1)
        .limit(2)
        .project(Projection::include(&["title"]).without_id());
    let rows = db.aggregate("books", &pipeline).unwrap();
    assert_eq!(rows, vec![doc! {"title": "The Hobbit"}, doc! {"title": "To Kill a Mockingbird"}]);
}

#[test]
fn compound_keys_and_min_max() {
    let (db, _books) = seeded();
    let pipeline = Pipeline::new()
        .group(
            GroupStage::by(Expr::Object(vec![
                ("genre".into(), Expr::field("genre")),
                ("in_stock".into(), Expr::field("in_stock")),
            ]))
            .with("cheapest", Accumulator::Min(Expr::field("price")))
            .with("dearest", Accumulator::Max(Expr::field("price")))
            .with("total", Accumulator::Sum(Expr::field("price"))),
        )
        .matching(Filter::eq("_id.genre", "Fantasy"));
    let rows = db.aggregate("books", &pipeline).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("cheapest"), Some(&Bson::Double(14.99)));
    assert_eq!(rows[0].get("dearest"), Some(&Bson::Double(19.99)));
}

#[test]
fn expression_errors_surface() {
    let (db, _books) = seeded();
    let err = db.aggregate_json("books", r#"[{"$group": {"_id": {"$divide": ["$price", 0]}}}]"#).unwrap_err();
    assert!(matches!(err, DbError::AggregateError(_)));
    let err = db.aggregate_json("books", r#"[{"$group": {"_id": {"$concat": ["$title", "$price"]}}}]"#).unwrap_err();
    assert!(matches!(err, DbError::AggregateError(_)));
    assert!(db.aggregate_json("books", r#"[{"$out": "copy"}]"#).is_err());
}

#[test]
fn missing_years_group_under_null() {
    let (db, books) = seeded();
    db.insert_document("books", bookshelf::document::Document::new(doc! {"title": "Undated"})).unwrap();
    let decades = books.count_by_decade().unwrap();
    assert_eq!(decades[0].decade, None);
    assert_eq!(decades[0].count, 1);
}
