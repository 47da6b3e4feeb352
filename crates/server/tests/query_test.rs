#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Query engine integration tests.
//!
//! Exercises the normalize → build pipeline and the envelope invariants
//! end to end, without a database.

use campdir_server::query::builder::SelectBuilder;
use campdir_server::query::{
    ComparisonOp, FilterCondition, FilterValue, PageLink, Pagination, ResultEnvelope,
    SortDirection, normalize,
};
use campdir_server::storage::{BOOTCAMPS, COURSES, REVIEWS, USERS};
use serde_json::json;

fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
    raw.iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

// -------------------------------------------------------------------------
// Normalizer
// -------------------------------------------------------------------------

#[test]
fn full_query_string_round_trip() {
    let raw = pairs(&[
        ("select", "name,rating"),
        ("sort", "-rating,name"),
        ("page", "2"),
        ("limit", "5"),
        ("housing", "true"),
        ("tuition[lte]", "12000"),
    ]);
    let (filter, directives) = normalize(&raw);

    assert_eq!(directives.select, vec!["name", "rating"]);
    assert_eq!(directives.sort.len(), 2);
    assert_eq!(directives.sort[0].field, "rating");
    assert_eq!(directives.sort[0].direction, SortDirection::Desc);
    assert_eq!(directives.sort[1].field, "name");
    assert_eq!(directives.sort[1].direction, SortDirection::Asc);
    assert_eq!(directives.page, 2);
    assert_eq!(directives.limit, 5);

    assert_eq!(filter.clauses.len(), 2);
    assert_eq!(
        filter.clauses[0].condition,
        FilterCondition::Equals(FilterValue::Bool(true))
    );
    assert_eq!(
        filter.clauses[1].condition,
        FilterCondition::Compare {
            op: ComparisonOp::Lte,
            value: FilterValue::Int(12000),
        }
    );
}

#[test]
fn operator_words_in_field_names_survive() {
    // Only whole bracket segments are operators.
    let raw = pairs(&[("budget", "5000"), ("budget[gte]", "1"), ("gt", "x")]);
    let (filter, _) = normalize(&raw);

    assert!(matches!(
        filter.clauses[0].condition,
        FilterCondition::Equals(_)
    ));
    assert!(matches!(
        filter.clauses[1].condition,
        FilterCondition::Compare {
            op: ComparisonOp::Gte,
            ..
        }
    ));
    // A bare field literally named "gt" stays an equality filter.
    assert_eq!(filter.clauses[2].path, "gt");
    assert!(matches!(
        filter.clauses[2].condition,
        FilterCondition::Equals(_)
    ));
}

#[test]
fn bad_pagination_input_never_errors() {
    for bad in ["abc", "-1", "0", "", "1.5", "NaN"] {
        let raw = pairs(&[("page", bad), ("limit", bad)]);
        let (_, directives) = normalize(&raw);
        assert_eq!(directives.page, 1, "page input {bad:?}");
        assert_eq!(directives.limit, 20, "limit input {bad:?}");
    }
}

#[test]
fn normalize_is_pure() {
    let raw = pairs(&[("location[city]", "Boston"), ("careers[in]", "Business")]);
    assert_eq!(normalize(&raw), normalize(&raw));
    // Input untouched afterwards.
    assert_eq!(raw[0].0, "location[city]");
}

// -------------------------------------------------------------------------
// Builder over each collection
// -------------------------------------------------------------------------

#[test]
fn bootcamp_listing_matches_filters_and_window() {
    let raw = pairs(&[
        ("average_cost[lte]", "10000"),
        ("location[city]", "Boston"),
        ("select", "name,description,average_cost"),
        ("sort", "-average_cost"),
        ("page", "2"),
        ("limit", "10"),
    ]);
    let (filter, directives) = normalize(&raw);
    let sql = SelectBuilder::new(&BOOTCAMPS, &filter, &directives).build();

    assert!(sql.contains("FROM \"bootcamp\""));
    assert!(sql.contains("\"average_cost\" <= 10000"), "sql: {sql}");
    assert!(sql.contains("location->>'city'"), "sql: {sql}");
    assert!(sql.contains("\"average_cost\" DESC"), "sql: {sql}");
    assert!(sql.contains("LIMIT 10"));
    assert!(sql.contains("OFFSET 10"));
}

#[test]
fn count_and_fetch_observe_the_same_filter() {
    let raw = pairs(&[("minimum_skill", "beginner"), ("page", "4"), ("limit", "25")]);
    let (filter, directives) = normalize(&raw);
    let builder = SelectBuilder::new(&COURSES, &filter, &directives);

    let fetch = builder.build();
    let count = builder.build_count();

    assert!(fetch.contains("minimum_skill"));
    assert!(count.contains("minimum_skill"));
    assert!(count.contains("COUNT(*)"));
    // The window only applies to the fetch.
    assert!(fetch.contains("LIMIT 25") && fetch.contains("OFFSET 75"));
    assert!(!count.contains("LIMIT") && !count.contains("OFFSET"));
}

#[test]
fn review_rating_filter_binds_numerically() {
    let raw = pairs(&[("rating[gte]", "8")]);
    let (filter, directives) = normalize(&raw);
    let sql = SelectBuilder::new(&REVIEWS, &filter, &directives).build();

    assert!(sql.contains("\"rating\" >= 8"), "sql: {sql}");
    assert!(!sql.contains("'8'"), "rating must not be a string: {sql}");
}

#[test]
fn user_listing_never_exposes_password() {
    let raw = pairs(&[
        ("select", "name,email,password"),
        ("password", "secret"),
        ("sort", "-password"),
    ]);
    let (filter, directives) = normalize(&raw);
    let sql = SelectBuilder::new(&USERS, &filter, &directives).build();

    assert!(!sql.contains("password"), "sql: {sql}");
}

#[test]
fn default_sort_is_descending_creation_time() {
    let (filter, directives) = normalize(&[]);

    for collection in [&BOOTCAMPS, &COURSES, &REVIEWS, &USERS] {
        let sql = SelectBuilder::new(collection, &filter, &directives).build();
        assert!(
            sql.contains("\"created_at\" DESC"),
            "{}: {sql}",
            collection.name
        );
    }
}

// -------------------------------------------------------------------------
// Envelope invariants
// -------------------------------------------------------------------------

#[test]
fn next_link_appears_iff_more_documents_exist() {
    // page * limit < total  <=>  next present
    let cases = [
        (1, 10, 25, true),
        (2, 10, 25, true),
        (3, 10, 25, false),
        (1, 10, 10, false),
        (1, 10, 11, true),
        (5, 20, 0, false),
    ];

    for (page, limit, total, expect_next) in cases {
        let p = Pagination::new(page, limit, total);
        assert_eq!(
            p.next.is_some(),
            expect_next,
            "page={page} limit={limit} total={total}"
        );
        assert_eq!(p.prev.is_some(), page > 1);
    }
}

#[test]
fn twenty_three_documents_page_three_scenario() {
    // 23 documents, page=3, limit=10: skip 20, take 3.
    let window: Vec<serde_json::Value> = (20..23).map(|i| json!({ "n": i })).collect();
    let envelope = ResultEnvelope::new(window, Pagination::new(3, 10, 23));

    assert_eq!(envelope.count, 3);
    assert_eq!(
        envelope.pagination.prev,
        Some(PageLink { page: 2, limit: 10 })
    );
    assert!(envelope.pagination.next.is_none());
}

#[test]
fn envelope_serializes_to_the_wire_shape() {
    let envelope = ResultEnvelope::new(
        vec![json!({ "id": "a" })],
        Pagination::new(2, 1, 3),
    );
    let wire = serde_json::to_value(&envelope).unwrap();

    assert_eq!(wire["success"], true);
    assert_eq!(wire["count"], 1);
    assert_eq!(wire["pagination"]["prev"], json!({ "page": 1, "limit": 1 }));
    assert_eq!(wire["pagination"]["next"], json!({ "page": 3, "limit": 1 }));
    assert_eq!(wire["data"][0]["id"], "a");
}
