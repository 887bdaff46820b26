mod common;
use common::*;

use basalt_db::{SelectOptions, Sort, SqlParam, build_count, build_select};
use serde_json::json;

// ── SELECT assembly ─────────────────────────────────────────────

#[test]
fn empty_query_selects_the_whole_table() {
    let (sql, params) = select("users", &json!({}));
    assert_eq!(sql, "SELECT \"data\" FROM \"users\"");
    assert!(params.is_empty());
}

#[test]
fn equality_on_string_and_integer() {
    let (sql, params) = select("users", &json!({ "name": "John Doe", "age": 30 }));
    assert_eq!(
        sql,
        "SELECT \"data\" FROM \"users\" WHERE data->>'name' = $1 AND \
         (data->>'age')::integer = $2"
    );
    assert_eq!(
        params.values(),
        &[SqlParam::Text("John Doe".into()), SqlParam::Int(30)]
    );
    assert_placeholders(&sql, params.len());
}

#[test]
fn membership_and_exclusion() {
    let (sql, params) = select(
        "items",
        &json!({
            "status": { "$in": ["active", "pending"] },
            "category": { "$nin": ["archived", "deleted"] }
        }),
    );
    assert_eq!(
        sql,
        "SELECT \"data\" FROM \"items\" WHERE data->>'status' = ANY($1) AND \
         data->>'category' != ALL($2)"
    );
    assert_eq!(
        params.values(),
        &[
            SqlParam::TextArray(vec!["active".into(), "pending".into()]),
            SqlParam::TextArray(vec!["archived".into(), "deleted".into()])
        ]
    );
    assert_placeholders(&sql, params.len());
}

#[test]
fn mixed_type_membership_with_null() {
    let (sql, params) = select("mixed", &json!({ "values": { "$in": [1, "two", null, 3.0] } }));
    assert_eq!(
        sql,
        "SELECT \"data\" FROM \"mixed\" WHERE (((data->>'values')::integer = ANY($1) OR \
         (data->>'values')::numeric = ANY($2) OR data->>'values' = ANY($3)) OR \
         (data->'values' IS NULL OR data->'values' = 'null'::jsonb))"
    );
    assert_eq!(
        params.values(),
        &[
            SqlParam::IntArray(vec![1]),
            SqlParam::FloatArray(vec![3.0]),
            SqlParam::TextArray(vec!["two".into()])
        ]
    );
    assert_placeholders(&sql, params.len());
}

#[test]
fn deep_dotted_path() {
    let (sql, params) = select("events", &json!({ "metadata.user.address.country": "CA" }));
    assert_eq!(
        sql,
        "SELECT \"data\" FROM \"events\" WHERE \
         data->'metadata'->'user'->'address'->>'country' = $1"
    );
    assert_eq!(params.values(), &[SqlParam::Text("CA".into())]);
}

#[test]
fn numeric_path_segments_index_arrays() {
    let (sql, _) = select("logs", &json!({ "entries.2.level": "error" }));
    assert_eq!(
        sql,
        "SELECT \"data\" FROM \"logs\" WHERE data->'entries'->2->>'level' = $1"
    );
}

// ── Logical edges ───────────────────────────────────────────────

#[test]
fn empty_and_emits_where_true() {
    let (sql, params) = select("t", &json!({ "$and": [] }));
    assert_eq!(sql, "SELECT \"data\" FROM \"t\" WHERE TRUE");
    assert!(params.is_empty());
}

#[test]
fn empty_or_emits_where_false() {
    let (sql, _) = select("t", &json!({ "$or": [] }));
    assert_eq!(sql, "SELECT \"data\" FROM \"t\" WHERE FALSE");
}

#[test]
fn empty_nin_emits_where_true() {
    let (sql, _) = select("t", &json!({ "a": { "$nin": [] } }));
    assert_eq!(sql, "SELECT \"data\" FROM \"t\" WHERE TRUE");
}

#[test]
fn empty_in_emits_where_false() {
    let (sql, _) = select("t", &json!({ "a": { "$in": [] } }));
    assert_eq!(sql, "SELECT \"data\" FROM \"t\" WHERE FALSE");
}

#[test]
fn or_over_subdocuments() {
    let (sql, params) = select(
        "accounts",
        &json!({ "$or": [{ "status": "snoozed" }, { "status": "rejected" }] }),
    );
    assert_eq!(
        sql,
        "SELECT \"data\" FROM \"accounts\" WHERE (data->>'status' = $1 OR \
         data->>'status' = $2)"
    );
    assert_placeholders(&sql, params.len());
}

#[test]
fn nested_logical_operators() {
    let (sql, params) = select(
        "accounts",
        &json!({
            "$or": [
                { "status": "active" },
                { "$and": [{ "score": { "$gt": 90 } }, { "verified": true }] }
            ]
        }),
    );
    assert_eq!(
        sql,
        "SELECT \"data\" FROM \"accounts\" WHERE (data->>'status' = $1 OR \
         ((data->>'score')::numeric > 90 AND (data->>'verified')::boolean = $2))"
    );
    assert_placeholders(&sql, params.len());
}

// ── Options ─────────────────────────────────────────────────────

#[test]
fn sort_limit_offset_and_schema() {
    let opts = SelectOptions {
        schema: Some("app".into()),
        limit: Some(25),
        offset: Some(50),
        sort: vec![Sort::desc("created.at"), Sort::asc("name")],
        ..Default::default()
    };
    let (sql, _) = build_select("users", &json!({ "active": true }), &opts).unwrap();
    assert_eq!(
        sql,
        "SELECT \"data\" FROM \"app\".\"users\" WHERE (data->>'active')::boolean = $1 \
         ORDER BY data->'created'->>'at' DESC, data->>'name' ASC LIMIT 25 OFFSET 50"
    );
}

#[test]
fn custom_json_field_threads_through_paths() {
    let opts = SelectOptions {
        json_field: Some("doc".into()),
        ..Default::default()
    };
    let (sql, _) = build_select("users", &json!({ "name": "Ada" }), &opts).unwrap();
    assert_eq!(
        sql,
        "SELECT \"doc\" FROM \"users\" WHERE doc->>'name' = $1"
    );
}

#[test]
fn count_with_filter() {
    let (sql, params) = build_count(
        "users",
        &json!({ "age": { "$gte": 18 } }),
        &SelectOptions::default(),
    )
    .unwrap();
    assert_eq!(
        sql,
        "SELECT COUNT(*) AS count FROM \"users\" WHERE (data->>'age')::numeric >= 18"
    );
    assert!(params.is_empty());
}

// ── Parameter ordering ──────────────────────────────────────────

#[test]
fn parameter_order_follows_document_order() {
    let (sql, params) = select(
        "t",
        &json!({ "a": "1", "b": "2", "c": { "$in": ["3", "4"] }, "d": true }),
    );
    assert_eq!(
        params.values(),
        &[
            SqlParam::Text("1".into()),
            SqlParam::Text("2".into()),
            SqlParam::TextArray(vec!["3".into(), "4".into()]),
            SqlParam::Bool(true)
        ]
    );
    assert_placeholders(&sql, 4);
}
