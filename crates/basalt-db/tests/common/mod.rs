use basalt_db::{Params, SelectOptions, build_select};
use serde_json::Value;

/// Build a SELECT with default options.
pub fn select(table: &str, query: &Value) -> (String, Params) {
    build_select(table, query, &SelectOptions::default()).unwrap()
}

/// Assert the placeholder invariant: every `$N` for `N` in `1..=len`
/// appears in the SQL, the total occurrence count equals `len`, and no
/// higher placeholder exists.
pub fn assert_placeholders(sql: &str, len: usize) {
    let re = regex::Regex::new(r"\$(\d+)").unwrap();
    let indices: Vec<usize> = re
        .captures_iter(sql)
        .map(|c| c[1].parse().unwrap())
        .collect();
    assert_eq!(
        indices.len(),
        len,
        "expected {len} placeholder occurrences in {sql:?}, found {indices:?}"
    );
    for n in 1..=len {
        assert!(
            indices.contains(&n),
            "placeholder ${n} missing from {sql:?}"
        );
    }
    assert!(
        indices.iter().all(|n| *n >= 1 && *n <= len),
        "out-of-range placeholder in {sql:?}"
    );
}
