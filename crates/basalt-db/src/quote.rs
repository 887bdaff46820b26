use serde_json::Value;

/// Quote a SQL identifier, doubling embedded double quotes.
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote a SQL string literal, doubling embedded single quotes.
pub(crate) fn quote_string(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Inline a JSON scalar as a SQL literal. Strings are single-quoted with
/// doubling; numbers and booleans are emitted bare; null becomes SQL NULL.
/// Containers fall back to their JSON serialization, quoted as a string.
pub(crate) fn quote_literal(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => quote_string(s),
        other => quote_string(&other.to_string()),
    }
}

/// Build a JSONB text-path literal: `'{"a","b","2"}'`. Each segment carries
/// its own JSON double-quotes; the whole literal is then single-quoted with
/// doubling so embedded quotes cannot escape it.
pub(crate) fn quote_path_literal(path: &str) -> String {
    let body = path
        .split('.')
        .map(|seg| Value::String(seg.to_string()).to_string())
        .collect::<Vec<_>>()
        .join(",");
    quote_string(&format!("{{{body}}}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ident_doubles_double_quotes() {
        assert_eq!(quote_ident("users"), "\"users\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn string_doubles_single_quotes() {
        assert_eq!(quote_string("O'Brien"), "'O''Brien'");
    }

    #[test]
    fn literal_shapes() {
        assert_eq!(quote_literal(&json!("a'b")), "'a''b'");
        assert_eq!(quote_literal(&json!(5)), "5");
        assert_eq!(quote_literal(&json!(2.5)), "2.5");
        assert_eq!(quote_literal(&json!(true)), "true");
        assert_eq!(quote_literal(&json!(null)), "null");
    }

    #[test]
    fn path_literal_carries_json_quotes() {
        assert_eq!(quote_path_literal("wallet"), "'{\"wallet\"}'");
        assert_eq!(
            quote_path_literal("profile.level"),
            "'{\"profile\",\"level\"}'"
        );
        assert_eq!(quote_path_literal("a.2.c"), "'{\"a\",\"2\",\"c\"}'");
    }

    #[test]
    fn path_literal_segment_quote_cannot_escape() {
        // A segment with a single quote stays inside the literal.
        assert_eq!(quote_path_literal("a'b"), "'{\"a''b\"}'");
    }
}
