//! Field-scope operator dispatch: equality shapes, comparisons, membership,
//! existence, pattern and structural operators.
//!
//! Parameterization policy: equality and membership operands always ride as
//! positional parameters; comparison, regex, `$mod`, `$size` and `$all`
//! operands are inlined through the literal quoting functions (single quotes
//! doubled), because they may be needed at plan time and are grouped with
//! ORDER BY rewrites.

use serde_json::{Map, Number, Value};

use crate::error::CompileError;
use crate::params::{Params, SqlParam};
use crate::quote::{quote_literal, quote_string};

use super::path::AccessPath;
use super::{Fragment, and_join, compile_document, negate, number_param};

/// Operators that force `$elemMatch` into object mode.
const LOGICAL_OPS: &[&str] = &["$and", "$or", "$nor", "$not"];

const JSONB_TYPES: &[&str] = &["string", "number", "boolean", "array", "object", "null"];

/// Compile an operator object `{$op: operand, ...}` against one field path.
/// Multiple operator clauses are AND-joined and wrapped in one pair of
/// parentheses; `$options` is consumed by a sibling `$regex`, never emitted.
pub(crate) fn compile_field_ops(
    path: &AccessPath,
    ops: &Map<String, Value>,
    params: &mut Params,
) -> Result<Fragment, CompileError> {
    let options = ops.get("$options").and_then(Value::as_str);

    let mut clauses = Vec::new();
    for (op, operand) in ops {
        if op == "$options" {
            continue;
        }
        clauses.push(compile_operator(path, op, operand, options, params)?);
    }
    Ok(and_join(clauses))
}

fn compile_operator(
    path: &AccessPath,
    op: &str,
    operand: &Value,
    options: Option<&str>,
    params: &mut Params,
) -> Result<Fragment, CompileError> {
    match op {
        "$eq" => equality(path, operand, params),
        "$ne" => not_equality(path, operand, params),
        "$gt" => Ok(comparison(path, ">", operand)),
        "$gte" => Ok(comparison(path, ">=", operand)),
        "$lt" => Ok(comparison(path, "<", operand)),
        "$lte" => Ok(comparison(path, "<=", operand)),
        "$in" => membership(path, operand, params, false),
        "$nin" => membership(path, operand, params, true),
        "$exists" => exists_clause(path, operand),
        "$regex" => Ok(regex_clause(path, operand, options)),
        "$mod" => Ok(mod_clause(path, operand)),
        "$size" => size_clause(path, operand),
        "$all" => all_clause(path, operand),
        "$elemMatch" => elem_match(path, operand, params),
        "$type" => type_clause(path, operand),
        "$not" => not_clause(path, operand, params),
        "$where" => Err(CompileError::Where),
        "$search" | "$text" => {
            tracing::warn!(operator = op, "unsupported text operator, skipping");
            Ok(Fragment::Empty)
        }
        _ => {
            tracing::warn!(operator = op, "unknown field operator, skipping");
            Ok(Fragment::Empty)
        }
    }
}

/// The container form, required by null handling and structural operators.
/// Absent only on the primitive `$elemMatch` pseudo-path, where these
/// operators have no meaning.
fn require_json<'a>(path: &'a AccessPath, op: &str) -> Result<&'a str, CompileError> {
    path.json().ok_or_else(|| {
        CompileError::InvalidElemMatch(format!("{op} is not supported on primitive array elements"))
    })
}

/// Equality against one field. Null matches both the missing key and JSON
/// null, mirroring MongoDB; the cast is chosen from the operand's runtime
/// type.
pub(crate) fn equality(
    path: &AccessPath,
    value: &Value,
    params: &mut Params,
) -> Result<Fragment, CompileError> {
    match value {
        Value::Null => {
            let jp = require_json(path, "$eq null")?;
            Ok(Fragment::Sql(format!(
                "({jp} IS NULL OR {jp} = 'null'::jsonb)"
            )))
        }
        Value::Object(map) if map.is_empty() => {
            let jp = require_json(path, "equality with {}")?;
            Ok(Fragment::Sql(format!("{jp}::jsonb = '{{}}'::jsonb")))
        }
        Value::Array(_) => {
            let jp = require_json(path, "array equality")?;
            let n = params.push(SqlParam::Json(value.clone()));
            Ok(Fragment::Sql(format!("{jp}::jsonb = ${n}::jsonb")))
        }
        Value::Bool(b) => {
            let n = params.push(SqlParam::Bool(*b));
            Ok(Fragment::Sql(format!("({})::boolean = ${n}", path.text())))
        }
        Value::Number(num) => {
            let cast = numeric_cast(num);
            let n = params.push(number_param(num));
            Ok(Fragment::Sql(format!("({})::{cast} = ${n}", path.text())))
        }
        Value::String(s) => {
            let n = params.push(SqlParam::Text(s.clone()));
            Ok(Fragment::Sql(format!("{} = ${n}", path.text())))
        }
        Value::Object(_) => {
            // Non-empty objects compare through their JSON serialization.
            let n = params.push(SqlParam::Text(value.to_string()));
            Ok(Fragment::Sql(format!("{} = ${n}", path.text())))
        }
    }
}

fn not_equality(
    path: &AccessPath,
    value: &Value,
    params: &mut Params,
) -> Result<Fragment, CompileError> {
    match value {
        Value::Null => {
            let jp = require_json(path, "$ne null")?;
            Ok(Fragment::Sql(format!(
                "({jp} IS NOT NULL AND {jp} != 'null'::jsonb)"
            )))
        }
        Value::Object(map) if map.is_empty() => {
            let jp = require_json(path, "$ne {}")?;
            Ok(Fragment::Sql(format!("{jp}::jsonb != '{{}}'::jsonb")))
        }
        Value::Array(_) => {
            let jp = require_json(path, "$ne array")?;
            let n = params.push(SqlParam::Json(value.clone()));
            Ok(Fragment::Sql(format!("{jp}::jsonb != ${n}::jsonb")))
        }
        Value::Bool(b) => {
            let n = params.push(SqlParam::Bool(*b));
            Ok(Fragment::Sql(format!(
                "({})::boolean IS DISTINCT FROM ${n}",
                path.text()
            )))
        }
        Value::Number(num) => {
            let cast = numeric_cast(num);
            let n = params.push(number_param(num));
            Ok(Fragment::Sql(format!(
                "({})::{cast} IS DISTINCT FROM ${n}",
                path.text()
            )))
        }
        Value::String(s) => {
            let n = params.push(SqlParam::Text(s.clone()));
            Ok(Fragment::Sql(format!("{} != ${n}", path.text())))
        }
        Value::Object(_) => {
            let n = params.push(SqlParam::Text(value.to_string()));
            Ok(Fragment::Sql(format!("{} != ${n}", path.text())))
        }
    }
}

/// `$gt`/`$gte`/`$lt`/`$lte`. The operand is inlined, not parameterized:
/// numbers compare under a `::numeric` cast, everything else textually.
fn comparison(path: &AccessPath, op: &str, operand: &Value) -> Fragment {
    match operand {
        Value::Number(n) => Fragment::Sql(format!("({})::numeric {op} {n}", path.text())),
        other => Fragment::Sql(format!("{} {op} {}", path.text(), quote_literal(other))),
    }
}

/// `$in` / `$nin`. Non-null elements are partitioned by runtime type into
/// homogeneous array parameters (integer, numeric, boolean, text, jsonb);
/// a null element adds the null/missing check alongside.
fn membership(
    path: &AccessPath,
    operand: &Value,
    params: &mut Params,
    negated: bool,
) -> Result<Fragment, CompileError> {
    let items = match operand {
        Value::Array(items) => items,
        _ => {
            tracing::warn!("$in/$nin operand must be an array");
            return Ok(Fragment::False);
        }
    };
    if items.is_empty() {
        // Nothing is in the empty set; everything is outside it.
        return Ok(if negated { Fragment::True } else { Fragment::False });
    }

    let mut ints: Vec<i64> = Vec::new();
    let mut floats: Vec<f64> = Vec::new();
    let mut bools: Vec<bool> = Vec::new();
    let mut strings: Vec<String> = Vec::new();
    let mut objects: Vec<Value> = Vec::new();
    let mut has_null = false;

    for item in items {
        match item {
            Value::Null => has_null = true,
            Value::Number(n) => match n.as_i64() {
                Some(i) => ints.push(i),
                None => floats.push(n.as_f64().unwrap_or(0.0)),
            },
            Value::Bool(b) => bools.push(*b),
            Value::String(s) => strings.push(s.clone()),
            other => objects.push(other.clone()),
        }
    }

    let ap = path.text();
    let op = if negated { "!= ALL" } else { "= ANY" };
    let mut groups: Vec<String> = Vec::new();

    if !ints.is_empty() {
        let n = params.push(SqlParam::IntArray(ints));
        groups.push(format!("({ap})::integer {op}(${n})"));
    }
    if !floats.is_empty() {
        let n = params.push(SqlParam::FloatArray(floats));
        groups.push(format!("({ap})::numeric {op}(${n})"));
    }
    if !bools.is_empty() {
        let n = params.push(SqlParam::BoolArray(bools));
        groups.push(format!("({ap})::boolean {op}(${n})"));
    }
    if !strings.is_empty() {
        let n = params.push(SqlParam::TextArray(strings));
        groups.push(format!("{ap} {op}(${n})"));
    }
    if !objects.is_empty() {
        let jp = require_json(path, "$in/$nin with object elements")?;
        let n = params.push(SqlParam::JsonArray(objects));
        groups.push(format!("{jp}::jsonb {op}(${n}::jsonb[])"));
    }

    let joiner = if negated { " AND " } else { " OR " };
    let groups_part = match groups.len() {
        0 => None,
        1 => Some(groups.pop().unwrap()),
        _ => Some(format!("({})", groups.join(joiner))),
    };

    if !has_null {
        // A non-empty array with no nulls always yields at least one group.
        return Ok(match groups_part {
            Some(g) => Fragment::Sql(g),
            None => {
                if negated {
                    Fragment::True
                } else {
                    Fragment::False
                }
            }
        });
    }

    let jp = require_json(path, "$in/$nin with null")?;
    let null_part = if negated {
        format!("({jp} IS NOT NULL AND {jp} != 'null'::jsonb)")
    } else {
        format!("({jp} IS NULL OR {jp} = 'null'::jsonb)")
    };
    Ok(match groups_part {
        Some(g) => Fragment::Sql(format!("({g}{joiner}{null_part})")),
        None => Fragment::Sql(null_part),
    })
}

fn exists_clause(path: &AccessPath, operand: &Value) -> Result<Fragment, CompileError> {
    let jp = require_json(path, "$exists")?;
    if js_truthy(operand) {
        Ok(Fragment::Sql(format!("{jp} IS NOT NULL")))
    } else {
        Ok(Fragment::Sql(format!("{jp} IS NULL")))
    }
}

/// `$regex`. Accepted operand shapes: a plain pattern, `/pattern/flags`,
/// or `[pattern, flags]`; a `$options` sibling supplies flags as a fallback.
fn regex_clause(path: &AccessPath, operand: &Value, options: Option<&str>) -> Fragment {
    let (pattern, flags) = match operand {
        Value::String(s) => parse_regex_string(s),
        Value::Array(items) => {
            let pattern = items.first().and_then(Value::as_str);
            let flags = items.get(1).and_then(Value::as_str);
            match pattern {
                Some(p) => (p.to_string(), flags.map(str::to_string)),
                None => {
                    tracing::warn!("$regex array operand must start with a pattern string");
                    return Fragment::False;
                }
            }
        }
        _ => {
            tracing::warn!("$regex operand must be a string or [pattern, flags]");
            return Fragment::False;
        }
    };

    let flags = flags.or_else(|| options.map(str::to_string)).unwrap_or_default();
    let op = if flags.contains('i') { "~*" } else { "~" };
    Fragment::Sql(format!("{} {op} {}", path.text(), quote_string(&pattern)))
}

fn parse_regex_string(s: &str) -> (String, Option<String>) {
    if let Some(rest) = s.strip_prefix('/') {
        if let Some(idx) = rest.rfind('/') {
            return (rest[..idx].to_string(), Some(rest[idx + 1..].to_string()));
        }
    }
    (s.to_string(), None)
}

fn mod_clause(path: &AccessPath, operand: &Value) -> Fragment {
    if let Value::Array(items) = operand {
        if let [Value::Number(d), Value::Number(r)] = items.as_slice() {
            return Fragment::Sql(format!("({})::numeric % {d} = {r}", path.text()));
        }
    }
    tracing::warn!("$mod operand must be [divisor, remainder]");
    Fragment::False
}

fn size_clause(path: &AccessPath, operand: &Value) -> Result<Fragment, CompileError> {
    let jp = require_json(path, "$size")?;
    match operand.as_u64() {
        Some(n) => Ok(Fragment::Sql(format!(
            "(jsonb_typeof({jp}) = 'array' AND jsonb_array_length({jp}) = {n})"
        ))),
        None => {
            tracing::warn!("$size operand must be a non-negative integer");
            Ok(Fragment::False)
        }
    }
}

fn all_clause(path: &AccessPath, operand: &Value) -> Result<Fragment, CompileError> {
    match operand {
        Value::Array(items) if items.is_empty() => Ok(Fragment::True),
        Value::Array(_) => {
            let jp = require_json(path, "$all")?;
            Ok(Fragment::Sql(format!(
                "{jp} @> {}::jsonb",
                quote_string(&operand.to_string())
            )))
        }
        _ => {
            tracing::warn!("$all operand must be an array");
            Ok(Fragment::False)
        }
    }
}

/// `$elemMatch`. Primitive mode (every key an operator, none logical)
/// expands the array as text and applies the operators to each element;
/// object mode re-enters document compilation rooted at the element alias.
/// An unconstrained inner clause reduces to a non-empty-array probe.
fn elem_match(
    path: &AccessPath,
    operand: &Value,
    params: &mut Params,
) -> Result<Fragment, CompileError> {
    let map = match operand {
        Value::Object(map) => map,
        _ => {
            tracing::warn!("$elemMatch operand must be an object");
            return Ok(Fragment::False);
        }
    };
    let jp = require_json(path, "$elemMatch")?.to_string();

    let primitive = !map.is_empty()
        && map.keys().all(|k| k.starts_with('$'))
        && !map.keys().any(|k| LOGICAL_OPS.contains(&k.as_str()));

    let (source, alias, inner) = if primitive {
        let elem = AccessPath::text_only("elem_val.value");
        let inner = compile_field_ops(&elem, map, params)?;
        ("jsonb_array_elements_text", "elem_val", inner)
    } else {
        let inner = compile_document(map, "elem", params)?;
        ("jsonb_array_elements", "elem", inner)
    };

    match inner {
        Fragment::Empty | Fragment::True => Ok(Fragment::Sql(format!(
            "({jp} IS NOT NULL AND jsonb_typeof({jp}) = 'array' AND jsonb_array_length({jp}) > 0)"
        ))),
        Fragment::False => Ok(Fragment::Sql(format!(
            "EXISTS (SELECT 1 FROM {source}({jp}) as {alias} WHERE FALSE)"
        ))),
        Fragment::Sql(s) => Ok(Fragment::Sql(format!(
            "EXISTS (SELECT 1 FROM {source}({jp}) as {alias} WHERE {s})"
        ))),
    }
}

fn type_clause(path: &AccessPath, operand: &Value) -> Result<Fragment, CompileError> {
    let jp = require_json(path, "$type")?;
    match operand.as_str() {
        Some(t) if JSONB_TYPES.contains(&t) => {
            Ok(Fragment::Sql(format!("jsonb_typeof({jp}) = '{t}'")))
        }
        _ => {
            tracing::warn!(operand = %operand, "unknown $type operand");
            Ok(Fragment::False)
        }
    }
}

/// `$not` in field scope: negate the inner operator object (or equality).
fn not_clause(
    path: &AccessPath,
    operand: &Value,
    params: &mut Params,
) -> Result<Fragment, CompileError> {
    let inner = match operand {
        Value::Object(map) if map.keys().next().is_some_and(|k| k.starts_with('$')) => {
            compile_field_ops(path, map, params)?
        }
        other => equality(path, other, params)?,
    };
    Ok(negate(inner))
}

fn numeric_cast(n: &Number) -> &'static str {
    let whole = n.is_i64()
        || n.is_u64()
        || n.as_f64().is_some_and(|f| f.is_finite() && f.fract() == 0.0);
    if whole { "integer" } else { "numeric" }
}

fn js_truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::compile_query;
    use serde_json::json;

    fn compile(query: Value) -> (Fragment, Params) {
        let mut params = Params::new();
        let frag = compile_query(&query, "data", &mut params).unwrap();
        (frag, params)
    }

    fn sql(query: Value) -> String {
        match compile(query).0 {
            Fragment::Sql(s) => s,
            other => panic!("expected Sql fragment, got {other:?}"),
        }
    }

    #[test]
    fn null_equality_matches_missing_and_json_null() {
        assert_eq!(
            sql(json!({ "a": null })),
            "(data->'a' IS NULL OR data->'a' = 'null'::jsonb)"
        );
    }

    #[test]
    fn empty_object_equality() {
        assert_eq!(sql(json!({ "a": {} })), "data->'a'::jsonb = '{}'::jsonb");
    }

    #[test]
    fn array_equality_is_parameterized_jsonb() {
        let (frag, params) = compile(json!({ "a": [1, 2] }));
        assert_eq!(frag, Fragment::Sql("data->'a'::jsonb = $1::jsonb".into()));
        assert_eq!(params.values(), &[SqlParam::Json(json!([1, 2]))]);
    }

    #[test]
    fn boolean_equality_casts() {
        let (frag, params) = compile(json!({ "active": true }));
        assert_eq!(
            frag,
            Fragment::Sql("(data->>'active')::boolean = $1".into())
        );
        assert_eq!(params.values(), &[SqlParam::Bool(true)]);
    }

    #[test]
    fn whole_number_equality_casts_integer() {
        assert_eq!(sql(json!({ "age": 30 })), "(data->>'age')::integer = $1");
        // A float with no fractional part still counts as whole
        assert_eq!(sql(json!({ "age": 3.0 })), "(data->>'age')::integer = $1");
    }

    #[test]
    fn fractional_number_equality_casts_numeric() {
        let (frag, params) = compile(json!({ "score": 99.5 }));
        assert_eq!(frag, Fragment::Sql("(data->>'score')::numeric = $1".into()));
        assert_eq!(params.values(), &[SqlParam::Float(99.5)]);
    }

    #[test]
    fn ne_null() {
        assert_eq!(
            sql(json!({ "a": { "$ne": null } })),
            "(data->'a' IS NOT NULL AND data->'a' != 'null'::jsonb)"
        );
    }

    #[test]
    fn ne_number_is_distinct_from() {
        assert_eq!(
            sql(json!({ "a": { "$ne": 5 } })),
            "(data->>'a')::integer IS DISTINCT FROM $1"
        );
    }

    #[test]
    fn ne_string_is_plain_inequality() {
        assert_eq!(sql(json!({ "a": { "$ne": "x" } })), "data->>'a' != $1");
    }

    #[test]
    fn comparison_inlines_numbers_under_numeric_cast() {
        let (_, params) = compile(json!({ "age": { "$gte": 21 } }));
        assert_eq!(
            sql(json!({ "age": { "$gte": 21 } })),
            "(data->>'age')::numeric >= 21"
        );
        assert!(params.is_empty());
    }

    #[test]
    fn comparison_inlines_strings_quoted() {
        assert_eq!(
            sql(json!({ "name": { "$lt": "O'Brien" } })),
            "data->>'name' < 'O''Brien'"
        );
    }

    #[test]
    fn multiple_operators_are_bracketed() {
        assert_eq!(
            sql(json!({ "age": { "$gte": 5, "$lt": 10 } })),
            "((data->>'age')::numeric >= 5 AND (data->>'age')::numeric < 10)"
        );
    }

    #[test]
    fn in_empty_is_false() {
        let (frag, params) = compile(json!({ "a": { "$in": [] } }));
        assert_eq!(frag, Fragment::False);
        assert!(params.is_empty());
    }

    #[test]
    fn nin_empty_is_true() {
        assert_eq!(compile(json!({ "a": { "$nin": [] } })).0, Fragment::True);
    }

    #[test]
    fn in_single_group_is_unbracketed() {
        let (frag, params) = compile(json!({ "status": { "$in": ["active", "pending"] } }));
        assert_eq!(frag, Fragment::Sql("data->>'status' = ANY($1)".into()));
        assert_eq!(
            params.values(),
            &[SqlParam::TextArray(vec!["active".into(), "pending".into()])]
        );
    }

    #[test]
    fn nin_single_group() {
        let (frag, params) = compile(json!({ "cat": { "$nin": ["archived", "deleted"] } }));
        assert_eq!(frag, Fragment::Sql("data->>'cat' != ALL($1)".into()));
        assert_eq!(
            params.values(),
            &[SqlParam::TextArray(vec![
                "archived".into(),
                "deleted".into()
            ])]
        );
    }

    #[test]
    fn in_mixed_types_group_and_null() {
        let (frag, params) = compile(json!({ "values": { "$in": [1, "two", null, 3.0] } }));
        assert_eq!(
            frag,
            Fragment::Sql(
                "(((data->>'values')::integer = ANY($1) OR (data->>'values')::numeric = ANY($2) \
                 OR data->>'values' = ANY($3)) OR (data->'values' IS NULL OR data->'values' = \
                 'null'::jsonb))"
                    .into()
            )
        );
        assert_eq!(
            params.values(),
            &[
                SqlParam::IntArray(vec![1]),
                SqlParam::FloatArray(vec![3.0]),
                SqlParam::TextArray(vec!["two".into()])
            ]
        );
    }

    #[test]
    fn in_only_null() {
        assert_eq!(
            sql(json!({ "a": { "$in": [null] } })),
            "(data->'a' IS NULL OR data->'a' = 'null'::jsonb)"
        );
    }

    #[test]
    fn nin_with_null_joins_with_and() {
        assert_eq!(
            sql(json!({ "a": { "$nin": ["x", null] } })),
            "(data->>'a' != ALL($1) AND (data->'a' IS NOT NULL AND data->'a' != 'null'::jsonb))"
        );
    }

    #[test]
    fn in_object_elements_compare_as_jsonb() {
        let (frag, params) = compile(json!({ "a": { "$in": [{ "k": 1 }] } }));
        assert_eq!(
            frag,
            Fragment::Sql("data->'a'::jsonb = ANY($1::jsonb[])".into())
        );
        assert_eq!(params.values(), &[SqlParam::JsonArray(vec![json!({"k": 1})])]);
    }

    #[test]
    fn exists_truthy_and_falsy() {
        assert_eq!(
            sql(json!({ "a": { "$exists": true } })),
            "data->'a' IS NOT NULL"
        );
        assert_eq!(sql(json!({ "a": { "$exists": 0 } })), "data->'a' IS NULL");
    }

    #[test]
    fn regex_plain_pattern() {
        assert_eq!(
            sql(json!({ "email": { "$regex": "^admin@" } })),
            "data->>'email' ~ '^admin@'"
        );
    }

    #[test]
    fn regex_slash_delimited_with_flags() {
        assert_eq!(
            sql(json!({ "name": { "$regex": "/^john/i" } })),
            "data->>'name' ~* '^john'"
        );
    }

    #[test]
    fn regex_array_shape() {
        assert_eq!(
            sql(json!({ "name": { "$regex": ["^jo", "i"] } })),
            "data->>'name' ~* '^jo'"
        );
    }

    #[test]
    fn regex_options_sibling_sets_flags() {
        assert_eq!(
            sql(json!({ "name": { "$regex": "^john", "$options": "i" } })),
            "data->>'name' ~* '^john'"
        );
    }

    #[test]
    fn regex_single_quotes_are_doubled() {
        assert_eq!(
            sql(json!({ "name": { "$regex": "o'b" } })),
            "data->>'name' ~ 'o''b'"
        );
    }

    #[test]
    fn mod_clause_inlines_both_operands() {
        assert_eq!(
            sql(json!({ "n": { "$mod": [4, 1] } })),
            "(data->>'n')::numeric % 4 = 1"
        );
    }

    #[test]
    fn mod_invalid_is_false() {
        assert_eq!(compile(json!({ "n": { "$mod": [4] } })).0, Fragment::False);
        assert_eq!(
            compile(json!({ "n": { "$mod": "x" } })).0,
            Fragment::False
        );
    }

    #[test]
    fn size_probe() {
        assert_eq!(
            sql(json!({ "tags": { "$size": 3 } })),
            "(jsonb_typeof(data->'tags') = 'array' AND jsonb_array_length(data->'tags') = 3)"
        );
    }

    #[test]
    fn size_negative_is_false() {
        assert_eq!(
            compile(json!({ "tags": { "$size": -1 } })).0,
            Fragment::False
        );
    }

    #[test]
    fn all_inlines_containment() {
        assert_eq!(
            sql(json!({ "tags": { "$all": ["a", "b"] } })),
            "data->'tags' @> '[\"a\",\"b\"]'::jsonb"
        );
    }

    #[test]
    fn all_empty_is_true() {
        assert_eq!(
            compile(json!({ "tags": { "$all": [] } })).0,
            Fragment::True
        );
    }

    #[test]
    fn type_known_and_unknown() {
        assert_eq!(
            sql(json!({ "a": { "$type": "string" } })),
            "jsonb_typeof(data->'a') = 'string'"
        );
        assert_eq!(
            compile(json!({ "a": { "$type": "decimal" } })).0,
            Fragment::False
        );
    }

    #[test]
    fn field_not_negates() {
        assert_eq!(
            sql(json!({ "a": { "$not": { "$gt": 5 } } })),
            "NOT ((data->>'a')::numeric > 5)"
        );
    }

    #[test]
    fn field_not_of_empty_array_membership_is_false() {
        // inner $nin: [] is trivially true, so $not flips it to false
        assert_eq!(
            compile(json!({ "a": { "$not": { "$nin": [] } } })).0,
            Fragment::False
        );
        assert_eq!(
            compile(json!({ "a": { "$not": { "$in": [] } } })).0,
            Fragment::True
        );
    }

    #[test]
    fn elem_match_object_mode() {
        let (frag, params) = compile(json!({
            "items": { "$elemMatch": { "product": "apple", "quantity": { "$gte": 5 } } }
        }));
        assert_eq!(
            frag,
            Fragment::Sql(
                "EXISTS (SELECT 1 FROM jsonb_array_elements(data->'items') as elem WHERE \
                 elem->>'product' = $1 AND (elem->>'quantity')::numeric >= 5)"
                    .into()
            )
        );
        assert_eq!(params.values(), &[SqlParam::Text("apple".into())]);
    }

    #[test]
    fn elem_match_primitive_mode() {
        assert_eq!(
            sql(json!({ "scores": { "$elemMatch": { "$gte": 90 } } })),
            "EXISTS (SELECT 1 FROM jsonb_array_elements_text(data->'scores') as elem_val \
             WHERE (elem_val.value)::numeric >= 90)"
        );
    }

    #[test]
    fn elem_match_empty_operand_reduces_to_array_probe() {
        assert_eq!(
            sql(json!({ "tags": { "$elemMatch": {} } })),
            "(data->'tags' IS NOT NULL AND jsonb_typeof(data->'tags') = 'array' AND \
             jsonb_array_length(data->'tags') > 0)"
        );
    }

    #[test]
    fn elem_match_primitive_rejects_null_sensitive_operators() {
        let mut params = Params::new();
        let err = compile_query(
            &json!({ "a": { "$elemMatch": { "$exists": true } } }),
            "data",
            &mut params,
        )
        .unwrap_err();
        assert!(matches!(err, CompileError::InvalidElemMatch(_)));
    }

    #[test]
    fn elem_match_primitive_rejects_null_equality() {
        let mut params = Params::new();
        let err = compile_query(
            &json!({ "a": { "$elemMatch": { "$eq": null } } }),
            "data",
            &mut params,
        )
        .unwrap_err();
        assert!(matches!(err, CompileError::InvalidElemMatch(_)));
    }

    #[test]
    fn unknown_operator_emits_nothing() {
        let (frag, params) = compile(json!({ "a": { "$fuzzy": 1, "$gt": 2 } }));
        assert_eq!(frag, Fragment::Sql("(data->>'a')::numeric > 2".into()));
        assert!(params.is_empty());
    }

    #[test]
    fn search_emits_nothing() {
        assert_eq!(
            compile(json!({ "a": { "$search": "hay" } })).0,
            Fragment::Empty
        );
    }
}
