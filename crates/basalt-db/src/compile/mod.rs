//! The query-to-SQL compiler: a recursive descent over a MongoDB-shaped
//! query document that emits a boolean SQL fragment over a JSONB column and
//! appends positional parameters to a shared vector.
//!
//! Fragments are propagated symbolically: `Empty` means "no constraint",
//! `True`/`False` are known truth values that callers can collapse (an AND
//! containing `False` is `False`, an OR with no surviving children is
//! `False`), and `Sql` carries a well-bracketed boolean expression.

mod field;
mod path;
mod renumber;
mod update;

pub use renumber::renumber;
pub use update::build_update;

pub(crate) use path::AccessPath;

use serde_json::{Map, Number, Value};

use crate::error::CompileError;
use crate::params::{Params, SqlParam};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Fragment {
    Empty,
    True,
    False,
    Sql(String),
}

/// Document-level operators handled outside field dispatch.
const LOGICAL_OPS: &[&str] = &["$and", "$or", "$nor", "$not", "$text", "$where"];

/// Compile a query document into a WHERE clause (with leading `" WHERE "`)
/// or an empty string when the query carries no constraint.
pub fn build_where(query: &Value, json_field: &str) -> Result<(String, Params), CompileError> {
    let mut params = Params::new();
    let frag = compile_query(query, json_field, &mut params)?;
    Ok((where_clause(&frag), params))
}

pub(crate) fn where_clause(frag: &Fragment) -> String {
    match frag {
        Fragment::Empty => String::new(),
        Fragment::True => " WHERE TRUE".to_string(),
        Fragment::False => " WHERE FALSE".to_string(),
        Fragment::Sql(s) => format!(" WHERE {s}"),
    }
}

pub(crate) fn compile_query(
    query: &Value,
    root: &str,
    params: &mut Params,
) -> Result<Fragment, CompileError> {
    match query {
        Value::Null => Ok(Fragment::Empty),
        Value::Object(map) => compile_document(map, root, params),
        other => Err(CompileError::InvalidQuery(format!(
            "query must be an object, got {other}"
        ))),
    }
}

/// Walk one document scope: field paths and document-level operators, joined
/// with AND. A `True` entry marks the document trivially true (so the caller
/// can still emit `WHERE TRUE`); a `False` entry collapses the whole scope.
pub(crate) fn compile_document(
    doc: &Map<String, Value>,
    root: &str,
    params: &mut Params,
) -> Result<Fragment, CompileError> {
    let mut parts: Vec<String> = Vec::new();
    let mut trivially_true = false;

    for (key, value) in doc {
        let frag = match key.as_str() {
            "$where" => return Err(CompileError::Where),
            "$text" => {
                // Full-text search is not supported; it constrains nothing.
                tracing::warn!("$text is not supported, matching everything");
                Fragment::True
            }
            "$and" => match logical_children(key, value, root, params)? {
                Some(children) => and_join(children),
                None => Fragment::Empty,
            },
            "$or" => match logical_children(key, value, root, params)? {
                Some(children) => or_join(children),
                None => Fragment::Empty,
            },
            "$nor" => compile_nor(key, value, root, params)?,
            "$not" => compile_doc_not(value, root, params)?,
            k if k.starts_with('$') => {
                tracing::warn!(operator = k, "unknown top-level operator, skipping");
                Fragment::Empty
            }
            _ => {
                let access = AccessPath::build(root, key);
                match value {
                    Value::Object(map) if is_operator_object(map) => {
                        field::compile_field_ops(&access, map, params)?
                    }
                    _ => field::equality(&access, value, params)?,
                }
            }
        };

        match frag {
            Fragment::Empty => {}
            Fragment::True => trivially_true = true,
            Fragment::False => return Ok(Fragment::False),
            Fragment::Sql(s) => parts.push(s),
        }
    }

    match parts.len() {
        0 if trivially_true => Ok(Fragment::True),
        0 => Ok(Fragment::Empty),
        1 => Ok(Fragment::Sql(parts.pop().unwrap())),
        _ => Ok(Fragment::Sql(parts.join(" AND "))),
    }
}

/// An operator object is a non-empty object whose first key is an operator.
/// An empty object is an equality operand (`{} = '{}'::jsonb`).
fn is_operator_object(map: &Map<String, Value>) -> bool {
    map.keys().next().is_some_and(|k| k.starts_with('$'))
}

fn logical_children(
    op: &str,
    value: &Value,
    root: &str,
    params: &mut Params,
) -> Result<Option<Vec<Fragment>>, CompileError> {
    match value {
        Value::Array(items) => {
            let mut children = Vec::with_capacity(items.len());
            for item in items {
                children.push(compile_query(item, root, params)?);
            }
            Ok(Some(children))
        }
        _ => {
            tracing::warn!(operator = op, "operand must be an array, skipping");
            Ok(None)
        }
    }
}

/// Join sub-fragments with AND. `Empty`/`True` children constrain nothing
/// and are dropped; a `False` child collapses the join; no survivors means
/// the clause is trivially true.
pub(crate) fn and_join(children: Vec<Fragment>) -> Fragment {
    let mut parts = Vec::new();
    for child in children {
        match child {
            Fragment::Empty | Fragment::True => {}
            Fragment::False => return Fragment::False,
            Fragment::Sql(s) => parts.push(s),
        }
    }
    match parts.len() {
        0 => Fragment::True,
        1 => Fragment::Sql(parts.pop().unwrap()),
        _ => Fragment::Sql(format!("({})", parts.join(" AND "))),
    }
}

/// Join sub-fragments with OR. `Empty`/`True` children are dropped (they
/// carry no constraint), `False` children are identity for OR; with no
/// survivors the clause is false.
pub(crate) fn or_join(children: Vec<Fragment>) -> Fragment {
    let mut parts = Vec::new();
    for child in children {
        if let Fragment::Sql(s) = child {
            parts.push(s);
        }
    }
    match parts.len() {
        0 => Fragment::False,
        1 => Fragment::Sql(parts.pop().unwrap()),
        _ => Fragment::Sql(format!("({})", parts.join(" OR "))),
    }
}

fn compile_nor(
    op: &str,
    value: &Value,
    root: &str,
    params: &mut Params,
) -> Result<Fragment, CompileError> {
    let items = match value {
        Value::Array(items) => items,
        _ => {
            tracing::warn!(operator = op, "operand must be an array, skipping");
            return Ok(Fragment::Empty);
        }
    };
    if items.is_empty() {
        return Ok(Fragment::True);
    }

    let mut parts = Vec::new();
    for item in items {
        match compile_query(item, root, params)? {
            Fragment::Empty | Fragment::False => {}
            // NOT (... OR TRUE) can never hold
            Fragment::True => return Ok(Fragment::False),
            Fragment::Sql(s) => parts.push(s),
        }
    }
    if parts.is_empty() {
        return Ok(Fragment::True);
    }
    Ok(Fragment::Sql(format!("NOT ({})", parts.join(" OR "))))
}

/// `$not` at document scope. A pure operator object (every key an operator,
/// none document-level) is compiled in field scope against a dummy path;
/// anything else is a sub-document.
fn compile_doc_not(
    operand: &Value,
    root: &str,
    params: &mut Params,
) -> Result<Fragment, CompileError> {
    let inner = match operand {
        Value::Object(map) => {
            let pure_operators = !map.is_empty()
                && map.keys().all(|k| k.starts_with('$'))
                && !map.keys().any(|k| LOGICAL_OPS.contains(&k.as_str()));
            if pure_operators {
                let dummy = AccessPath::build(root, "$not");
                field::compile_field_ops(&dummy, map, params)?
            } else {
                compile_query(operand, root, params)?
            }
        }
        _ => {
            tracing::warn!("$not operand must be an object, skipping");
            Fragment::Empty
        }
    };
    Ok(negate(inner))
}

/// Invert a fragment. An unconstrained (or trivially true) inner clause
/// negates to false.
pub(crate) fn negate(inner: Fragment) -> Fragment {
    match inner {
        Fragment::Empty | Fragment::True => Fragment::False,
        Fragment::False => Fragment::True,
        Fragment::Sql(s) => Fragment::Sql(format!("NOT ({s})")),
    }
}

/// Parameter variant for a JSON number: integral values ride as `Int`,
/// everything else as `Float`.
pub(crate) fn number_param(n: &Number) -> SqlParam {
    match n.as_i64() {
        Some(i) => SqlParam::Int(i),
        None => SqlParam::Float(n.as_f64().unwrap_or(0.0)),
    }
}
