//! Final statement assembly: SELECT/COUNT/DELETE/UPDATE over one collection
//! table, composed from the compiler's WHERE fragment and SET expression.

use basalt_query::{Sort, UpdateDoc};
use serde_json::Value;

use crate::compile::{self, AccessPath, build_update, renumber};
use crate::error::CompileError;
use crate::params::{Params, SqlParam};
use crate::quote::quote_ident;

pub const DEFAULT_JSON_FIELD: &str = "data";

/// Options for [`build_select`] and [`build_count`].
#[derive(Debug, Clone, Default)]
pub struct SelectOptions {
    pub json_field: Option<String>,
    pub schema: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub sort: Vec<Sort>,
}

impl SelectOptions {
    fn json_field(&self) -> &str {
        self.json_field.as_deref().unwrap_or(DEFAULT_JSON_FIELD)
    }
}

fn table_ref(schema: Option<&str>, table: &str) -> String {
    match schema {
        Some(schema) => format!("{}.{}", quote_ident(schema), quote_ident(table)),
        None => quote_ident(table),
    }
}

fn order_by(json_field: &str, sort: &[Sort]) -> String {
    let keys = sort
        .iter()
        .map(|s| {
            format!(
                "{} {}",
                AccessPath::build(json_field, &s.field).text(),
                s.direction.as_sql()
            )
        })
        .collect::<Vec<_>>()
        .join(", ");
    format!(" ORDER BY {keys}")
}

fn limit_offset(opts: &SelectOptions) -> Result<String, CompileError> {
    let mut out = String::new();
    if let Some(limit) = opts.limit {
        if limit < 0 {
            return Err(CompileError::InvalidLimit(limit));
        }
        out.push_str(&format!(" LIMIT {limit}"));
    }
    if let Some(offset) = opts.offset {
        if offset < 0 {
            return Err(CompileError::InvalidOffset(offset));
        }
        out.push_str(&format!(" OFFSET {offset}"));
    }
    Ok(out)
}

/// `SELECT "<json>" FROM "<table>" [WHERE ...] [ORDER BY ...] [LIMIT/OFFSET]`.
///
/// A trivially-true query emits `WHERE TRUE`; an unconstrained one omits the
/// WHERE entirely. Limit and offset are inlined as validated integers.
pub fn build_select(
    table: &str,
    query: &Value,
    opts: &SelectOptions,
) -> Result<(String, Params), CompileError> {
    let json_field = opts.json_field();
    let (where_sql, params) = compile::build_where(query, json_field)?;

    let mut sql = format!(
        "SELECT {} FROM {}",
        quote_ident(json_field),
        table_ref(opts.schema.as_deref(), table)
    );
    sql.push_str(&where_sql);
    if !opts.sort.is_empty() {
        sql.push_str(&order_by(json_field, &opts.sort));
    }
    sql.push_str(&limit_offset(opts)?);
    Ok((sql, params))
}

/// `SELECT COUNT(*) AS count FROM "<table>" [WHERE ...]`.
pub fn build_count(
    table: &str,
    query: &Value,
    opts: &SelectOptions,
) -> Result<(String, Params), CompileError> {
    let (where_sql, params) = compile::build_where(query, opts.json_field())?;
    let sql = format!(
        "SELECT COUNT(*) AS count FROM {}{}",
        table_ref(opts.schema.as_deref(), table),
        where_sql
    );
    Ok((sql, params))
}

/// Hard delete. An unconstrained filter is refused before any SQL is built.
pub fn build_delete(
    table: &str,
    query: &Value,
    opts: &SelectOptions,
) -> Result<(String, Params), CompileError> {
    let (where_sql, params) = compile::build_where(query, opts.json_field())?;
    if where_sql.is_empty() {
        return Err(CompileError::EmptyFilter("remove"));
    }
    let sql = format!(
        "DELETE FROM {}{}",
        table_ref(opts.schema.as_deref(), table),
        where_sql
    );
    Ok((sql, params))
}

/// Soft delete: rewritten as an UPDATE stamping `_deletedAt` with a
/// millisecond timestamp appended after the WHERE parameters.
pub fn build_soft_delete(
    table: &str,
    query: &Value,
    opts: &SelectOptions,
    deleted_at_ms: i64,
) -> Result<(String, Params), CompileError> {
    let json_field = opts.json_field();
    let (where_sql, mut params) = compile::build_where(query, json_field)?;
    if where_sql.is_empty() {
        return Err(CompileError::EmptyFilter("remove"));
    }
    let k = params.push(SqlParam::Int(deleted_at_ms));
    let sql = format!(
        "UPDATE {} SET {json_field} = jsonb_set({json_field}, '{{_deletedAt}}', \
         to_jsonb(${k}::numeric)){where_sql}",
        table_ref(opts.schema.as_deref(), table)
    );
    Ok((sql, params))
}

/// `UPDATE "<table>" SET <json> = <expr> WHERE <frag>`.
///
/// The WHERE fragment and the SET expression are compiled with independent
/// parameter vectors; the SET expression's placeholders are shifted by the
/// WHERE parameter count before splicing, and the vectors are concatenated
/// in that order.
///
/// Returns `Ok(None)` when the update document has no supported operator;
/// the caller should fall back to a COUNT of the filter.
pub fn build_update_statement(
    table: &str,
    query: &Value,
    update: &UpdateDoc,
    opts: &SelectOptions,
) -> Result<Option<(String, Params)>, CompileError> {
    let json_field = opts.json_field();
    let (where_sql, mut params) = compile::build_where(query, json_field)?;
    if where_sql.is_empty() {
        return Err(CompileError::EmptyFilter("update"));
    }

    let (expr, update_params) = match build_update(update, json_field) {
        Some(built) => built,
        None => return Ok(None),
    };

    let expr = renumber(&expr, params.len());
    params.extend(update_params);

    let sql = format!(
        "UPDATE {} SET {json_field} = {expr}{where_sql}",
        table_ref(opts.schema.as_deref(), table)
    );
    Ok(Some((sql, params)))
}
