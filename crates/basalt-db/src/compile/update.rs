use basalt_query::{UpdateDoc, UpdateOp};

use crate::params::{Params, SqlParam};
use crate::quote::quote_path_literal;

use super::number_param;
use super::path::container_path;

/// Fold `$set`/`$inc` entries into one nested `jsonb_set_lax` expression
/// over the JSON column.
///
/// `$set` operands ride as JSON-serialized text parameters cast back to
/// jsonb; `$inc` reads the stored value through the container path of the
/// original column (not the folded expression), so the increment sees the
/// pre-update value. The trailing `true` materializes missing intermediate
/// keys.
///
/// Returns `None` when the update contains no supported operator; the
/// statement would have no effect.
pub fn build_update(update: &UpdateDoc, json_field: &str) -> Option<(String, Params)> {
    if update.is_empty() {
        return None;
    }

    let mut params = Params::new();
    let mut expr = json_field.to_string();

    for fu in &update.ops {
        let path_lit = quote_path_literal(&fu.field);
        match &fu.op {
            UpdateOp::Set(value) => {
                let n = params.push(SqlParam::Text(value.to_string()));
                expr = format!("jsonb_set_lax({expr}::jsonb, {path_lit}, ${n}::jsonb, true)");
            }
            UpdateOp::Inc(amount) => {
                let n = params.push(number_param(amount));
                let read_back = container_path(json_field, &fu.field);
                expr = format!(
                    "jsonb_set_lax({expr}::jsonb, {path_lit}, \
                     to_jsonb(COALESCE(({read_back})::numeric, 0) + ${n}::numeric), true)"
                );
            }
        }
    }

    Some((expr, params))
}
