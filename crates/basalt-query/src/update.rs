use serde_json::Value;

/// A single field-level update operator.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOp {
    /// Set a field to a value. Creates the field (and missing parents) on write.
    Set(Value),
    /// Increment a numeric field by the given amount (negative for decrement).
    Inc(serde_json::Number),
}

/// A single field + operator pair within an UpdateDoc.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldUpdate {
    pub field: String,
    pub op: UpdateOp,
}

/// A complete update specification: an ordered list of (field, operator) pairs.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UpdateDoc {
    pub ops: Vec<FieldUpdate>,
}

impl UpdateDoc {
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn push_set(&mut self, field: impl Into<String>, value: Value) {
        self.ops.push(FieldUpdate {
            field: field.into(),
            op: UpdateOp::Set(value),
        });
    }

    pub fn push_inc(&mut self, field: impl Into<String>, amount: serde_json::Number) {
        self.ops.push(FieldUpdate {
            field: field.into(),
            op: UpdateOp::Inc(amount),
        });
    }
}

/// Parse error for update documents.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError(pub String);

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "update parse error: {}", self.0)
    }
}

impl std::error::Error for ParseError {}

/// Parse a MongoDB-style update document into a validated `UpdateDoc`.
///
/// Recognizes `$set` and `$inc`, whose values are sub-objects mapping dotted
/// field paths to operand values. Bare top-level fields are treated as
/// implicit `$set`. Unsupported `$`-operators (`$push`, `$unset`, ...) are
/// skipped with a warning; an update built only from unsupported operators
/// parses to an empty `UpdateDoc`.
///
/// # Errors
///
/// Returns an error if the document is not an object, targets `_id`, or has
/// an invalid operand shape (non-object operator value, non-numeric `$inc`).
pub fn parse_update(doc: &Value) -> Result<UpdateDoc, ParseError> {
    let map = match doc {
        Value::Object(map) => map,
        _ => return Err(ParseError("update document must be an object".into())),
    };

    let mut ops = Vec::new();

    for (key, value) in map {
        match key.as_str() {
            "_id" => continue, // silently skip _id
            "$set" => parse_set_fields(value, &mut ops)?,
            "$inc" => parse_inc_fields(value, &mut ops)?,
            k if k.starts_with('$') => {
                tracing::warn!(operator = k, "unsupported update operator, skipping");
            }
            _ => {
                // Bare field, implicit $set
                ops.push(FieldUpdate {
                    field: key.clone(),
                    op: UpdateOp::Set(value.clone()),
                });
            }
        }
    }

    // Reject any ops targeting _id
    for fu in &ops {
        let target = fu.field.split('.').next().unwrap_or(&fu.field);
        if target == "_id" {
            return Err(ParseError("cannot update _id field".into()));
        }
    }

    Ok(UpdateDoc { ops })
}

fn parse_set_fields(value: &Value, ops: &mut Vec<FieldUpdate>) -> Result<(), ParseError> {
    let sub = match value {
        Value::Object(map) => map,
        _ => return Err(ParseError("$set value must be an object".into())),
    };
    for (field, val) in sub {
        ops.push(FieldUpdate {
            field: field.clone(),
            op: UpdateOp::Set(val.clone()),
        });
    }
    Ok(())
}

fn parse_inc_fields(value: &Value, ops: &mut Vec<FieldUpdate>) -> Result<(), ParseError> {
    let sub = match value {
        Value::Object(map) => map,
        _ => return Err(ParseError("$inc value must be an object".into())),
    };
    for (field, val) in sub {
        let amount = match val {
            Value::Number(n) => n.clone(),
            _ => {
                return Err(ParseError(format!(
                    "$inc value for '{field}' must be numeric"
                )));
            }
        };
        ops.push(FieldUpdate {
            field: field.clone(),
            op: UpdateOp::Inc(amount),
        });
    }
    Ok(())
}
