use bytes::BytesMut;
use rust_decimal::Decimal;
use serde_json::Value;
use tokio_postgres::types::{IsNull, ToSql, Type, to_sql_checked};

/// A single positional statement parameter.
///
/// The compiler chooses the variant from the runtime type of the query
/// operand; Postgres infers the wire type from the statement text (casts,
/// comparison context). `to_sql` bridges the two by coercing the stored
/// value to whatever type the server inferred.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
    Json(Value),
    IntArray(Vec<i64>),
    FloatArray(Vec<f64>),
    BoolArray(Vec<bool>),
    TextArray(Vec<String>),
    JsonArray(Vec<Value>),
}

type BoxError = Box<dyn std::error::Error + Sync + Send>;

fn decimal_from_f64(v: f64) -> Result<Decimal, BoxError> {
    Decimal::from_f64_retain(v)
        .ok_or_else(|| format!("{v} cannot be represented as numeric").into())
}

impl ToSql for SqlParam {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        match self {
            SqlParam::Int(v) => {
                if *ty == Type::INT2 {
                    (*v as i16).to_sql(ty, out)
                } else if *ty == Type::INT4 {
                    (*v as i32).to_sql(ty, out)
                } else if *ty == Type::NUMERIC {
                    Decimal::from(*v).to_sql(ty, out)
                } else if *ty == Type::FLOAT8 {
                    (*v as f64).to_sql(ty, out)
                } else {
                    v.to_sql(ty, out)
                }
            }
            SqlParam::Float(v) => {
                if *ty == Type::NUMERIC {
                    decimal_from_f64(*v)?.to_sql(ty, out)
                } else if *ty == Type::FLOAT4 {
                    (*v as f32).to_sql(ty, out)
                } else {
                    v.to_sql(ty, out)
                }
            }
            SqlParam::Bool(v) => v.to_sql(ty, out),
            SqlParam::Text(v) => v.to_sql(ty, out),
            SqlParam::Json(v) => v.to_sql(ty, out),
            SqlParam::IntArray(v) => {
                if *ty == Type::INT4_ARRAY {
                    v.iter()
                        .map(|i| *i as i32)
                        .collect::<Vec<_>>()
                        .to_sql(ty, out)
                } else if *ty == Type::NUMERIC_ARRAY {
                    v.iter()
                        .map(|i| Decimal::from(*i))
                        .collect::<Vec<_>>()
                        .to_sql(ty, out)
                } else {
                    v.to_sql(ty, out)
                }
            }
            SqlParam::FloatArray(v) => {
                if *ty == Type::NUMERIC_ARRAY {
                    v.iter()
                        .copied()
                        .map(decimal_from_f64)
                        .collect::<Result<Vec<_>, _>>()?
                        .to_sql(ty, out)
                } else {
                    v.to_sql(ty, out)
                }
            }
            SqlParam::BoolArray(v) => v.to_sql(ty, out),
            SqlParam::TextArray(v) => v.to_sql(ty, out),
            SqlParam::JsonArray(v) => v.to_sql(ty, out),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        // Type selection is driven by the statement text; mismatches surface
        // as encode errors from the delegated impl.
        true
    }

    to_sql_checked!();
}

impl From<i64> for SqlParam {
    fn from(v: i64) -> Self {
        SqlParam::Int(v)
    }
}

impl From<f64> for SqlParam {
    fn from(v: f64) -> Self {
        SqlParam::Float(v)
    }
}

impl From<bool> for SqlParam {
    fn from(v: bool) -> Self {
        SqlParam::Bool(v)
    }
}

impl From<&str> for SqlParam {
    fn from(v: &str) -> Self {
        SqlParam::Text(v.to_string())
    }
}

impl From<String> for SqlParam {
    fn from(v: String) -> Self {
        SqlParam::Text(v)
    }
}

impl From<Value> for SqlParam {
    fn from(v: Value) -> Self {
        SqlParam::Json(v)
    }
}

/// The positional parameter vector threaded through one compile call.
///
/// `push` returns the 1-based index used as `$N` in the emitted SQL, so
/// parameter order always matches append order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params(Vec<SqlParam>);

impl Params {
    pub fn new() -> Self {
        Params(Vec::new())
    }

    pub fn push(&mut self, param: SqlParam) -> usize {
        self.0.push(param);
        self.0.len()
    }

    pub fn extend(&mut self, other: Params) {
        self.0.extend(other.0);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn values(&self) -> &[SqlParam] {
        &self.0
    }

    /// Borrow the vector in the shape `tokio_postgres` execution expects.
    pub fn as_sql_args(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.0.iter().map(|p| p as &(dyn ToSql + Sync)).collect()
    }
}

impl From<Vec<SqlParam>> for Params {
    fn from(values: Vec<SqlParam>) -> Self {
        Params(values)
    }
}
