use std::fmt;

/// A single failed field validation, aggregated into [`DbError::Validation`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Errors raised synchronously while compiling a query or update document.
#[derive(Debug, Clone, PartialEq)]
pub enum CompileError {
    /// `$where` is never compiled.
    Where,
    /// A null-sensitive operator inside a primitive-mode `$elemMatch`, or
    /// `$elemMatch` against a path with no container form.
    InvalidElemMatch(String),
    InvalidLimit(i64),
    InvalidOffset(i64),
    /// A destructive statement was requested with an unconstrained filter.
    EmptyFilter(&'static str),
    InvalidQuery(String),
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::Where => write!(f, "$where is not supported"),
            CompileError::InvalidElemMatch(msg) => write!(f, "invalid $elemMatch: {msg}"),
            CompileError::InvalidLimit(n) => write!(f, "invalid limit: {n}"),
            CompileError::InvalidOffset(n) => write!(f, "invalid offset: {n}"),
            CompileError::EmptyFilter(op) => {
                write!(f, "{op} requires a non-empty filter")
            }
            CompileError::InvalidQuery(msg) => write!(f, "invalid query: {msg}"),
        }
    }
}

impl std::error::Error for CompileError {}

#[derive(Debug)]
pub enum DbError {
    Compile(CompileError),
    Parse(basalt_query::ParseError),
    Pool(String),
    Postgres(tokio_postgres::Error),
    NotFound(String),
    OptimisticLock { expected: i64, actual: i64 },
    Validation(Vec<FieldError>),
    Serialization(String),
}

impl fmt::Display for DbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbError::Compile(e) => write!(f, "compile error: {e}"),
            DbError::Parse(e) => write!(f, "{e}"),
            DbError::Pool(msg) => write!(f, "pool error: {msg}"),
            DbError::Postgres(e) => write!(f, "postgres error: {e}"),
            DbError::NotFound(id) => write!(f, "not found: {id}"),
            DbError::OptimisticLock { expected, actual } => {
                write!(f, "version conflict: expected {expected}, found {actual}")
            }
            DbError::Validation(errors) => {
                write!(f, "validation failed:")?;
                for e in errors {
                    write!(f, " [{e}]")?;
                }
                Ok(())
            }
            DbError::Serialization(msg) => write!(f, "serialization error: {msg}"),
        }
    }
}

impl std::error::Error for DbError {}

impl From<CompileError> for DbError {
    fn from(e: CompileError) -> Self {
        DbError::Compile(e)
    }
}

impl From<basalt_query::ParseError> for DbError {
    fn from(e: basalt_query::ParseError) -> Self {
        DbError::Parse(e)
    }
}

impl From<tokio_postgres::Error> for DbError {
    fn from(e: tokio_postgres::Error) -> Self {
        DbError::Postgres(e)
    }
}

impl From<deadpool_postgres::PoolError> for DbError {
    fn from(e: deadpool_postgres::PoolError) -> Self {
        DbError::Pool(e.to_string())
    }
}

impl From<deadpool_postgres::CreatePoolError> for DbError {
    fn from(e: deadpool_postgres::CreatePoolError) -> Self {
        DbError::Pool(e.to_string())
    }
}

impl From<serde_json::Error> for DbError {
    fn from(e: serde_json::Error) -> Self {
        DbError::Serialization(e.to_string())
    }
}
