use std::fmt;
use std::sync::Arc;

use basalt_query::{FindOptions, parse_update};
use chrono::Utc;
use deadpool_postgres::GenericClient;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::compile::build_where;
use crate::database::Schema;
use crate::document::Document;
use crate::error::{CompileError, DbError};
use crate::params::{Params, SqlParam};
use crate::quote::quote_ident;
use crate::statement::{
    SelectOptions, build_count, build_delete, build_select, build_soft_delete,
    build_update_statement,
};

/// Outcome of `update_one`/`update_many`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateResult {
    pub matched: u64,
    pub modified: u64,
}

/// Handle on one defined collection. Cheap to clone; every operation takes
/// an explicit connection (a pooled client or a transaction client).
#[derive(Clone)]
pub struct Collection {
    schema: Arc<Schema>,
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.schema.name)
            .finish()
    }
}

impl Collection {
    pub(crate) fn new(schema: Arc<Schema>) -> Self {
        Self { schema }
    }

    pub fn name(&self) -> &str {
        &self.schema.name
    }

    pub(crate) fn schema(&self) -> &Schema {
        &self.schema
    }

    fn select_opts(&self, opts: &FindOptions) -> SelectOptions {
        SelectOptions {
            limit: opts.limit,
            offset: opts.offset,
            sort: opts.sort.clone(),
            ..Default::default()
        }
    }

    /// Inject the soft-delete read filter: reads on a soft-delete collection
    /// see only documents whose `_deletedAt` is null/missing, unless the
    /// caller opts into deleted rows or constrains `_deletedAt` themselves.
    fn read_query(&self, query: &Value, include_deleted: bool) -> Value {
        if !self.schema.soft_delete || include_deleted {
            return query.clone();
        }
        match query {
            Value::Object(map) if !map.contains_key("_deletedAt") => {
                let mut map = map.clone();
                map.insert("_deletedAt".to_string(), Value::Null);
                Value::Object(map)
            }
            _ => query.clone(),
        }
    }

    /// Destructive operations refuse an unconstrained filter.
    fn require_filter(&self, query: &Value, op: &'static str) -> Result<(), DbError> {
        let (where_sql, _) = build_where(query, crate::statement::DEFAULT_JSON_FIELD)?;
        if where_sql.is_empty() {
            return Err(CompileError::EmptyFilter(op).into());
        }
        Ok(())
    }

    /// Validate, stamp bookkeeping fields and INSERT a new document.
    pub async fn create(
        &self,
        conn: &impl GenericClient,
        mut data: Value,
    ) -> Result<Document, DbError> {
        if let Some(hook) = &self.schema.before_save {
            hook(&mut data);
        }
        let map = match &mut data {
            Value::Object(map) => map,
            _ => {
                return Err(DbError::Serialization("document must be an object".into()));
            }
        };

        let now = Utc::now().timestamp_millis();
        if !map.get("_id").is_some_and(Value::is_string) {
            let id = format!("{}:{}", self.schema.name, Uuid::new_v4().simple());
            map.insert("_id".to_string(), Value::String(id));
        }
        map.entry("_ctime").or_insert_with(|| json!(now));
        map.insert("_mtime".to_string(), json!(now));
        map.entry("_vers").or_insert_with(|| json!(1));

        self.schema.check(&data)?;

        let sql = format!(
            "INSERT INTO {} ({}) VALUES ($1)",
            quote_ident(&self.schema.name),
            quote_ident(crate::statement::DEFAULT_JSON_FIELD)
        );
        let params = Params::from(vec![SqlParam::Json(data.clone())]);
        tracing::debug!(collection = %self.schema.name, sql = %sql, "create");
        conn.execute(sql.as_str(), &params.as_sql_args()).await?;
        Ok(Document::new(self.clone(), data))
    }

    pub async fn find(
        &self,
        conn: &impl GenericClient,
        query: &Value,
        opts: &FindOptions,
    ) -> Result<Vec<Document>, DbError> {
        let query = self.read_query(query, opts.include_deleted);
        let (sql, params) = build_select(&self.schema.name, &query, &self.select_opts(opts))?;
        tracing::debug!(collection = %self.schema.name, sql = %sql, "find");
        let rows = conn.query(sql.as_str(), &params.as_sql_args()).await?;
        rows.iter()
            .map(|row| Ok(Document::new(self.clone(), row.try_get(0)?)))
            .collect()
    }

    pub async fn find_one(
        &self,
        conn: &impl GenericClient,
        query: &Value,
        opts: &FindOptions,
    ) -> Result<Option<Document>, DbError> {
        let mut opts = opts.clone();
        opts.limit = Some(1);
        Ok(self.find(conn, query, &opts).await?.into_iter().next())
    }

    /// Fetch by `_id`.
    pub async fn find1(
        &self,
        conn: &impl GenericClient,
        id: &str,
    ) -> Result<Option<Document>, DbError> {
        self.find_one(conn, &json!({ "_id": id }), &FindOptions::default())
            .await
    }

    pub async fn count(
        &self,
        conn: &impl GenericClient,
        query: &Value,
        opts: &FindOptions,
    ) -> Result<u64, DbError> {
        let query = self.read_query(query, opts.include_deleted);
        let (sql, params) = build_count(&self.schema.name, &query, &SelectOptions::default())?;
        tracing::debug!(collection = %self.schema.name, sql = %sql, "count");
        let rows = conn.query(sql.as_str(), &params.as_sql_args()).await?;
        let count: i64 = rows
            .first()
            .map(|row| row.try_get(0))
            .transpose()?
            .unwrap_or(0);
        Ok(count as u64)
    }

    /// Remove matching documents: a hard DELETE, or an UPDATE stamping
    /// `_deletedAt` when the collection is defined with soft-delete. Returns
    /// the affected row count. An empty filter is refused.
    pub async fn remove(
        &self,
        conn: &impl GenericClient,
        query: &Value,
    ) -> Result<u64, DbError> {
        let opts = SelectOptions::default();
        let (sql, params) = if self.schema.soft_delete {
            build_soft_delete(
                &self.schema.name,
                query,
                &opts,
                Utc::now().timestamp_millis(),
            )?
        } else {
            build_delete(&self.schema.name, query, &opts)?
        };
        tracing::debug!(collection = %self.schema.name, sql = %sql, "remove");
        Ok(conn.execute(sql.as_str(), &params.as_sql_args()).await?)
    }

    /// Apply `$set`/`$inc` operators to every matching document, bumping
    /// `_mtime` and `_vers` alongside. An update with no supported operator
    /// only counts the matches.
    pub async fn update_many(
        &self,
        conn: &impl GenericClient,
        filter: &Value,
        update: &Value,
    ) -> Result<UpdateResult, DbError> {
        self.require_filter(filter, "update")?;

        let mut update = parse_update(update)?;
        if update.is_empty() {
            let matched = self.count(conn, filter, &FindOptions::default()).await?;
            return Ok(UpdateResult {
                matched,
                modified: 0,
            });
        }
        update.push_set("_mtime", json!(Utc::now().timestamp_millis()));
        update.push_inc("_vers", 1.into());

        match build_update_statement(
            &self.schema.name,
            filter,
            &update,
            &SelectOptions::default(),
        )? {
            Some((sql, params)) => {
                tracing::debug!(collection = %self.schema.name, sql = %sql, "update");
                let n = conn.execute(sql.as_str(), &params.as_sql_args()).await?;
                Ok(UpdateResult {
                    matched: n,
                    modified: n,
                })
            }
            None => Ok(UpdateResult {
                matched: 0,
                modified: 0,
            }),
        }
    }

    /// Like `update_many`, but resolves one matching document first and
    /// targets it by `_id`.
    pub async fn update_one(
        &self,
        conn: &impl GenericClient,
        filter: &Value,
        update: &Value,
    ) -> Result<UpdateResult, DbError> {
        self.require_filter(filter, "update")?;

        match self.find_one(conn, filter, &FindOptions::default()).await? {
            Some(doc) => {
                let id = doc
                    .id()
                    .ok_or_else(|| DbError::Serialization("stored document has no _id".into()))?
                    .to_string();
                self.update_many(conn, &json!({ "_id": id }), update).await
            }
            None => Ok(UpdateResult {
                matched: 0,
                modified: 0,
            }),
        }
    }
}
