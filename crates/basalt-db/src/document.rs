use std::fmt;

use basalt_query::FindOptions;
use chrono::Utc;
use deadpool_postgres::GenericClient;
use serde_json::{Value, json};

use crate::collection::Collection;
use crate::database::get_path;
use crate::error::DbError;
use crate::params::{Params, SqlParam};
use crate::quote::quote_ident;

/// One stored document: its JSON value plus the collection it belongs to.
#[derive(Clone)]
pub struct Document {
    collection: Collection,
    data: Value,
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("collection", &self.collection.name())
            .field("data", &self.data)
            .finish()
    }
}

impl Document {
    pub(crate) fn new(collection: Collection, data: Value) -> Self {
        Self { collection, data }
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut Value {
        &mut self.data
    }

    pub fn into_data(self) -> Value {
        self.data
    }

    pub fn id(&self) -> Option<&str> {
        self.data.get("_id").and_then(Value::as_str)
    }

    /// Optimistic-lock version; new documents start at 1.
    pub fn version(&self) -> i64 {
        self.data.get("_vers").and_then(Value::as_i64).unwrap_or(1)
    }

    /// Read a dotted path out of the document.
    pub fn get(&self, path: &str) -> Option<&Value> {
        get_path(&self.data, path)
    }

    /// Write the whole document back, guarded by the optimistic-lock
    /// version. Zero affected rows distinguishes a version conflict from a
    /// vanished row by re-reading.
    pub async fn save(&mut self, conn: &impl GenericClient) -> Result<(), DbError> {
        let schema = self.collection.schema();
        if let Some(hook) = &schema.before_save {
            hook(&mut self.data);
        }
        schema.check(&self.data)?;

        let id = self
            .id()
            .ok_or_else(|| DbError::Serialization("document has no _id".into()))?
            .to_string();
        let expected = self.version();

        let mut next = self.data.clone();
        if let Value::Object(map) = &mut next {
            map.insert("_mtime".to_string(), json!(Utc::now().timestamp_millis()));
            map.insert("_vers".to_string(), json!(expected + 1));
        }

        let sql = format!(
            "UPDATE {} SET data = $1 WHERE data->>'_id' = $2 AND (data->>'_vers')::integer = $3",
            quote_ident(self.collection.name())
        );
        let params = Params::from(vec![
            SqlParam::Json(next.clone()),
            SqlParam::Text(id.clone()),
            SqlParam::Int(expected),
        ]);
        tracing::debug!(collection = %self.collection.name(), id = %id, "save");
        let affected = conn.execute(sql.as_str(), &params.as_sql_args()).await?;

        if affected == 0 {
            let opts = FindOptions::default().include_deleted();
            let found = self
                .collection
                .find_one(conn, &json!({ "_id": id }), &opts)
                .await?;
            return match found {
                Some(doc) => Err(DbError::OptimisticLock {
                    expected,
                    actual: doc.version(),
                }),
                None => Err(DbError::NotFound(id)),
            };
        }

        self.data = next;
        Ok(())
    }

    /// Remove this document (soft or hard per the collection definition).
    pub async fn remove(&self, conn: &impl GenericClient) -> Result<u64, DbError> {
        let id = self
            .id()
            .ok_or_else(|| DbError::Serialization("document has no _id".into()))?;
        self.collection.remove(conn, &json!({ "_id": id })).await
    }

    /// Replace a field holding a referenced `_id` with the referenced
    /// document's data. Returns whether anything was populated.
    pub async fn populate(
        &mut self,
        conn: &impl GenericClient,
        field: &str,
        target: &Collection,
    ) -> Result<bool, DbError> {
        let id = match self.data.get(field).and_then(Value::as_str) {
            Some(id) => id.to_string(),
            None => return Ok(false),
        };
        match target.find1(conn, &id).await? {
            Some(doc) => {
                if let Value::Object(map) = &mut self.data {
                    map.insert(field.to_string(), doc.into_data());
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
