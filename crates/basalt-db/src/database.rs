use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use deadpool_postgres::{Manager, ManagerConfig, Object, Pool, RecyclingMethod, Runtime,
                        Transaction};
use serde_json::Value;
use tokio_postgres::NoTls;

use crate::collection::Collection;
use crate::config::DatabaseConfig;
use crate::error::{DbError, FieldError};
use crate::params::Params;
use crate::quote::quote_ident;

pub type Validator = Arc<dyn Fn(&Value) -> Result<(), String> + Send + Sync>;
pub(crate) type BeforeSave = Arc<dyn Fn(&mut Value) + Send + Sync>;

/// Per-collection options, captured at definition time and immutable after.
pub struct SchemaOptions {
    name: String,
    soft_delete: bool,
    required: Vec<String>,
    validators: Vec<(String, Validator)>,
    before_save: Option<BeforeSave>,
}

impl SchemaOptions {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            soft_delete: false,
            required: Vec::new(),
            validators: Vec::new(),
            before_save: None,
        }
    }

    /// Removals mark `_deletedAt` instead of deleting the row; reads filter
    /// marked documents out unless asked otherwise.
    pub fn soft_delete(mut self) -> Self {
        self.soft_delete = true;
        self
    }

    pub fn required(mut self, field: impl Into<String>) -> Self {
        self.required.push(field.into());
        self
    }

    pub fn validate<F>(mut self, field: impl Into<String>, validator: F) -> Self
    where
        F: Fn(&Value) -> Result<(), String> + Send + Sync + 'static,
    {
        self.validators.push((field.into(), Arc::new(validator)));
        self
    }

    pub fn before_save<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut Value) + Send + Sync + 'static,
    {
        self.before_save = Some(Arc::new(hook));
        self
    }
}

/// The captured definition of one collection.
pub struct Schema {
    pub(crate) name: String,
    pub(crate) soft_delete: bool,
    required: Vec<String>,
    validators: Vec<(String, Validator)>,
    pub(crate) before_save: Option<BeforeSave>,
}

impl Schema {
    /// Run required/validate checks, aggregating every field failure before
    /// any SQL is issued.
    pub(crate) fn check(&self, data: &Value) -> Result<(), DbError> {
        let mut errors = Vec::new();

        for field in &self.required {
            let missing = matches!(get_path(data, field), None | Some(Value::Null));
            if missing {
                errors.push(FieldError {
                    field: field.clone(),
                    message: "is required".to_string(),
                });
            }
        }

        for (field, validator) in &self.validators {
            if let Some(value) = get_path(data, field) {
                if let Err(message) = validator(value) {
                    errors.push(FieldError {
                        field: field.clone(),
                        message,
                    });
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(DbError::Validation(errors))
        }
    }
}

/// Walk a dotted path through nested objects.
pub(crate) fn get_path<'a>(data: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = data;
    for seg in path.split('.') {
        current = current.get(seg)?;
    }
    Some(current)
}

/// Owns the connection pool and the schema registry. Collections are defined
/// once at startup; every operation takes an explicit connection (a pooled
/// client or a transaction), so there is no ambient connection state.
pub struct Database {
    pool: Pool,
    registry: RwLock<HashMap<String, Arc<Schema>>>,
}

impl Database {
    pub fn connect(config: DatabaseConfig) -> Result<Self, DbError> {
        let mut pg = tokio_postgres::Config::new();
        pg.host(&config.host)
            .port(config.port)
            .dbname(&config.database)
            .user(&config.user)
            .password(&config.password);
        if let Some(secs) = config.connect_timeout_secs {
            pg.connect_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = config.idle_timeout_secs {
            pg.keepalives_idle(Duration::from_secs(secs));
        }

        let manager = Manager::from_config(
            pg,
            NoTls,
            ManagerConfig {
                recycling_method: RecyclingMethod::Fast,
            },
        );
        let mut builder = Pool::builder(manager).runtime(Runtime::Tokio1);
        if let Some(max) = config.pool_max {
            builder = builder.max_size(max);
        }
        let pool = builder.build().map_err(|e| DbError::Pool(e.to_string()))?;

        Ok(Self {
            pool,
            registry: RwLock::new(HashMap::new()),
        })
    }

    /// Check a client out of the pool. Dropping it returns it.
    pub async fn client(&self) -> Result<Object, DbError> {
        self.pool.get().await.map_err(DbError::from)
    }

    /// Register a collection schema and hand back its handle.
    pub fn define(&self, options: SchemaOptions) -> Collection {
        let schema = Arc::new(Schema {
            name: options.name,
            soft_delete: options.soft_delete,
            required: options.required,
            validators: options.validators,
            before_save: options.before_save,
        });
        self.registry
            .write()
            .expect("schema registry lock poisoned")
            .insert(schema.name.clone(), Arc::clone(&schema));
        Collection::new(schema)
    }

    pub fn collection(&self, name: &str) -> Option<Collection> {
        self.registry
            .read()
            .expect("schema registry lock poisoned")
            .get(name)
            .map(|schema| Collection::new(Arc::clone(schema)))
    }

    /// Create the table and `_id` index for every registered collection.
    /// Idempotent; meant to run once at startup.
    pub async fn bootstrap(&self) -> Result<(), DbError> {
        let schemas: Vec<Arc<Schema>> = {
            let registry = self.registry.read().expect("schema registry lock poisoned");
            registry.values().cloned().collect()
        };

        let client = self.client().await?;
        for schema in schemas {
            let table = quote_ident(&schema.name);
            let index = quote_ident(&format!("{}_id_idx", schema.name));
            let ddl = format!(
                "CREATE TABLE IF NOT EXISTS {table} (id SERIAL PRIMARY KEY, data JSONB NOT \
                 NULL, created_at TIMESTAMPTZ DEFAULT NOW()); CREATE INDEX IF NOT EXISTS \
                 {index} ON {table} ((data->>'_id'))"
            );
            tracing::debug!(collection = %schema.name, "bootstrapping table");
            client.batch_execute(&ddl).await?;
        }
        Ok(())
    }

    /// Raw escape hatch: run a statement and return the first column of each
    /// row as JSON.
    pub async fn query(&self, sql: &str, params: &Params) -> Result<Vec<Value>, DbError> {
        let client = self.client().await?;
        let rows = client.query(sql, &params.as_sql_args()).await?;
        rows.iter()
            .map(|row| row.try_get(0).map_err(DbError::from))
            .collect()
    }

    /// Raw escape hatch without the JSON projection.
    pub async fn query_rows(
        &self,
        sql: &str,
        params: &Params,
    ) -> Result<Vec<tokio_postgres::Row>, DbError> {
        let client = self.client().await?;
        client
            .query(sql, &params.as_sql_args())
            .await
            .map_err(DbError::from)
    }

    /// Run `f` inside BEGIN/COMMIT, rolling back if it fails. The callback
    /// receives the transaction client; passing it to collection operations
    /// runs them inside the transaction. There is no nesting: run sequential
    /// work against the one transaction client instead.
    pub async fn transaction<T, F>(&self, f: F) -> Result<T, DbError>
    where
        F: for<'t> FnOnce(
            &'t Transaction<'t>,
        ) -> Pin<Box<dyn Future<Output = Result<T, DbError>> + Send + 't>>,
    {
        let mut client = self.client().await?;
        let tx = client.transaction().await?;
        match f(&tx).await {
            Ok(value) => {
                tx.commit().await?;
                Ok(value)
            }
            Err(e) => {
                // Best effort; dropping the transaction rolls back anyway.
                let _ = tx.rollback().await;
                Err(e)
            }
        }
    }
}
