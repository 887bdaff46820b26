mod collection;
mod config;
mod database;
mod document;
mod error;
mod params;
mod quote;
mod statement;

pub mod compile;

pub use basalt_query::{FindOptions, Sort, SortDirection, UpdateDoc, parse_update};
pub use collection::{Collection, UpdateResult};
pub use compile::{build_update, build_where, renumber};
pub use config::DatabaseConfig;
pub use database::{Database, Schema, SchemaOptions, Validator};
pub use document::Document;
pub use error::{CompileError, DbError, FieldError};
pub use params::{Params, SqlParam};
pub use statement::{
    SelectOptions, build_count, build_delete, build_select, build_soft_delete,
    build_update_statement,
};
