pub mod error;
pub mod query;
pub mod schema;
pub mod sql;
pub mod sql_backend;
pub mod store;
pub mod validation;

pub use error::{FourDbError, Result};
pub use query::Crud;
pub use schema::{
    parse_schema, parse_schema_str, ColumnDefinition, ColumnType, Conditions, Document,
    RawColumn, RawSchema, Schema,
};
pub use sql::ConnectionDescriptor;
pub use sql_backend::{SqlBackend, SqlTable};
pub use store::{Collection, Store};
