pub mod catalog;
pub mod normalize;
pub mod parser;
pub mod types;

pub use catalog::{DateFormat, NumericRange, ValueKind, NOW_LITERAL};
pub use normalize::{normalize, normalize_column, validate_check_clause, CHECK_KEYWORD};
pub use parser::{parse_raw_schema_str, parse_schema, parse_schema_str};
pub use types::{
    to_raw, ColumnDefinition, ColumnType, Conditions, Document, ForeignKey, RawColumn,
    RawSchema, ReferentialAction, Schema,
};
