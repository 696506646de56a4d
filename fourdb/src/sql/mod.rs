// SQL text generation: DDL from a schema, DML and WHERE fragments from
// documents and condition sets.

pub mod connection;

pub use connection::ConnectionDescriptor;

use crate::error::{FourDbError, Result};
use crate::schema::{
    validate_check_clause, ColumnDefinition, ColumnType, Conditions, Document, Schema, ValueKind,
    NOW_LITERAL,
};
use crate::validation::{check_date_format, check_numeric_range};
use serde_json::Value;

/// Server-side UUID generator used for `uuid` defaults.
pub const UUID_GENERATOR: &str = "uuid_generate_v4()";

/// Render a `CREATE TABLE IF NOT EXISTS` statement, columns in schema order.
/// Foreign keys follow the column list as table constraints.
pub fn render_create_table(table: &str, schema: &Schema) -> Result<String> {
    require_table_name(table)?;
    if schema.is_empty() {
        return Err(FourDbError::Schema(format!("Table '{table}' has no columns")));
    }

    let mut lines = Vec::with_capacity(schema.len());
    let mut constraints = Vec::new();

    for (name, column) in schema {
        lines.push(format!("  {}", render_column(name, column)?));

        if let Some(fk) = &column.foreign_key {
            constraints.push(format!(
                "  FOREIGN KEY ({}) REFERENCES {} ({}) ON DELETE {} ON UPDATE {}",
                fk.column,
                fk.references,
                fk.references_column,
                fk.on_delete.as_sql(),
                fk.on_update.as_sql()
            ));
        }
    }
    lines.extend(constraints);

    Ok(format!(
        "CREATE TABLE IF NOT EXISTS {table} (\n{}\n);",
        lines.join(",\n")
    ))
}

/// Render one column definition (without trailing comma).
pub fn render_column(name: &str, column: &ColumnDefinition) -> Result<String> {
    let mut sql = format!("{name} {}", column.column_type.sql_keyword());

    if column.max_length > 0 {
        if !column.column_type.is_length_bearing() {
            return Err(FourDbError::Schema(format!(
                "Column '{name}': invalid type '{}' to use a maximum length with",
                column.column_type
            )));
        }
        sql.push_str(&format!("({})", column.max_length));
    }

    if column.array {
        sql.push_str("[]");
    }
    if column.unique {
        sql.push_str(" UNIQUE");
    }
    if column.primary {
        sql.push_str(" PRIMARY KEY");
    }
    if !column.nullable {
        sql.push_str(" NOT NULL");
    }

    if let Some(check) = &column.check {
        validate_check_clause(name, check)?;
        sql.push(' ');
        sql.push_str(check.trim());
    }

    if let Some(default) = &column.default {
        sql.push_str(" DEFAULT ");
        sql.push_str(&render_default(name, column.column_type, default)?);
    }

    if let Some(comment) = &column.comment {
        sql.push_str(&format!(" /* {} */", comment.replace("*/", "* /")));
    }

    Ok(sql)
}

/// Type-dispatched DEFAULT literal.
pub fn render_default(name: &str, column_type: ColumnType, default: &Value) -> Result<String> {
    match column_type.value_kind() {
        ValueKind::Numeric => check_numeric_range(default, column_type),
        ValueKind::Boolean => match default {
            Value::Bool(true) => Ok("TRUE".into()),
            Value::Bool(false) => Ok("FALSE".into()),
            _ => Err(FourDbError::Schema(format!(
                "Column '{name}': default for a boolean column must be true or false"
            ))),
        },
        ValueKind::Text => match default {
            Value::String(s) => Ok(quote_literal(s)),
            _ => Err(FourDbError::Schema(format!(
                "Column '{name}': default for a {} column must be text",
                column_type.sql_keyword()
            ))),
        },
        ValueKind::Structured => Ok(quote_literal(&serde_json::to_string(default)?)),
        ValueKind::Temporal => {
            if default.as_str() == Some(NOW_LITERAL) {
                Ok(NOW_LITERAL.to_string())
            } else {
                Ok(quote_literal(&check_date_format(default, column_type)?))
            }
        }
        ValueKind::Uuid => Ok(UUID_GENERATOR.to_string()),
        ValueKind::Sequence => Err(FourDbError::Schema(format!(
            "Column '{name}': invalid data type for a default value: {column_type}"
        ))),
    }
}

/// Render `INSERT INTO table (cols) VALUES (vals);` in the document's key order.
/// Text is single-quoted with embedded quotes doubled.
pub fn render_insert(table: &str, document: &Document) -> Result<String> {
    require_table_name(table)?;
    if document.is_empty() {
        return Err(FourDbError::Validation(format!(
            "Cannot insert an empty document into '{table}'"
        )));
    }

    let columns: Vec<&str> = document.keys().map(|k| k.as_str()).collect();
    let values = document
        .values()
        .map(sql_literal)
        .collect::<Result<Vec<_>>>()?;

    Ok(format!(
        "INSERT INTO {table} ({}) VALUES ({});",
        columns.join(", "),
        values.join(", ")
    ))
}

/// Render `key = value` pairs joined with AND. Values are written bare,
/// text included, so the output is for display and logging; nothing is
/// escaped. An empty condition set renders as "" (match all).
pub fn render_equality_conditions(conditions: &Conditions) -> String {
    conditions
        .iter()
        .map(|(key, value)| match value {
            Value::String(s) => format!("{key} = {s}"),
            other => format!("{key} = {other}"),
        })
        .collect::<Vec<_>>()
        .join(" AND ")
}

/// Render `key = literal` pairs joined with AND, with values quoted and
/// escaped by `sql_literal`. Used by the statements the executor runs.
pub fn render_literal_conditions(conditions: &Conditions) -> Result<String> {
    let parts = conditions
        .iter()
        .map(|(key, value)| sql_literal(value).map(|literal| format!("{key} = {literal}")))
        .collect::<Result<Vec<_>>>()?;
    Ok(parts.join(" AND "))
}

fn push_where(sql: &mut String, conditions: &Conditions) -> Result<()> {
    let filter = render_literal_conditions(conditions)?;
    if !filter.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&filter);
    }
    Ok(())
}

/// Render `SELECT columns FROM table [WHERE ...] [ORDER BY ...] [LIMIT n];`.
pub fn render_select(
    table: &str,
    columns: &[&str],
    conditions: &Conditions,
    order_by: Option<&str>,
    limit: Option<usize>,
) -> Result<String> {
    require_table_name(table)?;
    let mut sql = format!("SELECT {} FROM {table}", columns.join(", "));
    push_where(&mut sql, conditions)?;
    if let Some(order_by) = order_by {
        sql.push_str(&format!(" ORDER BY {order_by}"));
    }
    if let Some(limit) = limit {
        sql.push_str(&format!(" LIMIT {limit}"));
    }
    sql.push(';');
    Ok(sql)
}

/// Render `UPDATE table SET ... [WHERE ...];`. An empty patch is rejected.
pub fn render_update(table: &str, patch: &Document, conditions: &Conditions) -> Result<String> {
    require_table_name(table)?;
    if patch.is_empty() {
        return Err(FourDbError::Validation(format!(
            "Cannot update '{table}' with an empty patch"
        )));
    }

    let assignments = patch
        .iter()
        .map(|(key, value)| sql_literal(value).map(|literal| format!("{key} = {literal}")))
        .collect::<Result<Vec<_>>>()?;
    let mut sql = format!("UPDATE {table} SET {}", assignments.join(", "));
    push_where(&mut sql, conditions)?;
    sql.push(';');
    Ok(sql)
}

/// Render `DELETE FROM table [WHERE ...];`.
pub fn render_delete(table: &str, conditions: &Conditions) -> Result<String> {
    require_table_name(table)?;
    let mut sql = format!("DELETE FROM {table}");
    push_where(&mut sql, conditions)?;
    sql.push(';');
    Ok(sql)
}

/// SQL literal for a JSON value.
pub fn sql_literal(value: &Value) -> Result<String> {
    Ok(match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(true) => "TRUE".to_string(),
        Value::Bool(false) => "FALSE".to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => quote_literal(s),
        Value::Array(_) | Value::Object(_) => quote_literal(&serde_json::to_string(value)?),
    })
}

pub fn quote_literal(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

fn require_table_name(table: &str) -> Result<()> {
    if table.trim().is_empty() {
        return Err(FourDbError::Configuration("Table name must not be empty".into()));
    }
    Ok(())
}
