use super::catalog::{ValueKind, NOW_LITERAL};
use super::types::{ColumnDefinition, ColumnType, RawColumn, RawSchema, Schema};
use crate::error::{FourDbError, Result};
use crate::validation::validate_value;

/// Keyword a `check` clause must start with.
pub const CHECK_KEYWORD: &str = "CHECK";

/// Canonicalize a raw schema. Pure: no I/O, same input gives same output,
/// and `normalize(to_raw(normalize(s))) == normalize(s)`.
pub fn normalize(raw: &RawSchema) -> Result<Schema> {
    let mut schema = Schema::with_capacity(raw.len());
    for (name, column) in raw {
        if name.trim().is_empty() {
            return Err(FourDbError::Schema("Column name must not be empty".into()));
        }
        let definition = normalize_column(name, column)?;
        schema.insert(name.clone(), definition);
    }
    Ok(schema)
}

/// Normalize a single column definition.
pub fn normalize_column(name: &str, raw: &RawColumn) -> Result<ColumnDefinition> {
    let column_type: ColumnType = raw
        .column_type
        .parse()
        .map_err(|_| FourDbError::Schema(format!(
            "Column '{name}' has unknown type '{}'",
            raw.column_type
        )))?;

    let max_length = raw.max_length.unwrap_or(0);
    if max_length > 0 && !column_type.is_length_bearing() {
        return Err(FourDbError::Schema(format!(
            "Column '{name}': maxLength is not allowed on type '{column_type}'"
        )));
    }

    if let Some(check) = &raw.check {
        validate_check_clause(name, check)?;
    }

    if let Some(fk) = &raw.foreign_key {
        if fk.column.trim().is_empty()
            || fk.references.trim().is_empty()
            || fk.references_column.trim().is_empty()
        {
            return Err(FourDbError::Schema(format!(
                "Column '{name}': foreign key needs column, references and referencesColumn"
            )));
        }
    }

    // An explicit JSON null default is the same as no default.
    let default = raw.default.clone().filter(|v| !v.is_null());

    let definition = ColumnDefinition {
        column_type,
        array: raw.array.unwrap_or(false),
        max_length,
        unique: raw.unique.unwrap_or(false),
        primary: raw.primary.unwrap_or(false),
        nullable: raw.nullable.unwrap_or(false),
        check: raw.check.clone(),
        display_default: default.clone().unwrap_or_else(|| column_type.zero_value()),
        default,
        foreign_key: raw.foreign_key.clone(),
        comment: raw.comment.clone(),
    };
    check_default(name, &definition)?;
    Ok(definition)
}

/// An explicit default must satisfy its own column's type rule. A uuid
/// default only asks for a generated value, and `now()` stands in for
/// the current date on temporal columns.
fn check_default(name: &str, column: &ColumnDefinition) -> Result<()> {
    let default = match &column.default {
        Some(default) => default,
        None => return Ok(()),
    };
    if !column.array {
        match column.column_type.value_kind() {
            ValueKind::Uuid => return Ok(()),
            ValueKind::Temporal if default.as_str() == Some(NOW_LITERAL) => return Ok(()),
            _ => {}
        }
    }
    validate_value(name, default, column)
        .map_err(|e| FourDbError::Schema(format!("Column '{name}': invalid default: {e}")))
}

/// A check clause must begin with the literal `CHECK` token.
pub fn validate_check_clause(column: &str, check: &str) -> Result<()> {
    if check.trim_start().starts_with(CHECK_KEYWORD) {
        Ok(())
    } else {
        Err(FourDbError::Schema(format!(
            "Column '{column}': check clause must start with {CHECK_KEYWORD}, got '{check}'"
        )))
    }
}
