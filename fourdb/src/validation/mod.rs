use crate::error::{FourDbError, Result};
use crate::schema::{
    ColumnDefinition, ColumnType, DateFormat, Document, NumericRange, Schema, ValueKind, NOW_LITERAL,
};
use chrono::{NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

/// Whether a value has the JSON shape the column type expects.
pub fn type_matches(value: &Value, column_type: ColumnType) -> bool {
    match column_type.value_kind() {
        ValueKind::Text | ValueKind::Temporal => value.is_string(),
        ValueKind::Numeric => value.is_number(),
        ValueKind::Boolean => value.is_boolean(),
        ValueKind::Structured => value.is_object() || value.is_array(),
        ValueKind::Sequence => value.is_array(),
        ValueKind::Uuid => value
            .as_str()
            .map(|s| uuid::Uuid::parse_str(s).is_ok())
            .unwrap_or(false),
    }
}

/// Check a number against the inclusive bounds of a numeric type.
/// Returns the number's canonical text on success.
pub fn check_numeric_range(value: &Value, column_type: ColumnType) -> Result<String> {
    let range = column_type.numeric_range().ok_or_else(|| {
        FourDbError::Schema(format!("Type '{column_type}' is not a numeric type"))
    })?;
    let number = match value {
        Value::Number(n) => n,
        other => {
            return Err(FourDbError::Validation(format!(
                "Expected a number for {} data type, got {}",
                column_type.sql_keyword(),
                type_name(other)
            )))
        }
    };

    let (min, max) = match range {
        NumericRange::Float => return Ok(number.to_string()),
        NumericRange::Integral { min, max } => (min, max),
    };

    let integral = if let Some(i) = number.as_i64() {
        Some(i)
    } else if number.is_u64() {
        // Larger than i64::MAX, so above every integral bound.
        None
    } else {
        let f = number.as_f64().unwrap_or(f64::NAN);
        if f.fract() != 0.0 {
            return Err(FourDbError::Range(format!(
                "{} data type expects an integral value, got {number}",
                column_type.sql_keyword()
            )));
        }
        if f < i64::MIN as f64 || f >= i64::MAX as f64 {
            None
        } else {
            Some(f as i64)
        }
    };

    match integral {
        Some(i) if i >= min && i <= max => Ok(number.to_string()),
        _ => Err(FourDbError::Range(format!(
            "Number out of range for {} data type: {number}",
            column_type.sql_keyword()
        ))),
    }
}

/// Check date/time text against the layout its type requires.
/// Returns the text unchanged on success.
pub fn check_date_format(value: &Value, column_type: ColumnType) -> Result<String> {
    let format = column_type.date_format().ok_or_else(|| {
        FourDbError::Schema(format!("Type '{column_type}' is not a date type"))
    })?;
    let text = value.as_str().ok_or_else(|| {
        FourDbError::Validation(format!(
            "Expected date text for {} data type, got {}",
            column_type.sql_keyword(),
            type_name(value)
        ))
    })?;

    let parses = match format {
        DateFormat::Date => NaiveDate::parse_from_str(text, format.chrono_layout()).is_ok(),
        DateFormat::Timestamp => {
            NaiveDateTime::parse_from_str(text, format.chrono_layout()).is_ok()
        }
    };

    let shaped = format.regex().is_some_and(|re| re.is_match(text));
    if !shaped || !parses {
        return Err(FourDbError::Format(format!(
            "Invalid format for {} data type: '{text}' (expected {})",
            column_type.sql_keyword(),
            format.describe()
        )));
    }
    Ok(text.to_string())
}

/// Check one field value against its column: nullability, the array flag,
/// then the type rule.
pub fn validate_value(field: &str, value: &Value, column: &ColumnDefinition) -> Result<()> {
    if value.is_null() {
        if column.nullable {
            return Ok(());
        }
        return Err(FourDbError::Validation(format!(
            "Field '{field}' must not be null"
        )));
    }

    if column.array {
        let items = value.as_array().ok_or_else(|| {
            FourDbError::Validation(format!(
                "Field '{field}' must be a list of '{}', got {}",
                column.column_type,
                type_name(value)
            ))
        })?;
        if let Some(bad) = items.iter().find(|item| !type_matches(item, column.column_type)) {
            return Err(FourDbError::Validation(format!(
                "Field '{field}' must only contain '{}' items, got {}",
                column.column_type,
                type_name(bad)
            )));
        }
        return Ok(());
    }

    if !type_matches(value, column.column_type) {
        return Err(FourDbError::Validation(format!(
            "Field '{field}' must be of type '{}', got {}",
            column.column_type,
            type_name(value)
        )));
    }
    Ok(())
}

/// Prepare a document for insertion: fill explicit defaults for omitted
/// columns, reject omitted required columns, unknown fields and values that
/// fail their type rule. Nothing is mutated on failure.
pub fn prepare_document(schema: &Schema, mut data: Document) -> Result<Document> {
    if let Some(unknown) = data.keys().find(|k| !schema.contains_key(k.as_str())) {
        return Err(FourDbError::Validation(format!(
            "Field '{unknown}' does not exist in schema"
        )));
    }

    for (field, column) in schema {
        let missing = match data.get(field) {
            None => true,
            Some(Value::Null) => !column.nullable,
            Some(value) => {
                validate_value(field, value, column)?;
                false
            }
        };
        if !missing {
            continue;
        }

        match &column.default {
            Some(default) => {
                let value = default_for_insert(column, default);
                data.insert(field.clone(), value);
            }
            None if column.nullable => {}
            None if data.contains_key(field) => {
                return Err(FourDbError::Validation(format!(
                    "Field '{field}' must not be null"
                )))
            }
            None => {
                return Err(FourDbError::Validation(format!(
                    "Field '{field}' must be defined"
                )))
            }
        }
    }

    Ok(data)
}

/// Validate every field of a partial update before any of it is applied.
pub fn validate_patch(schema: &Schema, patch: &Document) -> Result<()> {
    for (field, value) in patch {
        let column = schema.get(field).ok_or_else(|| {
            FourDbError::Validation(format!("Field '{field}' does not exist in schema"))
        })?;
        validate_value(field, value, column)?;
    }
    Ok(())
}

/// A uuid column's default stands for "generate one", like the SQL side's
/// server-side generator. A temporal `now()` default becomes the current
/// UTC date or timestamp in the column's layout.
fn default_for_insert(column: &ColumnDefinition, default: &Value) -> Value {
    if column.array {
        return default.clone();
    }
    if column.column_type == ColumnType::Uuid {
        return Value::String(uuid::Uuid::new_v4().to_string());
    }
    match column.column_type.date_format() {
        Some(format) if default.as_str() == Some(NOW_LITERAL) => {
            Value::String(Utc::now().format(format.chrono_layout()).to_string())
        }
        _ => default.clone(),
    }
}

pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{normalize, RawColumn, RawSchema};
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    fn users_schema() -> Schema {
        let mut raw = RawSchema::new();
        raw.insert("id".into(), RawColumn::new("uuid").primary(true).default_value(json!(true)));
        raw.insert("name".into(), RawColumn::new("varchar").max_length(50));
        raw.insert("age".into(), RawColumn::new("smallint").nullable(true));
        raw.insert("role".into(), RawColumn::new("text").default_value(json!("member")));
        raw.insert("tags".into(), RawColumn::new("text").array(true).nullable(true));
        normalize(&raw).unwrap()
    }

    #[test]
    fn test_type_matches() {
        assert!(type_matches(&json!("x"), ColumnType::Varchar));
        assert!(type_matches(&json!(1.5), ColumnType::Float));
        assert!(type_matches(&json!(3), ColumnType::BigSerial));
        assert!(type_matches(&json!(false), ColumnType::Boolean));
        assert!(type_matches(&json!("2024-01-01"), ColumnType::Date));
        assert!(type_matches(&json!({"a": 1}), ColumnType::Jsonb));
        assert!(type_matches(&json!([1, 2]), ColumnType::Json));
        assert!(type_matches(&json!([1, 2]), ColumnType::Array));
        assert!(type_matches(
            &json!("5f0f8c9f-5f3f-4b1c-b8c3-6d8a8a8a8a8a"),
            ColumnType::Uuid
        ));

        assert!(!type_matches(&json!(1), ColumnType::Text));
        assert!(!type_matches(&json!("1"), ColumnType::Integer));
        assert!(!type_matches(&json!("true"), ColumnType::Boolean));
        assert!(!type_matches(&json!({"a": 1}), ColumnType::Array));
        assert!(!type_matches(&json!("not-a-uuid"), ColumnType::Uuid));
    }

    #[test]
    fn test_numeric_bounds() {
        let cases = [
            (ColumnType::SmallInt, json!(32767), json!(32768)),
            (ColumnType::SmallInt, json!(-32767), json!(-32768)),
            (ColumnType::Integer, json!(2147483647i64), json!(2147483648i64)),
            (ColumnType::Integer, json!(-2147483647i64), json!(-2147483648i64)),
            (ColumnType::BigInt, json!(i64::MAX), json!(9223372036854775808u64)),
            (ColumnType::BigInt, json!(-i64::MAX), json!(i64::MIN)),
            (ColumnType::SmallSerial, json!(32767), json!(32768)),
            (ColumnType::SmallSerial, json!(1), json!(0)),
            (ColumnType::Serial, json!(2147483647i64), json!(2147483648i64)),
            (ColumnType::Serial, json!(1), json!(0)),
            (ColumnType::BigSerial, json!(i64::MAX), json!(9223372036854775808u64)),
            (ColumnType::BigSerial, json!(1), json!(0)),
        ];

        for (column_type, ok, bad) in cases {
            assert_eq!(
                check_numeric_range(&ok, column_type).unwrap(),
                ok.to_string(),
                "{column_type} should accept {ok}"
            );
            let err = check_numeric_range(&bad, column_type).unwrap_err();
            assert!(matches!(err, FourDbError::Range(_)), "{column_type} should reject {bad}");
            assert!(err.to_string().contains(column_type.sql_keyword()));
        }
    }

    #[test]
    fn test_float_has_no_bound() {
        assert!(check_numeric_range(&json!(1.5e300), ColumnType::Float).is_ok());
        assert!(check_numeric_range(&json!(-1), ColumnType::Float).is_ok());
    }

    #[test]
    fn test_integral_types_reject_fractions() {
        let err = check_numeric_range(&json!(1.5), ColumnType::Integer).unwrap_err();
        assert!(matches!(err, FourDbError::Range(_)));
        assert_eq!(check_numeric_range(&json!(2.0), ColumnType::Integer).unwrap(), "2.0");
    }

    #[test]
    fn test_numeric_range_on_text_type_is_schema_error() {
        let err = check_numeric_range(&json!(1), ColumnType::Text).unwrap_err();
        assert!(matches!(err, FourDbError::Schema(_)));
    }

    #[test]
    fn test_date_formats() {
        assert_eq!(
            check_date_format(&json!("2024-01-01"), ColumnType::Date).unwrap(),
            "2024-01-01"
        );
        for column_type in [ColumnType::Timestamp, ColumnType::TimestampTz] {
            assert!(check_date_format(&json!("2024-01-01T00:00:00.000Z"), column_type).is_ok());
            let err = check_date_format(&json!("2024-01-01"), column_type).unwrap_err();
            assert!(matches!(err, FourDbError::Format(_)));
        }
        let err = check_date_format(&json!("2024-01-01T00:00:00.000Z"), ColumnType::Date)
            .unwrap_err();
        assert!(matches!(err, FourDbError::Format(_)));
    }

    #[test]
    fn test_impossible_calendar_date_rejected() {
        let err = check_date_format(&json!("2024-13-40"), ColumnType::Date).unwrap_err();
        assert!(matches!(err, FourDbError::Format(_)));
    }

    #[test]
    fn test_validate_value_null_and_array() {
        let schema = users_schema();
        assert!(validate_value("age", &Value::Null, &schema["age"]).is_ok());
        assert!(validate_value("name", &Value::Null, &schema["name"]).is_err());
        assert!(validate_value("tags", &json!(["a", "b"]), &schema["tags"]).is_ok());
        assert!(validate_value("tags", &json!(["a", 1]), &schema["tags"]).is_err());
        assert!(validate_value("tags", &json!("a"), &schema["tags"]).is_err());
    }

    #[test]
    fn test_prepare_fills_defaults_and_generates_uuid() {
        let schema = users_schema();
        let prepared = prepare_document(&schema, doc(json!({"name": "Alice"}))).unwrap();

        assert_eq!(prepared["role"], json!("member"));
        let id = prepared["id"].as_str().unwrap();
        assert!(uuid::Uuid::parse_str(id).is_ok());
        assert!(!prepared.contains_key("age"));
    }

    #[test]
    fn test_prepare_resolves_now_defaults() {
        let mut raw = RawSchema::new();
        raw.insert("created".into(), RawColumn::new("date").default_value(json!("now()")));
        raw.insert("seen".into(), RawColumn::new("timestamptz").default_value(json!("now()")));
        let schema = normalize(&raw).unwrap();

        let prepared = prepare_document(&schema, Document::new()).unwrap();
        assert!(check_date_format(&prepared["created"], ColumnType::Date).is_ok());
        assert!(check_date_format(&prepared["seen"], ColumnType::TimestampTz).is_ok());
        assert!(validate_value("created", &prepared["created"], &schema["created"]).is_ok());
    }

    #[test]
    fn test_prepare_missing_required_field() {
        let schema = users_schema();
        let err = prepare_document(&schema, doc(json!({"age": 3}))).unwrap_err();
        assert!(matches!(err, FourDbError::Validation(_)));
        assert!(err.to_string().contains("name"));
    }

    #[test]
    fn test_prepare_type_mismatch() {
        let schema = users_schema();
        let err = prepare_document(&schema, doc(json!({"name": 42}))).unwrap_err();
        assert!(err.to_string().contains("name"));
    }

    #[test]
    fn test_prepare_rejects_unknown_field() {
        let schema = users_schema();
        let err = prepare_document(&schema, doc(json!({"name": "A", "extra": 1}))).unwrap_err();
        assert!(err.to_string().contains("extra"));
    }

    #[test]
    fn test_prepare_null_on_defaulted_column_uses_default() {
        let schema = users_schema();
        let prepared =
            prepare_document(&schema, doc(json!({"name": "A", "role": null}))).unwrap();
        assert_eq!(prepared["role"], json!("member"));
    }

    #[test]
    fn test_validate_patch() {
        let schema = users_schema();
        assert!(validate_patch(&schema, &doc(json!({"name": "B", "age": 4}))).is_ok());

        let err = validate_patch(&schema, &doc(json!({"nickname": "B"}))).unwrap_err();
        assert!(err.to_string().contains("does not exist"));

        let err = validate_patch(&schema, &doc(json!({"name": "B", "age": "four"}))).unwrap_err();
        assert!(err.to_string().contains("age"));
    }
}
