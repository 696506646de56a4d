use super::normalize::normalize;
use super::types::{RawSchema, Schema};
use crate::error::Result;
use std::path::Path;

/// Parse a schema file (YAML or JSON) into a normalized Schema
pub fn parse_schema(path: &Path) -> Result<Schema> {
    let content = std::fs::read_to_string(path)?;
    parse_schema_str(&content)
}

/// Parse a schema YAML/JSON string into a normalized Schema
pub fn parse_schema_str(content: &str) -> Result<Schema> {
    let raw = parse_raw_schema_str(content)?;
    normalize(&raw)
}

/// Parse a schema string without normalizing it.
pub fn parse_raw_schema_str(content: &str) -> Result<RawSchema> {
    let raw: RawSchema = serde_yaml::from_str(content)?;
    Ok(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FourDbError;
    use crate::schema::types::{ColumnType, ReferentialAction};

    #[test]
    fn test_parse_yaml_schema() {
        let schema = parse_schema_str(
            r#"
id: { type: uuid, primary: true, default: true }
name: { type: VARCHAR, maxLength: 50 }
author_id:
  type: uuid
  foreignKey:
    column: author_id
    references: users
    referencesColumn: id
    onDelete: CASCADE
"#,
        )
        .unwrap();

        assert_eq!(schema.len(), 3);
        assert_eq!(schema["name"].column_type, ColumnType::Varchar);
        assert_eq!(schema["name"].max_length, 50);
        let fk = schema["author_id"].foreign_key.as_ref().unwrap();
        assert_eq!(fk.on_delete, ReferentialAction::Cascade);
        assert_eq!(fk.on_update, ReferentialAction::NoAction);
    }

    #[test]
    fn test_parse_json_schema_keeps_order() {
        let schema = parse_schema_str(
            r#"{"zeta": {"type": "text"}, "alpha": {"type": "boolean", "nullable": true}}"#,
        )
        .unwrap();
        let names: Vec<&String> = schema.keys().collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
    }

    #[test]
    fn test_unknown_type_is_schema_error_not_parse_error() {
        let err = parse_schema_str("cost: { type: money }").unwrap_err();
        assert!(matches!(err, FourDbError::Schema(_)));
    }

    #[test]
    fn test_malformed_text_is_yaml_error() {
        let err = parse_schema_str("cost: [unclosed").unwrap_err();
        assert!(matches!(err, FourDbError::Yaml(_)));
    }
}
