// Type catalog: per-type validation rule, numeric bounds, temporal format,
// SQL keyword and zero value.

use super::types::ColumnType;
use crate::error::{FourDbError, Result};
use regex::Regex;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// The kind of JSON value a column type accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Text,
    Numeric,
    Boolean,
    /// Canonical date/time text
    Temporal,
    /// JSON object or array
    Structured,
    Sequence,
    /// UUID text
    Uuid,
}

/// Inclusive bounds for a numeric column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericRange {
    Integral { min: i64, max: i64 },
    /// Anything representable as an IEEE-754 double.
    Float,
}

/// Required textual layout of a temporal column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFormat {
    /// `YYYY-MM-DD`
    Date,
    /// `YYYY-MM-DDThh:mm:ss.sssZ`
    Timestamp,
}

impl DateFormat {
    pub fn pattern(&self) -> &'static str {
        match self {
            DateFormat::Date => r"^\d{4}-\d{2}-\d{2}$",
            DateFormat::Timestamp => r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}\.\d{3}Z$",
        }
    }

    /// `pattern` compiled once per process.
    pub fn regex(&self) -> Option<&'static Regex> {
        static DATE: OnceLock<Option<Regex>> = OnceLock::new();
        static TIMESTAMP: OnceLock<Option<Regex>> = OnceLock::new();
        let cell = match self {
            DateFormat::Date => &DATE,
            DateFormat::Timestamp => &TIMESTAMP,
        };
        cell.get_or_init(|| Regex::new(self.pattern()).ok()).as_ref()
    }

    /// chrono layout matching `pattern`
    pub fn chrono_layout(&self) -> &'static str {
        match self {
            DateFormat::Date => "%Y-%m-%d",
            DateFormat::Timestamp => "%Y-%m-%dT%H:%M:%S%.3fZ",
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            DateFormat::Date => "YYYY-MM-DD",
            DateFormat::Timestamp => "YYYY-MM-DDThh:mm:ss.sssZ",
        }
    }
}

/// Literal accepted verbatim as a temporal default.
pub const NOW_LITERAL: &str = "now()";

impl ColumnType {
    pub const ALL: [ColumnType; 19] = [
        ColumnType::String,
        ColumnType::Text,
        ColumnType::Character,
        ColumnType::Varchar,
        ColumnType::Integer,
        ColumnType::SmallInt,
        ColumnType::BigInt,
        ColumnType::Serial,
        ColumnType::SmallSerial,
        ColumnType::BigSerial,
        ColumnType::Float,
        ColumnType::Boolean,
        ColumnType::Date,
        ColumnType::Timestamp,
        ColumnType::TimestampTz,
        ColumnType::Json,
        ColumnType::Jsonb,
        ColumnType::Array,
        ColumnType::Uuid,
    ];

    /// Canonical (lowercase) type name, as stored in the backing file.
    pub fn name(&self) -> &'static str {
        match self {
            ColumnType::String => "string",
            ColumnType::Text => "text",
            ColumnType::Character => "character",
            ColumnType::Varchar => "varchar",
            ColumnType::Integer => "integer",
            ColumnType::SmallInt => "smallint",
            ColumnType::BigInt => "bigint",
            ColumnType::Serial => "serial",
            ColumnType::SmallSerial => "smallserial",
            ColumnType::BigSerial => "bigserial",
            ColumnType::Float => "float",
            ColumnType::Boolean => "boolean",
            ColumnType::Date => "date",
            ColumnType::Timestamp => "timestamp",
            ColumnType::TimestampTz => "timestamptz",
            ColumnType::Json => "json",
            ColumnType::Jsonb => "jsonb",
            ColumnType::Array => "array",
            ColumnType::Uuid => "uuid",
        }
    }

    /// SQL type keyword used in generated DDL.
    pub fn sql_keyword(&self) -> &'static str {
        match self {
            ColumnType::String | ColumnType::Varchar => "VARCHAR",
            ColumnType::Text => "TEXT",
            ColumnType::Character => "CHARACTER",
            ColumnType::Integer => "INTEGER",
            ColumnType::SmallInt => "SMALLINT",
            ColumnType::BigInt => "BIGINT",
            ColumnType::Serial => "SERIAL",
            ColumnType::SmallSerial => "SMALLSERIAL",
            ColumnType::BigSerial => "BIGSERIAL",
            ColumnType::Float => "FLOAT8",
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::Date => "DATE",
            ColumnType::Timestamp => "TIMESTAMP",
            ColumnType::TimestampTz => "TIMESTAMPTZ",
            ColumnType::Json => "JSON",
            ColumnType::Jsonb => "JSONB",
            ColumnType::Array => "TEXT[]",
            ColumnType::Uuid => "UUID",
        }
    }

    pub fn value_kind(&self) -> ValueKind {
        match self {
            ColumnType::String | ColumnType::Text | ColumnType::Character | ColumnType::Varchar => {
                ValueKind::Text
            }
            ColumnType::Integer
            | ColumnType::SmallInt
            | ColumnType::BigInt
            | ColumnType::Serial
            | ColumnType::SmallSerial
            | ColumnType::BigSerial
            | ColumnType::Float => ValueKind::Numeric,
            ColumnType::Boolean => ValueKind::Boolean,
            ColumnType::Date | ColumnType::Timestamp | ColumnType::TimestampTz => {
                ValueKind::Temporal
            }
            ColumnType::Json | ColumnType::Jsonb => ValueKind::Structured,
            ColumnType::Array => ValueKind::Sequence,
            ColumnType::Uuid => ValueKind::Uuid,
        }
    }

    /// Whether a `maxLength` may be attached to this type.
    pub fn is_length_bearing(&self) -> bool {
        self.value_kind() == ValueKind::Text
    }

    pub fn numeric_range(&self) -> Option<NumericRange> {
        let range = match self {
            ColumnType::SmallInt => NumericRange::Integral { min: -32_767, max: 32_767 },
            ColumnType::Integer => NumericRange::Integral {
                min: -2_147_483_647,
                max: 2_147_483_647,
            },
            ColumnType::BigInt => NumericRange::Integral { min: -i64::MAX, max: i64::MAX },
            ColumnType::SmallSerial => NumericRange::Integral { min: 1, max: 32_767 },
            ColumnType::Serial => NumericRange::Integral { min: 1, max: 2_147_483_647 },
            ColumnType::BigSerial => NumericRange::Integral { min: 1, max: i64::MAX },
            ColumnType::Float => NumericRange::Float,
            _ => return None,
        };
        Some(range)
    }

    pub fn date_format(&self) -> Option<DateFormat> {
        match self {
            ColumnType::Date => Some(DateFormat::Date),
            ColumnType::Timestamp | ColumnType::TimestampTz => Some(DateFormat::Timestamp),
            _ => None,
        }
    }

    /// Zero value used to pre-fill display defaults.
    pub fn zero_value(&self) -> Value {
        match self.value_kind() {
            ValueKind::Text => Value::String(String::new()),
            ValueKind::Numeric => Value::from(0),
            ValueKind::Boolean => Value::Bool(false),
            ValueKind::Temporal => Value::String(NOW_LITERAL.to_string()),
            ValueKind::Structured => Value::Object(serde_json::Map::new()),
            ValueKind::Sequence => Value::Array(Vec::new()),
            ValueKind::Uuid => Value::Null,
        }
    }
}

impl FromStr for ColumnType {
    type Err = FourDbError;

    fn from_str(s: &str) -> Result<Self> {
        let lowered = s.trim().to_ascii_lowercase();
        let column_type = match lowered.as_str() {
            "number" | "float8" => ColumnType::Float,
            "char" | "bpchar" => ColumnType::Character,
            "int" | "int4" => ColumnType::Integer,
            "int2" => ColumnType::SmallInt,
            "int8" => ColumnType::BigInt,
            other => ColumnType::ALL
                .iter()
                .copied()
                .find(|t| t.name() == other)
                .ok_or_else(|| FourDbError::Schema(format!("Unknown column type '{s}'")))?,
        };
        Ok(column_type)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("VARCHAR".parse::<ColumnType>().unwrap(), ColumnType::Varchar);
        assert_eq!("TimestampTz".parse::<ColumnType>().unwrap(), ColumnType::TimestampTz);
    }

    #[test]
    fn test_parse_aliases() {
        assert_eq!("number".parse::<ColumnType>().unwrap(), ColumnType::Float);
        assert_eq!("bpchar".parse::<ColumnType>().unwrap(), ColumnType::Character);
        assert_eq!("int8".parse::<ColumnType>().unwrap(), ColumnType::BigInt);
    }

    #[test]
    fn test_unknown_type_is_schema_error() {
        let err = "money".parse::<ColumnType>().unwrap_err();
        assert!(matches!(err, FourDbError::Schema(_)));
        assert!(err.to_string().contains("money"));
    }

    #[test]
    fn test_every_name_round_trips() {
        for column_type in ColumnType::ALL {
            assert_eq!(column_type.name().parse::<ColumnType>().unwrap(), column_type);
        }
    }

    #[test]
    fn test_serde_name_matches_catalog_name() {
        for column_type in ColumnType::ALL {
            let json = serde_json::to_value(column_type).unwrap();
            assert_eq!(json, Value::String(column_type.name().to_string()));
        }
    }

    #[test]
    fn test_length_bearing_types() {
        assert!(ColumnType::Varchar.is_length_bearing());
        assert!(ColumnType::String.is_length_bearing());
        assert!(!ColumnType::Integer.is_length_bearing());
        assert!(!ColumnType::Uuid.is_length_bearing());
    }

    #[test]
    fn test_zero_values() {
        assert_eq!(ColumnType::Text.zero_value(), Value::String(String::new()));
        assert_eq!(ColumnType::BigInt.zero_value(), Value::from(0));
        assert_eq!(ColumnType::Boolean.zero_value(), Value::Bool(false));
        assert_eq!(ColumnType::Date.zero_value(), Value::String("now()".into()));
        assert_eq!(ColumnType::Jsonb.zero_value(), serde_json::json!({}));
        assert_eq!(ColumnType::Array.zero_value(), serde_json::json!([]));
        assert_eq!(ColumnType::Uuid.zero_value(), Value::Null);
    }

    #[test]
    fn test_serial_ranges_start_at_one() {
        assert_eq!(
            ColumnType::SmallSerial.numeric_range(),
            Some(NumericRange::Integral { min: 1, max: 32_767 })
        );
        assert_eq!(ColumnType::Text.numeric_range(), None);
    }

    #[test]
    fn test_date_regex_is_compiled_once() {
        let first = DateFormat::Timestamp.regex().unwrap();
        let second = DateFormat::Timestamp.regex().unwrap();
        assert!(std::ptr::eq(first, second));
        assert!(first.is_match("2024-01-01T00:00:00.000Z"));
        assert!(!DateFormat::Date.regex().unwrap().is_match("2024-01-01T00:00:00.000Z"));
    }
}
