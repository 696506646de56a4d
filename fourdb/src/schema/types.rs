use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A stored record: column name -> value, in insertion order.
pub type Document = serde_json::Map<String, serde_json::Value>;

/// Equality conditions (column -> value), combined with AND.
pub type Conditions = serde_json::Map<String, serde_json::Value>;

/// Schema as declared by a caller, before normalization.
pub type RawSchema = IndexMap<String, RawColumn>;

/// Normalized schema. Column order drives generated column order.
pub type Schema = IndexMap<String, ColumnDefinition>;

/// Column type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    String,
    Text,
    Character,
    Varchar,
    Integer,
    SmallInt,
    BigInt,
    Serial,
    SmallSerial,
    BigSerial,
    Float,
    Boolean,
    Date,
    Timestamp,
    TimestampTz,
    Json,
    Jsonb,
    Array,
    Uuid,
}

/// Column definition exactly as declared. Every flag is optional here;
/// the normalizer decides what absence means.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawColumn {
    #[serde(rename = "type")]
    pub column_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub array: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_key: Option<ForeignKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl RawColumn {
    pub fn new(column_type: &str) -> Self {
        RawColumn {
            column_type: column_type.to_string(),
            ..Default::default()
        }
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = Some(nullable);
        self
    }

    pub fn unique(mut self, unique: bool) -> Self {
        self.unique = Some(unique);
        self
    }

    pub fn primary(mut self, primary: bool) -> Self {
        self.primary = Some(primary);
        self
    }

    pub fn max_length(mut self, max_length: u32) -> Self {
        self.max_length = Some(max_length);
        self
    }

    pub fn array(mut self, array: bool) -> Self {
        self.array = Some(array);
        self
    }

    pub fn check(mut self, check: &str) -> Self {
        self.check = Some(check.to_string());
        self
    }

    pub fn default_value(mut self, value: serde_json::Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn foreign_key(mut self, foreign_key: ForeignKey) -> Self {
        self.foreign_key = Some(foreign_key);
        self
    }

    pub fn comment(mut self, comment: &str) -> Self {
        self.comment = Some(comment.to_string());
        self
    }
}

/// Normalized column definition.
///
/// `default` only ever holds a caller-supplied default. The zero value the
/// type catalog derives lives in `display_default` and is never used to
/// satisfy `nullable: false` at insert time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDefinition {
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    #[serde(default)]
    pub array: bool,
    /// 0 means unbounded.
    #[serde(default)]
    pub max_length: u32,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub primary: bool,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_key: Option<ForeignKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default)]
    pub display_default: serde_json::Value,
}

impl ColumnDefinition {
    /// Whether a create/insert must carry a value for this column.
    pub fn is_required(&self) -> bool {
        !self.nullable && self.default.is_none()
    }
}

impl From<&ColumnDefinition> for RawColumn {
    fn from(column: &ColumnDefinition) -> Self {
        RawColumn {
            column_type: column.column_type.name().to_string(),
            array: Some(column.array),
            max_length: Some(column.max_length),
            unique: Some(column.unique),
            primary: Some(column.primary),
            nullable: Some(column.nullable),
            check: column.check.clone(),
            default: column.default.clone(),
            foreign_key: column.foreign_key.clone(),
            comment: column.comment.clone(),
        }
    }
}

/// Foreign key constraint attached to a column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeignKey {
    pub column: String,
    pub references: String,
    pub references_column: String,
    #[serde(default)]
    pub on_delete: ReferentialAction,
    #[serde(default)]
    pub on_update: ReferentialAction,
}

/// ON DELETE / ON UPDATE action
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReferentialAction {
    #[serde(rename = "CASCADE")]
    Cascade,
    #[serde(rename = "SET NULL")]
    SetNull,
    #[serde(rename = "SET DEFAULT")]
    SetDefault,
    #[default]
    #[serde(rename = "NO ACTION")]
    NoAction,
}

impl ReferentialAction {
    pub fn as_sql(&self) -> &'static str {
        match self {
            ReferentialAction::Cascade => "CASCADE",
            ReferentialAction::SetNull => "SET NULL",
            ReferentialAction::SetDefault => "SET DEFAULT",
            ReferentialAction::NoAction => "NO ACTION",
        }
    }
}

/// Converts a normalized schema back into its declared form.
pub fn to_raw(schema: &Schema) -> RawSchema {
    schema
        .iter()
        .map(|(name, column)| (name.clone(), RawColumn::from(column)))
        .collect()
}
