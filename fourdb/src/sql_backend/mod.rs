use crate::error::{FourDbError, Result};
use crate::query::Crud;
use crate::schema::{normalize, ColumnDefinition, Conditions, Document, RawSchema, Schema, ValueKind};
use crate::sql::{render_create_table, render_delete, render_insert, render_select, render_update};
use crate::validation::{prepare_document, validate_patch};
use rusqlite::types::Value as SqlValue;
use rusqlite::Connection;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

const ROWID: &str = "rowid";

/// SQL backend: generated statements executed on a SQLite connection.
/// One statement per call; no batching, retry or timeout.
pub struct SqlBackend {
    conn: Connection,
    tables: HashMap<String, Schema>,
}

impl SqlBackend {
    /// Open or create a database file.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Ok(SqlBackend {
            conn,
            tables: HashMap::new(),
        })
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(SqlBackend {
            conn,
            tables: HashMap::new(),
        })
    }

    /// Normalize the schema and run its `CREATE TABLE IF NOT EXISTS`.
    /// Redefining a table replaces the remembered schema only; the
    /// existing table is left as it is.
    pub fn define_table(&mut self, name: &str, raw: &RawSchema) -> Result<()> {
        let schema = normalize(raw)?;
        // Rendered in full first so default range and format errors surface.
        render_create_table(name, &schema)?;
        let sql = render_create_table(name, &without_defaults(&schema))?;
        self.execute(&sql)?;

        if self.tables.insert(name.to_string(), schema).is_some() {
            log::warn!("Table '{name}' redefined; existing rows were not migrated");
        } else {
            log::info!("Defined table '{name}'");
        }
        Ok(())
    }

    /// Get a handle for CRUD on a defined table.
    pub fn table(&self, name: &str) -> Result<SqlTable<'_>> {
        let schema = self.tables.get(name).ok_or_else(|| FourDbError::NotFound {
            collection: name.to_string(),
        })?;
        Ok(SqlTable {
            backend: self,
            name: name.to_string(),
            schema,
        })
    }

    pub fn schema(&self, name: &str) -> Option<&Schema> {
        self.tables.get(name)
    }

    /// Execute one rendered statement and return the number of changed rows.
    pub fn execute(&self, sql: &str) -> Result<usize> {
        log::debug!("executing: {sql}");
        let changed = self.conn.execute(sql, [])?;
        Ok(changed)
    }
}

/// A handle to one table of a SqlBackend.
pub struct SqlTable<'a> {
    backend: &'a SqlBackend,
    name: String,
    schema: &'a Schema,
}

impl<'a> SqlTable<'a> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Schema {
        self.schema
    }

    /// Rows matching `conditions` with their rowids, in insertion order.
    fn select(&self, conditions: &Conditions, limit: Option<usize>) -> Result<Vec<(i64, Document)>> {
        // An unknown column never matches, same as a missing document field.
        if conditions.keys().any(|k| !self.schema.contains_key(k.as_str())) {
            return Ok(Vec::new());
        }

        let mut columns: Vec<&str> = vec![ROWID];
        columns.extend(self.schema.keys().map(|k| k.as_str()));
        let sql = render_select(&self.name, &columns, conditions, Some(ROWID), limit)?;
        log::debug!("querying: {sql}");

        let mut stmt = self.backend.conn.prepare(&sql)?;
        let schema = self.schema;
        let rows = stmt.query_map([], |row| {
            let rowid: i64 = row.get(0)?;
            let mut document = Document::new();
            for (i, (name, column)) in schema.iter().enumerate() {
                let raw: SqlValue = row.get(i + 1)?;
                if let Some(value) = from_sql_value(raw, column) {
                    document.insert(name.clone(), value);
                }
            }
            Ok((rowid, document))
        })?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    fn first(&self, conditions: &Conditions) -> Result<Option<(i64, Document)>> {
        Ok(self.select(conditions, Some(1))?.into_iter().next())
    }
}

impl<'a> Crud for SqlTable<'a> {
    fn get_all(&self) -> Result<Vec<Document>> {
        self.find_many(&Conditions::new())
    }

    fn find_many(&self, conditions: &Conditions) -> Result<Vec<Document>> {
        Ok(self
            .select(conditions, None)?
            .into_iter()
            .map(|(_, doc)| doc)
            .collect())
    }

    fn find_one(&self, conditions: &Conditions) -> Result<Option<Document>> {
        Ok(self.first(conditions)?.map(|(_, doc)| doc))
    }

    fn create(&mut self, data: Document) -> Result<Document> {
        let document = prepare_document(self.schema, data)?;
        let sql = render_insert(&self.name, &document)?;
        self.backend.execute(&sql)?;
        Ok(document)
    }

    fn update(&mut self, conditions: &Conditions, patch: &Document) -> Result<Option<Document>> {
        let (rowid, current) = match self.first(conditions)? {
            Some(found) => found,
            None => return Ok(None),
        };
        validate_patch(self.schema, patch)?;
        if patch.is_empty() {
            return Ok(Some(current));
        }

        let by_rowid = row_condition(rowid);
        let sql = render_update(&self.name, patch, &by_rowid)?;
        self.backend.execute(&sql)?;

        Ok(self.first(&by_rowid)?.map(|(_, doc)| doc))
    }

    fn delete(&mut self, conditions: &Conditions) -> Result<Option<Document>> {
        let (rowid, document) = match self.first(conditions)? {
            Some(found) => found,
            None => return Ok(None),
        };

        let sql = render_delete(&self.name, &row_condition(rowid))?;
        self.backend.execute(&sql)?;
        Ok(Some(document))
    }
}

/// `prepare_document` fills every default before an insert, so the executed
/// DDL carries none. Server-side generators such as `uuid_generate_v4()` and
/// `now()` are not valid SQLite defaults.
fn without_defaults(schema: &Schema) -> Schema {
    schema
        .iter()
        .map(|(name, column)| {
            let column = ColumnDefinition {
                default: None,
                ..column.clone()
            };
            (name.clone(), column)
        })
        .collect()
}

fn row_condition(rowid: i64) -> Conditions {
    let mut conditions = Conditions::new();
    conditions.insert(ROWID.to_string(), Value::from(rowid));
    conditions
}

/// Decode a stored value using the column's type. NULL decodes to an
/// absent field.
fn from_sql_value(raw: SqlValue, column: &ColumnDefinition) -> Option<Value> {
    let kind = column.column_type.value_kind();
    match raw {
        SqlValue::Null => None,
        SqlValue::Integer(i) if kind == ValueKind::Boolean && !column.array => Some(Value::Bool(i != 0)),
        SqlValue::Integer(i) => Some(Value::from(i)),
        // REAL affinity turns a stored 3 into 3.0; give integral values back as integers.
        SqlValue::Real(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 => {
            Some(Value::from(f as i64))
        }
        SqlValue::Real(f) => Some(serde_json::Number::from_f64(f).map_or(Value::Null, Value::Number)),
        SqlValue::Text(s) => {
            let structured = column.array
                || matches!(kind, ValueKind::Structured | ValueKind::Sequence);
            if structured {
                Some(serde_json::from_str(&s).unwrap_or(Value::String(s)))
            } else {
                Some(Value::String(s))
            }
        }
        SqlValue::Blob(bytes) => Some(Value::Array(bytes.into_iter().map(Value::from).collect())),
    }
}
