use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::Row;

/// Failure to project a catalog row onto an entry.
#[derive(Debug, Error, PartialEq)]
pub enum RowMappingError {
    #[error("column '{0}' missing from result row")]
    MissingColumn(&'static str),

    #[error("column '{column}' is NULL but a value is required")]
    UnexpectedNull { column: &'static str },

    #[error("column '{column}' holds {found}, expected {expected}")]
    InvalidValue {
        column: &'static str,
        expected: &'static str,
        found: String,
    },
}

/// An entry built from one catalog row.
///
/// `FIELDS` lists `(catalog expression, alias)` pairs. The catalog query selects
/// exactly these, and `from_row` reads the aliases back; other columns are ignored.
pub trait CatalogEntry: Sized {
    const FIELDS: &'static [(&'static str, &'static str)];

    fn from_row(row: &Row) -> Result<Self, RowMappingError>;

    fn select_list() -> String {
        Self::FIELDS
            .iter()
            .map(|(expr, alias)| format!("{} as {}", expr, alias))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Schema/database properties
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SchemaEntry {
    pub schema_name: String,
    pub catalog_name: String,
    pub default_character_set_name: String,
    pub default_collation_name: String,
    pub sql_path: Option<String>,
    pub schema_comment: Option<String>,
}

impl CatalogEntry for SchemaEntry {
    const FIELDS: &'static [(&'static str, &'static str)] = &[
        ("SCHEMA_NAME", "schema_name"),
        ("CATALOG_NAME", "catalog_name"),
        ("DEFAULT_CHARACTER_SET_NAME", "default_character_set_name"),
        ("DEFAULT_COLLATION_NAME", "default_collation_name"),
        ("SQL_PATH", "sql_path"),
        ("SCHEMA_COMMENT", "schema_comment"),
    ];

    fn from_row(row: &Row) -> Result<Self, RowMappingError> {
        let r = RowReader(row);
        Ok(Self {
            schema_name: r.string("schema_name")?,
            catalog_name: r.string("catalog_name")?,
            default_character_set_name: r.string("default_character_set_name")?,
            default_collation_name: r.string("default_collation_name")?,
            sql_path: r.opt_string("sql_path")?,
            schema_comment: r.opt_string("schema_comment")?,
        })
    }
}

/// Table properties
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TableEntry {
    pub name: String,
    pub engine: Option<String>,
    pub version: Option<u64>,
    pub table_rows: Option<u64>,
    pub avg_row_length: Option<u64>,
    pub data_length: Option<u64>,
    pub index_length: Option<u64>,
    pub create_time: Option<NaiveDateTime>,
    pub update_time: Option<NaiveDateTime>,
    pub table_collation: Option<String>,
}

impl CatalogEntry for TableEntry {
    const FIELDS: &'static [(&'static str, &'static str)] = &[
        ("TABLE_NAME", "name"),
        ("ENGINE", "engine"),
        ("VERSION", "version"),
        ("TABLE_ROWS", "table_rows"),
        ("AVG_ROW_LENGTH", "avg_row_length"),
        ("DATA_LENGTH", "data_length"),
        ("INDEX_LENGTH", "index_length"),
        ("CREATE_TIME", "create_time"),
        ("UPDATE_TIME", "update_time"),
        ("TABLE_COLLATION", "table_collation"),
    ];

    fn from_row(row: &Row) -> Result<Self, RowMappingError> {
        let r = RowReader(row);
        Ok(Self {
            name: r.string("name")?,
            engine: r.opt_string("engine")?,
            version: r.opt_u64("version")?,
            table_rows: r.opt_u64("table_rows")?,
            avg_row_length: r.opt_u64("avg_row_length")?,
            data_length: r.opt_u64("data_length")?,
            index_length: r.opt_u64("index_length")?,
            create_time: r.opt_datetime("create_time")?,
            update_time: r.opt_datetime("update_time")?,
            table_collation: r.opt_string("table_collation")?,
        })
    }
}

/// Key type: PRI - primary, UNI - unique, MUL - other (non-unique index, foreign key)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum KeyType {
    #[serde(rename = "PRI")]
    Primary,
    #[serde(rename = "UNI")]
    Unique,
    #[serde(rename = "MUL")]
    Multiple,
}

impl KeyType {
    /// Parse a catalog `COLUMN_KEY` value; the empty string means no key.
    pub fn from_catalog(value: &str) -> Result<Option<Self>, String> {
        match value {
            "" => Ok(None),
            "PRI" => Ok(Some(KeyType::Primary)),
            "UNI" => Ok(Some(KeyType::Unique)),
            "MUL" => Ok(Some(KeyType::Multiple)),
            other => Err(other.to_string()),
        }
    }
}

/// Column properties
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ColumnEntry {
    pub name: String,
    pub data_type: String,
    pub column_type: String,
    pub position: u64,
    pub default_value: Option<String>,
    pub nullable: bool,
    pub character_max_length: Option<u64>,
    pub numeric_precision: Option<u64>,
    pub numeric_scale: Option<u64>,
    pub datetime_precision: Option<u64>,
    pub character_set_name: Option<String>,
    pub collation_name: Option<String>,
    pub column_key: Option<KeyType>,
    pub extra: String,
    pub privileges: String,
}

impl ColumnEntry {
    pub fn is_primary_key(&self) -> bool {
        self.column_key == Some(KeyType::Primary)
    }
}

impl CatalogEntry for ColumnEntry {
    const FIELDS: &'static [(&'static str, &'static str)] = &[
        ("COLUMN_NAME", "name"),
        ("ORDINAL_POSITION", "position"),
        ("COLUMN_DEFAULT", "default_value"),
        ("(IS_NULLABLE = 'YES')", "nullable"),
        ("COLUMN_TYPE", "column_type"),
        ("DATA_TYPE", "data_type"),
        ("CHARACTER_MAXIMUM_LENGTH", "character_max_length"),
        ("NUMERIC_PRECISION", "numeric_precision"),
        ("NUMERIC_SCALE", "numeric_scale"),
        ("DATETIME_PRECISION", "datetime_precision"),
        ("CHARACTER_SET_NAME", "character_set_name"),
        ("COLLATION_NAME", "collation_name"),
        ("COLUMN_KEY", "column_key"),
        ("EXTRA", "extra"),
        ("PRIVILEGES", "privileges"),
    ];

    fn from_row(row: &Row) -> Result<Self, RowMappingError> {
        let r = RowReader(row);
        let column_key = match r.opt_string("column_key")? {
            Some(key) => KeyType::from_catalog(&key).map_err(|found| RowMappingError::InvalidValue {
                column: "column_key",
                expected: "one of PRI, UNI, MUL or empty",
                found,
            })?,
            None => None,
        };

        Ok(Self {
            name: r.string("name")?,
            data_type: r.string("data_type")?,
            column_type: r.string("column_type")?,
            position: r.u64("position")?,
            default_value: r.opt_string("default_value")?,
            nullable: r.bool("nullable")?,
            character_max_length: r.opt_u64("character_max_length")?,
            numeric_precision: r.opt_u64("numeric_precision")?,
            numeric_scale: r.opt_u64("numeric_scale")?,
            datetime_precision: r.opt_u64("datetime_precision")?,
            character_set_name: r.opt_string("character_set_name")?,
            collation_name: r.opt_string("collation_name")?,
            column_key,
            extra: r.opt_string("extra")?.unwrap_or_default(),
            privileges: r.opt_string("privileges")?.unwrap_or_default(),
        })
    }
}

/// Typed accessors over a result row, tolerant of the text and binary protocols.
pub(crate) struct RowReader<'a>(pub(crate) &'a Row);

impl<'a> RowReader<'a> {
    fn value(&self, column: &'static str) -> Result<&'a Value, RowMappingError> {
        self.0.get(column).ok_or(RowMappingError::MissingColumn(column))
    }

    pub(crate) fn string(&self, column: &'static str) -> Result<String, RowMappingError> {
        self.opt_string(column)?
            .ok_or(RowMappingError::UnexpectedNull { column })
    }

    pub(crate) fn opt_string(&self, column: &'static str) -> Result<Option<String>, RowMappingError> {
        match self.value(column)? {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(s.clone())),
            Value::Number(n) => Ok(Some(n.to_string())),
            Value::Bool(b) => Ok(Some(b.to_string())),
            other => Err(invalid(column, "a string", other)),
        }
    }

    pub(crate) fn u64(&self, column: &'static str) -> Result<u64, RowMappingError> {
        self.opt_u64(column)?
            .ok_or(RowMappingError::UnexpectedNull { column })
    }

    pub(crate) fn opt_u64(&self, column: &'static str) -> Result<Option<u64>, RowMappingError> {
        match self.value(column)? {
            Value::Null => Ok(None),
            Value::Number(n) => n
                .as_u64()
                .map(Some)
                .ok_or_else(|| invalid(column, "an unsigned integer", &Value::Number(n.clone()))),
            Value::String(s) => s
                .trim()
                .parse::<u64>()
                .map(Some)
                .map_err(|_| invalid(column, "an unsigned integer", &Value::String(s.clone()))),
            other => Err(invalid(column, "an unsigned integer", other)),
        }
    }

    pub(crate) fn bool(&self, column: &'static str) -> Result<bool, RowMappingError> {
        match self.value(column)? {
            Value::Bool(b) => Ok(*b),
            Value::Number(n) => match n.as_i64() {
                Some(0) => Ok(false),
                Some(1) => Ok(true),
                _ => Err(invalid(column, "a boolean", &Value::Number(n.clone()))),
            },
            Value::String(s) => match s.as_str() {
                "0" => Ok(false),
                "1" => Ok(true),
                _ => Err(invalid(column, "a boolean", &Value::String(s.clone()))),
            },
            Value::Null => Err(RowMappingError::UnexpectedNull { column }),
            other => Err(invalid(column, "a boolean", other)),
        }
    }

    pub(crate) fn opt_datetime(&self, column: &'static str) -> Result<Option<NaiveDateTime>, RowMappingError> {
        match self.value(column)? {
            Value::Null => Ok(None),
            Value::String(s) => NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                .map(Some)
                .map_err(|_| invalid(column, "a 'YYYY-MM-DD HH:MM:SS' timestamp", &Value::String(s.clone()))),
            other => Err(invalid(column, "a timestamp", other)),
        }
    }
}

fn invalid(column: &'static str, expected: &'static str, found: &Value) -> RowMappingError {
    RowMappingError::InvalidValue {
        column,
        expected,
        found: found.to_string(),
    }
}
