//! SQLite type conversion utilities.
//!
//! SQLite is dynamically typed, so cells are decoded by the storage class of
//! the value itself rather than the declared column type:
//! - INTEGER: 64-bit signed integer (declared BOOLEAN columns become bools)
//! - REAL: 64-bit floating point
//! - TEXT: UTF-8 string
//! - BLOB: binary data, decoded lossily as UTF-8
//! - NULL

use sqlx::sqlite::{SqliteColumn, SqliteRow};
use sqlx::{Column, Row, TypeInfo, ValueRef};

use crate::services::database::traits::{Row as TraitRow, Value};

/// Converter for SQLite values to the unified `Value` type.
pub struct SqliteValueConverter;

impl SqliteValueConverter {
    /// Convert a SQLite row to a trait Row.
    pub fn convert_row(sqlite_row: &SqliteRow) -> TraitRow {
        let mut row = TraitRow::with_capacity(sqlite_row.columns().len());
        for (idx, col) in sqlite_row.columns().iter().enumerate() {
            row.insert(col.name(), Self::extract_value(sqlite_row, col, idx));
        }
        row
    }

    /// Column names, in result-set order.
    pub fn column_names(columns: &[SqliteColumn]) -> Vec<String> {
        columns.iter().map(|c| c.name().to_string()).collect()
    }

    /// Extract a value from a SQLite row at the given column index.
    fn extract_value(row: &SqliteRow, column: &SqliteColumn, index: usize) -> Value {
        let storage_class = match row.try_get_raw(index) {
            Ok(raw) if raw.is_null() => return Value::Null,
            Ok(raw) => raw.type_info().name().to_uppercase(),
            Err(_) => return Value::Null,
        };

        let declared = column.type_info().name().to_uppercase();
        Self::decode_by_storage_class(row, index, &storage_class, &declared)
    }

    fn decode_by_storage_class(
        row: &SqliteRow,
        index: usize,
        storage_class: &str,
        declared: &str,
    ) -> Value {
        match storage_class {
            "INTEGER" if matches!(declared, "BOOLEAN" | "BOOL") => row
                .try_get::<i64, _>(index)
                .map(|v| Value::Bool(v != 0))
                .unwrap_or(Value::Null),

            "INTEGER" => row
                .try_get::<i64, _>(index)
                .map(Value::Int)
                .unwrap_or(Value::Null),

            "REAL" => row
                .try_get::<f64, _>(index)
                .map(Value::Float)
                .unwrap_or(Value::Null),

            "TEXT" => row
                .try_get::<String, _>(index)
                .map(Value::Text)
                .unwrap_or(Value::Null),

            "BLOB" => row
                .try_get::<Vec<u8>, _>(index)
                .map(|b| Value::from_bytes(&b))
                .unwrap_or(Value::Null),

            _ => Self::decode_unknown(row, index),
        }
    }

    /// Try the common decode paths in order.
    fn decode_unknown(row: &SqliteRow, index: usize) -> Value {
        if let Ok(v) = row.try_get::<i64, _>(index) {
            return Value::Int(v);
        }
        if let Ok(v) = row.try_get::<f64, _>(index) {
            return Value::Float(v);
        }
        if let Ok(v) = row.try_get::<String, _>(index) {
            return Value::Text(v);
        }
        if let Ok(v) = row.try_get::<Vec<u8>, _>(index) {
            return Value::from_bytes(&v);
        }
        Value::Null
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::{Connection, SqliteConnection};

    #[test]
    fn test_storage_classes_decode() {
        smol::block_on(async {
            let mut conn = SqliteConnection::connect("sqlite::memory:").await.unwrap();
            let row = sqlx::query(
                "SELECT 42 AS i, 1.5 AS r, 'hi' AS t, X'6F6BFF' AS b, NULL AS n",
            )
            .fetch_one(&mut conn)
            .await
            .unwrap();

            let converted = SqliteValueConverter::convert_row(&row);
            assert_eq!(converted.get("i"), Some(&Value::Int(42)));
            assert_eq!(converted.get("r"), Some(&Value::Float(1.5)));
            assert_eq!(converted.get("t"), Some(&Value::Text("hi".into())));
            assert_eq!(converted.get("b"), Some(&Value::Text("ok\u{FFFD}".into())));
            assert_eq!(converted.get("n"), Some(&Value::Null));
        });
    }

    #[test]
    fn test_declared_boolean_column() {
        smol::block_on(async {
            let mut conn = SqliteConnection::connect("sqlite::memory:").await.unwrap();
            sqlx::query("CREATE TABLE flags (active BOOLEAN)")
                .execute(&mut conn)
                .await
                .unwrap();
            sqlx::query("INSERT INTO flags VALUES (1)")
                .execute(&mut conn)
                .await
                .unwrap();
            let row = sqlx::query("SELECT active FROM flags")
                .fetch_one(&mut conn)
                .await
                .unwrap();

            let converted = SqliteValueConverter::convert_row(&row);
            assert_eq!(converted.get("active"), Some(&Value::Bool(true)));
        });
    }
}
