//! MySQL type conversion utilities.
//!
//! This module handles conversion between MySQL-specific types (from SQLx)
//! and the normalized `Value` type used across all adapters.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use sqlx::mysql::{MySqlColumn, MySqlRow};
use sqlx::{Column, Row, TypeInfo, ValueRef};

use crate::services::database::traits::{Row as TraitRow, Value};

/// Converter for MySQL values to the unified `Value` type.
pub struct MySqlValueConverter;

impl MySqlValueConverter {
    /// Convert a MySQL row to a trait Row.
    pub fn convert_row(mysql_row: &MySqlRow) -> TraitRow {
        let mut row = TraitRow::with_capacity(mysql_row.columns().len());
        for (idx, col) in mysql_row.columns().iter().enumerate() {
            row.insert(col.name(), Self::extract_value(mysql_row, col, idx));
        }
        row
    }

    /// Column names, in result-set order.
    pub fn column_names(columns: &[MySqlColumn]) -> Vec<String> {
        columns.iter().map(|c| c.name().to_string()).collect()
    }

    /// Read a text column, tolerating binary collations in the catalog.
    pub fn text(row: &MySqlRow, index: usize) -> Option<String> {
        match row.try_get::<Option<String>, _>(index) {
            Ok(v) => v,
            Err(_) => row
                .try_get::<Option<Vec<u8>>, _>(index)
                .ok()
                .flatten()
                .map(|b| String::from_utf8_lossy(&b).into_owned()),
        }
    }

    /// Read an integer column that may be signed or unsigned.
    pub fn integer(row: &MySqlRow, index: usize) -> Option<i64> {
        match row.try_get::<Option<u64>, _>(index) {
            Ok(v) => v.and_then(|n| i64::try_from(n).ok()),
            Err(_) => row.try_get::<Option<i64>, _>(index).ok().flatten(),
        }
    }

    /// Extract a value from a MySQL row at the given column index.
    fn extract_value(row: &MySqlRow, column: &MySqlColumn, index: usize) -> Value {
        match row.try_get_raw(index) {
            Ok(raw) if raw.is_null() => return Value::Null,
            Err(_) => return Value::Null,
            _ => {}
        }

        let type_name = column.type_info().name();
        Self::decode_by_type(row, index, type_name)
    }

    /// Decode a value based on its MySQL type name.
    fn decode_by_type(row: &MySqlRow, index: usize, type_name: &str) -> Value {
        match type_name {
            // TINYINT(1)
            "BOOLEAN" | "BOOL" => row
                .try_get::<bool, _>(index)
                .map(Value::Bool)
                .unwrap_or(Value::Null),

            "TINYINT" => row
                .try_get::<i8, _>(index)
                .map(|v| Value::Int(v as i64))
                .unwrap_or(Value::Null),

            "TINYINT UNSIGNED" => row
                .try_get::<u8, _>(index)
                .map(|v| Value::Int(v as i64))
                .unwrap_or(Value::Null),

            "SMALLINT" => row
                .try_get::<i16, _>(index)
                .map(|v| Value::Int(v as i64))
                .unwrap_or(Value::Null),

            "SMALLINT UNSIGNED" => row
                .try_get::<u16, _>(index)
                .map(|v| Value::Int(v as i64))
                .unwrap_or(Value::Null),

            "MEDIUMINT" | "INT" | "INTEGER" => row
                .try_get::<i32, _>(index)
                .map(|v| Value::Int(v as i64))
                .unwrap_or(Value::Null),

            "MEDIUMINT UNSIGNED" | "INT UNSIGNED" | "INTEGER UNSIGNED" => row
                .try_get::<u32, _>(index)
                .map(|v| Value::Int(v as i64))
                .unwrap_or(Value::Null),

            "BIGINT" => row
                .try_get::<i64, _>(index)
                .map(Value::Int)
                .unwrap_or(Value::Null),

            "BIGINT UNSIGNED" => row
                .try_get::<u64, _>(index)
                .map(Value::UInt)
                .unwrap_or(Value::Null),

            "FLOAT" => row
                .try_get::<f32, _>(index)
                .map(|v| Value::Float(v as f64))
                .unwrap_or(Value::Null),

            "DOUBLE" | "DOUBLE PRECISION" | "REAL" => row
                .try_get::<f64, _>(index)
                .map(Value::Float)
                .unwrap_or(Value::Null),

            "DECIMAL" | "NUMERIC" | "DEC" | "FIXED" => row
                .try_get::<Decimal, _>(index)
                .map(Value::from_decimal)
                .unwrap_or(Value::Null),

            "CHAR" | "VARCHAR" | "TINYTEXT" | "TEXT" | "MEDIUMTEXT" | "LONGTEXT" => {
                Self::text(row, index).map(Value::Text).unwrap_or(Value::Null)
            }

            "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" => row
                .try_get::<Vec<u8>, _>(index)
                .map(|b| Value::from_bytes(&b))
                .unwrap_or(Value::Null),

            "DATE" => row
                .try_get::<NaiveDate, _>(index)
                .map(Value::from_date)
                .unwrap_or(Value::Null),

            // TIME can exceed 24h or be negative; those fall back to text.
            "TIME" => row
                .try_get::<NaiveTime, _>(index)
                .map(Value::from_time)
                .or_else(|_| row.try_get::<String, _>(index).map(Value::Text))
                .unwrap_or(Value::Null),

            "DATETIME" => row
                .try_get::<NaiveDateTime, _>(index)
                .map(Value::from_datetime)
                .unwrap_or(Value::Null),

            "TIMESTAMP" => row
                .try_get::<DateTime<Utc>, _>(index)
                .map(Value::from_datetime_tz)
                .or_else(|_| {
                    row.try_get::<NaiveDateTime, _>(index)
                        .map(Value::from_datetime)
                })
                .unwrap_or(Value::Null),

            "YEAR" => row
                .try_get::<u16, _>(index)
                .map(|v| Value::Int(v as i64))
                .unwrap_or(Value::Null),

            "JSON" => row
                .try_get::<serde_json::Value, _>(index)
                .map(Value::Json)
                .unwrap_or(Value::Null),

            // ENUM and SET come back as strings
            _ if type_name.starts_with("ENUM") || type_name.starts_with("SET") => {
                Self::text(row, index).map(Value::Text).unwrap_or(Value::Null)
            }

            _ => Self::decode_as_string_fallback(row, index),
        }
    }

    /// Fallback for types without a dedicated mapping.
    fn decode_as_string_fallback(row: &MySqlRow, index: usize) -> Value {
        if let Ok(v) = row.try_get::<i64, _>(index) {
            return Value::Int(v);
        }
        if let Ok(v) = row.try_get::<u64, _>(index) {
            return Value::UInt(v);
        }
        if let Ok(v) = row.try_get::<f64, _>(index) {
            return Value::Float(v);
        }
        Self::text(row, index).map(Value::Text).unwrap_or(Value::Null)
    }
}
