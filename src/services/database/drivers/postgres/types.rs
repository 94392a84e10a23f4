//! PostgreSQL type conversion utilities.
//!
//! This module handles conversion between PostgreSQL-specific types (from SQLx)
//! and the normalized `Value` type used across all adapters.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::postgres::types::{PgInterval, PgMoney, PgTimeTz};
use sqlx::postgres::{PgColumn, PgRow};
use sqlx::{Column, Row, TypeInfo, ValueRef};
use uuid::Uuid;

use crate::services::database::traits::{Row as TraitRow, Value};

/// Converter for PostgreSQL values to the unified `Value` type.
pub struct PgValueConverter;

impl PgValueConverter {
    /// Convert a PostgreSQL row to a trait Row.
    pub fn convert_row(pg_row: &PgRow) -> TraitRow {
        let mut row = TraitRow::with_capacity(pg_row.columns().len());
        for (idx, col) in pg_row.columns().iter().enumerate() {
            row.insert(col.name(), Self::extract_value(pg_row, col, idx));
        }
        row
    }

    /// Column names, in result-set order.
    pub fn column_names(columns: &[PgColumn]) -> Vec<String> {
        columns.iter().map(|c| c.name().to_string()).collect()
    }

    /// Extract a value from a PostgreSQL row at the given column index.
    fn extract_value(row: &PgRow, column: &PgColumn, index: usize) -> Value {
        match row.try_get_raw(index) {
            Ok(raw) if raw.is_null() => return Value::Null,
            Err(_) => return Value::Null,
            _ => {}
        }

        let type_name = column.type_info().name();
        Self::decode_by_type(row, index, type_name)
    }

    /// Decode a value based on its PostgreSQL type name.
    fn decode_by_type(row: &PgRow, index: usize, type_name: &str) -> Value {
        match type_name {
            "BOOL" => row
                .try_get::<bool, _>(index)
                .map(Value::Bool)
                .unwrap_or(Value::Null),

            "INT2" => row
                .try_get::<i16, _>(index)
                .map(|v| Value::Int(v as i64))
                .unwrap_or(Value::Null),

            "INT4" => row
                .try_get::<i32, _>(index)
                .map(|v| Value::Int(v as i64))
                .unwrap_or(Value::Null),

            "INT8" => row
                .try_get::<i64, _>(index)
                .map(Value::Int)
                .unwrap_or(Value::Null),

            "FLOAT4" => row
                .try_get::<f32, _>(index)
                .map(|v| Value::Float(v as f64))
                .unwrap_or(Value::Null),

            "FLOAT8" => row
                .try_get::<f64, _>(index)
                .map(Value::Float)
                .unwrap_or(Value::Null),

            "NUMERIC" => row
                .try_get::<Decimal, _>(index)
                .map(Value::from_decimal)
                .unwrap_or(Value::Null),

            "MONEY" => row
                .try_get::<PgMoney, _>(index)
                .map(|m| Value::from_decimal(m.to_decimal(2)))
                .unwrap_or(Value::Null),

            "TEXT" | "VARCHAR" | "CHAR" | "BPCHAR" | "NAME" | "CITEXT" => row
                .try_get::<String, _>(index)
                .map(Value::Text)
                .unwrap_or(Value::Null),

            "BYTEA" => row
                .try_get::<Vec<u8>, _>(index)
                .map(|b| Value::from_bytes(&b))
                .unwrap_or(Value::Null),

            "DATE" => row
                .try_get::<NaiveDate, _>(index)
                .map(Value::from_date)
                .unwrap_or(Value::Null),

            "TIME" => row
                .try_get::<NaiveTime, _>(index)
                .map(Value::from_time)
                .unwrap_or(Value::Null),

            "TIMETZ" => row
                .try_get::<PgTimeTz, _>(index)
                .map(|t| Value::Text(format!("{}{}", t.time.format("%H:%M:%S%.f"), t.offset)))
                .unwrap_or(Value::Null),

            "TIMESTAMP" => row
                .try_get::<NaiveDateTime, _>(index)
                .map(Value::from_datetime)
                .unwrap_or(Value::Null),

            "TIMESTAMPTZ" => row
                .try_get::<DateTime<Utc>, _>(index)
                .map(Value::from_datetime_tz)
                .unwrap_or(Value::Null),

            "INTERVAL" => row
                .try_get::<PgInterval, _>(index)
                .map(|iv| Value::Text(format_interval(iv.months, iv.days, iv.microseconds)))
                .unwrap_or(Value::Null),

            "UUID" => row
                .try_get::<Uuid, _>(index)
                .map(|u| Value::Text(u.to_string()))
                .unwrap_or(Value::Null),

            "JSON" | "JSONB" => row
                .try_get::<serde_json::Value, _>(index)
                .map(Value::Json)
                .unwrap_or(Value::Null),

            "INT4[]" => Self::decode_array::<i32>(row, index),
            "INT8[]" => Self::decode_array::<i64>(row, index),
            "TEXT[]" | "VARCHAR[]" => Self::decode_array::<String>(row, index),
            "BOOL[]" => Self::decode_array::<bool>(row, index),
            "FLOAT8[]" => Self::decode_array::<f64>(row, index),

            _ => Self::decode_as_string_fallback(row, index),
        }
    }

    /// Decode a one-dimensional array into a JSON array.
    fn decode_array<T>(row: &PgRow, index: usize) -> Value
    where
        T: Serialize,
        Vec<T>: for<'r> sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
    {
        row.try_get::<Vec<T>, _>(index)
            .ok()
            .and_then(|arr| serde_json::to_value(arr).ok())
            .map(Value::Json)
            .unwrap_or(Value::Null)
    }

    /// Fallback for types without a dedicated mapping.
    ///
    /// Enums, domains over text and most extension types send their text
    /// form, so the raw payload is decoded as UTF-8.
    fn decode_as_string_fallback(row: &PgRow, index: usize) -> Value {
        if let Ok(s) = row.try_get::<String, _>(index) {
            return Value::Text(s);
        }

        match row.try_get_raw(index) {
            Ok(raw) => raw
                .as_bytes()
                .map(Value::from_bytes)
                .unwrap_or(Value::Null),
            Err(_) => Value::Null,
        }
    }
}

/// Render an interval the way PostgreSQL's default `IntervalStyle` does,
/// e.g. `1 year 2 mons 3 days 04:05:06`.
pub fn format_interval(months: i32, days: i32, microseconds: i64) -> String {
    let mut out = String::new();
    let mut is_zero = true;
    let mut is_before = false;

    let mut push_part = |out: &mut String, value: i64, unit: &str| {
        if value == 0 {
            return;
        }
        if !is_zero {
            out.push(' ');
        }
        let sign = if is_before && value > 0 { "+" } else { "" };
        let plural = if value != 1 { "s" } else { "" };
        out.push_str(&format!("{}{} {}{}", sign, value, unit, plural));
        is_before = value < 0;
        is_zero = false;
    };

    push_part(&mut out, (months / 12) as i64, "year");
    push_part(&mut out, (months % 12) as i64, "mon");
    push_part(&mut out, days as i64, "day");

    if microseconds != 0 || is_zero {
        let minus = microseconds < 0;
        let abs = microseconds.unsigned_abs();
        let hours = abs / 3_600_000_000;
        let minutes = (abs / 60_000_000) % 60;
        let seconds = (abs / 1_000_000) % 60;
        let fraction = abs % 1_000_000;

        if !is_zero {
            out.push(' ');
        }
        let sign = if minus {
            "-"
        } else if is_before {
            "+"
        } else {
            ""
        };
        out.push_str(&format!("{}{:02}:{:02}:{:02}", sign, hours, minutes, seconds));
        if fraction != 0 {
            let digits = format!("{:06}", fraction);
            out.push('.');
            out.push_str(digits.trim_end_matches('0'));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_full() {
        let micros = ((4 * 60 + 5) * 60 + 6) * 1_000_000;
        assert_eq!(format_interval(14, 3, micros), "1 year 2 mons 3 days 04:05:06");
    }

    #[test]
    fn test_interval_zero() {
        assert_eq!(format_interval(0, 0, 0), "00:00:00");
    }

    #[test]
    fn test_interval_date_only() {
        assert_eq!(format_interval(0, 1, 0), "1 day");
        assert_eq!(format_interval(24, 0, 0), "2 years");
    }

    #[test]
    fn test_interval_fraction_and_sign() {
        assert_eq!(format_interval(0, 0, 1_500_000), "00:00:01.5");
        assert_eq!(format_interval(0, 0, -90_000_000), "-00:01:30");
        assert_eq!(format_interval(0, -1, 3_600_000_000), "-1 days +01:00:00");
    }
}
