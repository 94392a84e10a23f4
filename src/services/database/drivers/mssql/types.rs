//! SQL Server type conversion utilities.
//!
//! Tiberius hands every cell out as a typed `ColumnData`, so conversion works
//! on the cell itself instead of looking the column type up by name.

use std::borrow::Cow;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use tiberius::numeric::Numeric;
use tiberius::{Column, ColumnData, FromSql};

use crate::services::database::traits::{Row as TraitRow, Value};

/// Converter for SQL Server values to the unified `Value` type.
pub struct MssqlValueConverter;

impl MssqlValueConverter {
    /// Convert a Tiberius row to a trait Row.
    pub fn convert_row(row: &tiberius::Row) -> TraitRow {
        let mut out = TraitRow::with_capacity(row.len());
        for (column, data) in row.cells() {
            out.insert(column.name(), Self::convert_data(data));
        }
        out
    }

    /// Column names, in result-set order.
    pub fn column_names(columns: &[Column]) -> Vec<String> {
        columns.iter().map(|c| c.name().to_string()).collect()
    }

    /// Convert a single cell.
    pub fn convert_data(data: &ColumnData<'static>) -> Value {
        match data {
            ColumnData::U8(v) => v.map(|v| Value::Int(v as i64)).unwrap_or_default(),
            ColumnData::I16(v) => v.map(|v| Value::Int(v as i64)).unwrap_or_default(),
            ColumnData::I32(v) => v.map(|v| Value::Int(v as i64)).unwrap_or_default(),
            ColumnData::I64(v) => v.map(Value::Int).unwrap_or_default(),
            ColumnData::F32(v) => v.map(|v| Value::Float(v as f64)).unwrap_or_default(),
            ColumnData::F64(v) => v.map(Value::Float).unwrap_or_default(),
            ColumnData::Bit(v) => v.map(Value::Bool).unwrap_or_default(),
            ColumnData::String(v) => v
                .as_ref()
                .map(|s| Value::Text(s.to_string()))
                .unwrap_or_default(),
            ColumnData::Guid(v) => v.map(|u| Value::Text(u.to_string())).unwrap_or_default(),
            ColumnData::Binary(v) => v
                .as_ref()
                .map(|b| Value::from_bytes(b))
                .unwrap_or_default(),
            ColumnData::Numeric(v) => v.map(numeric_value).unwrap_or_default(),
            ColumnData::Xml(v) => v
                .as_ref()
                .map(|xml| Value::Text(Cow::clone(xml).into_owned().into_string()))
                .unwrap_or_default(),
            ColumnData::DateTime(_) | ColumnData::SmallDateTime(_) | ColumnData::DateTime2(_) => {
                decode::<NaiveDateTime>(data)
                    .map(Value::from_datetime)
                    .unwrap_or_default()
            }
            ColumnData::Date(_) => decode::<NaiveDate>(data)
                .map(Value::from_date)
                .unwrap_or_default(),
            ColumnData::Time(_) => decode::<NaiveTime>(data)
                .map(Value::from_time)
                .unwrap_or_default(),
            ColumnData::DateTimeOffset(_) => decode::<DateTime<FixedOffset>>(data)
                .map(Value::from_datetime_tz)
                .unwrap_or_default(),
        }
    }
}

fn decode<'a, T: FromSql<'a>>(data: &'a ColumnData<'static>) -> Option<T> {
    T::from_sql(data).ok().flatten()
}

/// Exact decimal when it fits in 28 digits, float division otherwise.
fn numeric_value(n: Numeric) -> Value {
    match Decimal::try_from_i128_with_scale(n.value(), n.scale() as u32) {
        Ok(d) => Value::from_decimal(d),
        Err(_) => Value::Float(n.value() as f64 / 10f64.powi(n.scale() as i32)),
    }
}
