//! DM8 type conversion utilities.
//!
//! Results are fetched through ODBC text buffers, so every cell arrives as
//! text. The column's SQL type decides how that text is turned back into a
//! `Value`.

use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use odbc_api::DataType;
use rust_decimal::Decimal;

use crate::services::database::traits::Value;

/// Coarse classification of an ODBC column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DmColumnKind {
    Integer,
    Float,
    Decimal,
    Bit,
    Date,
    Time,
    Timestamp,
    Binary,
    Text,
}

impl DmColumnKind {
    pub fn from_data_type(data_type: DataType) -> Self {
        match data_type {
            DataType::TinyInt { .. }
            | DataType::SmallInt { .. }
            | DataType::Integer { .. }
            | DataType::BigInt { .. } => Self::Integer,
            DataType::Real { .. } | DataType::Float { .. } | DataType::Double { .. } => {
                Self::Float
            }
            DataType::Decimal { .. } | DataType::Numeric { .. } => Self::Decimal,
            DataType::Bit { .. } => Self::Bit,
            DataType::Date { .. } => Self::Date,
            DataType::Time { .. } => Self::Time,
            DataType::Timestamp { .. } => Self::Timestamp,
            DataType::Binary { .. } | DataType::Varbinary { .. } | DataType::LongVarbinary { .. } => {
                Self::Binary
            }
            _ => Self::Text,
        }
    }
}

/// Convert one fetched cell. `None` is SQL NULL.
pub fn convert_text(kind: DmColumnKind, text: Option<&str>) -> Value {
    let Some(text) = text else {
        return Value::Null;
    };
    let trimmed = text.trim();

    let parsed = match kind {
        DmColumnKind::Integer => trimmed.parse::<i64>().ok().map(Value::Int),
        DmColumnKind::Float => trimmed.parse::<f64>().ok().map(Value::Float),
        DmColumnKind::Decimal => Decimal::from_str(trimmed)
            .ok()
            .map(Value::from_decimal)
            .or_else(|| trimmed.parse::<f64>().ok().map(Value::Float)),
        DmColumnKind::Bit => match trimmed {
            "1" => Some(Value::Bool(true)),
            "0" => Some(Value::Bool(false)),
            _ => None,
        },
        DmColumnKind::Date => NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
            .ok()
            .map(Value::from_date),
        DmColumnKind::Time => NaiveTime::parse_from_str(trimmed, "%H:%M:%S%.f")
            .ok()
            .map(Value::from_time),
        DmColumnKind::Timestamp => NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f")
            .ok()
            .map(Value::from_datetime),
        // The driver renders binary columns as hex digits.
        DmColumnKind::Binary => hex::decode(trimmed).ok().map(|b| Value::from_bytes(&b)),
        DmColumnKind::Text => None,
    };

    parsed.unwrap_or_else(|| Value::Text(text.to_string()))
}
